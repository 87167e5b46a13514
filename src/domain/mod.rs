pub mod feed;
pub mod item;

pub use feed::Feed;
pub use item::Item;
