use serde::{Deserialize, Serialize};

use super::Item;

/// Per-slug aggregate served to feed readers.
///
/// `items` keeps extraction order and is replaced wholesale on every
/// successful refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Feed {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            items: Vec::new(),
        }
    }
}
