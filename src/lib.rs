//! # rsslite
//!
//! Turns web pages and JSON APIs that have no feed of their own into RSS.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler → Fetcher → Extractor → Store → Gateway → HTTP
//! ```
//!
//! Each configured source is refreshed on its own timer. A refresh fetches
//! the source page (following next-page links), extracts items with CSS
//! selectors or JSON paths, and atomically replaces the source's items in a
//! shared feed table. The table is snapshotted to disk after every
//! successful refresh and reloaded at startup.
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a sample configuration to data/config.toml
//! rsslite init
//!
//! # Validate it
//! rsslite check
//!
//! # Serve feeds at http://0.0.0.0:3000/feed/<slug>
//! rsslite
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// refresh coordinator and render gateway.
pub mod app;

/// Command-line interface using clap.
///
/// - `serve` (default) - Run the server and schedules
/// - `check` - Validate the configuration
/// - `refresh <slug>` - Refresh one source now
/// - `init` - Write a sample configuration
pub mod cli;

/// TOML configuration: service settings and sources.
pub mod config;

/// Core domain models: [`Feed`](domain::Feed) and [`Item`](domain::Item).
pub mod domain;

/// Item extraction from HTML (CSS selectors) and JSON (dotted paths).
pub mod extractor;

/// Page fetching and pagination.
pub mod fetcher;

/// Single-flight feed rendering.
pub mod gateway;

/// Refresh coordination and per-source scheduling.
pub mod refresh;

/// RSS 2.0 serialization.
pub mod render;

/// Relative link resolution.
pub mod resolver;

/// Shared feed table and its on-disk snapshot.
pub mod store;

/// HTTP routes.
pub mod web;
