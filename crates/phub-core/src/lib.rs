//! Phub Client Core Library
//!
//! Provides an async API for looking up, searching and downloading videos.
//!
//! # Overview
//!
//! This crate provides a complete client with:
//! - A rate-limited HTTP session with login and automatic session renewal
//! - A small sandboxed interpreter for the obfuscated scripts video pages carry
//! - Lazily fetched, cached video fields from the structured API and the page
//! - HLS manifest resolution and bounded-concurrency segment downloads
//!
//! # Example
//!
//! ```no_run
//! use phub_core::{DownloadOptions, PhubScraper, Quality, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let scraper = PhubScraper::new()?;
//!
//!     let video = scraper.get_video("https://www.pornhub.com/view_video.php?viewkey=ph5f0a")?;
//!     println!("{} ({:?})", video.title().await?, video.duration().await?);
//!
//!     let qualities = video.qualities().await?;
//!     println!("Available: {:?}", qualities.keys().collect::<Vec<_>>());
//!
//!     video
//!         .download("video.ts", Quality::Best, &DownloadOptions::default(), |done, total| {
//!             println!("{}/{}", done, total);
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! Content that cannot be played (region-blocked, premium, disabled, under
//! review) raises a terminal error; see [`PhubError::is_terminal`]. Batch
//! callers should skip such items rather than abort.

mod client;
mod consts;
mod data;
mod download;
mod error;
pub mod js;
pub mod parser;
pub mod patterns;
mod quality;
mod query;
mod resolver;
mod scraper;
mod types;
pub mod url;
mod video;

// Re-export client types
pub use client::{ClientConfig, PhubClient, RateLimiter};

// Re-export error types
pub use error::{PhubError, Result};

// Re-export the data model
pub use data::{DataKey, Namespace};
pub use download::{DownloadMode, DownloadOptions};
pub use quality::Quality;
pub use query::{Query, Source};
pub use types::{ListingItem, Rating};
pub use video::{Video, parse_duration};

// Re-export main scraper API
pub use scraper::PhubScraper;

// Re-export resolver entry points for callers holding raw pages
pub use resolver::classify;
