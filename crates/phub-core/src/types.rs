//! Core data types for the phub client

use serde::{Deserialize, Serialize};

/// A video card scraped from an HTML listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingItem {
    /// View key (e.g., "ph5f0a1b2c3d4e5")
    pub key: String,

    /// Card title
    pub title: Option<String>,

    /// Duration as printed on the card (e.g., "12:34")
    pub duration: Option<String>,
}

/// Like ratio of a video
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Share of positive votes, 0-100
    pub percent: f64,

    /// Number of votes cast
    pub count: u64,
}
