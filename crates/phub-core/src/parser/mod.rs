//! Page and manifest parsers
//!
//! Contains modules for parsing the different documents the site serves.

pub mod challenge;
pub mod flash;
pub mod listing;
pub mod manifest;

pub use challenge::{Challenge, least_factor, parse_challenge};
pub use flash::parse_flash;
pub use listing::parse_listing;
pub use manifest::{parse_index, parse_master, segment_base};
