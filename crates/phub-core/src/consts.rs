//! Site constants shared across modules

/// Site root. Every root-relative URL is joined onto this.
pub const ROOT: &str = "https://www.pornhub.com/";

/// Structured (webmasters) API root.
pub const API_ROOT: &str = "https://www.pornhub.com/webmasters/";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Cookie injected by session renewal.
pub const RENEWAL_COOKIE: &str = "RNKEY";

/// Resolver attempt ceiling (initial try plus renewals).
pub const MAX_CALL_RETRIES: u32 = 3;

/// Resolutions a master manifest may be selected for.
pub const KNOWN_QUALITIES: [u32; 6] = [240, 480, 720, 1080, 1440, 2160];

/// Filename every master manifest URL contains; the segment base path ends right before it.
pub const MASTER_MARKER: &str = "master.m3u8";

/// Placeholder the flash variable is renamed to before evaluation.
pub const FLASH_PLACEHOLDER: &str = "FLASH";

/// Marker statement after which the flash decoration script starts.
pub const FLASH_SCRIPT_START: &str = "player_mp4_seek";

/// Marker that ends the flash decoration script.
pub const FLASH_SCRIPT_END: &str = "playerObjList";

/// Items per page for each query source.
pub const API_PAGE_SIZE: usize = 30;
pub const HTML_PAGE_SIZE: usize = 32;
