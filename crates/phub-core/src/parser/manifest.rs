//! HLS manifest parsing
//!
//! The quality-specific master manifest references exactly one index
//! manifest; the index lists the segments in playback order. Both are
//! relative to the directory that holds `master.m3u8`.

use m3u8_rs::{parse_master_playlist_res, parse_media_playlist_res};

use crate::consts::MASTER_MARKER;
use crate::error::{PhubError, Result};

/// Extracts the single index reference from a master manifest
///
/// # Errors
/// `Parsing` if the manifest is malformed or references no index or more
/// than one.
pub fn parse_master(text: &str) -> Result<String> {
    let playlist = parse_master_playlist_res(text.as_bytes())
        .map_err(|e| PhubError::Parsing(format!("Failed to parse master manifest: {e}")))?;

    let mut variants = playlist.variants.into_iter().filter(|v| !v.uri.is_empty());
    match (variants.next(), variants.next()) {
        (Some(variant), None) => Ok(variant.uri),
        (None, _) => Err(PhubError::Parsing(
            "no index file found in master manifest".to_string(),
        )),
        (Some(_), Some(_)) => Err(PhubError::Parsing(
            "multiple index files found in master manifest".to_string(),
        )),
    }
}

/// Directory URL segments are resolved against
///
/// # Example
/// ```
/// use phub_core::parser::segment_base;
/// let base = segment_base("https://cdn.example/v/720P/master.m3u8?tok=1").unwrap();
/// assert_eq!(base, "https://cdn.example/v/720P/");
/// ```
pub fn segment_base(master_url: &str) -> Result<&str> {
    master_url
        .find(MASTER_MARKER)
        .map(|pos| &master_url[..pos])
        .ok_or_else(|| {
            PhubError::Parsing(format!("`{}` is not a master manifest URL", master_url))
        })
}

/// Absolute segment URLs of an index manifest, in playback order
///
/// # Errors
/// `Parsing` if the index is not a media playlist
pub fn parse_index(text: &str, base: &str) -> Result<Vec<String>> {
    let playlist = parse_media_playlist_res(text.as_bytes())
        .map_err(|e| PhubError::Parsing(format!("Failed to parse index manifest: {e}")))?;

    Ok(playlist
        .segments
        .iter()
        .map(|segment| format!("{}{}", base, segment.uri.trim()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_master_single_reference() {
        let text = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=4000000,RESOLUTION=1280x720\nindex-v1-a1.m3u8?tok=1\n\n";
        assert_eq!(parse_master(text).unwrap(), "index-v1-a1.m3u8?tok=1");
    }

    #[test]
    fn test_parse_master_no_reference() {
        let result = parse_master("#EXTM3U\n#EXT-X-VERSION:3\n");
        assert!(matches!(result, Err(PhubError::Parsing(_))));
    }

    #[test]
    fn test_parse_master_multiple_references() {
        let text = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=4000000\nindex-a.m3u8\n#EXT-X-STREAM-INF:BANDWIDTH=2000000\nindex-b.m3u8\n";
        match parse_master(text) {
            Err(PhubError::Parsing(msg)) => assert!(msg.contains("multiple")),
            other => panic!("Expected Parsing error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_master_rejects_garbage() {
        let result = parse_master("<html>not a playlist</html>");
        assert!(matches!(result, Err(PhubError::Parsing(_))));
    }

    #[test]
    fn test_segment_base_missing_marker() {
        assert!(segment_base("https://cdn.example/v/video.mp4").is_err());
    }

    #[test]
    fn test_parse_index_preserves_order() {
        let text = "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:10,\nseg-1-v1-a1.ts\n#EXTINF:10,\nseg-2-v1-a1.ts\n#EXTINF:4,\nseg-3-v1-a1.ts\n#EXT-X-ENDLIST\n";
        let segments = parse_index(text, "https://cdn.example/v/").unwrap();
        assert_eq!(
            segments,
            vec![
                "https://cdn.example/v/seg-1-v1-a1.ts",
                "https://cdn.example/v/seg-2-v1-a1.ts",
                "https://cdn.example/v/seg-3-v1-a1.ts",
            ]
        );
    }
}
