//! Video entity
//!
//! A [`Video`] is created from a URL or key without touching the network.
//! Every field is read through the tiered data cache: `data@` fields come
//! from one structured-API call, `page@` fields from the resolved flash
//! blob of the video page. [`Video::refresh`] drops both.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::client::PhubClient;
use crate::consts::KNOWN_QUALITIES;
use crate::data::{DataCache, DataKey, Namespace};
use crate::download::{self, DownloadOptions};
use crate::error::{PhubError, Result};
use crate::parser::{parse_index, parse_master, segment_base};
use crate::quality::Quality;
use crate::resolver;
use crate::types::Rating;
use crate::url::{build_api_video_path, build_video_path, extract_key};

const QUALITIES: &str = "qualities";

#[derive(Default)]
struct VideoState {
    page: Option<String>,
    data: DataCache,
}

/// One remote video
pub struct Video {
    key: String,
    url: String,
    client: Arc<PhubClient>,
    state: Mutex<VideoState>,
}

impl std::fmt::Debug for Video {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Video")
            .field("key", &self.key)
            .field("url", &self.url)
            .finish()
    }
}

impl Video {
    /// Creates a video from a full URL, a root-relative URL or a bare key
    ///
    /// # Errors
    /// `InvalidUrl` if no view key can be found
    pub fn new(client: Arc<PhubClient>, url: &str) -> Result<Self> {
        let key = extract_key(url).ok_or_else(|| PhubError::InvalidUrl(url.to_string()))?;
        Ok(Self::with_state(client, key, VideoState::default()))
    }

    /// Creates a video whose API fields are partly known already
    pub(crate) fn seeded(client: Arc<PhubClient>, key: &str, fields: Map<String, Value>) -> Self {
        let mut state = VideoState::default();
        state.data.seed(Namespace::Api, fields);
        Self::with_state(client, key.to_string(), state)
    }

    fn with_state(client: Arc<PhubClient>, key: String, state: VideoState) -> Self {
        Self {
            url: build_video_path(&key),
            key,
            client,
            state: Mutex::new(state),
        }
    }

    /// View key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Canonical root-relative URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Drops the cached page, every field and every derived value
    pub async fn refresh(&self) {
        let mut state = self.state.lock().await;
        state.page = None;
        state.data.invalidate();
        debug!(key = %self.key, generation = state.data.generation(), "Video refreshed");
    }

    /// Raw HTML of the video page, fetched on first use
    pub async fn page(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        if let Some(page) = &state.page {
            return Ok(page.clone());
        }
        let page = self.client.fetch_text(&self.url).await?;
        state.page = Some(page.clone());
        Ok(page)
    }

    /// Value of a namespaced field
    ///
    /// Each namespace costs at most one request until the next
    /// [`Self::refresh`]: the first miss fetches and caches every field
    /// of that namespace.
    ///
    /// # Errors
    /// - Anything the API call or the page resolver raises
    /// - `Parsing` - the field is absent from the fetched data
    pub async fn fetch(&self, key: &DataKey) -> Result<Value> {
        self.fetch_optional(key).await?.ok_or_else(|| {
            PhubError::Parsing(format!("video {} has no field `{}`", self.key, key))
        })
    }

    /// Like [`Self::fetch`], with `None` for a field the source lacks
    pub async fn fetch_optional(&self, key: &DataKey) -> Result<Option<Value>> {
        let mut state = self.state.lock().await;
        if let Some(value) = state.data.get(key) {
            return Ok(Some(value.clone()));
        }

        let namespace = key.namespace();
        if !state.data.is_loaded(namespace) {
            let fields = match namespace {
                Namespace::Api => self.api_fields().await?,
                Namespace::Page => {
                    let flash = resolver::resolve(&self.client, &self.url, &mut state.page).await?;
                    match flash {
                        Value::Object(map) => map,
                        _ => {
                            return Err(PhubError::Parsing(
                                "flash blob is not an object".to_string(),
                            ));
                        }
                    }
                }
            };
            debug!(key = %self.key, ?namespace, fields = fields.len(), "Fields loaded");
            state.data.merge(namespace, fields);
        }

        Ok(state.data.get(key).cloned())
    }

    async fn api_fields(&self) -> Result<Map<String, Value>> {
        let mut reply = self.client.fetch_api(&build_api_video_path(&self.key)).await?;
        match reply.get_mut("video").map(Value::take) {
            Some(Value::Object(fields)) => Ok(fields),
            _ => {
                let message = reply
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("no video in reply");
                Err(PhubError::NotFound(format!("{}: {}", self.key, message)))
            }
        }
    }

    // ------------------------------------------------------------------
    // Typed accessors
    // ------------------------------------------------------------------

    pub async fn title(&self) -> Result<String> {
        let value = self.fetch(&DataKey::api("title")).await?;
        Ok(as_text(&value))
    }

    /// Length of the video
    pub async fn duration(&self) -> Result<Duration> {
        match self.fetch(&DataKey::api("duration")).await? {
            Value::Number(n) => n
                .as_u64()
                .map(Duration::from_secs)
                .ok_or_else(|| PhubError::Parsing(format!("invalid duration {}", n))),
            value => parse_duration(&as_text(&value)),
        }
    }

    pub async fn views(&self) -> Result<u64> {
        let value = self.fetch(&DataKey::api("views")).await?;
        as_u64(&value).ok_or_else(|| PhubError::Parsing(format!("invalid views {}", value)))
    }

    /// Like percentage and vote count
    pub async fn rating(&self) -> Result<Rating> {
        let percent = self.fetch(&DataKey::api("rating")).await?;
        let percent = as_f64(&percent)
            .ok_or_else(|| PhubError::Parsing(format!("invalid rating {}", percent)))?;
        let count = self
            .fetch_optional(&DataKey::api("ratings"))
            .await?
            .and_then(|v| as_u64(&v))
            .unwrap_or_default();
        Ok(Rating { percent, count })
    }

    /// Publish date (site local time)
    pub async fn date(&self) -> Result<NaiveDateTime> {
        let value = self.fetch(&DataKey::api("publish_date")).await?;
        let text = as_text(&value);
        NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S")
            .map_err(|e| PhubError::Parsing(format!("invalid date `{}`: {}", text, e)))
    }

    pub async fn tags(&self) -> Result<Vec<String>> {
        self.names("tags", "tag_name").await
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        self.names("categories", "category").await
    }

    pub async fn pornstars(&self) -> Result<Vec<String>> {
        self.names("pornstars", "pornstar_name").await
    }

    pub async fn thumbnail(&self) -> Result<String> {
        let value = match self.fetch_optional(&DataKey::api("default_thumb")).await? {
            Some(value) => value,
            None => self.fetch(&DataKey::api("thumb")).await?,
        };
        Ok(as_text(&value))
    }

    /// Whether the player reports a portrait video
    pub async fn is_vertical(&self) -> Result<bool> {
        let value = self.fetch_optional(&DataKey::page("isVertical")).await?;
        Ok(match value {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => s == "true",
            _ => false,
        })
    }

    /// List field whose entries are strings or objects carrying `name_field`
    async fn names(&self, field: &str, name_field: &str) -> Result<Vec<String>> {
        let value = self.fetch_optional(&DataKey::api(field)).await?;
        let Some(Value::Array(entries)) = value else {
            return Ok(Vec::new());
        };

        Ok(entries
            .iter()
            .filter_map(|entry| match entry {
                Value::String(s) => Some(s.clone()),
                Value::Object(map) => map.get(name_field).map(as_text),
                _ => None,
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // Media
    // ------------------------------------------------------------------

    /// Master manifest URL per available resolution
    ///
    /// Built from `page@mediaDefinitions`, keeping only known resolutions.
    /// Memoised until the next [`Self::refresh`].
    pub async fn qualities(&self) -> Result<BTreeMap<u32, String>> {
        let generation = {
            let state = self.state.lock().await;
            if let Some(qualities) = state.data.derived::<BTreeMap<u32, String>>(QUALITIES) {
                return Ok(qualities);
            }
            state.data.generation()
        };

        let definitions = self.fetch(&DataKey::page("mediaDefinitions")).await?;
        let qualities = quality_map(&definitions);
        // A refresh in between leaves the map unstored
        self.state
            .lock()
            .await
            .data
            .store_derived(QUALITIES, generation, qualities.clone());
        Ok(qualities)
    }

    /// Absolute segment URLs for `quality`, in playback order
    ///
    /// Every call walks the master and index manifests again.
    ///
    /// # Errors
    /// - `Parsing` - no known quality, or a master manifest without
    ///   exactly one index reference
    pub async fn get_segments(&self, quality: Quality) -> Result<Vec<String>> {
        let qualities = self.qualities().await?;
        let (resolution, master_url) = quality.select(&qualities).ok_or_else(|| {
            PhubError::Parsing(format!("video {} lists no known quality", self.key))
        })?;

        let master = self.client.fetch_text(master_url).await?;
        let reference = parse_master(&master)?;
        let base = segment_base(master_url)?;

        let index = self
            .client
            .fetch_text(&format!("{}{}", base, reference))
            .await?;
        let segments = parse_index(&index, base)?;

        debug!(
            key = %self.key,
            %quality,
            resolution,
            segments = segments.len(),
            "Resolved manifest chain"
        );
        Ok(segments)
    }

    /// Downloads the video at `quality` into `path`
    ///
    /// Nothing is written unless every segment arrived.
    ///
    /// # Arguments
    /// * `path` - Output file
    /// * `quality` - Requested quality
    /// * `options` - Retry budget and execution mode
    /// * `progress` - Called with `(completed, total)` segments
    pub async fn download<P, F>(
        &self,
        path: P,
        quality: Quality,
        options: &DownloadOptions,
        progress: F,
    ) -> Result<()>
    where
        P: AsRef<Path>,
        F: FnMut(usize, usize),
    {
        let segments = self.get_segments(quality).await?;
        let media = download::fetch_segments(&self.client, &segments, options, progress).await?;
        tokio::fs::write(path.as_ref(), &media).await?;

        info!(
            key = %self.key,
            path = %path.as_ref().display(),
            bytes = media.len(),
            "Video downloaded"
        );
        Ok(())
    }
}

/// Parses `MM:SS`, `HH:MM:SS` or `D:HH:MM:SS`
///
/// # Example
/// ```
/// use std::time::Duration;
/// use phub_core::parse_duration;
/// assert_eq!(parse_duration("1:02:03").unwrap(), Duration::from_secs(3723));
/// ```
pub fn parse_duration(text: &str) -> Result<Duration> {
    let invalid = || PhubError::Parsing(format!("invalid duration `{}`", text));

    let parts = text
        .trim()
        .split(':')
        .map(|part| part.trim().parse::<u64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    if !(2..=4).contains(&parts.len()) {
        return Err(invalid());
    }

    let seconds = parts
        .iter()
        .rev()
        .zip([1u64, 60, 3600, 86400])
        .try_fold(0u64, |total, (value, unit)| {
            value.checked_mul(unit)?.checked_add(total)
        })
        .ok_or_else(invalid)?;
    Ok(Duration::from_secs(seconds))
}

/// Known resolution → master URL, from the player's media definitions
fn quality_map(definitions: &Value) -> BTreeMap<u32, String> {
    let Some(entries) = definitions.as_array() else {
        return BTreeMap::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let resolution = match entry.get("quality")? {
                Value::String(s) => s.parse::<u32>().ok()?,
                Value::Number(n) => u32::try_from(n.as_u64()?).ok()?,
                _ => return None,
            };
            let url = entry.get("videoUrl")?.as_str()?;
            (KNOWN_QUALITIES.contains(&resolution) && !url.is_empty())
                .then(|| (resolution, url.to_string()))
        })
        .collect()
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use serde_json::json;
    use wiremock::matchers::{path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn video_page(master: &str) -> String {
        format!(
            r#"<html><script>
            var flashvars_42 = {{"isVertical":"false","mediaDefinitions":[{{"format":"hls","quality":"720","videoUrl":"{master}"}},{{"format":"hls","quality":"480","videoUrl":"http://unused/480P/master.m3u8"}},{{"format":"hls","quality":"360","videoUrl":"http://unused/360P/master.m3u8"}},{{"format":"mp4","quality":["720","480"],"videoUrl":"http://unused/get_media"}}]}};
            var player_mp4_seek = "ms";
            flashvars_42.isVertical = "true";
            playerObjList.x = 1;
            </script></html>"#
        )
    }

    fn api_reply() -> Value {
        json!({
            "video": {
                "title": "Sample",
                "duration": "1:02:03",
                "views": 1234,
                "rating": "87.5",
                "ratings": 40,
                "publish_date": "2021-03-04 05:06:07",
                "tags": [{"tag_name": "one"}, {"tag_name": "two"}],
                "categories": [{"category": "cat"}],
                "pornstars": [],
                "default_thumb": "https://thumbs/1.jpg"
            }
        })
    }

    async fn setup() -> (MockServer, Arc<PhubClient>) {
        let server = MockServer::start().await;
        let client = PhubClient::with_config(ClientConfig::for_mock(&server.uri())).unwrap();
        (server, Arc::new(client))
    }

    #[test]
    fn test_parse_duration_formats() {
        assert_eq!(parse_duration("12:34").unwrap(), Duration::from_secs(754));
        assert_eq!(parse_duration("01:02:03").unwrap(), Duration::from_secs(3723));
        assert_eq!(
            parse_duration("1:00:00:01").unwrap(),
            Duration::from_secs(86401)
        );
        assert!(parse_duration("12").is_err());
        assert!(parse_duration("a:b").is_err());
    }

    #[test]
    fn test_parse_duration_overflow() {
        assert!(matches!(
            parse_duration("18446744073709551615:00"),
            Err(PhubError::Parsing(_))
        ));
        assert!(matches!(
            parse_duration("213503982334602:00:00:00"),
            Err(PhubError::Parsing(_))
        ));
    }

    #[test]
    fn test_quality_map_filters_unknown() {
        let definitions = json!([
            {"quality": "1080", "videoUrl": "u1080"},
            {"quality": 240, "videoUrl": "u240"},
            {"quality": "360", "videoUrl": "u360"},
            {"quality": ["720"], "videoUrl": "get_media"},
            {"quality": "480", "videoUrl": ""}
        ]);
        let map = quality_map(&definitions);
        assert_eq!(
            map,
            BTreeMap::from([(240, "u240".to_string()), (1080, "u1080".to_string())])
        );
    }

    #[test]
    fn test_new_extracts_key() {
        let client = Arc::new(PhubClient::new().unwrap());
        let video = Video::new(
            Arc::clone(&client),
            "https://www.pornhub.com/view_video.php?viewkey=ph5f0a",
        )
        .unwrap();
        assert_eq!(video.key(), "ph5f0a");
        assert_eq!(video.url(), "view_video.php?viewkey=ph5f0a");

        assert!(matches!(
            Video::new(client, "https://www.pornhub.com/categories"),
            Err(PhubError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_api_fields_fetched_once() {
        let (server, client) = setup().await;
        Mock::given(path("/webmasters/video_by_id"))
            .and(query_param("id", "ph42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(api_reply()))
            .expect(1)
            .mount(&server)
            .await;

        let video = Video::new(client, "ph42").unwrap();
        assert_eq!(video.title().await.unwrap(), "Sample");
        assert_eq!(video.title().await.unwrap(), "Sample");
        assert_eq!(video.duration().await.unwrap(), Duration::from_secs(3723));
        assert_eq!(video.views().await.unwrap(), 1234);
        assert_eq!(
            video.rating().await.unwrap(),
            Rating {
                percent: 87.5,
                count: 40
            }
        );
        assert_eq!(
            video.date().await.unwrap().to_string(),
            "2021-03-04 05:06:07"
        );
        assert_eq!(video.tags().await.unwrap(), vec!["one", "two"]);
        assert_eq!(video.categories().await.unwrap(), vec!["cat"]);
        assert!(video.pornstars().await.unwrap().is_empty());
        assert_eq!(video.thumbnail().await.unwrap(), "https://thumbs/1.jpg");
        // Missing field: no second request
        assert!(matches!(
            video.fetch(&DataKey::api("nope")).await,
            Err(PhubError::Parsing(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_refetches() {
        let (server, client) = setup().await;
        Mock::given(path("/webmasters/video_by_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(api_reply()))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/webmasters/video_by_id"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"video": {"title": "Renamed"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let video = Video::new(client, "ph42").unwrap();
        assert_eq!(video.title().await.unwrap(), "Sample");
        video.refresh().await;
        assert_eq!(video.title().await.unwrap(), "Renamed");
        assert_eq!(video.title().await.unwrap(), "Renamed");
    }

    #[tokio::test]
    async fn test_api_missing_video() {
        let (server, client) = setup().await;
        Mock::given(path("/webmasters/video_by_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"code": "2001", "message": "No video with this ID."}),
            ))
            .mount(&server)
            .await;

        let video = Video::new(client, "ph0").unwrap();
        assert!(matches!(video.title().await, Err(PhubError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_seeded_fields_skip_request() {
        let (server, client) = setup().await;
        Mock::given(path("/webmasters/video_by_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(api_reply()))
            .expect(0)
            .mount(&server)
            .await;

        let fields = match json!({"title": "From search"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let video = Video::seeded(client, "ph42", fields);
        assert_eq!(video.title().await.unwrap(), "From search");
    }

    #[tokio::test]
    async fn test_manifest_chain() {
        let (server, client) = setup().await;
        let master = format!("{}/hls/720P/master.m3u8?tok=1", server.uri());

        Mock::given(path("/view_video.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(video_page(&master)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/hls/720P/master.m3u8"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nindex-v1.m3u8\n"),
            )
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(path("/hls/720P/index-v1.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "#EXTM3U\n#EXTINF:10,\nseg-1.ts\n#EXTINF:10,\nseg-2.ts\n#EXT-X-ENDLIST\n",
            ))
            .expect(2)
            .mount(&server)
            .await;

        let video = Video::new(client, "ph42").unwrap();
        let qualities = video.qualities().await.unwrap();
        assert_eq!(qualities.keys().copied().collect::<Vec<_>>(), vec![480, 720]);
        assert!(video.is_vertical().await.unwrap());

        let segments = video.get_segments(Quality::Best).await.unwrap();
        let base = format!("{}/hls/720P/", server.uri());
        assert_eq!(
            segments,
            vec![format!("{}seg-1.ts", base), format!("{}seg-2.ts", base)]
        );

        // Not restartable: a second walk fetches the manifests again
        let again = video.get_segments(Quality::Exact(720)).await.unwrap();
        assert_eq!(again, segments);
    }

    #[tokio::test]
    async fn test_qualities_rebuilt_after_refresh() {
        let (server, client) = setup().await;
        Mock::given(path("/view_video.php"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(video_page("http://old/720P/master.m3u8")),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/view_video.php"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(video_page("http://new/720P/master.m3u8")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let video = Video::new(client, "ph42").unwrap();
        assert_eq!(video.qualities().await.unwrap()[&720], "http://old/720P/master.m3u8");
        assert_eq!(video.qualities().await.unwrap()[&720], "http://old/720P/master.m3u8");

        video.refresh().await;
        assert_eq!(video.qualities().await.unwrap()[&720], "http://new/720P/master.m3u8");
    }

    #[tokio::test]
    async fn test_master_with_two_references() {
        let (server, client) = setup().await;
        let master = format!("{}/hls/720P/master.m3u8", server.uri());

        Mock::given(path("/view_video.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(video_page(&master)))
            .mount(&server)
            .await;
        Mock::given(path("/hls/720P/master.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=2\na.m3u8\n#EXT-X-STREAM-INF:BANDWIDTH=1\nb.m3u8\n",
            ))
            .mount(&server)
            .await;
        Mock::given(path("/hls/720P/a.m3u8"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let video = Video::new(client, "ph42").unwrap();
        let result = video.get_segments(Quality::Exact(720)).await;
        assert!(matches!(result, Err(PhubError::Parsing(_))));
    }

    #[tokio::test]
    async fn test_terminal_page_error() {
        let (server, client) = setup().await;
        Mock::given(path("/view_video.php"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<h1>This video has been disabled</h1>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let video = Video::new(client, "ph42").unwrap();
        let err = video.qualities().await.unwrap_err();
        assert!(err.is_terminal());
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let (server, client) = setup().await;
        let master = format!("{}/hls/720P/master.m3u8", server.uri());

        Mock::given(path("/view_video.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(video_page(&master)))
            .mount(&server)
            .await;
        Mock::given(path("/hls/720P/master.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_string("index.m3u8\n"))
            .mount(&server)
            .await;
        Mock::given(path("/hls/720P/index.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_string("s1.ts\ns2.ts\n"))
            .mount(&server)
            .await;
        Mock::given(path("/hls/720P/s1.ts"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"AAA".to_vec()))
            .mount(&server)
            .await;
        Mock::given(path("/hls/720P/s2.ts"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"BB".to_vec()))
            .mount(&server)
            .await;

        let target = std::env::temp_dir().join(format!("phub-video-{}.ts", std::process::id()));
        let video = Video::new(client, "ph42").unwrap();
        let mut calls = Vec::new();
        video
            .download(
                &target,
                Quality::Exact(720),
                &DownloadOptions::default(),
                |done, total| calls.push((done, total)),
            )
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"AAABB");
        assert_eq!(calls.last(), Some(&(2, 2)));
        tokio::fs::remove_file(&target).await.unwrap();
    }
}
