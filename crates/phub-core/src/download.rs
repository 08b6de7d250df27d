//! Segment fetcher
//!
//! Downloads every segment of an index manifest and concatenates them in
//! manifest order. Each segment has its own retry budget; one segment
//! running out of it fails the whole download.

use std::collections::HashMap;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, StreamExt};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::client::PhubClient;
use crate::error::{PhubError, Result};

/// How segments are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    /// One segment at a time, in order
    Sequential,
    /// Up to `max_workers` segments in flight
    Concurrent { max_workers: usize },
}

/// Options for [`crate::Video::download`]
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Attempts per segment (default: 5)
    pub retries: u32,
    /// Pause between attempts of one segment (default: 1s)
    pub retry_delay: Duration,
    /// Scheduling (default: 10 concurrent workers)
    pub mode: DownloadMode,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            retries: 5,
            retry_delay: Duration::from_secs(1),
            mode: DownloadMode::Concurrent { max_workers: 10 },
        }
    }
}

/// Fetches `urls` and returns their bodies concatenated in input order
///
/// `progress` receives `(completed, total)` after every segment and once
/// more when the whole download is assembled. The session is held for the
/// whole batch, so a renewal cookie cannot change mid-download.
///
/// # Errors
/// `MaxRetriesExceeded` for the first segment that runs out of attempts
pub async fn fetch_segments<F>(
    client: &PhubClient,
    urls: &[String],
    options: &DownloadOptions,
    mut progress: F,
) -> Result<Bytes>
where
    F: FnMut(usize, usize),
{
    let total = urls.len();
    let _session = client.hold_session().await;
    let mut media = BytesMut::new();

    match options.mode {
        DownloadMode::Sequential => {
            for (done, url) in urls.iter().enumerate() {
                let body = fetch_segment(client, url, options).await?;
                media.extend_from_slice(&body);
                progress(done + 1, total);
            }
        }
        DownloadMode::Concurrent { max_workers } => {
            let mut bodies: HashMap<&str, Bytes> = HashMap::with_capacity(total);
            let mut fetches = stream::iter(urls)
                .map(|url| async move { (url.as_str(), fetch_segment(client, url, options).await) })
                .buffer_unordered(max_workers.max(1));

            let mut done = 0;
            while let Some((url, result)) = fetches.next().await {
                bodies.insert(url, result?);
                done += 1;
                progress(done, total);
            }

            // Completion order is arbitrary; assemble in manifest order
            for url in urls {
                let body = bodies
                    .get(url.as_str())
                    .ok_or_else(|| PhubError::NotFound(url.clone()))?;
                media.extend_from_slice(body);
            }
        }
    }

    progress(total, total);
    debug!(segments = total, bytes = media.len(), "Segments assembled");
    Ok(media.freeze())
}

/// One segment, retried up to `options.retries` attempts
async fn fetch_segment(client: &PhubClient, url: &str, options: &DownloadOptions) -> Result<Bytes> {
    let attempts = options.retries.max(1);

    for attempt in 1..=attempts {
        match client.fetch_bytes(url).await {
            Ok(body) => return Ok(body),
            Err(e) => {
                warn!(url, attempt, attempts, error = %e, "Segment fetch failed");
                if attempt < attempts {
                    sleep(options.retry_delay).await;
                }
            }
        }
    }

    Err(PhubError::MaxRetriesExceeded {
        url: url.to_string(),
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;
    use wiremock::matchers::{any, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    async fn setup() -> (MockServer, PhubClient) {
        let server = MockServer::start().await;
        let client = PhubClient::with_config(ClientConfig::for_mock(&server.uri())).unwrap();
        (server, client)
    }

    async fn mount_segment(server: &MockServer, name: &str, body: &[u8], delay_ms: u64) {
        Mock::given(path(format!("/{}", name)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(body.to_vec())
                    .set_delay(Duration::from_millis(delay_ms)),
            )
            .mount(server)
            .await;
    }

    fn fast(mode: DownloadMode, retries: u32) -> DownloadOptions {
        DownloadOptions {
            retries,
            retry_delay: Duration::from_millis(10),
            mode,
        }
    }

    #[test]
    fn test_default_options() {
        let options = DownloadOptions::default();
        assert_eq!(options.retries, 5);
        assert_eq!(options.retry_delay, Duration::from_secs(1));
        assert_eq!(options.mode, DownloadMode::Concurrent { max_workers: 10 });
    }

    #[tokio::test]
    async fn test_concurrent_preserves_input_order() {
        let (server, client) = setup().await;
        // `a` finishes last
        mount_segment(&server, "a", b"first-", 300).await;
        mount_segment(&server, "b", b"second-", 100).await;
        mount_segment(&server, "c", b"third", 0).await;

        let urls: Vec<String> = ["a", "b", "c"]
            .iter()
            .map(|name| format!("{}/{}", server.uri(), name))
            .collect();
        let options = fast(DownloadMode::Concurrent { max_workers: 3 }, 1);

        let media = fetch_segments(&client, &urls, &options, |_, _| {}).await.unwrap();
        assert_eq!(&media[..], b"first-second-third");
    }

    #[tokio::test]
    async fn test_concurrent_respects_worker_cap() {
        let (server, client) = setup().await;
        let arrivals = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&arrivals);
        Mock::given(any())
            .respond_with(move |request: &Request| {
                log.lock().unwrap().push(Instant::now());
                ResponseTemplate::new(200)
                    .set_body_bytes(request.url.path().as_bytes().to_vec())
                    .set_delay(Duration::from_millis(200))
            })
            .expect(6)
            .mount(&server)
            .await;

        let urls: Vec<String> = (1..=6)
            .map(|i| format!("{}/seg-{}", server.uri(), i))
            .collect();
        let options = fast(DownloadMode::Concurrent { max_workers: 2 }, 1);
        let media = fetch_segments(&client, &urls, &options, |_, _| {}).await.unwrap();
        assert_eq!(&media[..], b"/seg-1/seg-2/seg-3/seg-4/seg-5/seg-6");

        // A third request can only start once one of the first two answered
        let mut arrivals = arrivals.lock().unwrap().clone();
        arrivals.sort();
        for window in arrivals.windows(3) {
            assert!(
                window[2] - window[0] >= Duration::from_millis(150),
                "more than 2 segments were in flight"
            );
        }
    }

    #[tokio::test]
    async fn test_concurrent_progress() {
        let (server, client) = setup().await;
        mount_segment(&server, "a", b"1", 150).await;
        mount_segment(&server, "b", b"2", 0).await;
        mount_segment(&server, "c", b"3", 50).await;

        let urls: Vec<String> = ["a", "b", "c"]
            .iter()
            .map(|name| format!("{}/{}", server.uri(), name))
            .collect();
        let mut calls = Vec::new();
        fetch_segments(
            &client,
            &urls,
            &fast(DownloadMode::Concurrent { max_workers: 3 }, 1),
            |done, total| calls.push((done, total)),
        )
        .await
        .unwrap();

        assert_eq!(calls, vec![(1, 3), (2, 3), (3, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_cookie_write_waits_for_running_download() {
        let (server, client) = setup().await;
        mount_segment(&server, "slow", b"data", 300).await;
        let urls = vec![format!("{}/slow", server.uri())];
        let options = fast(DownloadMode::Concurrent { max_workers: 2 }, 1);

        let download = async {
            let media = fetch_segments(&client, &urls, &options, |_, _| {}).await;
            (media, Instant::now())
        };
        let renewal = async {
            sleep(Duration::from_millis(50)).await;
            client.set_cookie("RNKEY", "1*2:3:4").await;
            Instant::now()
        };

        let ((media, downloaded_at), renewed_at) = tokio::join!(download, renewal);
        assert_eq!(&media.unwrap()[..], b"data");
        assert!(renewed_at >= downloaded_at);
        assert_eq!(client.cookie("RNKEY").as_deref(), Some("1*2:3:4"));
    }

    #[tokio::test]
    async fn test_sequential_progress() {
        let (server, client) = setup().await;
        mount_segment(&server, "a", b"1", 0).await;
        mount_segment(&server, "b", b"2", 0).await;
        mount_segment(&server, "c", b"3", 0).await;

        let urls: Vec<String> = ["a", "b", "c"]
            .iter()
            .map(|name| format!("{}/{}", server.uri(), name))
            .collect();
        let mut calls = Vec::new();
        let media = fetch_segments(
            &client,
            &urls,
            &fast(DownloadMode::Sequential, 1),
            |done, total| calls.push((done, total)),
        )
        .await
        .unwrap();

        assert_eq!(&media[..], b"123");
        // Final call repeats 100%
        assert_eq!(calls, vec![(1, 3), (2, 3), (3, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_counts_attempts() {
        let (server, client) = setup().await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .expect(4)
            .mount(&server)
            .await;

        let urls = vec![format!("{}/broken", server.uri())];
        let options = fast(DownloadMode::Concurrent { max_workers: 2 }, 4);

        let result = fetch_segments(&client, &urls, &options, |_, _| {}).await;
        match result {
            Err(PhubError::MaxRetriesExceeded { url, attempts }) => {
                assert_eq!(url, urls[0]);
                assert_eq!(attempts, 4);
            }
            other => panic!("expected MaxRetriesExceeded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transient_failure_recovers() {
        let (server, client) = setup().await;
        Mock::given(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        mount_segment(&server, "flaky", b"ok", 0).await;

        let urls = vec![format!("{}/flaky", server.uri())];
        let media = fetch_segments(&client, &urls, &fast(DownloadMode::Sequential, 3), |_, _| {})
            .await
            .unwrap();
        assert_eq!(&media[..], b"ok");
    }

    #[tokio::test]
    async fn test_empty_list() {
        let (_server, client) = setup().await;
        let mut calls = Vec::new();
        let media = fetch_segments(&client, &[], &DownloadOptions::default(), |d, t| {
            calls.push((d, t))
        })
        .await
        .unwrap();
        assert!(media.is_empty());
        assert_eq!(calls, vec![(0, 0)]);
    }
}
