//! HTTP client with rate limiting, retry logic and session state
//!
//! Provides the one shared session every video and query goes through:
//! a cookie jar, request pacing, exponential backoff for transient
//! errors, the login round-trip and the renewal cookie gate.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use reqwest::cookie::{CookieStore, Jar};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tokio::time::sleep;
use tracing::{Instrument, Span, debug, info, warn};

use crate::consts::{API_ROOT, ROOT, USER_AGENT};
use crate::error::{PhubError, Result};
use crate::patterns::registry;
use crate::url::join;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Site root, with trailing slash (default: `https://www.pornhub.com/`)
    pub base_url: String,
    /// Structured API root, with trailing slash
    pub api_url: String,
    /// Maximum requests per second (default: 2.0)
    pub requests_per_second: f64,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Maximum retry attempts for transient errors (default: 3)
    pub max_retries: u32,
    /// Accept-Language header (default: "en-US,en;q=0.9")
    pub language: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: ROOT.to_string(),
            api_url: API_ROOT.to_string(),
            requests_per_second: 2.0,
            timeout_secs: 30,
            max_retries: 3,
            language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// Rate limiter to control request frequency
///
/// Ensures requests are spaced at least `min_interval` apart.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified requests per second
    ///
    /// # Arguments
    /// * `requests_per_second` - Maximum number of requests allowed per second
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = Duration::from_secs_f64(1.0 / requests_per_second);
        Self {
            min_interval,
            last_request: Arc::new(Mutex::new(Instant::now() - min_interval)),
        }
    }

    /// Acquire permission to make a request
    ///
    /// If called before the minimum interval has passed since the last request,
    /// this method will sleep until the interval has elapsed.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();

        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }

        *last = Instant::now();
    }

    /// Get the minimum interval between requests
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

struct Credentials {
    username: String,
    password: String,
}

/// HTTP session shared by every video and query
///
/// Handles all HTTP communication with the site, including:
/// - Rate limiting of page and API requests
/// - Automatic retries with exponential backoff for transient errors
/// - The cookie jar, written only by login and session renewal
pub struct PhubClient {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base: Url,
    base_url: String,
    api_url: String,
    rate_limiter: RateLimiter,
    max_retries: u32,
    span: Span,
    logged: AtomicBool,
    credentials: Mutex<Option<Credentials>>,
    session: RwLock<()>,
}

impl PhubClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    ///
    /// # Errors
    /// - `InvalidUrl` - `base_url` does not parse
    /// - `Http` - the underlying client cannot be built
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        // Fail on a bad rule before any request goes out
        registry();

        let base = Url::parse(&config.base_url)
            .map_err(|e| PhubError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        let jar = Arc::new(Jar::default());

        let language: reqwest::header::HeaderValue = config
            .language
            .parse()
            .map_err(|_| PhubError::Parsing(format!("invalid language `{}`", config.language)))?;
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT_LANGUAGE, language);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .cookie_provider(Arc::clone(&jar))
            .default_headers(headers)
            .build()?;

        let span = tracing::info_span!("phub", host = base.host_str().unwrap_or_default());

        Ok(Self {
            http,
            jar,
            base,
            base_url: config.base_url,
            api_url: config.api_url,
            rate_limiter: RateLimiter::new(config.requests_per_second),
            max_retries: config.max_retries,
            span,
            logged: AtomicBool::new(false),
            credentials: Mutex::new(None),
            session: RwLock::new(()),
        })
    }

    /// Site root every relative URL is joined onto
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of a root-relative path
    pub fn page_url(&self, path: &str) -> String {
        join(&self.base_url, path)
    }

    /// Whether the last login round-trip succeeded
    pub fn is_logged(&self) -> bool {
        self.logged.load(Ordering::SeqCst)
    }

    /// Username of the stored credentials, if any
    pub async fn username(&self) -> Option<String> {
        self.credentials
            .lock()
            .await
            .as_ref()
            .map(|c| c.username.clone())
    }

    /// Fetch a page as text
    ///
    /// # Arguments
    /// * `url` - Absolute URL, or a path relative to the site root
    ///
    /// # Errors
    /// - `Http` - Network or HTTP errors
    /// - `NotFound` - Server returned 404
    /// - `RateLimited` - Server returned 429 after all retries exhausted
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let url = self.page_url(url);
        let response = self.send_with_retry(|| self.http.get(&url)).await?;
        Ok(response.text().await?)
    }

    /// Fetch and decode a JSON document
    ///
    /// # Errors
    /// Same as [`Self::fetch_text`], plus `Parsing` when the body is not the
    /// expected JSON.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.fetch_text(url).await?;
        serde_json::from_str(&body)
            .map_err(|e| PhubError::Parsing(format!("invalid JSON from {}: {}", url, e)))
    }

    /// Fetch a structured-API path (e.g. `video_by_id?id=ph1`)
    pub async fn fetch_api(&self, path: &str) -> Result<Value> {
        self.fetch_json(&join(&self.api_url, path)).await
    }

    /// Fetch a binary resource in a single attempt
    ///
    /// Media segments live on a CDN, so they skip request pacing; retrying
    /// is left to the caller's per-segment budget.
    pub async fn fetch_bytes(&self, url: &str) -> Result<bytes::Bytes> {
        let url = self.page_url(url);
        let response = self
            .http
            .get(&url)
            .send()
            .instrument(self.span.clone())
            .await?;
        let response = Self::check_status(response)?;
        Ok(response.bytes().await?)
    }

    /// Value of a cookie the jar would send to the site root
    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.base)?;
        let header = header.to_str().ok()?;
        header.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }

    /// Writes a cookie for the site root
    ///
    /// Waits for any segment batch holding the session to finish first.
    pub async fn set_cookie(&self, name: &str, value: &str) {
        let _gate = self.session.write().await;
        self.jar
            .add_cookie_str(&format!("{}={}; Path=/", name, value), &self.base);
        debug!(parent: &self.span, cookie = name, "Cookie set");
    }

    /// Shared hold on the session; cookie writes wait until it is dropped
    pub async fn hold_session(&self) -> RwLockReadGuard<'_, ()> {
        self.session.read().await
    }

    /// Log in with a username and password
    ///
    /// Reads the CSRF token off the home page and posts the login form.
    /// Credentials are kept for [`Self::relogin`].
    ///
    /// # Errors
    /// - `PatternNotFound` - the home page carries no login token
    /// - `AuthenticationFailed` - the site rejected the credentials
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let home = self.fetch_text(&self.base_url).await?;
        let token = registry().login_token.find(&home)?.value().to_string();

        let url = self.page_url("front/authenticate");
        let form = [
            ("username", username),
            ("password", password),
            ("token", token.as_str()),
            ("redirect", ""),
            ("from", "pc_login_modal_:homepage"),
        ];
        let response = self
            .send_with_retry(|| self.http.post(&url).form(&form))
            .await?;
        let body = response.text().await?;
        let reply: Value = serde_json::from_str(&body)
            .map_err(|e| PhubError::AuthenticationFailed(format!("unreadable reply: {}", e)))?;

        let success = match reply.get("success") {
            Some(Value::String(s)) => s == "1",
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            Some(Value::Bool(b)) => *b,
            _ => false,
        };

        if !success {
            let message = reply
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("login rejected");
            warn!(parent: &self.span, username, message, "Login rejected");
            self.logged.store(false, Ordering::SeqCst);
            return Err(PhubError::AuthenticationFailed(message.to_string()));
        }

        *self.credentials.lock().await = Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });
        self.logged.store(true, Ordering::SeqCst);
        info!(parent: &self.span, username, "Logged in");
        Ok(())
    }

    /// Repeat the login with the stored credentials
    ///
    /// # Errors
    /// `AuthenticationFailed` if [`Self::login`] never succeeded
    pub async fn relogin(&self) -> Result<()> {
        let (username, password) = match self.credentials.lock().await.as_ref() {
            Some(c) => (c.username.clone(), c.password.clone()),
            None => {
                return Err(PhubError::AuthenticationFailed(
                    "no stored credentials".to_string(),
                ));
            }
        };
        self.login(&username, &password).await
    }

    /// Send a request, retrying transient failures with exponential backoff
    async fn send_with_retry<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;

        loop {
            // Wait for rate limiter
            self.rate_limiter.acquire().await;

            let result = match build().send().instrument(self.span.clone()).await {
                Ok(response) => Self::check_status(response),
                Err(e) => Err(PhubError::Http(e)),
            };

            match result {
                Ok(response) => return Ok(response),
                Err(e) if Self::is_retryable(&e) && attempt < self.max_retries => {
                    // Exponential backoff: 1s, 2s, 4s
                    let backoff = Duration::from_secs(1 << attempt);
                    warn!(parent: &self.span, error = %e, attempt, ?backoff, "Retrying request");
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Map error statuses onto typed errors
    fn check_status(response: Response) -> Result<Response> {
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(PhubError::RateLimited),
            StatusCode::NOT_FOUND => Err(PhubError::NotFound(response.url().to_string())),
            _ => Ok(response.error_for_status()?),
        }
    }

    /// Check if an error is retryable
    fn is_retryable(error: &PhubError) -> bool {
        match error {
            PhubError::RateLimited => true,
            PhubError::Http(e) => {
                // Retry on timeout, connection errors, or 5xx status codes
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }

    /// Get a reference to the rate limiter (for testing)
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}

#[cfg(test)]
impl ClientConfig {
    /// Config pointed at a mock server, without pacing or retries
    pub(crate) fn for_mock(uri: &str) -> Self {
        Self {
            base_url: format!("{}/", uri),
            api_url: format!("{}/webmasters/", uri),
            requests_per_second: 1000.0,
            max_retries: 0,
            ..Self::default()
        }
    }
}
