//! Main client API
//!
//! Provides the high-level API combining the shared session, videos and
//! queries.

use std::sync::Arc;

use crate::client::{ClientConfig, PhubClient};
use crate::error::Result;
use crate::query::{Query, Source};
use crate::video::Video;

/// Main entry point
///
/// Owns one HTTP session; every video and query created from it shares
/// the session's cookies and request pacing.
pub struct PhubScraper {
    client: Arc<PhubClient>,
}

impl PhubScraper {
    /// Create a new scraper with default configuration
    ///
    /// # Errors
    /// Returns error if HTTP client initialization fails
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new scraper with custom client configuration
    ///
    /// # Arguments
    /// * `config` - Custom client configuration
    ///
    /// # Errors
    /// Returns error if HTTP client initialization fails
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = PhubClient::with_config(config)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// The shared session
    pub fn client(&self) -> &Arc<PhubClient> {
        &self.client
    }

    /// Log the session in
    ///
    /// # Errors
    /// `AuthenticationFailed` if the site rejects the credentials
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        self.client.login(username, password).await
    }

    pub fn is_logged(&self) -> bool {
        self.client.is_logged()
    }

    /// Video by full URL, root-relative URL or bare view key
    ///
    /// No request is made until a field is read.
    ///
    /// # Errors
    /// `InvalidUrl` if no view key can be found
    ///
    /// # Example
    /// ```
    /// # fn example() -> phub_core::Result<()> {
    /// use phub_core::PhubScraper;
    /// let scraper = PhubScraper::new()?;
    /// let video = scraper.get_video("https://www.pornhub.com/view_video.php?viewkey=ph5f0a")?;
    /// assert_eq!(video.url(), "view_video.php?viewkey=ph5f0a");
    /// # Ok(())
    /// # }
    /// # example().unwrap();
    /// ```
    pub fn get_video(&self, url: &str) -> Result<Video> {
        Video::new(Arc::clone(&self.client), url)
    }

    /// Search through the structured API
    ///
    /// # Example
    /// ```no_run
    /// # async fn example() -> phub_core::Result<()> {
    /// use futures::StreamExt;
    /// use phub_core::PhubScraper;
    /// let scraper = PhubScraper::new()?;
    /// let query = scraper.search("nature documentary");
    /// let mut results = std::pin::pin!(query.stream().take(5));
    /// while let Some(video) = results.next().await {
    ///     println!("{}", video?.title().await?);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn search(&self, query: &str) -> Query {
        Query::new(Arc::clone(&self.client), Source::Api, query)
    }

    /// Search through the HTML search pages
    pub fn search_html(&self, query: &str) -> Query {
        Query::new(Arc::clone(&self.client), Source::Html, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PhubError;

    #[test]
    fn test_scraper_creation() {
        let scraper = PhubScraper::new();
        assert!(scraper.is_ok());
        assert!(!scraper.unwrap().is_logged());
    }

    #[test]
    fn test_get_video_variants() {
        let scraper = PhubScraper::new().unwrap();
        for url in [
            "https://www.pornhub.com/view_video.php?viewkey=ph5f0a",
            "/view_video.php?viewkey=ph5f0a",
            "ph5f0a",
        ] {
            let video = scraper.get_video(url).unwrap();
            assert_eq!(video.key(), "ph5f0a");
        }
    }

    #[test]
    fn test_get_video_invalid() {
        let scraper = PhubScraper::new().unwrap();
        assert!(matches!(
            scraper.get_video("https://www.pornhub.com/model/someone"),
            Err(PhubError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_query_sources() {
        let scraper = PhubScraper::new().unwrap();
        assert_eq!(scraper.search("a").source(), Source::Api);
        assert_eq!(scraper.search_html("a").page_size(), 32);
    }
}
