//! Paginated queries
//!
//! A [`Query`] pages through search results lazily. Every page is fetched
//! at most once per query; item `i` lives on page `i / page_size`.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::client::PhubClient;
use crate::consts::{API_PAGE_SIZE, HTML_PAGE_SIZE};
use crate::error::{PhubError, Result};
use crate::parser::parse_listing;
use crate::url::{build_api_search_path, build_search_path, extract_key};
use crate::video::Video;

/// Where a query reads its pages from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Structured API search
    Api,
    /// Scraped HTML search page
    Html,
}

impl Source {
    pub fn page_size(self) -> usize {
        match self {
            Source::Api => API_PAGE_SIZE,
            Source::Html => HTML_PAGE_SIZE,
        }
    }
}

/// One listed video: its key and whatever fields the listing carried
#[derive(Debug, Clone)]
struct Item {
    key: String,
    fields: Map<String, Value>,
}

/// Lazily paginated search
pub struct Query {
    client: Arc<PhubClient>,
    source: Source,
    search: String,
    pages: Mutex<HashMap<usize, Arc<Vec<Item>>>>,
}

impl Query {
    pub fn new(client: Arc<PhubClient>, source: Source, search: &str) -> Self {
        Self {
            client,
            source,
            search: search.trim().to_string(),
            pages: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn page_size(&self) -> usize {
        self.source.page_size()
    }

    /// Video at logical index `i`, or `None` past the last result
    pub async fn get(&self, i: usize) -> Result<Option<Video>> {
        let size = self.page_size();
        let items = self.items(i / size).await?;
        Ok(items.get(i % size).map(|item| self.video(item)))
    }

    /// Videos of page `n` (0-based); empty past the last page
    pub async fn page(&self, n: usize) -> Result<Vec<Video>> {
        let items = self.items(n).await?;
        Ok(items.iter().map(|item| self.video(item)).collect())
    }

    /// Every result in order
    ///
    /// Stops after the first page that is short, empty or missing. An error
    /// is yielded once and ends the stream.
    pub fn stream(&self) -> impl Stream<Item = Result<Video>> + '_ {
        let size = self.page_size();

        stream::unfold(Some(0), move |next| async move {
            let n = next?;
            match self.page(n).await {
                Ok(videos) if videos.is_empty() => None,
                Ok(videos) => {
                    let next = (videos.len() >= size).then_some(n + 1);
                    Some((videos.into_iter().map(Ok).collect::<Vec<_>>(), next))
                }
                Err(e) => Some((vec![Err(e)], None)),
            }
        })
        .flat_map(stream::iter)
    }

    fn video(&self, item: &Item) -> Video {
        Video::seeded(Arc::clone(&self.client), &item.key, item.fields.clone())
    }

    /// Cached items of page `n`, fetched on first use
    async fn items(&self, n: usize) -> Result<Arc<Vec<Item>>> {
        let mut pages = self.pages.lock().await;
        if let Some(items) = pages.get(&n) {
            return Ok(Arc::clone(items));
        }

        let items = match self.fetch_page(n).await {
            Ok(items) => items,
            // Past the last page the site answers 404
            Err(PhubError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        debug!(search = %self.search, page = n, items = items.len(), "Fetched result page");

        let items = Arc::new(items);
        pages.insert(n, Arc::clone(&items));
        Ok(items)
    }

    async fn fetch_page(&self, n: usize) -> Result<Vec<Item>> {
        match self.source {
            Source::Api => {
                let reply = self
                    .client
                    .fetch_api(&build_api_search_path(&self.search, n + 1))
                    .await?;
                Ok(api_items(reply))
            }
            Source::Html => {
                let html = self
                    .client
                    .fetch_text(&build_search_path(&self.search, n + 1))
                    .await?;
                Ok(parse_listing(&html)?
                    .into_iter()
                    .map(|card| {
                        let mut fields = Map::new();
                        if let Some(title) = card.title {
                            fields.insert("title".to_string(), Value::String(title));
                        }
                        if let Some(duration) = card.duration {
                            fields.insert("duration".to_string(), Value::String(duration));
                        }
                        Item {
                            key: card.key,
                            fields,
                        }
                    })
                    .collect())
            }
        }
    }
}

/// Items of an API search reply; a reply without `videos` is an empty page
fn api_items(mut reply: Value) -> Vec<Item> {
    let Some(Value::Array(videos)) = reply.get_mut("videos").map(Value::take) else {
        return Vec::new();
    };

    videos
        .into_iter()
        .filter_map(|video| {
            let Value::Object(fields) = video else {
                return None;
            };
            let key = fields
                .get("video_id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| fields.get("url").and_then(Value::as_str).and_then(extract_key))?;
            Some(Item { key, fields })
        })
        .collect()
}
