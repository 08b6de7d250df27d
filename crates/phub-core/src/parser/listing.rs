//! Listing page parser
//!
//! Parses HTML search/listing pages into video cards.

use scraper::{ElementRef, Html, Selector};

use crate::error::{PhubError, Result};
use crate::patterns::registry;
use crate::types::ListingItem;

/// Parses a listing page and returns its video cards in page order
///
/// Cards are read from `li[data-video-vkey]` elements. Layouts that drop
/// the list markup still carry the `data-video-vkey` attribute, so when no
/// card element matches, keys are collected from the raw HTML instead.
///
/// # Errors
/// Returns `Parsing` if a selector fails to compile
pub fn parse_listing(html: &str) -> Result<Vec<ListingItem>> {
    let document = Html::parse_document(html);

    let card_selector = Selector::parse("li[data-video-vkey]")
        .map_err(|e| PhubError::Parsing(format!("Invalid selector: {:?}", e)))?;

    let items: Vec<ListingItem> = document
        .select(&card_selector)
        .filter_map(|card| parse_card(&card))
        .collect();

    if !items.is_empty() {
        return Ok(items);
    }

    let mut keys: Vec<&str> = Vec::new();
    for m in registry().listing_keys.find_all(html) {
        let key = m.value();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    Ok(keys
        .into_iter()
        .map(|key| ListingItem {
            key: key.to_string(),
            title: None,
            duration: None,
        })
        .collect())
}

/// Parses a single `li` card
fn parse_card(card: &ElementRef) -> Option<ListingItem> {
    let key = card.value().attr("data-video-vkey")?.trim().to_string();
    if key.is_empty() {
        return None;
    }

    let title = Selector::parse("span.title a, a[title]").ok().and_then(|selector| {
        card.select(&selector).next().and_then(|a| {
            a.value()
                .attr("title")
                .map(str::to_string)
                .or_else(|| Some(a.text().collect::<String>()))
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
        })
    });

    let duration = Selector::parse("var.duration").ok().and_then(|selector| {
        card.select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|d| !d.is_empty())
    });

    Some(ListingItem {
        key,
        title,
        duration,
    })
}
