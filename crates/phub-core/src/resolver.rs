//! Video page resolver
//!
//! Turns a video page into its flash object. Pages that lack the blob are
//! usually challenge pages served to a stale session; those are solved,
//! the renewal cookie is installed and the page is fetched again, up to
//! [`MAX_CALL_RETRIES`] extraction attempts in total.

use serde_json::Value;
use tracing::{debug, warn};

use crate::client::PhubClient;
use crate::consts::{MAX_CALL_RETRIES, RENEWAL_COOKIE};
use crate::error::{PhubError, Result};
use crate::parser::{parse_challenge, parse_flash};
use crate::patterns::registry;

/// Raises the typed error for a known unavailability page
///
/// # Errors
/// `RegionBlocked`, `PremiumRequired`, `VideoDisabled` or
/// `VideoPendingReview`, checked in that order
pub fn classify(page: &str) -> Result<()> {
    let rules = registry();
    let markers = [
        (&rules.region_blocked, PhubError::RegionBlocked),
        (&rules.premium_required, PhubError::PremiumRequired),
        (&rules.video_disabled, PhubError::VideoDisabled),
        (&rules.video_pending_review, PhubError::VideoPendingReview),
    ];

    for (rule, error) in markers {
        if rule.is_match(page) {
            return Err(error);
        }
    }
    Ok(())
}

/// Resolves the flash object of the page at `url`
///
/// `page` is the entity's cached HTML: it is fetched when empty and
/// replaced whenever the session is renewed.
///
/// # Errors
/// - Terminal availability errors (see [`classify`]), never retried
/// - `Parsing` - the blob was found but is not valid data, never retried
/// - `ParsingExhausted` - renewal did not unlock the page
pub async fn resolve(client: &PhubClient, url: &str, page: &mut Option<String>) -> Result<Value> {
    for attempt in 1..=MAX_CALL_RETRIES {
        if page.is_none() {
            *page = Some(client.fetch_text(url).await?);
        }
        let html = page.as_deref().unwrap_or_default();

        classify(html)?;

        match parse_flash(html) {
            Ok(flash) => {
                debug!(url, attempt, "Resolved video page");
                return Ok(flash);
            }
            Err(PhubError::PatternNotFound { rule }) => {
                debug!(url, attempt, rule, "Flash blob missing");
                if attempt < MAX_CALL_RETRIES {
                    renew(client, url, page).await?;
                }
            }
            Err(e) => return Err(e),
        }
    }

    warn!(url, attempts = MAX_CALL_RETRIES, "Session renewal exhausted");
    Err(PhubError::ParsingExhausted {
        attempts: MAX_CALL_RETRIES,
    })
}

/// Solves the challenge on the cached page, if any, and refetches it
///
/// Each call recomputes the cookie from the latest page. A page without a
/// challenge, or with one that does not evaluate, is simply fetched again.
pub async fn renew(client: &PhubClient, url: &str, page: &mut Option<String>) -> Result<()> {
    let cookie = match page.as_deref().map(parse_challenge) {
        Some(Ok(challenge)) => Some(challenge.cookie()),
        Some(Err(PhubError::PatternNotFound { .. })) | None => None,
        Some(Err(e)) => {
            warn!(url, error = %e, "Challenge did not evaluate");
            None
        }
    };

    if let Some(cookie) = cookie {
        client.set_cookie(RENEWAL_COOKIE, &cookie).await;
        debug!(url, cookie = %cookie, "Session renewed");
    }

    *page = Some(client.fetch_text(url).await?);
    Ok(())
}
