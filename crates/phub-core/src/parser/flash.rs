//! Flash blob extraction
//!
//! Video pages declare `var flashvars_<id> = {...};` and later run an
//! obfuscated script that finishes filling it in (media URLs are assembled
//! from dozens of string fragments). This module finds both, runs the
//! script against the parsed object and returns the decorated object.

use serde_json::Value;
use tracing::debug;

use crate::consts::{FLASH_PLACEHOLDER, FLASH_SCRIPT_END, FLASH_SCRIPT_START};
use crate::error::{PhubError, Result};
use crate::js::{self, Env};
use crate::patterns::registry;

/// Extracts and evaluates the flash blob of a video page
///
/// # Arguments
/// * `page` - Raw HTML of the video page
///
/// # Returns
/// The flash object after the page's decoration script has run
///
/// # Errors
/// - `PatternNotFound` - the declaration or the script markers are missing
///   (usually a challenge page; the caller renews the session)
/// - `Parsing` - the blob is not JSON or the script does not evaluate
pub fn parse_flash(page: &str) -> Result<Value> {
    let declaration = registry().flash.find(page)?;
    let id = declaration.get(1).unwrap_or_default();
    let (flash, rest) = object_literal(&page[declaration.end()..])?;
    let script = script_region(rest)?;
    let script = registry().remove_var.substitute(script)?;
    let script = registry().remove_comments.substitute(&script)?;

    let variable = format!("flashvars_{}", id);
    let program = js::compile_renamed(&script, &variable, FLASH_PLACEHOLDER)?;

    let mut env = Env::new().with(FLASH_PLACEHOLDER, flash);
    env.run(&program)?;
    debug!(variable = %variable, statements = program.body.len(), "Evaluated flash script");

    env.take(FLASH_PLACEHOLDER)
        .ok_or_else(|| PhubError::Parsing("flash object was unbound by its script".to_string()))
}

/// The JSON object at the start of `text` and whatever follows it
///
/// The blob may span lines and its strings may contain `};`, so its end is
/// found by the JSON parser rather than by a pattern.
fn object_literal(text: &str) -> Result<(Value, &str)> {
    let mut values = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    match values.next() {
        Some(Ok(value @ Value::Object(_))) => Ok((value, &text[values.byte_offset()..])),
        Some(Ok(other)) => Err(PhubError::Parsing(format!(
            "flash blob is not an object: {}",
            other
        ))),
        Some(Err(e)) => Err(PhubError::Parsing(format!(
            "flash blob is not valid JSON: {}",
            e
        ))),
        None => Err(PhubError::Parsing("flash blob is empty".to_string())),
    }
}

/// Slice between the end of the start-marker statement and the end marker
fn script_region(text: &str) -> Result<&str> {
    let not_found = || PhubError::PatternNotFound {
        rule: "flash_script",
    };

    let marker = text.find(FLASH_SCRIPT_START).ok_or_else(not_found)?;
    let start = text[marker..]
        .find(';')
        .map(|pos| marker + pos + 1)
        .ok_or_else(not_found)?;
    let end = text[start..]
        .find(FLASH_SCRIPT_END)
        .map(|pos| start + pos)
        .ok_or_else(not_found)?;

    Ok(&text[start..end])
}
