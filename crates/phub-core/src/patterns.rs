//! Named text-extraction rules
//!
//! Every regex the client runs against fetched pages lives here, compiled
//! once into a process-wide [`Registry`]. Rules carry a name so a missing
//! required match surfaces as [`PhubError::PatternNotFound`] naming the rule
//! instead of a bare `None`.

use std::sync::LazyLock;

use regex::{Captures, Regex, RegexBuilder};

use crate::error::{PhubError, Result};

/// What a rule is meant to be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// First match only
    FindFirst,
    /// Every match, in text order
    FindAll,
    /// Replace every occurrence with the rule's template
    Substitute,
}

/// Compile flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// `.` also matches `\n`
    pub dot_all: bool,
    pub case_insensitive: bool,
    /// `^`/`$` match at line boundaries
    pub multi_line: bool,
}

impl Flags {
    pub const NONE: Flags = Flags {
        dot_all: false,
        case_insensitive: false,
        multi_line: false,
    };

    pub const DOT_ALL: Flags = Flags {
        dot_all: true,
        case_insensitive: false,
        multi_line: false,
    };

    pub const IGNORE_CASE: Flags = Flags {
        dot_all: false,
        case_insensitive: true,
        multi_line: false,
    };
}

/// A single match of a rule
#[derive(Debug)]
pub struct Match<'t> {
    caps: Captures<'t>,
}

impl<'t> Match<'t> {
    /// Capture group `i` (0 is the whole match)
    pub fn get(&self, i: usize) -> Option<&'t str> {
        self.caps.get(i).map(|m| m.as_str())
    }

    /// Byte offset just past the whole match
    pub fn end(&self) -> usize {
        self.caps.get(0).map(|m| m.end()).unwrap_or_default()
    }

    /// The first capture group, or the whole match for group-less rules
    pub fn value(&self) -> &'t str {
        self.get(1)
            .or_else(|| self.get(0))
            .unwrap_or_default()
    }
}

/// An immutable, compiled, named rule
#[derive(Debug, Clone)]
pub struct Rule {
    name: &'static str,
    mode: Mode,
    regex: Regex,
    template: Option<&'static str>,
}

impl Rule {
    /// Compiles a rule
    ///
    /// # Errors
    /// `Pattern` if the regex does not compile.
    pub fn compile(name: &'static str, mode: Mode, pattern: &str, flags: Flags) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .dot_matches_new_line(flags.dot_all)
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .build()
            .map_err(|e| PhubError::Pattern(format!("rule `{}`: {}", name, e)))?;

        Ok(Self {
            name,
            mode,
            regex,
            template: None,
        })
    }

    /// Compiles a substitution rule with its replacement template
    ///
    /// # Errors
    /// `Pattern` if the regex does not compile or the template references
    /// groups the regex does not have.
    pub fn substitution(
        name: &'static str,
        pattern: &str,
        template: &'static str,
        flags: Flags,
    ) -> Result<Self> {
        let mut rule = Self::compile(name, Mode::Substitute, pattern, flags)?;
        validate_template(&rule.regex, template)
            .map_err(|e| PhubError::Pattern(format!("rule `{}`: {}", name, e)))?;
        rule.template = Some(template);
        Ok(rule)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// First match, or `PatternNotFound` naming this rule
    pub fn find<'t>(&self, text: &'t str) -> Result<Match<'t>> {
        self.try_find(text)
            .ok_or(PhubError::PatternNotFound { rule: self.name })
    }

    /// First match, `None` when absent
    pub fn try_find<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        self.regex.captures(text).map(|caps| Match { caps })
    }

    /// Whether the rule matches anywhere in `text`
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// All matches in text order; empty when nothing matches
    pub fn find_all<'t>(&self, text: &'t str) -> Vec<Match<'t>> {
        self.regex
            .captures_iter(text)
            .map(|caps| Match { caps })
            .collect()
    }

    /// Replaces every occurrence with the rule's template
    ///
    /// # Errors
    /// `Pattern` when called on a rule that was not built as a substitution.
    pub fn substitute(&self, text: &str) -> Result<String> {
        let template = self.template.ok_or_else(|| {
            PhubError::Pattern(format!("rule `{}` is not a substitution", self.name))
        })?;
        Ok(self.regex.replace_all(text, template).into_owned())
    }
}

/// Rejects templates the regex engine would silently mangle
fn validate_template(regex: &Regex, template: &str) -> std::result::Result<(), String> {
    let group_exists = |name: &str| match name.parse::<usize>() {
        Ok(index) => index < regex.captures_len(),
        Err(_) => regex.capture_names().flatten().any(|n| n == name),
    };

    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        rest = &rest[pos + 1..];

        if let Some(after) = rest.strip_prefix('$') {
            rest = after;
            continue;
        }

        let name = if let Some(braced) = rest.strip_prefix('{') {
            let end = braced
                .find('}')
                .ok_or_else(|| "unterminated `${` in template".to_string())?;
            let name = &braced[..end];
            rest = &braced[end + 1..];
            name
        } else {
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            let name = &rest[..end];
            rest = &rest[end..];
            name
        };

        if name.is_empty() {
            return Err("dangling `$` in template".to_string());
        }
        if !group_exists(name) {
            return Err(format!("template references unknown group `{}`", name));
        }
    }

    Ok(())
}

/// Every rule the client uses
#[derive(Debug)]
pub struct Registry {
    /// `var flashvars_<id> = ` → id; the object literal follows the match
    pub flash: Rule,
    /// `/* ... */` comments, replaced by a space so `*/else/*` stays a keyword
    pub remove_comments: Rule,
    /// `var` declaration keywords
    pub remove_var: Rule,
    /// Renewal challenge → (script, end token)
    pub challenge: Rule,
    /// CSRF token of the login form
    pub login_token: Rule,
    /// View key inside a video URL
    pub view_key: Rule,
    /// View keys of every video card on a listing page
    pub listing_keys: Rule,
    pub region_blocked: Rule,
    pub premium_required: Rule,
    pub video_disabled: Rule,
    pub video_pending_review: Rule,
}

impl Registry {
    /// Compiles every rule
    pub fn build() -> Result<Self> {
        Ok(Self {
            flash: Rule::compile(
                "flash",
                Mode::FindFirst,
                r"var\s+flashvars_(\d+)\s*=\s*",
                Flags::NONE,
            )?,
            remove_comments: Rule::substitution("remove_comments", r"/\*.*?\*/", " ", Flags::DOT_ALL)?,
            remove_var: Rule::substitution("remove_var", r"\bvar\s+", "", Flags::NONE)?,
            challenge: Rule::compile(
                "challenge",
                Mode::FindFirst,
                r#"go\(\)\s*\{(.*?)n\s*=\s*l.*?\+\s*s\s*\+\s*":([^"]+)""#,
                Flags::DOT_ALL,
            )?,
            login_token: Rule::compile(
                "login_token",
                Mode::FindFirst,
                r#"name="token"\s+value="([^"]+)""#,
                Flags::NONE,
            )?,
            view_key: Rule::compile(
                "view_key",
                Mode::FindFirst,
                r"viewkey=([a-zA-Z0-9]+)",
                Flags::NONE,
            )?,
            listing_keys: Rule::compile(
                "listing_keys",
                Mode::FindAll,
                r#"data-video-vkey="([a-zA-Z0-9]+)""#,
                Flags::NONE,
            )?,
            region_blocked: Rule::compile(
                "region_blocked",
                Mode::FindFirst,
                r#"<div[^>]*class="[^"]*geoBlocked"#,
                Flags::IGNORE_CASE,
            )?,
            premium_required: Rule::compile(
                "premium_required",
                Mode::FindFirst,
                r#"<div[^>]*class="[^"]*premiumLocked"#,
                Flags::IGNORE_CASE,
            )?,
            video_disabled: Rule::compile(
                "video_disabled",
                Mode::FindFirst,
                r"this video has been disabled",
                Flags::IGNORE_CASE,
            )?,
            video_pending_review: Rule::compile(
                "video_pending_review",
                Mode::FindFirst,
                r"video is (?:currently )?(?:pending|under) review",
                Flags::IGNORE_CASE,
            )?,
        })
    }
}

static REGISTRY: LazyLock<Registry> =
    LazyLock::new(|| Registry::build().expect("pattern registry failed to compile"));

/// The process-wide registry
///
/// Built on first use; [`crate::PhubClient`] touches it on construction so a
/// malformed rule aborts before any request is made.
pub fn registry() -> &'static Registry {
    &REGISTRY
}
