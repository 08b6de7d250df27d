//! Session renewal challenge
//!
//! When the site decides a session looks automated it serves a page whose
//! only script computes a cookie from two integers:
//!
//! ```text
//! function go() {
//!     var p=1022718341043; var s=3019137698; var n;
//!     if ((s >> 6) & 1) p += 32727577 * 14; else p -= 1299 * 11;
//!     n=leastFactor(p);
//!     document.cookie="RNKEY="+n+"*"+p/n+":"+s+":3463521427:1";
//!     ...
//! ```
//!
//! [`parse_challenge`] evaluates the part between `go() {` and `n=leastFactor`
//! and [`Challenge::cookie`] assembles the same value the browser would.

use tracing::debug;

use crate::error::{PhubError, Result};
use crate::js::{self, Env};
use crate::patterns::registry;

/// Solved challenge values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge<'a> {
    /// Least factor of `p`
    pub n: i64,
    pub p: i64,
    pub s: i64,
    /// Trailing cookie fragment captured after `s` (e.g. `3463521427:1`)
    pub end: &'a str,
}

impl Challenge<'_> {
    /// Cookie value in the `{n}*{p/n}:{s}:{end}` layout
    pub fn cookie(&self) -> String {
        format!("{}*{}:{}:{}", self.n, self.p / self.n, self.s, self.end)
    }
}

/// Solves the challenge embedded in `page`
///
/// # Errors
/// - `PatternNotFound` - the page carries no challenge
/// - `Parsing` - the script does not evaluate, or leaves `p`/`s` non-integral
pub fn parse_challenge(page: &str) -> Result<Challenge<'_>> {
    let found = registry().challenge.find(page)?;
    let script = found.get(1).unwrap_or_default();
    let end = found.get(2).unwrap_or_default();

    let script = registry().remove_var.substitute(script)?;
    let script = registry().remove_comments.substitute(&script)?;
    let program = js::compile(&script)?;

    let mut env = Env::new()
        .with("p", js::number(0.0))
        .with("s", js::number(0.0))
        .with("n", js::number(0.0));
    env.run(&program)?;

    let p = integral(&env, "p")?;
    let s = integral(&env, "s")?;
    let n = least_factor(p);
    if n == 0 {
        return Err(PhubError::Parsing("challenge produced p = 0".to_string()));
    }

    debug!(n, p, s, "Solved renewal challenge");
    Ok(Challenge { n, p, s, end })
}

fn integral(env: &Env, name: &str) -> Result<i64> {
    let value = env.number(name).unwrap_or(f64::NAN);
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Ok(value as i64)
    } else {
        Err(PhubError::Parsing(format!(
            "challenge left `{}` non-integral ({})",
            name, value
        )))
    }
}

/// Smallest factor of `n`
///
/// `0` for `0`, `1` for `±1`, otherwise the smallest divisor ≥ 2 found by a
/// mod-30 wheel, or `n` itself when nothing up to `√n` divides it.
/// Negative inputs only get the 2/3/5 checks since `√n` is undefined for them.
pub fn least_factor(n: i64) -> i64 {
    const WHEEL: [i64; 8] = [0, 4, 6, 10, 12, 16, 22, 24];

    if n == 0 {
        return 0;
    }
    if n.unsigned_abs() < 2 {
        return 1;
    }
    for d in [2, 3, 5] {
        if n % d == 0 {
            return d;
        }
    }
    if n < 0 {
        return n;
    }

    let m = (n as f64).sqrt();
    let mut i = 7;
    while (i as f64) <= m {
        for offset in WHEEL {
            if n % (i + offset) == 0 {
                return i + offset;
            }
        }
        i += 30;
    }
    n
}
