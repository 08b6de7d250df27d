//! Quality selection
//!
//! Maps a requested quality onto the resolutions a video actually offers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PhubError;

/// Requested quality: a named tier or an explicit vertical resolution
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Highest available resolution
    #[default]
    Best,
    /// Lowest available resolution
    Worst,
    /// Middle of the sorted resolutions; upper middle for an even count
    Half,
    /// This resolution, or the closest one available
    Exact(u32),
}

impl Quality {
    /// Picks an entry from `available`, keyed by resolution
    ///
    /// Returns `None` only when `available` is empty. Ties in
    /// [`Quality::Exact`] distance resolve to the smaller resolution.
    ///
    /// # Example
    /// ```
    /// use std::collections::BTreeMap;
    /// use phub_core::Quality;
    /// let available = BTreeMap::from([(480, "sd"), (1080, "fhd")]);
    /// assert_eq!(Quality::Exact(720).select(&available), Some((480, &"sd")));
    /// ```
    pub fn select<'a, V>(&self, available: &'a BTreeMap<u32, V>) -> Option<(u32, &'a V)> {
        let (resolution, value) = match self {
            Quality::Best => available.iter().next_back()?,
            Quality::Worst => available.iter().next()?,
            Quality::Half => available.iter().nth(available.len() / 2)?,
            Quality::Exact(target) => available
                .get_key_value(target)
                .or_else(|| available.iter().min_by_key(|(r, _)| (r.abs_diff(*target), **r)))?,
        };
        Some((*resolution, value))
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Best => f.write_str("best"),
            Quality::Worst => f.write_str("worst"),
            Quality::Half => f.write_str("half"),
            Quality::Exact(r) => write!(f, "{}p", r),
        }
    }
}

impl FromStr for Quality {
    type Err = PhubError;

    /// Accepts `best`, `worst`, `half`, `720` and `720p`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "best" => Ok(Quality::Best),
            "worst" => Ok(Quality::Worst),
            "half" => Ok(Quality::Half),
            other => other
                .trim_end_matches('p')
                .parse()
                .map(Quality::Exact)
                .map_err(|_| PhubError::Parsing(format!("unknown quality `{}`", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> BTreeMap<u32, &'static str> {
        BTreeMap::from([(240, "a"), (480, "b"), (720, "c"), (1080, "d")])
    }

    #[test]
    fn test_named_tiers() {
        let available = sample();
        assert_eq!(Quality::Best.select(&available), Some((1080, &"d")));
        assert_eq!(Quality::Worst.select(&available), Some((240, &"a")));
        // Even count: upper middle
        assert_eq!(Quality::Half.select(&available), Some((720, &"c")));
    }

    #[test]
    fn test_half_odd_count() {
        let available = BTreeMap::from([(240, "a"), (480, "b"), (720, "c")]);
        assert_eq!(Quality::Half.select(&available), Some((480, &"b")));
    }

    #[test]
    fn test_exact_and_nearest() {
        let available = sample();
        assert_eq!(Quality::Exact(480).select(&available), Some((480, &"b")));
        assert_eq!(Quality::Exact(2160).select(&available), Some((1080, &"d")));
        assert_eq!(Quality::Exact(100).select(&available), Some((240, &"a")));
        // 600 is 120 from both 480 and 720: smaller wins
        assert_eq!(Quality::Exact(600).select(&available), Some((480, &"b")));
    }

    #[test]
    fn test_empty_mapping() {
        let empty: BTreeMap<u32, &str> = BTreeMap::new();
        assert_eq!(Quality::Best.select(&empty), None);
        assert_eq!(Quality::Exact(720).select(&empty), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("best".parse::<Quality>().unwrap(), Quality::Best);
        assert_eq!("Worst".parse::<Quality>().unwrap(), Quality::Worst);
        assert_eq!("half".parse::<Quality>().unwrap(), Quality::Half);
        assert_eq!("720p".parse::<Quality>().unwrap(), Quality::Exact(720));
        assert_eq!("1080".parse::<Quality>().unwrap(), Quality::Exact(1080));
        assert!("ultra".parse::<Quality>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Quality::Exact(720).to_string(), "720p");
        assert_eq!(Quality::Half.to_string(), "half");
    }

    proptest! {
        #[test]
        fn prop_best_worst_are_extremes(keys in proptest::collection::btree_set(1u32..5000, 1..12)) {
            let available: BTreeMap<u32, u32> = keys.iter().map(|k| (*k, *k)).collect();
            let max = *keys.iter().max().unwrap();
            let min = *keys.iter().min().unwrap();
            prop_assert_eq!(Quality::Best.select(&available), Some((max, &max)));
            prop_assert_eq!(Quality::Worst.select(&available), Some((min, &min)));
        }

        #[test]
        fn prop_exact_is_closest(
            keys in proptest::collection::btree_set(1u32..5000, 1..12),
            target in 0u32..6000,
        ) {
            let available: BTreeMap<u32, u32> = keys.iter().map(|k| (*k, *k)).collect();
            let (chosen, _) = Quality::Exact(target).select(&available).unwrap();
            for k in &keys {
                let d = k.abs_diff(target);
                let dc = chosen.abs_diff(target);
                prop_assert!(dc < d || (dc == d && chosen <= *k));
            }
        }
    }
}
