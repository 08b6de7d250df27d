//! Tiered data cache
//!
//! Video fields come from two sources: the structured API (`data@` keys)
//! and the scraped page (`page@` keys). One request fills every field of
//! its namespace, so each namespace is fetched at most once per
//! generation. Derived values computed from those fields are stamped with
//! the generation they were built in and ignored once it moves on.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::PhubError;

/// Backing source of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Structured API (`video_by_id`)
    Api,
    /// Resolved flash blob of the video page
    Page,
}

impl Namespace {
    fn prefix(self) -> &'static str {
        match self {
            Namespace::Api => "data",
            Namespace::Page => "page",
        }
    }
}

/// A namespaced field key, written `data@field` or `page@field`
///
/// # Example
/// ```
/// use phub_core::DataKey;
/// let key: DataKey = "page@mediaDefinitions".parse().unwrap();
/// assert_eq!(key, DataKey::Page("mediaDefinitions".to_string()));
/// assert!("user@name".parse::<DataKey>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataKey {
    Api(String),
    Page(String),
}

impl DataKey {
    pub fn api(field: &str) -> Self {
        DataKey::Api(field.to_string())
    }

    pub fn page(field: &str) -> Self {
        DataKey::Page(field.to_string())
    }

    pub fn namespace(&self) -> Namespace {
        match self {
            DataKey::Api(_) => Namespace::Api,
            DataKey::Page(_) => Namespace::Page,
        }
    }

    /// Field name without its namespace
    pub fn field(&self) -> &str {
        match self {
            DataKey::Api(field) | DataKey::Page(field) => field,
        }
    }

    fn new(namespace: Namespace, field: String) -> Self {
        match namespace {
            Namespace::Api => DataKey::Api(field),
            Namespace::Page => DataKey::Page(field),
        }
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.namespace().prefix(), self.field())
    }
}

impl FromStr for DataKey {
    type Err = PhubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PhubError::InvalidKey(s.to_string());
        let (prefix, field) = s.split_once('@').ok_or_else(invalid)?;
        if field.is_empty() {
            return Err(invalid());
        }
        match prefix {
            "data" => Ok(DataKey::Api(field.to_string())),
            "page" => Ok(DataKey::Page(field.to_string())),
            _ => Err(invalid()),
        }
    }
}

struct Derived {
    generation: u64,
    value: Box<dyn Any + Send + Sync>,
}

/// Per-video field cache
#[derive(Default)]
pub struct DataCache {
    generation: u64,
    fields: HashMap<DataKey, Value>,
    loaded: HashSet<Namespace>,
    derived: HashMap<&'static str, Derived>,
}

impl DataCache {
    /// Cached value of a field
    pub fn get(&self, key: &DataKey) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Whether a full fetch of `namespace` has been merged this generation
    pub fn is_loaded(&self, namespace: Namespace) -> bool {
        self.loaded.contains(&namespace)
    }

    /// Merges every field of a full fetch and marks its namespace loaded
    pub fn merge(&mut self, namespace: Namespace, fields: Map<String, Value>) {
        self.seed(namespace, fields);
        self.loaded.insert(namespace);
    }

    /// Inserts fields known from elsewhere (e.g. a search listing)
    ///
    /// The namespace stays unloaded: a field the seed lacks still triggers
    /// a full fetch.
    pub fn seed(&mut self, namespace: Namespace, fields: Map<String, Value>) {
        for (field, value) in fields {
            self.fields.insert(DataKey::new(namespace, field), value);
        }
    }

    /// Drops every field and derived value
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.fields.clear();
        self.loaded.clear();
        self.derived.clear();
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A derived value, if it was computed in the current generation
    pub fn derived<T: Any + Clone>(&self, name: &str) -> Option<T> {
        self.derived
            .get(name)
            .filter(|d| d.generation == self.generation)
            .and_then(|d| d.value.downcast_ref::<T>())
            .cloned()
    }

    /// Stores a value computed during `generation`
    ///
    /// Returns `false` and drops the value if the cache was invalidated
    /// since then.
    pub fn store_derived<T: Any + Send + Sync>(
        &mut self,
        name: &'static str,
        generation: u64,
        value: T,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.derived.insert(
            name,
            Derived {
                generation,
                value: Box::new(value),
            },
        );
        true
    }
}
