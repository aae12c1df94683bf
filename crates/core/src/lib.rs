//! Sift core types: the filter model shared by the registry, codec, controller
//! and saved-filter store.

#![forbid(unsafe_code)]

pub mod comparator;
pub mod query;

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub use comparator::Comparator;
pub use query::{decode_component, Query, QueryValue};

/// Reserved key whose value is a `{startDate, endDate}` pair.
pub const TIME_RANGE_KEY: &str = "timeRange";
pub const START_DATE_KEY: &str = "startDate";
pub const END_DATE_KEY: &str = "endDate";
/// Audit-log detail filter, exploded into `details.<k>=<v>` in legacy URLs.
pub const DETAILS_KEY: &str = "details";
pub const LABELS_KEY: &str = "labels";
/// Configuration key standing for every `labels.<name>` filter.
pub const LABELS_PATTERN_KEY: &str = "labels.{key}";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("unknown filter key: {0}")]
    UnknownKey(String),
    #[error("comparator {comparator} is not allowed for key {key}")]
    ComparatorNotAllowed { key: String, comparator: Comparator },
    #[error("invalid comparator: {0}")]
    InvalidComparator(String),
    #[error("value does not fit key {0}")]
    ValueShape(String),
}

pub type FilterResult<T> = Result<T, FilterError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    Text,
    Select,
    MultiSelect,
    Radio,
}

/// A candidate value offered for a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueOption {
    pub label: String,
    pub value: String,
}

impl ValueOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { label: label.into(), value: value.into() }
    }

    /// Option whose label is its value.
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self { label: value.clone(), value }
    }
}

/// Where candidate values for a key come from. Dynamic sources are resolved by
/// the registry against its directory collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValueSource {
    #[default]
    None,
    Static(Vec<ValueOption>),
    /// Every namespace and each of its ancestors, gated on NAMESPACE/READ.
    Namespaces,
    /// Flow ids of the namespace currently in view, gated on FLOW/READ.
    FlowsOfNamespace,
    TasksWithMetrics,
    Metrics,
    /// Free date input; no candidates.
    PickDate,
}

/// Static description of one filterable key of a view.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterKeyConfig {
    pub key: String,
    pub label: String,
    pub description: String,
    /// Never empty; the first entry is the default comparator.
    pub comparators: SmallVec<[Comparator; 8]>,
    pub value_type: ValueType,
    pub value_source: ValueSource,
    pub searchable: bool,
    pub show_comparator_selection: bool,
    /// Keys that stop being offered once this one is in use.
    pub related_keys: SmallVec<[String; 3]>,
}

impl FilterKeyConfig {
    pub fn new(key: &str, label: &str, comparators: &[Comparator], value_type: ValueType) -> Self {
        let mut comparators: SmallVec<[Comparator; 8]> = comparators.iter().copied().collect();
        if comparators.is_empty() {
            comparators.push(Comparator::Equals);
        }
        Self {
            key: key.to_string(),
            label: label.to_string(),
            description: String::new(),
            comparators,
            value_type,
            value_source: ValueSource::None,
            searchable: false,
            show_comparator_selection: true,
            related_keys: SmallVec::new(),
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn values(mut self, source: ValueSource) -> Self {
        self.value_source = source;
        self
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn comparator_selection(mut self, show: bool) -> Self {
        self.show_comparator_selection = show;
        self
    }

    pub fn related(mut self, keys: &[&str]) -> Self {
        self.related_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn default_comparator(&self) -> Comparator {
        self.comparators.first().copied().unwrap_or(Comparator::Equals)
    }

    pub fn allows(&self, comparator: Comparator) -> bool {
        self.comparators.contains(&comparator)
    }

    /// Exact match, or any `labels.<name>` against the `labels.{key}` pattern.
    pub fn matches_key(&self, key: &str) -> bool {
        self.key == key || (self.key == LABELS_PATTERN_KEY && key.starts_with("labels.") && key.len() > "labels.".len())
    }

    pub fn is_multi_select(&self) -> bool {
        self.value_type == ValueType::MultiSelect
    }
}

/// Per-view filter configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfiguration {
    pub title: String,
    pub search_placeholder: String,
    pub keys: Vec<FilterKeyConfig>,
}

impl FilterConfiguration {
    pub fn new(title: &str, search_placeholder: &str, keys: Vec<FilterKeyConfig>) -> Self {
        Self { title: title.to_string(), search_placeholder: search_placeholder.to_string(), keys }
    }

    /// Look a key up, preferring an exact entry over the `labels.{key}` pattern.
    pub fn find(&self, key: &str) -> Option<&FilterKeyConfig> {
        self.keys
            .iter()
            .find(|k| k.key == key)
            .or_else(|| self.keys.iter().find(|k| k.matches_key(key)))
    }

    pub fn has_keys(&self) -> bool {
        !self.keys.is_empty()
    }
}

/// Value carried by an applied filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Text(String),
    List(Vec<String>),
    TimeRange {
        #[serde(rename = "startDate")]
        start_date: DateTime<Utc>,
        #[serde(rename = "endDate")]
        end_date: DateTime<Utc>,
    },
}

impl FilterValue {
    pub fn text(v: impl Into<String>) -> Self {
        FilterValue::Text(v.into())
    }

    pub fn list<S: Into<String>>(vs: impl IntoIterator<Item = S>) -> Self {
        FilterValue::List(vs.into_iter().map(Into::into).collect())
    }

    /// Scalar and list values as a flat list; empty for time ranges.
    pub fn as_list(&self) -> Vec<&str> {
        match self {
            FilterValue::Text(s) => vec![s.as_str()],
            FilterValue::List(vs) => vs.iter().map(|s| s.as_str()).collect(),
            FilterValue::TimeRange { .. } => Vec::new(),
        }
    }

    pub fn is_time_range(&self) -> bool {
        matches!(self, FilterValue::TimeRange { .. })
    }
}

/// One active filter criterion, as shown to the user and reflected in the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilter {
    pub id: String,
    pub key: String,
    pub key_label: String,
    pub comparator: Comparator,
    pub comparator_label: String,
    pub value: FilterValue,
    pub value_label: String,
}

impl AppliedFilter {
    /// Build a filter from user input. The comparator defaults to the key's first
    /// one and must be among the key's configured comparators.
    pub fn create(config: &FilterKeyConfig, key: &str, comparator: Option<Comparator>, value: FilterValue) -> FilterResult<Self> {
        if !config.matches_key(key) {
            return Err(FilterError::UnknownKey(key.to_string()));
        }
        let comparator = comparator.unwrap_or_else(|| config.default_comparator());
        if !config.allows(comparator) {
            return Err(FilterError::ComparatorNotAllowed { key: key.to_string(), comparator });
        }
        // `timeRange` may also hold a relative duration such as `PT24H`.
        if value.is_time_range() && key != TIME_RANGE_KEY {
            return Err(FilterError::ValueShape(key.to_string()));
        }
        let value_label = match &value {
            FilterValue::TimeRange { start_date, end_date } => {
                return Ok(Self::time_range(config, *start_date, *end_date, comparator));
            }
            FilterValue::List(vs) if key == DETAILS_KEY => details_label(vs),
            FilterValue::List(vs) => vs.join(", "),
            FilterValue::Text(s) => s.clone(),
        };
        Ok(Self::from_parts(config, key, comparator, value, value_label))
    }

    /// Assemble a filter without validating the comparator against the key.
    /// Used when rebuilding filters from a URL, which is taken as-is.
    pub fn from_parts(config: &FilterKeyConfig, key: &str, comparator: Comparator, value: FilterValue, value_label: String) -> Self {
        Self {
            id: next_filter_id(key, comparator.as_key()),
            key: key.to_string(),
            key_label: config.label.clone(),
            comparator,
            comparator_label: comparator.label().to_string(),
            value,
            value_label,
        }
    }

    /// A `timeRange` filter; its comparator label is always "Is Between".
    pub fn time_range(config: &FilterKeyConfig, start_date: DateTime<Utc>, end_date: DateTime<Utc>, comparator: Comparator) -> Self {
        let value_label = format!("{} - {}", start_date.format("%Y-%m-%d"), end_date.format("%Y-%m-%d"));
        let mut filter = Self::from_parts(
            config,
            TIME_RANGE_KEY,
            comparator,
            FilterValue::TimeRange { start_date, end_date },
            value_label,
        );
        filter.comparator_label = "Is Between".to_string();
        filter
    }

    pub fn is_time_range(&self) -> bool {
        self.key == TIME_RANGE_KEY && self.value.is_time_range()
    }
}

/// `details` filters show their first entry and a count of the rest.
pub fn details_label(values: &[String]) -> String {
    match values {
        [] => String::new(),
        [only] => only.clone(),
        [first, rest @ ..] => format!("{} +{}", first, rest.len()),
    }
}

static FILTER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Session-unique filter id: `<key>-<suffix>-<epoch-ms>-<seq>`.
pub fn next_filter_id(key: &str, suffix: &str) -> String {
    let seq = FILTER_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}-{}", key, suffix, now_millis(), seq)
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Named, persisted snapshot of filter state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFilter {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub filters: Vec<AppliedFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub mod prelude {
    pub use super::{
        AppliedFilter, Comparator, FilterConfiguration, FilterError, FilterKeyConfig, FilterResult, FilterValue, Query,
        QueryValue, SavedFilter, ValueOption, ValueSource, ValueType,
    };
}
