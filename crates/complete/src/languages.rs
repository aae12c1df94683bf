//! Filter languages: the keys a view's filter bar completes, with their
//! comparators, value sources and related keys.
//!
//! Views without a dedicated language complete the keys of their filter
//! configuration.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use sift_core::prelude::*;
use sift_core::{END_DATE_KEY, LABELS_PATTERN_KEY, START_DATE_KEY, TIME_RANGE_KEY};
use sift_registry::{configuration, values, View};

use Comparator::*;

/// One completable key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCompletion {
    pub key: String,
    pub label: String,
    pub description: String,
    pub comparators: Vec<Comparator>,
    pub values: ValueSource,
    /// Several values may be typed, comma separated.
    pub allow_multiple: bool,
    /// The key is no longer offered once any of these is used.
    pub related_keys: Vec<String>,
}

impl KeyCompletion {
    fn new(key: &str, comparators: &[Comparator]) -> Self {
        Self {
            key: key.to_string(),
            label: key.to_string(),
            description: String::new(),
            comparators: comparators.to_vec(),
            values: ValueSource::None,
            allow_multiple: false,
            related_keys: Vec::new(),
        }
    }

    fn values(mut self, source: ValueSource) -> Self {
        self.values = source;
        self
    }

    fn multiple(mut self) -> Self {
        self.allow_multiple = true;
        self
    }

    fn related(mut self, keys: &[&str]) -> Self {
        self.related_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    fn from_config(cfg: &FilterKeyConfig) -> Self {
        Self {
            key: cfg.key.clone(),
            label: cfg.label.clone(),
            description: cfg.description.clone(),
            comparators: cfg.comparators.to_vec(),
            values: cfg.value_source.clone(),
            allow_multiple: cfg.is_multi_select(),
            related_keys: cfg.related_keys.to_vec(),
        }
    }

    pub fn is_pattern(&self) -> bool { self.key == LABELS_PATTERN_KEY }

    /// Text inserted when the key is picked; patterns insert their fixed prefix.
    pub fn insert_text(&self) -> &str {
        match self.key.find('{') {
            Some(i) => &self.key[..i],
            None => &self.key,
        }
    }

    /// Exact match, or a `labels.<name>` key against the labels pattern.
    pub fn matches(&self, key: &str) -> bool {
        self.key == key || (self.is_pattern() && key.len() > self.insert_text().len() && key.starts_with(self.insert_text()))
    }

    pub fn hidden_by(&self, used: &[&str]) -> bool {
        self.related_keys.iter().any(|r| used.contains(&r.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterLanguage {
    pub view: View,
    pub keys: Vec<KeyCompletion>,
}

impl FilterLanguage {
    pub fn find(&self, key: &str) -> Option<&KeyCompletion> {
        self.keys.iter().find(|k| k.key == key).or_else(|| self.keys.iter().find(|k| k.matches(key)))
    }
}

static LANGUAGES: Lazy<FxHashMap<View, FilterLanguage>> =
    Lazy::new(|| View::ALL.iter().map(|v| (*v, FilterLanguage { view: *v, keys: build(*v) })).collect());

/// Completion language of a view.
pub fn language(view: View) -> &'static FilterLanguage {
    // Every view is inserted when the table is built.
    &LANGUAGES[&view]
}

fn namespace() -> KeyCompletion {
    KeyCompletion::new("namespace", &[Prefix, Equals, NotEquals, Contains, StartsWith, EndsWith, Regex])
        .values(ValueSource::Namespaces)
        .multiple()
}

fn flow_id() -> KeyCompletion {
    KeyCompletion::new("flowId", &[Equals, NotEquals, Contains, StartsWith, EndsWith, Regex]).multiple()
}

fn scope() -> KeyCompletion {
    KeyCompletion::new("scope", &[Equals, NotEquals]).values(ValueSource::Static(values::scopes())).related(&["scope"])
}

fn time_range() -> KeyCompletion {
    KeyCompletion::new(TIME_RANGE_KEY, &[Equals])
        .values(ValueSource::Static(values::relative_dates()))
        .related(&[TIME_RANGE_KEY, START_DATE_KEY, END_DATE_KEY])
}

fn start_date() -> KeyCompletion {
    KeyCompletion::new(
        START_DATE_KEY,
        &[GreaterThanOrEqualTo, GreaterThan, LessThanOrEqualTo, LessThan, Equals, NotEquals],
    )
    .values(ValueSource::PickDate)
}

fn end_date() -> KeyCompletion {
    KeyCompletion::new(
        END_DATE_KEY,
        &[LessThanOrEqualTo, LessThan, GreaterThanOrEqualTo, GreaterThan, Equals, NotEquals],
    )
    .values(ValueSource::PickDate)
}

/// Date keys plus the time range they exclude.
fn dates() -> [KeyCompletion; 3] {
    [time_range(), start_date().related(&[TIME_RANGE_KEY]), end_date().related(&[TIME_RANGE_KEY])]
}

fn labels() -> KeyCompletion {
    KeyCompletion::new(LABELS_PATTERN_KEY, &[Equals, NotEquals]).multiple()
}

fn state() -> KeyCompletion {
    KeyCompletion::new("state", &[Equals, NotEquals]).values(ValueSource::Static(values::execution_states())).multiple()
}

fn child_filter() -> KeyCompletion {
    KeyCompletion::new("childFilter", &[Equals, NotEquals]).values(ValueSource::Static(values::child_filters()))
}

fn text_id(key: &str) -> KeyCompletion {
    KeyCompletion::new(key, &[Equals, NotEquals, Contains, StartsWith, EndsWith]).multiple()
}

fn build(view: View) -> Vec<KeyCompletion> {
    let mut keys = match view {
        View::Executions => vec![namespace(), flow_id(), state(), scope(), child_filter()],
        View::FlowExecutions => vec![state(), scope(), child_filter()],
        View::Flows => return vec![namespace(), scope(), labels()],
        View::Secrets => return vec![namespace()],
        View::Triggers => vec![namespace(), flow_id()],
        View::Dashboards => vec![namespace()],
        View::NamespaceDashboards => vec![flow_id().values(ValueSource::FlowsOfNamespace)],
        View::FlowMetrics => {
            return vec![
                KeyCompletion::new("task", &[Equals]).values(ValueSource::TasksWithMetrics),
                KeyCompletion::new("metric", &[Equals]).values(ValueSource::Metrics),
                KeyCompletion::new("aggregation", &[Equals]).values(ValueSource::Static(values::aggregations())),
                start_date(),
                end_date(),
            ]
        }
        _ => return configuration(view).keys.iter().map(KeyCompletion::from_config).collect(),
    };
    keys.extend(dates());
    match view {
        View::Executions => keys.extend([labels(), text_id("triggerExecutionId"), text_id("kind")]),
        View::FlowExecutions => keys.extend([labels(), text_id("triggerExecutionId")]),
        View::Triggers => keys.extend([scope(), text_id("triggerId"), text_id("workerId")]),
        View::Dashboards | View::NamespaceDashboards => keys.push(labels()),
        _ => {}
    }
    keys
}
