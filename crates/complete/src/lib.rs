//! Sift completions for the filter bar: which key to filter on, which
//! comparator, which value.
//!
//! Input is typed as `key:COMPARATOR:value`; the number of `:`-separated parts
//! decides what is completed. Candidates are ranked with a skim fuzzy matcher.

#![forbid(unsafe_code)]

pub mod languages;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::Serialize;
use sift_core::ValueSource;
use sift_registry::{Registry, View};
use tracing::debug;

pub use languages::{language, FilterLanguage, KeyCompletion};

/// Value offered for date keys; the editor swaps it for a date picker.
pub const PICK_DATE_VALUE: &str = "${pickDate}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionKind {
    Key,
    Comparator,
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub label: String,
    /// Text inserted when picked.
    pub value: String,
    pub kind: CompletionKind,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl Completion {
    fn new(kind: CompletionKind, label: &str, value: &str, detail: &str) -> Self {
        Self { label: label.to_string(), value: value.to_string(), kind, detail: detail.to_string() }
    }
}

pub struct Completer {
    registry: Registry,
}

impl Completer {
    pub fn new(registry: Registry) -> Self { Self { registry } }

    /// Keys of `view` still worth offering. A key is hidden once any of its
    /// related keys is in `used`.
    pub fn keys(&self, view: View, used: &[&str], partial: &str) -> Vec<Completion> {
        let items = language(view)
            .keys
            .iter()
            .filter(|k| !k.hidden_by(used))
            .map(|k| Completion::new(CompletionKind::Key, &k.label, k.insert_text(), &k.description))
            .collect();
        rank(items, partial)
    }

    pub fn comparators(&self, view: View, key: &str, partial: &str) -> Vec<Completion> {
        let Some(k) = language(view).find(key) else { return Vec::new() };
        let items = k
            .comparators
            .iter()
            .map(|c| Completion::new(CompletionKind::Comparator, c.label(), c.as_key(), ""))
            .collect();
        rank(items, partial)
    }

    pub async fn values(&self, view: View, key: &str, partial: &str) -> Vec<Completion> {
        let Some(k) = language(view).find(key) else { return Vec::new() };
        if k.values == ValueSource::PickDate {
            return vec![Completion::new(CompletionKind::Value, "Pick a date", PICK_DATE_VALUE, "")];
        }
        let options = self.registry.resolve(&k.values).await;
        let items = options
            .iter()
            .map(|o| Completion::new(CompletionKind::Value, &o.label, &o.value, ""))
            .collect();
        rank(items, partial)
    }

    /// Complete `input` in `view`; `used` are keys already applied.
    pub async fn complete(&self, view: View, input: &str, used: &[&str]) -> Vec<Completion> {
        let started = std::time::Instant::now();
        let parts: Vec<&str> = input.trim_start().splitn(3, ':').collect();
        let out = match parts.as_slice() {
            [key, comparator] => self.comparators(view, key, comparator),
            [key, _, value] => {
                let multiple = language(view).find(key).map(|k| k.allow_multiple).unwrap_or(false);
                // Only the value after the last comma is being typed.
                let partial = if multiple { value.rsplit(',').next().unwrap_or_default() } else { value };
                self.values(view, key, partial).await
            }
            [partial] => self.keys(view, used, partial),
            _ => Vec::new(),
        };
        metrics::histogram!("complete_eval_ms", started.elapsed().as_secs_f64() * 1_000.0);
        debug!(view = %view, input, candidates = out.len(), "completed");
        out
    }
}

/// Keep fuzzy matches of `partial` against label or value, best first. An empty
/// `partial` keeps everything in configuration order.
fn rank(items: Vec<Completion>, partial: &str) -> Vec<Completion> {
    if partial.is_empty() {
        return items;
    }
    let matcher = SkimMatcherV2::default().ignore_case();
    let mut scored: Vec<(i64, Completion)> = items
        .into_iter()
        .filter_map(|c| {
            let by_label = matcher.fuzzy_match(&c.label, partial);
            let by_value = matcher.fuzzy_match(&c.value, partial);
            by_label.max(by_value).map(|s| (s, c))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.label.cmp(&b.1.label)));
    scored.into_iter().map(|(_, c)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_registry::{Action, Resource, StaticDirectory};
    use std::sync::Arc;

    fn completer() -> Completer {
        let dir = StaticDirectory::with_namespaces(["company.team", "company.data"]).grant(Resource::Namespace, Action::Read);
        Completer::new(Registry::new(Arc::new(dir)))
    }

    fn values(out: &[Completion]) -> Vec<&str> {
        out.iter().map(|c| c.value.as_str()).collect()
    }

    #[test]
    fn related_keys_hide_time_range() {
        let c = completer();
        let all = c.keys(View::Executions, &[], "");
        assert!(values(&all).contains(&"timeRange"));
        assert!(values(&all).contains(&"startDate"));
        assert_eq!(all.len(), language(View::Executions).keys.len());
        let used = c.keys(View::Executions, &["startDate"], "");
        assert!(!values(&used).contains(&"timeRange"));
        assert!(values(&used).contains(&"endDate"));
        assert!(values(&used).contains(&"namespace"));
        let ranged = c.keys(View::Executions, &["timeRange"], "");
        assert!(!values(&ranged).contains(&"startDate"));
        assert!(!values(&ranged).contains(&"endDate"));
    }

    #[test]
    fn scope_hides_itself_once_used() {
        let c = completer();
        assert!(values(&c.keys(View::Triggers, &[], "")).contains(&"scope"));
        let used = c.keys(View::Triggers, &["scope"], "");
        assert!(!values(&used).contains(&"scope"));
        assert!(values(&used).contains(&"workerId"));
    }

    #[test]
    fn labels_pattern_is_offered() {
        let c = completer();
        let out = c.keys(View::Flows, &[], "lab");
        assert_eq!(out[0].label, "labels.{key}");
        assert_eq!(out[0].value, "labels.");
        let ops = c.comparators(View::Flows, "labels.env", "");
        assert_eq!(values(&ops), vec!["EQUALS", "NOT_EQUALS"]);
    }

    #[test]
    fn keys_rank_fuzzily() {
        let out = completer().keys(View::Executions, &[], "trig");
        assert_eq!(out[0].value, "triggerExecutionId");
        assert!(out.iter().all(|c| c.kind == CompletionKind::Key));
    }

    #[test]
    fn comparators_for_key() {
        let out = completer().comparators(View::Flows, "namespace", "");
        assert_eq!(values(&out), vec!["PREFIX", "EQUALS", "NOT_EQUALS", "CONTAINS", "STARTS_WITH", "ENDS_WITH", "REGEX"]);
        assert_eq!(out[0].label, "Prefix");
        let start = completer().comparators(View::Executions, "startDate", "");
        assert_eq!(start[0].value, "GREATER_THAN_OR_EQUAL_TO");
        assert!(completer().comparators(View::Flows, "nope", "").is_empty());
    }

    #[tokio::test]
    async fn values_through_registry() {
        let c = completer();
        let out = c.complete(View::Executions, "namespace:IN:company.d", &[]).await;
        assert_eq!(out[0].value, "company.data");
        let all = c.complete(View::Executions, "namespace:IN:", &[]).await;
        assert_eq!(values(&all), vec!["company", "company.team", "company.data"]);
        let after_comma = c.complete(View::Executions, "state:IN:FAILED,killed", &[]).await;
        assert_eq!(after_comma[0].value, "KILLED");
    }

    #[tokio::test]
    async fn date_keys_offer_the_picker() {
        let c = completer();
        let out = c.complete(View::FlowMetrics, "endDate:LESS_THAN:", &[]).await;
        assert_eq!(values(&out), vec![PICK_DATE_VALUE]);
        assert!(c.complete(View::FlowMetrics, "nope:EQUALS:", &[]).await.is_empty());
    }

    #[tokio::test]
    async fn input_shape_picks_the_stage() {
        let c = completer();
        assert_eq!(c.complete(View::Logs, "lev", &[]).await[0].kind, CompletionKind::Key);
        assert_eq!(c.complete(View::Logs, "level:", &[]).await[0].kind, CompletionKind::Comparator);
        assert_eq!(c.complete(View::Logs, "level:EQUALS:", &[]).await.len(), 5);
    }
}
