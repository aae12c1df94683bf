//! Legacy format: bare `<key>=<value>` parameters.
//!
//! Comparators are not carried; every decoded filter gets its key's default.
//! Audit-log details go to `details.<name>=<value>`, time ranges to bare
//! `startDate`/`endDate`.

use sift_core::prelude::*;
use sift_core::{decode_component, details_label, DETAILS_KEY, END_DATE_KEY, START_DATE_KEY, TIME_RANGE_KEY};
use tracing::debug;

use crate::{is_date_field, iso, parse_iso, ENCODED_SEARCH_KEY, SEARCH_ALIAS_KEY, SEARCH_KEY};

const DETAILS_PREFIX: &str = "details.";

pub fn encode(filters: &[AppliedFilter]) -> Query {
    let mut query = Query::new();
    for filter in filters {
        match &filter.value {
            FilterValue::TimeRange { start_date, end_date } => {
                query.insert(START_DATE_KEY, iso(start_date));
                query.insert(END_DATE_KEY, iso(end_date));
            }
            FilterValue::List(values) if filter.key == DETAILS_KEY => {
                for entry in values {
                    if let Some((name, value)) = entry.split_once(':') {
                        query.append(format!("{}{}", DETAILS_PREFIX, name), value);
                    }
                }
            }
            FilterValue::List(values) => {
                for v in values {
                    query.append(filter.key.as_str(), v.as_str());
                }
            }
            FilterValue::Text(v) => query.insert(filter.key.as_str(), v.as_str()),
        }
    }
    query
}

pub fn decode(query: &Query, config: &FilterConfiguration) -> Vec<AppliedFilter> {
    let mut out = Vec::new();
    let mut details: Vec<String> = Vec::new();

    for (key, raw) in query.iter() {
        if key == SEARCH_KEY || key == SEARCH_ALIAS_KEY || key == ENCODED_SEARCH_KEY || is_date_field(key) {
            continue;
        }
        if let Some(name) = key.strip_prefix(DETAILS_PREFIX) {
            details.extend(raw.values().into_iter().map(|v| format!("{}:{}", name, decode_component(v))));
            continue;
        }
        let Some(cfg) = config.find(key) else { continue };
        let value = match raw {
            QueryValue::Many(_) => FilterValue::list(raw.values().into_iter().map(decode_component)),
            QueryValue::One(v) if cfg.is_multi_select() => {
                FilterValue::list(decode_component(v).split(',').filter(|s| !s.is_empty()))
            }
            QueryValue::One(v) => FilterValue::Text(decode_component(v)),
            QueryValue::Null => FilterValue::text(""),
        };
        let label = match &value {
            FilterValue::List(vs) => vs.join(", "),
            FilterValue::Text(s) => s.clone(),
            FilterValue::TimeRange { .. } => String::new(),
        };
        out.push(AppliedFilter::from_parts(cfg, key, cfg.default_comparator(), value, label));
    }

    if !details.is_empty() {
        if let Some(cfg) = config.find(DETAILS_KEY) {
            let label = details_label(&details);
            out.push(AppliedFilter::from_parts(cfg, DETAILS_KEY, cfg.default_comparator(), FilterValue::List(details), label));
        }
    }

    if let (Some(start), Some(end)) = (query.first(START_DATE_KEY), query.first(END_DATE_KEY)) {
        match (config.find(TIME_RANGE_KEY), parse_iso(start), parse_iso(end)) {
            (Some(cfg), Some(s), Some(e)) => {
                out.retain(|f| f.key != TIME_RANGE_KEY);
                out.push(AppliedFilter::time_range(cfg, s, e, Comparator::Equals));
            }
            (Some(_), _, _) => debug!(start, end, "ignoring legacy time range with unparseable dates"),
            _ => {}
        }
    }
    out
}

/// Bare parameters the legacy format writes for `config`. Dates and
/// `details.*` only belong to views that declare a time range or details.
pub fn is_owned(key: &str, config: &FilterConfiguration) -> bool {
    if is_date_field(key) {
        return config.find(TIME_RANGE_KEY).is_some();
    }
    if key.starts_with(DETAILS_PREFIX) {
        return config.find(DETAILS_KEY).is_some();
    }
    config.find(key).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FilterConfiguration {
        FilterConfiguration::new(
            "t",
            "s",
            vec![
                FilterKeyConfig::new("namespace", "Namespace", &[Comparator::In, Comparator::Prefix], ValueType::MultiSelect),
                FilterKeyConfig::new("flowId", "Flow", &[Comparator::Equals], ValueType::Text),
                FilterKeyConfig::new(DETAILS_KEY, "Details", &[Comparator::Equals], ValueType::MultiSelect),
                FilterKeyConfig::new(TIME_RANGE_KEY, "Time range", &[Comparator::Equals], ValueType::Select),
            ],
        )
    }

    #[test]
    fn bare_keys_get_default_comparator() {
        let q: Query = [("namespace", "a,b"), ("flowId", "hello"), ("page", "2"), ("q", "term")].into_iter().collect();
        let out = decode(&q, &config());
        assert_eq!(out.len(), 2);
        let ns = out.iter().find(|f| f.key == "namespace").unwrap();
        assert_eq!(ns.comparator, Comparator::In);
        assert_eq!(ns.value, FilterValue::list(["a", "b"]));
        let flow = out.iter().find(|f| f.key == "flowId").unwrap();
        assert_eq!(flow.value, FilterValue::text("hello"));
    }

    #[test]
    fn details_collect_into_one_filter() {
        let q: Query = [("details.env", "prod"), ("details.region", "eu")].into_iter().collect();
        let out = decode(&q, &config());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, FilterValue::list(["env:prod", "region:eu"]));
        assert_eq!(out[0].value_label, "env:prod +1");

        let back = encode(&out);
        assert_eq!(back.first("details.env"), Some("prod"));
        assert_eq!(back.first("details.region"), Some("eu"));
    }

    #[test]
    fn start_date_alone_is_not_a_range() {
        let q: Query = [("startDate", "2024-05-01T00:00:00.000Z")].into_iter().collect();
        assert!(decode(&q, &config()).is_empty());
    }

    #[test]
    fn both_dates_make_a_range() {
        let q: Query = [("startDate", "2024-05-01T00:00:00.000Z"), ("endDate", "2024-05-03T00:00:00.000Z")]
            .into_iter()
            .collect();
        let out = decode(&q, &config());
        assert_eq!(out.len(), 1);
        assert!(out[0].is_time_range());
        assert_eq!(out[0].value_label, "2024-05-01 - 2024-05-03");
        let back = encode(&out);
        assert_eq!(back.first("startDate"), Some("2024-05-01T00:00:00.000Z"));
    }

    #[test]
    fn owned_params() {
        let cfg = config();
        assert!(is_owned("namespace", &cfg));
        assert!(is_owned("details.env", &cfg));
        assert!(is_owned("endDate", &cfg));
        assert!(!is_owned("page", &cfg));
    }

    #[test]
    fn details_and_dates_need_their_keys() {
        let cfg = FilterConfiguration::new(
            "t",
            "s",
            vec![FilterKeyConfig::new("level", "Level", &[Comparator::Equals], ValueType::Select)],
        );
        assert!(!is_owned("details.foo", &cfg));
        assert!(!is_owned("startDate", &cfg));
        assert!(is_owned("level", &cfg));
    }
}
