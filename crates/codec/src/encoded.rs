//! Encoded format: `filters[<key>][<COMPARATOR>]=<value>`.
//!
//! - repeated values repeat the parameter name
//! - labels go to `filters[labels][<COMPARATOR>][<name>]=<value>`
//! - a time range goes to `filters[startDate][<COMPARATOR>]` and
//!   `filters[endDate][<COMPARATOR>]`

use metrics::counter;
use sift_core::prelude::*;
use sift_core::{END_DATE_KEY, LABELS_KEY, START_DATE_KEY, TIME_RANGE_KEY};
use tracing::debug;

use crate::{decode_search_params, is_date_field, iso, parse_iso, DecodedParam, ParamValue};

fn param_name(key: &str, comparator: Comparator) -> String {
    format!("filters[{}][{}]", key, comparator.as_key())
}

fn label_param_name(comparator: Comparator, name: &str) -> String {
    format!("filters[{}][{}][{}]", LABELS_KEY, comparator.as_key(), name)
}

/// Encode filters, assumed valid and unique by key.
pub fn encode(filters: &[AppliedFilter]) -> Query {
    let mut query = Query::new();
    for filter in filters {
        let op = filter.comparator;
        if let FilterValue::TimeRange { start_date, end_date } = &filter.value {
            query.insert(param_name(START_DATE_KEY, op), iso(start_date));
            query.insert(param_name(END_DATE_KEY, op), iso(end_date));
            continue;
        }
        let values = filter.value.as_list();
        if filter.key == LABELS_KEY {
            for v in values {
                match v.split_once(':') {
                    Some((name, label_value)) => query.append(label_param_name(op, name), label_value),
                    None => query.append(param_name(LABELS_KEY, op), v),
                }
            }
        } else if let Some(name) = filter.key.strip_prefix("labels.") {
            for v in values {
                query.append(label_param_name(op, name), v);
            }
        } else {
            for v in values {
                query.append(param_name(&filter.key, op), v);
            }
        }
    }
    query
}

struct DateParam {
    operation: String,
    value: String,
}

/// Rebuild filters from `filters[...]` parameters. Fields without a configured
/// key, unknown comparators and unparseable dates are dropped.
pub fn decode(query: &Query, config: &FilterConfiguration) -> Vec<AppliedFilter> {
    let mut fields: Vec<(String, Vec<DecodedParam>)> = Vec::new();
    let mut start: Option<DateParam> = None;
    let mut end: Option<DateParam> = None;

    // Without a plain `labels` key, named labels decode through `labels.{key}`.
    let named_labels = config.find(LABELS_KEY).is_none();
    for mut param in decode_search_params(query) {
        if let (true, Some(sub)) = (named_labels, param.sub_key.take()) {
            param.field = format!("{}.{}", LABELS_KEY, sub);
            param.value = strip_label_name(param.value, &sub);
        }
        if is_date_field(&param.field) {
            let date = DateParam { operation: param.operation.clone(), value: param.value.first().unwrap_or_default().to_string() };
            if param.field == START_DATE_KEY {
                start = Some(date);
            } else {
                end = Some(date);
            }
            continue;
        }
        match fields.iter_mut().find(|(f, _)| *f == param.field) {
            Some((_, params)) => params.push(param),
            None => fields.push((param.field.clone(), vec![param])),
        }
    }

    // Bare `startDate`/`endDate` carry no comparator; they count as EQUALS.
    let bare = |key: &str| {
        query.first(key).map(|v| DateParam { operation: Comparator::Equals.as_key().to_string(), value: v.to_string() })
    };
    let start = start.or_else(|| bare(START_DATE_KEY));
    let end = end.or_else(|| bare(END_DATE_KEY));

    let mut out: Vec<AppliedFilter> = Vec::new();
    for (field, params) in fields.iter() {
        let Some(cfg) = config.find(field) else {
            counter!("filters_decode_dropped_total", 1u64, "reason" => "unknown_key");
            debug!(field = %field, "dropping filter for unconfigured key");
            continue;
        };
        let Ok(comparator) = params[0].operation.parse::<Comparator>() else {
            counter!("filters_decode_dropped_total", 1u64, "reason" => "unknown_comparator");
            debug!(field = %field, operation = %params[0].operation, "dropping filter with unknown comparator");
            continue;
        };
        let (value, value_label) = field_value(cfg, params, field, comparator);
        upsert(&mut out, AppliedFilter::from_parts(cfg, field, comparator, value, value_label));
    }

    if let (Some(start), Some(end)) = (start, end) {
        if let Some(cfg) = config.find(TIME_RANGE_KEY) {
            match (parse_iso(&start.value), parse_iso(&end.value)) {
                (Some(s), Some(e)) => {
                    let comparator = start.operation.parse::<Comparator>().unwrap_or(Comparator::Equals);
                    upsert(&mut out, AppliedFilter::time_range(cfg, s, e, comparator));
                }
                _ => {
                    counter!("filters_decode_dropped_total", 1u64, "reason" => "bad_date");
                    debug!(start = %start.value, end = %end.value, "dropping time range with unparseable dates");
                }
            }
        }
    }
    out
}

fn strip_label_name(value: ParamValue, name: &str) -> ParamValue {
    let prefix = format!("{}:", name);
    let strip = |v: String| v.strip_prefix(&prefix).map(|s| s.to_string()).unwrap_or(v);
    match value {
        ParamValue::One(v) => ParamValue::One(strip(v)),
        ParamValue::Many(vs) => ParamValue::Many(vs.into_iter().map(strip).collect()),
    }
}

/// Multi-select keys collect every value (comma lists split, labels kept whole);
/// everything else, and text comparators, keep the first value only.
fn field_value(cfg: &FilterKeyConfig, params: &[DecodedParam], field: &str, comparator: Comparator) -> (FilterValue, String) {
    if cfg.is_multi_select() && !comparator.is_text() {
        let combined: Vec<String> = if field == LABELS_KEY {
            params.iter().flat_map(|p| p.value.items()).map(|s| s.to_string()).collect()
        } else {
            params
                .iter()
                .flat_map(|p| match &p.value {
                    ParamValue::Many(vs) => vs.clone(),
                    ParamValue::One(v) => v.split(',').map(|s| s.to_string()).collect(),
                })
                .collect()
        };
        let label = combined.join(", ");
        (FilterValue::List(combined), label)
    } else {
        let first = params.first().and_then(|p| p.value.first()).unwrap_or_default().to_string();
        (FilterValue::Text(first.clone()), first)
    }
}

fn upsert(out: &mut Vec<AppliedFilter>, filter: AppliedFilter) {
    match out.iter_mut().find(|f| f.key == filter.key) {
        Some(slot) => *slot = filter,
        None => out.push(filter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sift_core::{ValueType, LABELS_PATTERN_KEY};

    fn config() -> FilterConfiguration {
        FilterConfiguration::new(
            "t",
            "s",
            vec![
                FilterKeyConfig::new("namespace", "Namespace", &[Comparator::In, Comparator::Contains], ValueType::MultiSelect),
                FilterKeyConfig::new("flowId", "Flow", &[Comparator::Equals], ValueType::Text),
                FilterKeyConfig::new(LABELS_KEY, "Labels", &[Comparator::Equals], ValueType::MultiSelect),
                FilterKeyConfig::new(TIME_RANGE_KEY, "Time range", &[Comparator::Equals], ValueType::Select),
            ],
        )
    }

    #[test]
    fn promote_on_second_write() {
        let cfg = config();
        let ns = cfg.find("namespace").unwrap();
        let one = AppliedFilter::create(ns, "namespace", None, FilterValue::list(["a"])).unwrap();
        assert_eq!(encode(&[one]).get("filters[namespace][IN]"), Some(&QueryValue::One("a".into())));
        let three = AppliedFilter::create(ns, "namespace", None, FilterValue::list(["a", "b", "c"])).unwrap();
        assert_eq!(encode(&[three]).get("filters[namespace][IN]").unwrap().values(), vec!["a", "b", "c"]);
    }

    #[test]
    fn labels_use_sub_keys() {
        let cfg = config();
        let labels = cfg.find(LABELS_KEY).unwrap();
        let f = AppliedFilter::create(labels, LABELS_KEY, None, FilterValue::list(["env:prod", "team:data"])).unwrap();
        let q = encode(&[f]);
        assert_eq!(q.first("filters[labels][EQUALS][env]"), Some("prod"));
        assert_eq!(q.first("filters[labels][EQUALS][team]"), Some("data"));

        let back = decode(&q, &cfg);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].value, FilterValue::list(["env:prod", "team:data"]));
    }

    #[test]
    fn named_labels_round_trip_through_the_pattern() {
        let cfg = FilterConfiguration::new(
            "t",
            "s",
            vec![FilterKeyConfig::new(LABELS_PATTERN_KEY, "Labels", &[Comparator::Equals, Comparator::NotEquals], ValueType::Text)],
        );
        let env = AppliedFilter::create(cfg.find("labels.env").unwrap(), "labels.env", Some(Comparator::NotEquals), FilterValue::text("prod"))
            .unwrap();
        let q = encode(&[env]);
        assert_eq!(q.first("filters[labels][NOT_EQUALS][env]"), Some("prod"));

        let back = decode(&q, &cfg);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].key, "labels.env");
        assert_eq!(back[0].comparator, Comparator::NotEquals);
        assert_eq!(back[0].value, FilterValue::text("prod"));
    }

    #[test]
    fn comma_lists_split_for_multi_select() {
        let q: Query = [("filters[namespace][IN]", "a,b")].into_iter().collect();
        let out = decode(&q, &config());
        assert_eq!(out[0].value, FilterValue::list(["a", "b"]));
        assert_eq!(out[0].value_label, "a, b");
    }

    #[test]
    fn text_comparator_keeps_first_value() {
        let q: Query = [("filters[namespace][CONTAINS]", QueryValue::from(vec!["x".to_string(), "y".to_string()]))]
            .into_iter()
            .collect();
        let out = decode(&q, &config());
        assert_eq!(out[0].comparator, Comparator::Contains);
        assert_eq!(out[0].value, FilterValue::text("x"));
    }

    #[test]
    fn unknown_fields_and_comparators_dropped() {
        let q: Query = [("filters[nope][EQUALS]", "x"), ("filters[flowId][SOMETIMES]", "y")].into_iter().collect();
        assert!(decode(&q, &config()).is_empty());
    }

    #[test]
    fn time_range_round_trip() {
        let cfg = config();
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();
        let f = AppliedFilter::time_range(cfg.find(TIME_RANGE_KEY).unwrap(), start, end, Comparator::Equals);
        let q = encode(&[f]);
        assert_eq!(q.first("filters[startDate][EQUALS]"), Some("2024-05-01T08:00:00.000Z"));
        assert_eq!(q.first("filters[endDate][EQUALS]"), Some("2024-05-02T08:00:00.000Z"));
        let back = decode(&q, &cfg);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].value, FilterValue::TimeRange { start_date: start, end_date: end });
    }

    #[test]
    fn half_time_range_is_ignored() {
        let q: Query = [("filters[startDate][EQUALS]", "2024-05-01T08:00:00.000Z")].into_iter().collect();
        assert!(decode(&q, &config()).is_empty());
    }

    #[test]
    fn bare_dates_default_to_equals() {
        let q: Query = [("startDate", "2024-05-01T08:00:00Z"), ("endDate", "2024-05-02T08:00:00Z")].into_iter().collect();
        let out = decode(&q, &config());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].comparator, Comparator::Equals);
        assert!(out[0].is_time_range());
    }
}
