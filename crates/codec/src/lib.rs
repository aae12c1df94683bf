//! Sift codec: translate applied filters and a search term to and from URL
//! query parameters.
//!
//! Two formats exist. The encoded format writes `filters[<key>][<COMPARATOR>]`
//! parameters; the legacy format writes bare `<key>=<value>` parameters and is
//! kept for views whose bookmarked URLs still use it.

#![forbid(unsafe_code)]

pub mod encoded;
pub mod legacy;

use chrono::{DateTime, SecondsFormat, Utc};
use metrics::histogram;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::Serialize;
use sift_core::prelude::*;
use sift_core::{decode_component, END_DATE_KEY, LABELS_KEY, START_DATE_KEY, TIME_RANGE_KEY};

/// Plain search parameter (legacy format, and views without filter keys).
pub const SEARCH_KEY: &str = "q";
/// Older alias of [`SEARCH_KEY`], cleared but never written.
pub const SEARCH_ALIAS_KEY: &str = "search";
/// Search parameter of the encoded format.
pub const ENCODED_SEARCH_KEY: &str = "filters[q][EQUALS]";

const FILTERS_PREFIX: &str = "filters[";

static PARAM_RE: Lazy<Regex> = Lazy::new(|| {
    // filters[<field>][<operation>] with an optional trailing [<subKey>]
    Regex::new(r"^filters\[(.*?)\]\[(.*?)\](?:\[(.*?)\])?").expect("static regex")
});

/// Route names whose list pages carry a filter bar.
pub fn is_search_path(name: &str) -> bool {
    ["home", "flows/list", "executions/list", "logs/list", "admin/triggers"].contains(&name)
}

/// Value of one decoded `filters[...]` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    One(String),
    Many(Vec<String>),
}

impl ParamValue {
    pub fn items(&self) -> Vec<&str> {
        match self {
            ParamValue::One(v) => vec![v.as_str()],
            ParamValue::Many(vs) => vs.iter().map(|s| s.as_str()).collect(),
        }
    }

    pub fn first(&self) -> Option<&str> {
        self.items().into_iter().next()
    }
}

/// A `filters[<field>][<operation>]` parameter split into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedParam {
    pub field: String,
    pub value: ParamValue,
    pub operation: String,
    /// Trailing `[<subKey>]`, only ever set for labels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_key: Option<String>,
}

/// Extract every `filters[...]` parameter of `query`, URL-decoding values.
/// `filters[labels][OP][name]=v` becomes field `labels` with value `name:v`.
/// Null values and names that do not match the pattern are skipped.
pub fn decode_search_params(query: &Query) -> Vec<DecodedParam> {
    query
        .iter()
        .filter(|(key, _)| key.starts_with(FILTERS_PREFIX) || *key == SEARCH_KEY)
        .filter_map(|(key, value)| {
            if value.is_null() {
                return None;
            }
            let caps = PARAM_RE.captures(key)?;
            let field = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let operation = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            let sub_key = caps.get(3).map(|m| m.as_str()).filter(|s| !s.is_empty() && field == LABELS_KEY);
            let mut decoded = decode_value(value);
            if let Some(sub) = sub_key {
                decoded = match decoded {
                    ParamValue::One(v) => ParamValue::One(format!("{}:{}", sub, v)),
                    ParamValue::Many(vs) => ParamValue::Many(vs.into_iter().map(|v| format!("{}:{}", sub, v)).collect()),
                };
            }
            Some(DecodedParam {
                field: field.to_string(),
                value: decoded,
                operation: operation.to_string(),
                sub_key: sub_key.map(|s| s.to_string()),
            })
        })
        .collect()
}

fn decode_value(value: &QueryValue) -> ParamValue {
    match value {
        QueryValue::Many(_) => ParamValue::Many(value.values().into_iter().map(decode_component).collect()),
        _ => ParamValue::One(value.first().map(decode_component).unwrap_or_default()),
    }
}

/// A filter is valid when its key is still configured for the view.
pub fn is_valid_filter(config: &FilterConfiguration, filter: &AppliedFilter) -> bool {
    config.find(&filter.key).is_some()
}

/// Keep the last filter of each key, in the order those last occurrences appear.
pub fn unique_filters(filters: &[AppliedFilter]) -> Vec<AppliedFilter> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut out: Vec<AppliedFilter> = filters.iter().rev().filter(|f| seen.insert(f.key.as_str())).cloned().collect();
    out.reverse();
    out
}

/// Encoding options fixed for the lifetime of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodecOptions {
    pub legacy_query: bool,
    pub show_search_input: bool,
}

impl CodecOptions {
    pub fn encoded() -> Self {
        Self { legacy_query: false, show_search_input: true }
    }

    pub fn legacy() -> Self {
        Self { legacy_query: true, show_search_input: true }
    }
}

/// Decode filters in the format selected by `opts`.
pub fn decode_filters(query: &Query, config: &FilterConfiguration, opts: CodecOptions) -> Vec<AppliedFilter> {
    if opts.legacy_query {
        legacy::decode(query, config)
    } else {
        encoded::decode(query, config)
    }
}

/// Search term from the URL, preferring the encoded parameter over `q`.
pub fn decode_search(query: &Query) -> String {
    query
        .first(ENCODED_SEARCH_KEY)
        .or_else(|| query.first(SEARCH_KEY))
        .unwrap_or_default()
        .to_string()
}

/// Encode the valid, de-duplicated filters in the format selected by `opts`.
pub fn encode_filters(filters: &[AppliedFilter], config: &FilterConfiguration, opts: CodecOptions) -> Query {
    let valid: Vec<AppliedFilter> = filters.iter().filter(|f| is_valid_filter(config, f)).cloned().collect();
    let unique = unique_filters(&valid);
    if opts.legacy_query {
        legacy::encode(&unique)
    } else {
        encoded::encode(&unique)
    }
}

/// Whether the codec would write or read back (and so may delete) parameter
/// `key`. Bare dates belong to views with a time range in both formats, since
/// the encoded decoder accepts them too.
pub fn is_owned_param(key: &str, config: &FilterConfiguration, opts: CodecOptions) -> bool {
    if key.starts_with(FILTERS_PREFIX) || key == SEARCH_KEY || key == SEARCH_ALIAS_KEY {
        return true;
    }
    if is_date_field(key) {
        return config.find(TIME_RANGE_KEY).is_some();
    }
    opts.legacy_query && legacy::is_owned(key, config)
}

/// Drop every parameter the codec owns, leaving foreign ones untouched.
pub fn clear_owned_params(query: &mut Query, config: &FilterConfiguration, opts: CodecOptions) {
    query.retain(|key, _| !is_owned_param(key, config, opts));
}

/// Write the trimmed search term under the parameter the format uses.
/// A blank term (or a view without search input) writes nothing.
pub fn write_search(query: &mut Query, search: &str, config: &FilterConfiguration, opts: CodecOptions) {
    let trimmed = search.trim();
    if trimmed.is_empty() || !opts.show_search_input {
        return;
    }
    let key = if config.has_keys() && !opts.legacy_query { ENCODED_SEARCH_KEY } else { SEARCH_KEY };
    query.insert(key, trimmed);
}

/// Rebuild the URL query for a new filter state: drop owned parameters from
/// `current`, then merge freshly encoded filters and the search term.
pub fn rewrite_query(
    current: &Query,
    filters: &[AppliedFilter],
    search: &str,
    config: &FilterConfiguration,
    opts: CodecOptions,
) -> Query {
    let started = std::time::Instant::now();
    let mut next = current.clone();
    clear_owned_params(&mut next, config, opts);
    next.merge(encode_filters(filters, config, opts));
    write_search(&mut next, search, config, opts);
    histogram!("codec_encode_ms", started.elapsed().as_secs_f64() * 1000.0);
    next
}

/// ISO-8601 with milliseconds and `Z`, the form browsers emit.
pub(crate) fn iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

pub(crate) fn is_date_field(field: &str) -> bool {
    field == START_DATE_KEY || field == END_DATE_KEY
}
