//! Filter configurations per view.
//!
//! Each view gets its own `FilterConfiguration`; keys with the same name
//! (`namespace`, `timeRange`, ...) are declared independently per view.

use sift_core::prelude::*;
use sift_core::{DETAILS_KEY, END_DATE_KEY, LABELS_KEY, START_DATE_KEY, TIME_RANGE_KEY};

use crate::values;
use crate::View;

use Comparator::*;

fn namespace() -> FilterKeyConfig {
    FilterKeyConfig::new("namespace", "Namespace", &[In, NotIn, Contains, Prefix], ValueType::MultiSelect)
        .describe("Filter by namespace")
        .values(ValueSource::Namespaces)
        .searchable()
}

fn flow_id() -> FilterKeyConfig {
    FilterKeyConfig::new("flowId", "Flow", &[Equals, NotEquals, Contains, StartsWith, EndsWith, Regex], ValueType::Text)
        .describe("Filter by flow id")
}

fn scope(description: &str) -> FilterKeyConfig {
    FilterKeyConfig::new("scope", "Scope", &[Equals, NotEquals], ValueType::Radio)
        .describe(description)
        .values(ValueSource::Static(values::scopes()))
        .comparator_selection(false)
}

fn time_range(description: &str) -> FilterKeyConfig {
    FilterKeyConfig::new(TIME_RANGE_KEY, "Time range", &[Equals], ValueType::Select)
        .describe(description)
        .values(ValueSource::Static(values::relative_dates()))
        .related(&[TIME_RANGE_KEY, START_DATE_KEY, END_DATE_KEY])
}

fn labels() -> FilterKeyConfig {
    FilterKeyConfig::new(LABELS_KEY, "Labels", &[Equals, NotEquals], ValueType::MultiSelect)
        .describe("Filter by labels, as key:value")
        .searchable()
}

fn state() -> FilterKeyConfig {
    FilterKeyConfig::new("state", "State", &[In, NotIn], ValueType::MultiSelect)
        .describe("Filter by execution state")
        .values(ValueSource::Static(values::execution_states()))
        .searchable()
}

fn child_filter() -> FilterKeyConfig {
    FilterKeyConfig::new("childFilter", "Subflow", &[Equals, NotEquals], ValueType::Radio)
        .describe("Show child or parent executions only")
        .values(ValueSource::Static(values::child_filters()))
        .comparator_selection(false)
}

fn trigger_execution_id() -> FilterKeyConfig {
    FilterKeyConfig::new(
        "triggerExecutionId",
        "Parent execution",
        &[Equals, NotEquals, Contains, StartsWith, EndsWith],
        ValueType::Text,
    )
    .describe("Filter by the execution that triggered this one")
}

pub(crate) fn build(view: View) -> FilterConfiguration {
    match view {
        View::Executions => FilterConfiguration::new(
            "Execution filters",
            "Search executions",
            vec![
                namespace(),
                flow_id(),
                state(),
                scope("Show user or system executions"),
                child_filter(),
                time_range("Executions started within"),
                labels(),
                trigger_execution_id(),
                FilterKeyConfig::new("kind", "Kind", &[Equals, NotEquals], ValueType::Select)
                    .describe("Filter by execution kind")
                    .values(ValueSource::Static(values::execution_kinds())),
            ],
        ),
        View::FlowExecutions => FilterConfiguration::new(
            "Execution filters",
            "Search executions",
            vec![
                state(),
                scope("Show user or system executions"),
                child_filter(),
                time_range("Executions started within"),
                labels(),
                trigger_execution_id(),
            ],
        ),
        View::Flows => FilterConfiguration::new(
            "Flow filters",
            "Search flows",
            vec![namespace(), scope("Show user or system flows"), labels()],
        ),
        View::Logs => FilterConfiguration::new(
            "Log filters",
            "Search logs",
            vec![
                namespace(),
                FilterKeyConfig::new("level", "Level", &[Equals, NotEquals], ValueType::Select)
                    .describe("Minimum log level")
                    .values(ValueSource::Static(values::log_levels())),
                time_range("Logs emitted within"),
                scope("Show user or system logs"),
                FilterKeyConfig::new("triggerId", "Trigger", &[Equals, NotEquals, Contains, StartsWith, EndsWith], ValueType::Text)
                    .describe("Filter by trigger id"),
                FilterKeyConfig::new("flowId", "Flow", &[Equals, NotEquals, Contains, StartsWith, EndsWith], ValueType::Text)
                    .describe("Filter by flow id"),
            ],
        ),
        View::Triggers => FilterConfiguration::new(
            "Trigger filters",
            "Search triggers",
            vec![
                namespace(),
                FilterKeyConfig::new("flowId", "Flow", &[Equals, NotEquals, Contains, StartsWith, EndsWith], ValueType::Text)
                    .describe("Filter by flow id"),
                time_range("Triggers evaluated within"),
                scope("Show user or system triggers"),
                FilterKeyConfig::new(
                    "triggerId",
                    "Trigger",
                    &[In, NotIn, Equals, NotEquals, Contains, StartsWith, EndsWith],
                    ValueType::Text,
                )
                .describe("Filter by trigger id"),
                FilterKeyConfig::new(
                    "workerId",
                    "Worker",
                    &[In, NotIn, Equals, NotEquals, Contains, StartsWith, EndsWith],
                    ValueType::Text,
                )
                .describe("Filter by worker id")
                .searchable(),
            ],
        ),
        View::Secrets => FilterConfiguration::new("Secret filters", "Search secrets", vec![namespace()]),
        View::AuditLogs => FilterConfiguration::new(
            "Audit log filters",
            "Search audit logs",
            vec![
                namespace(),
                FilterKeyConfig::new("userId", "User", &[Equals], ValueType::Text).describe("Filter by acting user"),
                FilterKeyConfig::new(DETAILS_KEY, "Details", &[Equals], ValueType::MultiSelect)
                    .describe("Filter by detail entries, as key:value"),
                time_range("Events recorded within"),
            ],
        ),
        View::Dashboards => FilterConfiguration::new(
            "Dashboard filters",
            "Search dashboards",
            vec![namespace(), time_range("Data within"), labels()],
        ),
        View::NamespaceDashboards => FilterConfiguration::new(
            "Dashboard filters",
            "Search dashboards",
            vec![
                FilterKeyConfig::new("flowId", "Flow", &[Equals, NotEquals, Contains, StartsWith, EndsWith, Regex], ValueType::Select)
                    .describe("Filter by flow of this namespace")
                    .values(ValueSource::FlowsOfNamespace)
                    .searchable(),
                time_range("Data within"),
                labels(),
            ],
        ),
        View::FlowMetrics => FilterConfiguration::new(
            "Metric filters",
            "Search metrics",
            vec![
                FilterKeyConfig::new("task", "Task", &[Equals], ValueType::Select)
                    .describe("Task that emitted the metric")
                    .values(ValueSource::TasksWithMetrics),
                FilterKeyConfig::new("metric", "Metric", &[Equals], ValueType::Select)
                    .describe("Metric name")
                    .values(ValueSource::Metrics),
                FilterKeyConfig::new("aggregation", "Aggregation", &[Equals], ValueType::Select)
                    .describe("Aggregation applied to the metric")
                    .values(ValueSource::Static(values::aggregations())),
                time_range("Metrics recorded within"),
            ],
        ),
        View::Kv => FilterConfiguration::new("Key-value filters", "Search keys", Vec::new()),
        View::Namespaces => FilterConfiguration::new("Namespace filters", "Search namespaces", Vec::new()),
        View::Plugins => FilterConfiguration::new("Plugin filters", "Search plugins", Vec::new()),
        View::Blueprints => FilterConfiguration::new("Blueprint filters", "Search blueprints", Vec::new()),
    }
}
