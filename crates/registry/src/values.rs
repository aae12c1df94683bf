//! Hardcoded candidate values shared by several views.

use sift_core::ValueOption;

fn plain(values: &[&str]) -> Vec<ValueOption> {
    values.iter().map(|v| ValueOption::plain(*v)).collect()
}

pub fn log_levels() -> Vec<ValueOption> {
    plain(&["TRACE", "DEBUG", "INFO", "WARN", "ERROR"])
}

pub fn scopes() -> Vec<ValueOption> {
    vec![ValueOption::new("User", "USER"), ValueOption::new("System", "SYSTEM")]
}

pub fn relative_dates() -> Vec<ValueOption> {
    vec![
        ValueOption::new("Last 5 minutes", "PT5M"),
        ValueOption::new("Last 15 minutes", "PT15M"),
        ValueOption::new("Last 1 hour", "PT1H"),
        ValueOption::new("Last 12 hours", "PT12H"),
        ValueOption::new("Last 24 hours", "PT24H"),
        ValueOption::new("Last 48 hours", "PT48H"),
        ValueOption::new("Last 7 days", "P7D"),
        ValueOption::new("Last 30 days", "P30D"),
        ValueOption::new("Last 365 days", "P365D"),
    ]
}

pub fn execution_states() -> Vec<ValueOption> {
    plain(&[
        "CREATED", "RUNNING", "PAUSED", "RESTARTED", "KILLING", "SUCCESS", "WARNING", "FAILED", "KILLED", "CANCELLED",
        "QUEUED", "RETRYING", "RETRIED", "SKIPPED", "BREAKPOINT",
    ])
}

pub fn child_filters() -> Vec<ValueOption> {
    vec![ValueOption::new("Child executions", "CHILD"), ValueOption::new("Parent executions", "MAIN")]
}

pub fn execution_kinds() -> Vec<ValueOption> {
    plain(&["NORMAL", "TEST", "PLAYGROUND"])
}

pub fn aggregations() -> Vec<ValueOption> {
    plain(&["SUM", "AVG", "MIN", "MAX"])
}
