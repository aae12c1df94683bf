//! Sift registry: which keys each view can filter on, their comparators, and
//! where their candidate values come from.
//!
//! Configurations are a read-only table built once on first use. Dynamic value
//! sources are resolved through a [`Directory`], the collaborator that knows
//! about namespaces, flows and the current user's permissions.

#![forbid(unsafe_code)]

pub mod values;
mod views;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use metrics::counter;
use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use sift_core::prelude::*;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Executions,
    FlowExecutions,
    Flows,
    Logs,
    Triggers,
    Secrets,
    AuditLogs,
    Dashboards,
    NamespaceDashboards,
    FlowMetrics,
    Kv,
    Namespaces,
    Plugins,
    Blueprints,
}

impl View {
    pub const ALL: [View; 14] = [
        View::Executions,
        View::FlowExecutions,
        View::Flows,
        View::Logs,
        View::Triggers,
        View::Secrets,
        View::AuditLogs,
        View::Dashboards,
        View::NamespaceDashboards,
        View::FlowMetrics,
        View::Kv,
        View::Namespaces,
        View::Plugins,
        View::Blueprints,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            View::Executions => "executions",
            View::FlowExecutions => "flow-executions",
            View::Flows => "flows",
            View::Logs => "logs",
            View::Triggers => "triggers",
            View::Secrets => "secrets",
            View::AuditLogs => "audit-logs",
            View::Dashboards => "dashboards",
            View::NamespaceDashboards => "namespace-dashboards",
            View::FlowMetrics => "flow-metrics",
            View::Kv => "kv",
            View::Namespaces => "namespaces",
            View::Plugins => "plugins",
            View::Blueprints => "blueprints",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        View::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown view: {} (expected one of: {})", s, view_names().join(", ")))
    }
}

fn view_names() -> Vec<&'static str> {
    View::ALL.iter().map(|v| v.as_str()).collect()
}

static CONFIGURATIONS: Lazy<FxHashMap<View, FilterConfiguration>> =
    Lazy::new(|| View::ALL.iter().map(|v| (*v, views::build(*v))).collect());

/// Filter configuration of a view.
pub fn configuration(view: View) -> &'static FilterConfiguration {
    // Every view is inserted when the table is built.
    &CONFIGURATIONS[&view]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Resource {
    Namespace,
    Flow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

/// Namespace, flow and permission lookups the registry calls but does not own.
#[async_trait::async_trait]
pub trait Directory: Send + Sync {
    /// Namespace ids visible to the current user.
    async fn load_autocomplete(&self) -> Result<Vec<String>>;

    fn has_any_action_on_any_namespace(&self, resource: Resource, action: Action) -> bool;

    /// Namespace currently in view, if any.
    fn current_namespace(&self) -> Option<String> {
        None
    }

    async fn flows_by_namespace(&self, _namespace: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn tasks_with_metrics(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn metrics(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// In-memory directory with fixed contents.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    pub namespaces: Vec<String>,
    pub grants: FxHashSet<(Resource, Action)>,
    pub current_namespace: Option<String>,
    pub flows: FxHashMap<String, Vec<String>>,
    pub tasks_with_metrics: Vec<String>,
    pub metrics: Vec<String>,
}

impl StaticDirectory {
    pub fn with_namespaces<S: Into<String>>(namespaces: impl IntoIterator<Item = S>) -> Self {
        Self { namespaces: namespaces.into_iter().map(Into::into).collect(), ..Default::default() }
    }

    pub fn grant(mut self, resource: Resource, action: Action) -> Self {
        self.grants.insert((resource, action));
        self
    }
}

#[async_trait::async_trait]
impl Directory for StaticDirectory {
    async fn load_autocomplete(&self) -> Result<Vec<String>> {
        Ok(self.namespaces.clone())
    }

    fn has_any_action_on_any_namespace(&self, resource: Resource, action: Action) -> bool {
        self.grants.contains(&(resource, action))
    }

    fn current_namespace(&self) -> Option<String> {
        self.current_namespace.clone()
    }

    async fn flows_by_namespace(&self, namespace: &str) -> Result<Vec<String>> {
        Ok(self.flows.get(namespace).cloned().unwrap_or_default())
    }

    async fn tasks_with_metrics(&self) -> Result<Vec<String>> {
        Ok(self.tasks_with_metrics.clone())
    }

    async fn metrics(&self) -> Result<Vec<String>> {
        Ok(self.metrics.clone())
    }
}

/// Expand dotted namespace ids into every ancestor path, first occurrence wins:
/// `a.b.c` yields `a`, `a.b`, `a.b.c`.
pub fn expand_namespaces<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut out = Vec::new();
    for id in ids {
        let mut path = String::new();
        for part in id.as_ref().split('.') {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(part);
            if seen.insert(path.clone()) {
                out.push(path.clone());
            }
        }
    }
    out
}

/// Configuration lookup plus value resolution against a directory.
#[derive(Clone)]
pub struct Registry {
    directory: Arc<dyn Directory>,
}

impl Registry {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    pub fn configuration(&self, view: View) -> &'static FilterConfiguration {
        configuration(view)
    }

    /// Candidate values for `key` in `view`. Unknown keys and keys without a
    /// value source yield nothing.
    pub async fn values(&self, view: View, key: &str) -> Vec<ValueOption> {
        match configuration(view).find(key) {
            Some(cfg) => self.resolve(&cfg.value_source).await,
            None => Vec::new(),
        }
    }

    /// Resolve a value source. Missing permissions and collaborator failures
    /// both resolve to an empty list.
    pub async fn resolve(&self, source: &ValueSource) -> Vec<ValueOption> {
        let resolved = match source {
            ValueSource::None | ValueSource::PickDate => Ok(Vec::new()),
            ValueSource::Static(options) => Ok(options.clone()),
            ValueSource::Namespaces => self.namespace_values().await,
            ValueSource::FlowsOfNamespace => self.flow_values().await,
            ValueSource::TasksWithMetrics => self.directory.tasks_with_metrics().await.map(plain_options),
            ValueSource::Metrics => self.directory.metrics().await.map(plain_options),
        };
        match resolved {
            Ok(options) => options,
            Err(e) => {
                counter!("registry_value_errors_total", 1u64);
                warn!(error = %e, source = ?source, "value provider failed; offering no values");
                Vec::new()
            }
        }
    }

    async fn namespace_values(&self) -> Result<Vec<ValueOption>> {
        if !self.directory.has_any_action_on_any_namespace(Resource::Namespace, Action::Read) {
            debug!("no NAMESPACE/READ permission; namespace values hidden");
            return Ok(Vec::new());
        }
        let ids = self.directory.load_autocomplete().await?;
        Ok(plain_options(expand_namespaces(&ids)))
    }

    async fn flow_values(&self) -> Result<Vec<ValueOption>> {
        let Some(namespace) = self.directory.current_namespace() else { return Ok(Vec::new()) };
        if !self.directory.has_any_action_on_any_namespace(Resource::Flow, Action::Read) {
            return Ok(Vec::new());
        }
        Ok(plain_options(self.directory.flows_by_namespace(&namespace).await?))
    }
}

fn plain_options(values: Vec<String>) -> Vec<ValueOption> {
    values.into_iter().map(ValueOption::plain).collect()
}
