//! Sift filter state: the applied filters and search term of one view, kept in
//! sync with the URL.
//!
//! The controller decodes the URL once at construction and again on every
//! external route change (full resync). Each mutation rewrites the URL exactly
//! once through [`Router::push`].

#![forbid(unsafe_code)]

pub mod table;

use metrics::counter;
use rustc_hash::FxHashSet;
use sift_codec::{decode_filters, decode_search, rewrite_query, CodecOptions};
use sift_core::prelude::*;
use tracing::{debug, info};

pub use table::TableOptions;

/// Navigation seam: where the current query comes from and where rewrites go.
pub trait Router {
    fn current_query(&self) -> Query;
    fn push(&mut self, query: Query);
}

/// Router that keeps every pushed query.
#[derive(Debug, Clone, Default)]
pub struct MemoryRouter {
    current: Query,
    history: Vec<Query>,
}

impl MemoryRouter {
    pub fn new(initial: Query) -> Self { Self { current: initial, history: Vec::new() } }

    pub fn from_query_string(raw: &str) -> Self { Self::new(Query::parse(raw)) }

    /// Queries pushed so far, oldest first.
    pub fn history(&self) -> &[Query] { &self.history }

    /// Simulate external navigation (back/forward, link click).
    pub fn navigate(&mut self, query: Query) { self.current = query; }
}

impl Router for MemoryRouter {
    fn current_query(&self) -> Query { self.current.clone() }

    fn push(&mut self, query: Query) {
        self.current = query.clone();
        self.history.push(query);
    }
}

/// Options fixed for the lifetime of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    pub legacy_query: bool,
    pub show_search_input: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self { Self { legacy_query: false, show_search_input: true } }
}

impl ControllerOptions {
    pub fn legacy() -> Self { Self { legacy_query: true, ..Self::default() } }

    pub fn without_search() -> Self { Self { show_search_input: false, ..Self::default() } }

    fn codec(&self) -> CodecOptions {
        CodecOptions { legacy_query: self.legacy_query, show_search_input: self.show_search_input }
    }
}

pub struct FilterController<R: Router> {
    config: FilterConfiguration,
    options: ControllerOptions,
    router: R,
    applied: Vec<AppliedFilter>,
    search: String,
    pre_applied_keys: FxHashSet<String>,
}

impl<R: Router> FilterController<R> {
    pub fn new(config: FilterConfiguration, options: ControllerOptions, router: R) -> Self {
        let mut controller = Self {
            config,
            options,
            router,
            applied: Vec::new(),
            search: String::new(),
            pre_applied_keys: FxHashSet::default(),
        };
        let query = controller.router.current_query();
        controller.sync_from(&query);
        info!(filters = controller.applied.len(), legacy = options.legacy_query, "filter state initialized from URL");
        controller
    }

    /// Replace the whole state from `query`. Keys of filters decoded while the
    /// state is empty count as pre-applied.
    fn sync_from(&mut self, query: &Query) {
        if self.options.show_search_input {
            self.search = decode_search(query);
        }
        let parsed = decode_filters(query, &self.config, self.options.codec());
        if self.applied.is_empty() && !parsed.is_empty() {
            self.pre_applied_keys.extend(parsed.iter().map(|f| f.key.clone()));
        }
        self.applied = parsed;
    }

    /// Resynchronize after the URL changed outside the controller.
    pub fn on_route_change(&mut self, query: &Query) {
        self.sync_from(query);
        debug!(filters = self.applied.len(), "filter state resynced from route");
    }

    /// Replace the filter with the same key in place, or append.
    pub fn add_filter(&mut self, filter: AppliedFilter) {
        match self.applied.iter_mut().find(|f| f.key == filter.key) {
            Some(slot) => *slot = filter,
            None => self.applied.push(filter),
        }
        self.update_route();
    }

    /// Remove every filter sharing the key of the filter with `id`.
    pub fn remove_filter(&mut self, id: &str) {
        if let Some(key) = self.applied.iter().find(|f| f.id == id).map(|f| f.key.clone()) {
            self.applied.retain(|f| f.key != key);
        }
        self.update_route();
    }

    /// Drop filters with the same key and append `filter` at the end.
    pub fn update_filter(&mut self, filter: AppliedFilter) {
        self.applied.retain(|f| f.key != filter.key);
        self.applied.push(filter);
        self.update_route();
    }

    pub fn clear_filters(&mut self) {
        self.applied.clear();
        self.search.clear();
        self.update_route();
    }

    /// Keep only filters whose key came with the initial URL.
    pub fn reset_to_pre_applied(&mut self) {
        let keep = &self.pre_applied_keys;
        self.applied.retain(|f| keep.contains(&f.key));
        self.search.clear();
        self.update_route();
    }

    /// Every assignment rewrites the URL; debouncing is up to the caller.
    pub fn set_search_query(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.update_route();
    }

    pub fn applied_filters(&self) -> &[AppliedFilter] { &self.applied }

    pub fn search_query(&self) -> &str { &self.search }

    pub fn pre_applied_keys(&self) -> &FxHashSet<String> { &self.pre_applied_keys }

    pub fn configuration(&self) -> &FilterConfiguration { &self.config }

    pub fn options(&self) -> ControllerOptions { self.options }

    pub fn router(&self) -> &R { &self.router }

    pub fn router_mut(&mut self) -> &mut R { &mut self.router }

    fn update_route(&mut self) {
        let current = self.router.current_query();
        let next = rewrite_query(&current, &self.applied, &self.search, &self.config, self.options.codec());
        debug!(filters = self.applied.len(), params = next.len(), "writing filter state to route");
        counter!("filters_route_writes_total", 1u64);
        self.router.push(next);
    }
}
