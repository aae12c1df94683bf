//! Table toolbar state: options panel, chart visibility and refresh.

use tracing::debug;

type ChartCallback = Box<dyn FnMut(bool) + Send>;
type RefreshCallback = Box<dyn FnMut() + Send>;

#[derive(Default)]
pub struct TableOptions {
    show_options: bool,
    chart_visible: bool,
    on_chart: Option<ChartCallback>,
    on_refresh: Option<RefreshCallback>,
}

impl TableOptions {
    /// `chart` is the externally owned chart visibility, if the table has a chart.
    pub fn new(chart: Option<bool>) -> Self {
        Self { chart_visible: chart.unwrap_or(false), ..Self::default() }
    }

    pub fn on_chart_change(mut self, callback: impl FnMut(bool) + Send + 'static) -> Self {
        self.on_chart = Some(Box::new(callback));
        self
    }

    pub fn on_refresh(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_refresh = Some(Box::new(callback));
        self
    }

    pub fn toggle_options(&mut self) -> bool {
        self.show_options = !self.show_options;
        self.show_options
    }

    /// Mirror a change of the external chart value. `None` leaves it as is.
    pub fn sync_chart(&mut self, external: Option<bool>) {
        if let Some(v) = external {
            self.chart_visible = v;
        }
    }

    /// User toggled the chart: store it and notify the owner.
    pub fn update_chart(&mut self, visible: bool) {
        self.chart_visible = visible;
        debug!(visible, "chart visibility changed");
        if let Some(cb) = self.on_chart.as_mut() {
            cb(visible);
        }
    }

    pub fn refresh_data(&mut self) {
        if let Some(cb) = self.on_refresh.as_mut() {
            cb();
        }
    }

    pub fn show_options(&self) -> bool { self.show_options }

    pub fn chart_visible(&self) -> bool { self.chart_visible }
}
