use std::path::Path;

use crate::charts::{self, Interval};
use crate::config::DashboardConfig;
use crate::data::datasets::{self, fields, ref_fields, CONTROL_METRICS, POLICY_YEARS};
use crate::data::derive::DerivedMetrics;
use crate::data::filter::sorted_labels;
use crate::data::geo::Feature;
use crate::data::model::Table;
use crate::error::DataLoadError;
use crate::fetch::Fetcher;

// ---------------------------------------------------------------------------
// Loaded datasets
// ---------------------------------------------------------------------------

/// Every dataset loaded independently: a failure only disables the charts
/// that need it.
pub struct Datasets {
    pub deaths_by_age: Result<Table, DataLoadError>,
    pub risk_factors: Result<Table, DataLoadError>,
    pub sales: Result<Table, DataLoadError>,
    pub control_policy: Result<Table, DataLoadError>,
    pub death_counts: Result<Table, DataLoadError>,
    pub boundaries: Result<Vec<Feature>, DataLoadError>,
}

impl Datasets {
    pub fn load(config: &DashboardConfig) -> Self {
        let fetcher = Fetcher::new(config.request_timeout());

        let data = Datasets {
            deaths_by_age: datasets::load_deaths_by_age(config),
            risk_factors: datasets::load_risk_factors(config),
            sales: datasets::load_sales(config),
            control_policy: with_fetcher(
                &fetcher,
                datasets::CONTROL_POLICY,
                &config.control_policy_source,
                |f| datasets::load_control_policy(config, f),
            ),
            death_counts: with_fetcher(
                &fetcher,
                datasets::DEATH_COUNTS,
                &config.deaths_source,
                |f| datasets::load_death_counts(config, f),
            ),
            boundaries: with_fetcher(
                &fetcher,
                datasets::BOUNDARIES,
                &config.boundaries_source,
                |f| datasets::load_boundaries(config, f),
            ),
        };

        for err in data.errors() {
            log::error!("Failed to load {}: {err}", err.dataset());
        }
        data
    }

    /// All load failures, in dataset order.
    pub fn errors(&self) -> Vec<&DataLoadError> {
        [
            self.deaths_by_age.as_ref().err(),
            self.risk_factors.as_ref().err(),
            self.sales.as_ref().err(),
            self.control_policy.as_ref().err(),
            self.death_counts.as_ref().err(),
            self.boundaries.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Run a remote load, or fail closed when no HTTP client could be built.
fn with_fetcher<T>(
    fetcher: &Result<Fetcher, reqwest::Error>,
    dataset: &str,
    location: &str,
    load: impl FnOnce(&Fetcher) -> Result<T, DataLoadError>,
) -> Result<T, DataLoadError> {
    match fetcher {
        Ok(f) => load(f),
        Err(e) => Err(DataLoadError::Remote {
            dataset: dataset.to_string(),
            url: location.to_string(),
            reason: e.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Widget values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Deaths,
    Sales,
    Policies,
}

/// Which plot a brush drag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushTarget {
    Years,
    MetricChange,
    OutcomeChange,
}

/// Current value of every widget. Chart builders receive these explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct Selections {
    pub country: String,
    pub year_brush: Option<Interval>,
    pub sales_countries: Vec<String>,
    pub sales_years: (i64, i64),
    pub control_metric: String,
    pub map_year: i64,
    pub metric_brush: Option<Interval>,
    pub outcome_brush: Option<Interval>,
}

impl Selections {
    pub fn brush_mut(&mut self, target: BrushTarget) -> &mut Option<Interval> {
        match target {
            BrushTarget::Years => &mut self.year_brush,
            BrushTarget::MetricChange => &mut self.metric_brush,
            BrushTarget::OutcomeChange => &mut self.outcome_brush,
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,
    pub data: Datasets,
    pub selections: Selections,
    pub view: View,

    /// Dropdown options of the deaths view (sorted country names).
    pub countries: Vec<String>,
    /// Multiselect options of the sales view.
    pub sales_countries: Vec<String>,
    /// Year slider bounds of the sales view.
    pub sales_year_bounds: (i64, i64),

    /// Scatterplot data for the current control metric (cached).
    pub policy_effect: Option<DerivedMetrics>,

    /// Start of an in-progress brush drag.
    pub drag_anchor: Option<(BrushTarget, f64)>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let data = Datasets::load(&config);
        Self::with_data(config, data)
    }

    /// Build the state around already loaded datasets.
    pub fn with_data(config: DashboardConfig, data: Datasets) -> Self {
        let countries = data
            .deaths_by_age
            .as_ref()
            .map(|t| sorted_labels(&t.records, fields::COUNTRY))
            .unwrap_or_default();
        let sales_countries = data
            .sales
            .as_ref()
            .map(|t| sorted_labels(&t.records, ref_fields::COUNTRY))
            .unwrap_or_default();
        let sales_year_bounds = data
            .sales
            .as_ref()
            .ok()
            .and_then(|t| year_bounds(t, ref_fields::YEAR))
            .unwrap_or(config.default_sales_years);

        let (lo, hi) = config.default_sales_years;
        let selections = Selections {
            country: countries.first().cloned().unwrap_or_default(),
            year_brush: None,
            sales_countries: config
                .default_sales_countries
                .iter()
                .filter(|c| sales_countries.contains(c))
                .cloned()
                .collect(),
            sales_years: (
                lo.clamp(sales_year_bounds.0, sales_year_bounds.1),
                hi.clamp(sales_year_bounds.0, sales_year_bounds.1),
            ),
            control_metric: CONTROL_METRICS[0].to_string(),
            map_year: POLICY_YEARS[0],
            metric_brush: None,
            outcome_brush: None,
        };

        let status_message = match data.errors().len() {
            0 => None,
            n => Some(format!("{n} dataset(s) failed to load")),
        };

        let mut state = AppState {
            config,
            data,
            selections,
            view: View::Deaths,
            countries,
            sales_countries,
            sales_year_bounds,
            policy_effect: None,
            drag_anchor: None,
            status_message,
        };
        state.refresh_policy_effect();
        state
    }

    /// Reload everything from a local folder holding all datasets.
    pub fn reload_from_dir(&mut self, dir: &Path) {
        let config = self.config.clone().with_local_dir(dir);
        log::info!("Reloading datasets from {}", dir.display());
        let view = self.view;
        *self = AppState::new(config);
        self.view = view;
    }

    /// Recompute the scatterplot data after the control metric changed.
    pub fn refresh_policy_effect(&mut self) {
        self.policy_effect = match (&self.data.control_policy, &self.data.death_counts) {
            (Ok(control), Ok(deaths)) => {
                let effect = charts::policy_effect(
                    &control.records,
                    &deaths.records,
                    &self.selections.control_metric,
                    self.config.change_years,
                    &deaths.name,
                );
                for skipped in &effect.skipped {
                    log::warn!("Excluded from scatterplot: {skipped}");
                }
                Some(effect)
            }
            _ => None,
        };
        self.selections.metric_brush = None;
        self.selections.outcome_brush = None;
    }

    pub fn set_control_metric(&mut self, metric: &str) {
        if self.selections.control_metric != metric {
            self.selections.control_metric = metric.to_string();
            self.refresh_policy_effect();
        }
    }

    pub fn set_country(&mut self, country: &str) {
        self.selections.country = country.to_string();
    }

    /// Toggle one country of the sales multiselect.
    pub fn toggle_sales_country(&mut self, country: &str) {
        let selected = &mut self.selections.sales_countries;
        if let Some(pos) = selected.iter().position(|c| c == country) {
            selected.remove(pos);
        } else {
            selected.push(country.to_string());
        }
    }

    /// Select all sales countries.
    pub fn select_all_sales(&mut self) {
        self.selections.sales_countries = self.sales_countries.clone();
    }

    /// Deselect all sales countries.
    pub fn select_no_sales(&mut self) {
        self.selections.sales_countries.clear();
    }

    /// Feed a pointer event of a brushable plot. A drag defines the interval
    /// between its start and the current pointer; a click clears it.
    pub fn brush_event(&mut self, target: BrushTarget, event: BrushEvent) {
        match event {
            BrushEvent::Start(x) => {
                self.drag_anchor = Some((target, x));
            }
            BrushEvent::Drag(x) => {
                if let Some((t, anchor)) = self.drag_anchor {
                    if t == target {
                        *self.selections.brush_mut(target) = Some((anchor.min(x), anchor.max(x)));
                    }
                }
            }
            BrushEvent::Stop => {
                self.drag_anchor = None;
            }
            BrushEvent::Clear => {
                self.drag_anchor = None;
                *self.selections.brush_mut(target) = None;
            }
        }
    }
}

/// Pointer interaction on a brushable plot, in plot coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BrushEvent {
    Start(f64),
    Drag(f64),
    Stop,
    Clear,
}

fn year_bounds(table: &Table, field: &str) -> Option<(i64, i64)> {
    let years = table.records.iter().filter_map(|r| r.value(field).as_i64());
    let (lo, hi) = years.fold((i64::MAX, i64::MIN), |(lo, hi), y| (lo.min(y), hi.max(y)));
    (lo <= hi).then_some((lo, hi))
}
