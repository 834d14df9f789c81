use eframe::egui::{self, Color32, RichText, Stroke, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, HLine, Legend, Line, Plot, PlotPoint, PlotPoints, Points, Polygon, VLine};

use crate::charts::{self, Interval, METRIC_EXTENT, OUTCOME_EXTENT};
use crate::color::{
    orange_shades, score_color, CategoryColors, HIGHLIGHT_RED, MUTED_GRAY, NO_DATA,
    REGRESSION_ORANGE,
};
use crate::data::datasets::SMOKING;
use crate::data::derive::DerivedMetricRecord;
use crate::data::stats::Bin;
use crate::error::DataLoadError;
use crate::state::{AppState, BrushEvent, BrushTarget};

const BRUSH_COLOR: Color32 = Color32::from_rgb(70, 130, 180);

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

/// Translate the pointer activity on a plot into a brush event.
fn brush_event(response: &egui::Response, pointer: Option<PlotPoint>, axis: Axis) -> Option<BrushEvent> {
    let coord = pointer.map(|p| match axis {
        Axis::X => p.x,
        Axis::Y => p.y,
    });
    if response.drag_started() {
        coord.map(BrushEvent::Start)
    } else if response.dragged() {
        coord.map(BrushEvent::Drag)
    } else if response.drag_stopped() {
        Some(BrushEvent::Stop)
    } else if response.clicked() {
        Some(BrushEvent::Clear)
    } else {
        None
    }
}

fn dataset_error(ui: &mut Ui, err: &str) {
    ui.label(RichText::new(err).color(Color32::RED));
}

fn error_text(err: &DataLoadError) -> String {
    format!("Cannot show this chart: {err}")
}

fn brush_lines(plot_ui: &mut egui_plot::PlotUi, brush: Option<Interval>, axis: Axis) {
    if let Some((lo, hi)) = brush {
        for v in [lo, hi] {
            match axis {
                Axis::X => plot_ui.vline(VLine::new(v).color(BRUSH_COLOR).width(2.0)),
                Axis::Y => plot_ui.hline(HLine::new(v).color(BRUSH_COLOR).width(2.0)),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Smoking deaths view
// ---------------------------------------------------------------------------

/// Age-band area chart and yearly totals on the left, risk factors on the
/// right. Dragging over the yearly totals brushes the years of both other
/// charts.
pub fn deaths_view(ui: &mut Ui, state: &mut AppState) {
    let sel = state.selections.clone();

    let per_year = state
        .data
        .deaths_by_age
        .as_ref()
        .map(|t| charts::deaths_per_year(&t.records, &sel.country))
        .map_err(error_text);
    let shares = state
        .data
        .deaths_by_age
        .as_ref()
        .map(|t| charts::age_shares(&t.records, &sel.country, sel.year_brush))
        .map_err(error_text);
    let factors = state
        .data
        .risk_factors
        .as_ref()
        .map(|t| charts::risk_factor_totals(&t.records, &sel.country, sel.year_brush))
        .map_err(error_text);

    let mut event = None;

    ui.columns(2, |cols| {
        let left = &mut cols[0];
        left.heading(format!("Smoking deaths by age in {}", sel.country));
        match &shares {
            Ok(bands) => age_area(left, bands),
            Err(e) => dataset_error(left, e),
        }
        left.add_space(8.0);
        left.label("Smoking deaths (all ages) – drag to select years, click to clear");
        match &per_year {
            Ok(points) => event = year_line(left, points, sel.year_brush),
            Err(e) => dataset_error(left, e),
        }

        let right = &mut cols[1];
        right.heading("Deaths by risk factor");
        match &factors {
            Ok(totals) => risk_factor_bars(right, totals),
            Err(e) => dataset_error(right, e),
        }
    });

    if let Some(ev) = event {
        state.brush_event(BrushTarget::Years, ev);
    }
}

fn age_area(ui: &mut Ui, bands: &[(String, Vec<(i64, f64, f64)>)]) {
    let shades = orange_shades(bands.len());
    Plot::new("age_area")
        .height(260.0)
        .legend(Legend::default())
        .x_axis_label("Year")
        .y_axis_label("Share of smoking deaths")
        .include_y(0.0)
        .include_y(1.0)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for ((age, band), color) in bands.iter().zip(shades) {
                // Upper edge left to right, then lower edge back.
                let outline: PlotPoints = band
                    .iter()
                    .map(|&(x, _, hi)| [x as f64, hi])
                    .chain(band.iter().rev().map(|&(x, lo, _)| [x as f64, lo]))
                    .collect();
                plot_ui.polygon(
                    Polygon::new(outline)
                        .fill_color(color)
                        .stroke(Stroke::new(1.0, color))
                        .name(age),
                );
            }
        });
}

fn year_line(ui: &mut Ui, points: &[(i64, f64)], brush: Option<Interval>) -> Option<BrushEvent> {
    let line: PlotPoints = points.iter().map(|&(x, y)| [x as f64, y]).collect();
    let resp = Plot::new("deaths_per_year")
        .height(120.0)
        .x_axis_label("Year")
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(line).color(HIGHLIGHT_RED).width(1.5).name("All ages"));
            brush_lines(plot_ui, brush, Axis::X);
            plot_ui.pointer_coordinate()
        });
    brush_event(&resp.response, resp.inner, Axis::X)
}

fn risk_factor_bars(ui: &mut Ui, totals: &[(String, f64)]) {
    // Largest factor on top: bar i sits at y = n - 1 - i.
    let n = totals.len();
    let bars: Vec<Bar> = totals
        .iter()
        .enumerate()
        .map(|(i, (factor, total))| {
            let fill = if factor == SMOKING { HIGHLIGHT_RED } else { MUTED_GRAY };
            Bar::new((n - 1 - i) as f64, *total)
                .name(factor)
                .fill(fill)
                .width(0.8)
        })
        .collect();
    let labels: Vec<String> = totals.iter().rev().map(|(f, _)| f.clone()).collect();

    Plot::new("risk_factors")
        .height(ui.available_height().max(300.0))
        .x_axis_label("Total deaths")
        .y_axis_formatter(move |mark, _range| {
            let i = mark.value.round();
            if (mark.value - i).abs() < 1e-6 && i >= 0.0 {
                labels.get(i as usize).cloned().unwrap_or_default()
            } else {
                String::new()
            }
        })
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal());
        });
}

// ---------------------------------------------------------------------------
// Cigarette sales view
// ---------------------------------------------------------------------------

pub fn sales_view(ui: &mut Ui, state: &AppState) {
    ui.heading("Average number of cigarettes sold daily during the chosen period");
    let sales = match &state.data.sales {
        Ok(t) => t,
        Err(e) => return dataset_error(ui, &error_text(e)),
    };
    let sel = &state.selections;
    let series = charts::sales_series(&sales.records, &sel.sales_countries, sel.sales_years);
    let colors = CategoryColors::new(&sel.sales_countries);

    if series.is_empty() {
        ui.label("No data for the selected countries and years.");
    }

    Plot::new("sales")
        .legend(Legend::default())
        .x_axis_label("Years")
        .y_axis_label("Avg daily sales of cigarettes")
        .include_y(0.0)
        .show(ui, |plot_ui| {
            for (country, points) in &series {
                let line: PlotPoints = points.iter().map(|&(x, y)| [x as f64, y]).collect();
                plot_ui.line(
                    Line::new(line)
                        .name(country)
                        .color(colors.color_for(country))
                        .width(1.5),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Control policy view
// ---------------------------------------------------------------------------

pub fn policies_view(ui: &mut Ui, state: &mut AppState) {
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("A global view of the implementation of control policies");
            policy_map(ui, state);
            ui.separator();
            ui.heading("Are control policies effective?");
            policy_effect(ui, state);
        });
}

fn policy_map(ui: &mut Ui, state: &AppState) {
    let (features, control) = match (&state.data.boundaries, &state.data.control_policy) {
        (Ok(f), Ok(c)) => (f, c),
        (Err(e), _) | (_, Err(e)) => return dataset_error(ui, &error_text(e)),
    };
    let sel = &state.selections;
    let map = charts::choropleth(features, &control.records, &sel.control_metric, sel.map_year, &control.name);

    let resp = Plot::new("choropleth")
        .height(420.0)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .show(ui, |plot_ui| {
            for region in &map.regions {
                let fill = region.score.map_or(NO_DATA, score_color);
                for rings in &region.feature.polygons {
                    let Some(outer) = rings.first() else { continue };
                    let outline: PlotPoints = outer.iter().copied().collect();
                    plot_ui.polygon(
                        Polygon::new(outline)
                            .fill_color(fill)
                            .stroke(Stroke::new(0.5, Color32::BLACK)),
                    );
                }
            }
            plot_ui.pointer_coordinate()
        });

    let hovered = resp
        .inner
        .and_then(|p| map.regions.iter().find(|r| r.feature.contains([p.x, p.y])));
    match hovered {
        Some(region) => {
            let score = region
                .score
                .map_or_else(|| "no data".to_string(), |s| format!("{s}"));
            ui.label(format!(
                "{}: {} = {score} ({})",
                region.feature.name, sel.control_metric, sel.map_year
            ));
        }
        None => {
            ui.label(format!(
                "{} of {} countries without a score for {}",
                map.misses.len(),
                map.regions.len(),
                sel.map_year
            ));
        }
    }
}

fn policy_effect(ui: &mut Ui, state: &mut AppState) {
    let Some(effect) = state.policy_effect.as_ref() else {
        let err = [&state.data.control_policy, &state.data.death_counts]
            .into_iter()
            .find_map(|d| d.as_ref().err())
            .map(error_text)
            .unwrap_or_default();
        return dataset_error(ui, &err);
    };

    let sel = &state.selections;
    let (year_a, year_b) = state.config.change_years;
    let metric_bins = charts::metric_histogram(&effect.records);
    let outcome_bins = charts::outcome_histogram(&effect.records);
    let shown = charts::brushed(&effect.records, sel.metric_brush, sel.outcome_brush);
    let segment = charts::regression_segment(&shown);
    let (metric_brush, outcome_brush) = (sel.metric_brush, sel.outcome_brush);
    let skipped: Vec<String> = effect.skipped.iter().map(ToString::to_string).collect();
    let metric = sel.control_metric.clone();

    let mut events = Vec::new();

    ui.label("Drag on a histogram to filter the points, click it to clear.");
    if let Some(ev) = histogram(ui, "metric_hist", &metric_bins, metric_brush, Axis::X) {
        events.push((BrushTarget::MetricChange, ev));
    }

    let hovered = ui
        .horizontal(|ui: &mut Ui| {
            let hovered = scatter(ui, &shown, segment, &metric, (year_a, year_b));
            if let Some(ev) = histogram(ui, "outcome_hist", &outcome_bins, outcome_brush, Axis::Y) {
                events.push((BrushTarget::OutcomeChange, ev));
            }
            hovered
        })
        .inner;
    if let Some(entity) = hovered {
        ui.label(format!("Country: {entity}"));
    }

    if !skipped.is_empty() {
        egui::CollapsingHeader::new(format!("{} countries excluded", skipped.len()))
            .default_open(false)
            .show(ui, |ui: &mut Ui| excluded_table(ui, &skipped));
    }

    for (target, ev) in events {
        state.brush_event(target, ev);
    }
}

/// Scatterplot with regression line; returns the entity under the pointer.
fn scatter(
    ui: &mut Ui,
    points: &[&DerivedMetricRecord],
    segment: Option<[[f64; 2]; 2]>,
    metric: &str,
    (year_a, year_b): (i64, i64),
) -> Option<String> {
    let xy: PlotPoints = points
        .iter()
        .map(|r| [r.metric_change_pct, r.outcome_change_pct])
        .collect();
    let resp = Plot::new("policy_scatter")
        .width(600.0)
        .height(400.0)
        .x_axis_label(format!("% change of efforts in {metric} from {year_a} to {year_b}"))
        .y_axis_label(format!("% change in deaths from {year_a} to {year_b}"))
        .include_x(METRIC_EXTENT.0)
        .include_x(METRIC_EXTENT.1)
        .include_y(OUTCOME_EXTENT.0)
        .include_y(OUTCOME_EXTENT.1)
        .show(ui, |plot_ui| {
            plot_ui.points(Points::new(xy).radius(4.0).color(Color32::from_rgb(31, 119, 180)));
            if let Some(seg) = segment {
                plot_ui.line(
                    Line::new(PlotPoints::new(seg.to_vec()))
                        .color(REGRESSION_ORANGE)
                        .width(2.0),
                );
            }
            plot_ui.pointer_coordinate()
        });

    // Nearest point within a few percentage points of the pointer.
    let pointer = resp.inner?;
    points
        .iter()
        .map(|r| {
            let dx = r.metric_change_pct - pointer.x;
            let dy = r.outcome_change_pct - pointer.y;
            (r, dx * dx + dy * dy)
        })
        .filter(|(_, d2)| *d2 < 25.0)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(r, _)| r.entity.clone())
}

fn histogram(
    ui: &mut Ui,
    id: &str,
    bins: &[Bin],
    brush: Option<Interval>,
    axis: Axis,
) -> Option<BrushEvent> {
    let bars: Vec<Bar> = bins
        .iter()
        .map(|b| {
            Bar::new((b.lo + b.hi) / 2.0, b.count as f64)
                .width(b.hi - b.lo)
                .fill(Color32::from_rgb(158, 202, 225))
        })
        .collect();
    let mut chart = BarChart::new(bars).name("N° countries");
    let mut plot = Plot::new(id)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false);
    match axis {
        Axis::X => {
            plot = plot
                .width(600.0)
                .height(80.0)
                .include_x(METRIC_EXTENT.0)
                .include_x(METRIC_EXTENT.1);
        }
        Axis::Y => {
            chart = chart.horizontal();
            plot = plot
                .width(120.0)
                .height(400.0)
                .include_y(OUTCOME_EXTENT.0)
                .include_y(OUTCOME_EXTENT.1);
        }
    }

    let resp = plot.show(ui, |plot_ui| {
        plot_ui.bar_chart(chart);
        brush_lines(plot_ui, brush, axis);
        plot_ui.pointer_coordinate()
    });
    brush_event(&resp.response, resp.inner, axis)
}

fn excluded_table(ui: &mut Ui, reasons: &[String]) {
    TableBuilder::new(ui)
        .striped(true)
        .column(Column::remainder())
        .header(18.0, |mut header| {
            header.col(|ui| {
                ui.strong("Reason");
            });
        })
        .body(|mut body| {
            for reason in reasons {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(reason);
                    });
                });
            }
        });
}
