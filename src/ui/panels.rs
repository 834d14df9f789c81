use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::color::CategoryColors;
use crate::data::datasets::{CONTROL_METRICS, POLICY_YEARS};
use crate::state::{AppState, View};

// ---------------------------------------------------------------------------
// Left side panel – widgets of the current view
// ---------------------------------------------------------------------------

/// Render the left panel with the selectors of the active view.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Selection");
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| match state.view {
            View::Deaths => deaths_widgets(ui, state),
            View::Sales => sales_widgets(ui, state),
            View::Policies => policy_widgets(ui, state),
        });
}

fn deaths_widgets(ui: &mut Ui, state: &mut AppState) {
    if state.countries.is_empty() {
        ui.label("No countries loaded.");
        return;
    }

    ui.strong("Country");
    let current = state.selections.country.clone();
    let mut picked = None;
    egui::ComboBox::from_id_salt("country")
        .selected_text(&current)
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for country in &state.countries {
                if ui.selectable_label(current == *country, country).clicked() {
                    picked = Some(country.clone());
                }
            }
        });
    if let Some(country) = picked {
        state.set_country(&country);
    }

    ui.separator();
    ui.strong("Years");
    match state.selections.year_brush {
        Some((lo, hi)) => {
            ui.label(format!("{:.0} – {:.0}", lo.ceil(), hi.floor()));
            if ui.small_button("Show all years").clicked() {
                state.selections.year_brush = None;
            }
        }
        None => {
            ui.label("All years");
        }
    }
}

fn sales_widgets(ui: &mut Ui, state: &mut AppState) {
    let options = state.sales_countries.clone();
    if options.is_empty() {
        ui.label("No sales data loaded.");
        return;
    }

    let (min_year, max_year) = state.sales_year_bounds;
    ui.strong("Year range");
    let (mut from, mut to) = state.selections.sales_years;
    ui.add(egui::Slider::new(&mut from, min_year..=max_year).text("from"));
    ui.add(egui::Slider::new(&mut to, min_year..=max_year).text("to"));
    state.selections.sales_years = (from.min(to), from.max(to));

    ui.separator();
    let n_selected = state.selections.sales_countries.len();
    egui::CollapsingHeader::new(
        RichText::new(format!("Countries  ({n_selected}/{})", options.len())).strong(),
    )
    .default_open(true)
    .show(ui, |ui: &mut Ui| {
        ui.horizontal(|ui: &mut Ui| {
            if ui.small_button("All").clicked() {
                state.select_all_sales();
            }
            if ui.small_button("None").clicked() {
                state.select_no_sales();
            }
        });

        // Swatches match the line colours of the chart.
        let colors = CategoryColors::new(&state.selections.sales_countries);
        for country in &options {
            let mut checked = state.selections.sales_countries.contains(country);
            let mut text = RichText::new(country);
            if checked {
                text = text.color(colors.color_for(country));
            }
            if ui.checkbox(&mut checked, text).changed() {
                state.toggle_sales_country(country);
            }
        }
    });
}

fn policy_widgets(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Control policy");
    let current = state.selections.control_metric.clone();
    let mut picked = None;
    egui::ComboBox::from_id_salt("control_metric")
        .selected_text(&current)
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for metric in CONTROL_METRICS {
                if ui.selectable_label(current == metric, metric).clicked() {
                    picked = Some(metric);
                }
            }
        });
    if let Some(metric) = picked {
        state.set_control_metric(metric);
    }

    ui.separator();
    ui.strong("Map year");
    let (first, last) = (POLICY_YEARS[0], POLICY_YEARS[POLICY_YEARS.len() - 1]);
    ui.add(
        egui::Slider::new(&mut state.selections.map_year, first..=last)
            .step_by(2.0)
            .text("year"),
    );

    ui.separator();
    if let Some(effect) = &state.policy_effect {
        let shown = crate::charts::brushed(
            &effect.records,
            state.selections.metric_brush,
            state.selections.outcome_brush,
        )
        .len();
        ui.label(format!("{shown} of {} countries shown", effect.records.len()));
    }
    if ui.small_button("Clear histogram filters").clicked() {
        state.selections.metric_brush = None;
        state.selections.outcome_brush = None;
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu, view tabs and status line.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open data folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        ui.selectable_value(&mut state.view, View::Deaths, "Smoking deaths");
        ui.selectable_value(&mut state.view, View::Sales, "Cigarette sales");
        ui.selectable_value(&mut state.view, View::Policies, "Control policies");

        ui.separator();

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Folder dialog
// ---------------------------------------------------------------------------

pub fn open_folder_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Open a folder with the dashboard datasets")
        .pick_folder();

    if let Some(dir) = folder {
        state.reload_from_dir(&dir);
    }
}
