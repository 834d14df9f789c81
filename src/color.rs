use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Categorical palette
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            to_color32(Hsl::new(hue, 0.75, 0.55).into_color())
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

/// Maps category labels (countries, age bands) to distinct colours.
#[derive(Debug, Clone)]
pub struct CategoryColors {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl CategoryColors {
    /// Colours are assigned in the order the labels are given.
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Self {
        let palette = generate_palette(labels.len());
        let mapping = labels
            .iter()
            .zip(palette)
            .map(|(l, c)| (l.as_ref().to_string(), c))
            .collect();
        CategoryColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}

// ---------------------------------------------------------------------------
// Fixed colours
// ---------------------------------------------------------------------------

pub const HIGHLIGHT_RED: Color32 = Color32::from_rgb(214, 39, 40);
pub const MUTED_GRAY: Color32 = Color32::from_rgb(200, 200, 200);
pub const NO_DATA: Color32 = Color32::from_rgb(211, 211, 211);
pub const REGRESSION_ORANGE: Color32 = Color32::from_rgb(255, 165, 0);

/// Light-to-dark orange shades for the age bands, youngest lightest.
pub fn orange_shades(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| {
            let t = if n > 1 { i as f32 / (n - 1) as f32 } else { 0.5 };
            sequential(0.2 + 0.7 * t)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Sequential scale
// ---------------------------------------------------------------------------

/// Pale yellow → deep orange-red for `t` in `[0, 1]` (clamped).
pub fn sequential(t: f32) -> Color32 {
    let low: LinSrgb = Srgb::new(1.0f32, 0.96, 0.85).into_linear();
    let high: LinSrgb = Srgb::new(0.75f32, 0.22, 0.02).into_linear();
    to_color32(Srgb::from_linear(low.mix(high, t.clamp(0.0, 1.0))))
}

/// Colour of a policy score on the 1–5 scale.
pub fn score_color(score: f64) -> Color32 {
    sequential(((score - 1.0) / 4.0) as f32)
}
