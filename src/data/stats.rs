//! Small numeric helpers behind the histogram, regression and stacked-area
//! charts.

use std::collections::BTreeMap;

/// One histogram bin covering `[lo, hi)` (the last bin is closed).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

/// Pick a "nice" bin step: a power of ten, possibly divided by 5 or 2, such
/// that the extent is covered by at most `maxbins` bins.
pub fn nice_step(extent: (f64, f64), maxbins: usize) -> f64 {
    let span = extent.1 - extent.0;
    let maxbins = maxbins.max(1) as f64;
    if !(span.is_finite() && span > 0.0) {
        return 1.0;
    }
    let mut step = 10f64.powf(span.log10().round());
    while (span / step).ceil() > maxbins {
        step *= 10.0;
    }
    for div in [5.0, 2.0] {
        let v = step / div;
        if span / v <= maxbins {
            step = v;
        }
    }
    step
}

/// Count `values` into nice bins over `extent`. Values outside the extent or
/// not finite are dropped.
pub fn bin(values: &[f64], maxbins: usize, extent: (f64, f64)) -> Vec<Bin> {
    let step = nice_step(extent, maxbins);
    let start = (extent.0 / step).floor() * step;
    let stop = (extent.1 / step).ceil() * step;
    let n = (((stop - start) / step).round() as usize).max(1);

    let mut bins: Vec<Bin> = (0..n)
        .map(|i| Bin {
            lo: start + i as f64 * step,
            hi: start + (i + 1) as f64 * step,
            count: 0,
        })
        .collect();

    for &v in values {
        if !v.is_finite() || v < extent.0 || v > extent.1 {
            continue;
        }
        let idx = (((v - start) / step).floor() as usize).min(n - 1);
        bins[idx].count += 1;
    }
    bins
}

/// Ordinary least squares fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// `None` for fewer than two points or when all x are equal.
pub fn linear_regression(points: &[(f64, f64)]) -> Option<LinearFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), &(x, y)| {
        let dx = x - mean_x;
        (sxy + dx * (y - mean_y), sxx + dx * dx)
    });
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// Normalise stacked series so that at every x the categories sum to 1.
///
/// Input is `(x, category, value)`; output maps each category (in first
/// appearance order) to its `(x, lower, upper)` band. An x whose total is
/// zero gets empty bands.
pub fn normalized_stack(rows: &[(i64, String, f64)]) -> Vec<(String, Vec<(i64, f64, f64)>)> {
    let mut categories: Vec<&str> = Vec::new();
    let mut by_x: BTreeMap<i64, BTreeMap<&str, f64>> = BTreeMap::new();
    for (x, cat, v) in rows {
        if !categories.contains(&cat.as_str()) {
            categories.push(cat);
        }
        *by_x.entry(*x).or_default().entry(cat).or_default() += v;
    }

    let mut bands: Vec<(String, Vec<(i64, f64, f64)>)> = categories
        .iter()
        .map(|c| (c.to_string(), Vec::with_capacity(by_x.len())))
        .collect();

    for (x, values) in &by_x {
        let total: f64 = values.values().sum();
        let mut lower = 0.0;
        for (i, cat) in categories.iter().enumerate() {
            let share = if total > 0.0 {
                values.get(cat).copied().unwrap_or(0.0) / total
            } else {
                0.0
            };
            bands[i].1.push((*x, lower, lower + share));
            lower += share;
        }
    }
    bands
}
