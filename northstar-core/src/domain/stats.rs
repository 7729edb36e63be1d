// northstar-core/src/domain/stats.rs
//
// Small numeric helpers shared by metrics, segmentation and quality checks.
// Every ratio returns 0.0 on a zero denominator so NaN never leaks into results.

pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn mean(values: &[f64]) -> f64 {
    safe_div(values.iter().sum(), values.len() as f64)
}

/// Population variance (divides by n).
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let squared: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    safe_div(squared, values.len() as f64)
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Quantile with linear interpolation between closest ranks.
/// Returns 0.0 for an empty slice.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q = q.clamp(0.0, 1.0);
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}
