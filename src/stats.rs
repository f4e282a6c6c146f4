// SleepWatch Companion: Windowed Statistics Engine
//
// Pure functions over a numeric sequence. Each returns one value per valid
// trailing-window offset (`len - window_size + 1` values); the last element
// belongs to the most recent window. A sequence shorter than the window, or a
// zero window, yields an empty result: "not enough data yet", not an error.

/// Sample standard deviation (n - 1 denominator) of every trailing window.
pub fn variability(values: &[f64], window_size: usize) -> Vec<f64> {
    if window_size == 0 || values.len() < window_size {
        return Vec::new();
    }
    values.windows(window_size).map(sample_std_dev).collect()
}

/// Arithmetic mean of every trailing window.
pub fn moving_average(values: &[f64], window_size: usize) -> Vec<f64> {
    if window_size == 0 || values.len() < window_size {
        return Vec::new();
    }
    values.windows(window_size).map(mean).collect()
}

/// `variability(x) + variability(y) + variability(z)`, element-wise,
/// truncated to the shortest of the three.
pub fn accel_variability_sum(x: &[f64], y: &[f64], z: &[f64], window_size: usize) -> Vec<f64> {
    let vx = variability(x, window_size);
    let vy = variability(y, window_size);
    let vz = variability(z, window_size);
    vx.iter()
        .zip(&vy)
        .zip(&vz)
        .map(|((a, b), c)| a + b + c)
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Divides by `n - 1`; a single value has no spread.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (sum_sq / (n - 1) as f64).sqrt()
}
