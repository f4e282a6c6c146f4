// SleepWatch Companion: Feature Builders
//
// One builder per classifier. Both refuse to run on a partial window, so a
// feature vector in hand always means every field came from full-size data.

use crate::buffer::Window;
use crate::config::{INTERACTION_EPSILON, WINDOW_LONG, WINDOW_SHORT};
use crate::stats::{accel_variability_sum, moving_average, variability};

/// Input of the binary sleep/wake detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryFeatures {
    pub heart_rate: f64,
    pub hr_variability: f64,
    pub accx_variability: f64,
    pub accy_variability: f64,
    pub accz_variability: f64,
}

/// Input of the multi-class stage detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageFeatures {
    pub heart_rate: f64,
    pub hr_variability_90: f64,
    pub hr_moving_avg_90: f64,
    pub hr_moving_avg_30: f64,
    pub accel_variability_sum_90: f64,
    pub hr_var_x_accel_var: f64,
    pub hr_var_div_accel_var: f64,
}

/// Features for the binary detector from a `WINDOW_LONG` window.
///
/// Statistics are taken over the trailing `WINDOW_LONG` samples; heart rate
/// is the most recent raw reading.
pub fn build_binary_features(window90: &Window<'_>) -> Option<BinaryFeatures> {
    if window90.len() < WINDOW_LONG {
        return None;
    }
    let heart_rate = window90.last()?.heart_rate;

    Some(BinaryFeatures {
        heart_rate,
        hr_variability: last_of(variability(&window90.heart_rates(), WINDOW_LONG))?,
        accx_variability: last_of(variability(&window90.accel_x(), WINDOW_LONG))?,
        accy_variability: last_of(variability(&window90.accel_y(), WINDOW_LONG))?,
        accz_variability: last_of(variability(&window90.accel_z(), WINDOW_LONG))?,
    })
}

/// Features for the stage detector; needs both windows at full size.
pub fn build_stage_features(
    window90: &Window<'_>,
    window30: &Window<'_>,
) -> Option<StageFeatures> {
    if window90.len() < WINDOW_LONG || window30.len() < WINDOW_SHORT {
        return None;
    }

    let hr_90 = window90.heart_rates();
    let heart_rate = window90.last()?.heart_rate;
    let hr_variability_90 = last_of(variability(&hr_90, WINDOW_LONG))?;
    let hr_moving_avg_90 = last_of(moving_average(&hr_90, WINDOW_LONG))?;
    let hr_moving_avg_30 = last_of(moving_average(&window30.heart_rates(), WINDOW_SHORT))?;
    let accel_variability_sum_90 = last_of(accel_variability_sum(
        &window90.accel_x(),
        &window90.accel_y(),
        &window90.accel_z(),
        WINDOW_LONG,
    ))?;

    Some(StageFeatures {
        heart_rate,
        hr_variability_90,
        hr_moving_avg_90,
        hr_moving_avg_30,
        accel_variability_sum_90,
        hr_var_x_accel_var: hr_variability_90 * accel_variability_sum_90,
        hr_var_div_accel_var: hr_variability_90 / (accel_variability_sum_90 + INTERACTION_EPSILON),
    })
}

fn last_of(values: Vec<f64>) -> Option<f64> {
    values.last().copied()
}
