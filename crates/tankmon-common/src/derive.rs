//! Derived measurement fields computed at ingestion time.

/// Plausible density band for raw milk, g/cm³. Values outside it are stored
/// as computed but logged by the caller.
pub const DENSITY_PLAUSIBLE_MIN: f64 = 1.025;
pub const DENSITY_PLAUSIBLE_MAX: f64 = 1.040;

/// Density in g/cm³ from weight (kg) and volume (L), rounded to three
/// decimals. 1 L = 1000 cm³, so kg/L equals g/cm³ directly.
pub fn density(weight: f64, volume: f64) -> Option<f64> {
    if !(weight.is_finite() && volume.is_finite()) || volume <= 0.0 {
        return None;
    }
    Some((weight / volume * 1000.0).round() / 1000.0)
}

// Cold-chain quality bands. Deviation outside a band costs the listed points
// per unit, clamped to [0, 100].
const TEMP_BAND: (f64, f64) = (2.0, 6.0);
const TEMP_PENALTY_PER_DEG: f64 = 8.0;
const PH_BAND: (f64, f64) = (6.5, 6.9);
const PH_PENALTY_PER_UNIT: f64 = 40.0;
const DENSITY_BAND: (f64, f64) = (1.028, 1.036);
const DENSITY_PENALTY_PER_UNIT: f64 = 2000.0;

fn band_deviation(value: f64, band: (f64, f64)) -> f64 {
    if value < band.0 {
        band.0 - value
    } else if value > band.1 {
        value - band.1
    } else {
        0.0
    }
}

/// Composite 0-100 quality score. 100.0 when every reading sits inside its
/// band; density only contributes when it could be derived.
pub fn quality_score(temperature: f64, ph: f64, density: Option<f64>) -> f64 {
    let mut score = 100.0;
    score -= band_deviation(temperature, TEMP_BAND) * TEMP_PENALTY_PER_DEG;
    score -= band_deviation(ph, PH_BAND) * PH_PENALTY_PER_UNIT;
    if let Some(d) = density {
        score -= band_deviation(d, DENSITY_BAND) * DENSITY_PENALTY_PER_UNIT;
    }
    (score.clamp(0.0, 100.0) * 10.0).round() / 10.0
}
