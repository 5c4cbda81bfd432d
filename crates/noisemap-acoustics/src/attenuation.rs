//! Propagation attenuation: geometric spreading, atmospheric absorption
//! (ISO 9613-1), barrier diffraction (Maekawa family) and ground effect
//! (ISO 9613-2).
//!
//! Two ground-effect formulas coexist on purpose. The legacy Eq. 10 term
//! ([`ground_attenuation_iso9613`]) is clamped to ≥ 0 for callers that
//! need a pure attenuation; the signed two-ray phasor model lives in
//! [`crate::impedance::agr_two_ray_db`]. Call sites depend on each one's
//! specific sign behavior; do not unify them.

use serde::{Deserialize, Serialize};

use crate::surface::{GroundParams, SurfaceType};

/// Geometric spreading law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpreadingMode {
    /// Point source: 20·log10(d) + 10·log10(4π).
    Spherical,
    /// Line source: 10·log10(d) + 10·log10(2π).
    Cylindrical,
}

/// Distance floor before the logarithm; 10 cm keeps a receiver sitting on
/// the source from producing −∞.
const MIN_SPREADING_DISTANCE: f64 = 0.1;

/// Spreading loss in dB for a path of length `distance` meters.
pub fn spreading_loss(distance: f64, mode: SpreadingMode) -> f64 {
    let d = distance.max(MIN_SPREADING_DISTANCE);
    match mode {
        SpreadingMode::Spherical => 20.0 * d.log10() + 10.0 * (4.0 * std::f64::consts::PI).log10(),
        SpreadingMode::Cylindrical => {
            10.0 * d.log10() + 10.0 * (2.0 * std::f64::consts::PI).log10()
        }
    }
}

/// Atmospheric absorption model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtmosphericModel {
    None,
    /// Cheap piecewise approximation, adequate for short ranges.
    Simple,
    /// Full ISO 9613-1 molecular-relaxation formula.
    #[default]
    Iso9613,
}

/// Atmospheric absorption coefficient in dB/m.
///
/// Multiply by the **actual traced path length** (not the direct distance)
/// for reflected and diffracted paths.
pub fn atmospheric_absorption(
    model: AtmosphericModel,
    frequency: f64,
    temperature_c: f64,
    humidity_pct: f64,
    pressure_kpa: f64,
) -> f64 {
    match model {
        AtmosphericModel::None => 0.0,
        AtmosphericModel::Simple => simple_absorption(frequency, temperature_c, humidity_pct),
        AtmosphericModel::Iso9613 => {
            iso9613_absorption(frequency, temperature_c, humidity_pct, pressure_kpa)
        }
    }
}

/// Full ISO 9613-1 absorption, dB/m.
///
/// Oxygen and nitrogen relaxation frequencies are derived from the molar
/// water-vapour concentration, which comes from the saturation vapour
/// pressure at the given temperature.
///
/// # Arguments
/// * `frequency` - Hz
/// * `temperature_c` - air temperature, °C
/// * `humidity_pct` - relative humidity, 0–100 %
/// * `pressure_kpa` - ambient pressure, kPa (101.325 at sea level)
pub fn iso9613_absorption(
    frequency: f64,
    temperature_c: f64,
    humidity_pct: f64,
    pressure_kpa: f64,
) -> f64 {
    if frequency <= 0.0 {
        return 0.0;
    }
    let humidity = humidity_pct.clamp(0.0, 100.0);
    let t = 273.15 + temperature_c.clamp(-50.0, 60.0);
    let t01 = 273.16; // triple point of water, K
    let tr = t / 293.15;
    let pa = (pressure_kpa / 101.325).max(1e-3);

    // Molar concentration of water vapour, percent.
    let c_sat = -6.8346 * (t01 / t).powf(1.261) + 4.6151;
    let h = humidity * 10f64.powf(c_sat) / pa;

    // Relaxation frequencies of oxygen and nitrogen, Hz.
    let fr_o = pa * (24.0 + 4.04e4 * h * (0.02 + h) / (0.391 + h));
    let fr_n = pa
        * tr.powf(-0.5)
        * (9.0 + 280.0 * h * (-4.170 * (tr.powf(-1.0 / 3.0) - 1.0)).exp());

    let f2 = frequency * frequency;
    8.686
        * f2
        * (1.84e-11 * tr.sqrt() / pa
            + tr.powf(-2.5)
                * (0.01275 * (-2239.1 / t).exp() / (fr_o + f2 / fr_o)
                    + 0.1068 * (-3352.0 / t).exp() / (fr_n + f2 / fr_n)))
}

/// Piecewise empirical absorption, dB/m. Reference values at 20 °C, 50 %
/// RH; corrected roughly ±2 %/°C and for dry/humid air.
pub fn simple_absorption(frequency: f64, temperature_c: f64, humidity_pct: f64) -> f64 {
    if frequency <= 0.0 {
        return 0.0;
    }
    let base_np_per_m = match frequency {
        f if f < 500.0 => 0.0001 * (f / 500.0).powi(2),
        f if f < 2000.0 => 0.0001 + 0.0009 * ((f - 500.0) / 1500.0),
        f if f < 8000.0 => 0.001 + 0.009 * ((f - 2000.0) / 6000.0),
        f => 0.01 + 0.005 * ((f - 8000.0) / 8000.0),
    };
    let temp_factor = 1.0 + 0.02 * (temperature_c - 20.0).abs();
    let humidity = humidity_pct.clamp(0.0, 100.0);
    let humidity_factor = if humidity < 40.0 {
        1.0 + 0.01 * (40.0 - humidity)
    } else {
        1.0 + 0.005 * (humidity - 40.0)
    };
    // Np/m → dB/m.
    base_np_per_m * temp_factor * humidity_factor * 8.686
}

/// Screen profile for the Maekawa-family insertion loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarrierKind {
    /// Knife edge / thin wall: 10·log10(3 + 20N), capped at 20 dB.
    #[default]
    Thin,
    /// Building or wide embankment: 10·log10(3 + 40N), capped at 25 dB.
    Thick,
}

/// Barrier insertion loss in dB for a diffraction path difference `delta`
/// (meters) at `frequency`.
///
/// Fresnel number N = 2δ/λ. N below −0.1 means the receiver sees well over
/// the barrier: exactly 0 dB. Non-decreasing in δ and in frequency.
pub fn barrier_attenuation(
    delta: f64,
    frequency: f64,
    speed_of_sound: f64,
    kind: BarrierKind,
) -> f64 {
    if frequency <= 0.0 || speed_of_sound <= 0.0 {
        return 0.0;
    }
    let wavelength = speed_of_sound / frequency;
    let n = 2.0 * delta / wavelength;
    if n < -0.1 {
        return 0.0;
    }
    match kind {
        BarrierKind::Thin => (10.0 * (3.0 + 20.0 * n).log10()).clamp(0.0, 20.0),
        BarrierKind::Thick => (10.0 * (3.0 + 40.0 * n).log10()).clamp(0.0, 25.0),
    }
}

/// Legacy ISO 9613-2 Eq. 10 ground attenuation, dB, clamped to ≥ 0.
///
/// A_gr = 4.8 − (2·hm/d)·(17 + 300/d) with hm the mean propagation height.
/// The signed two-ray model is [`crate::impedance::agr_two_ray_db`];
/// callers pick by sign contract.
pub fn ground_attenuation_iso9613(distance: f64, hs: f64, hr: f64) -> f64 {
    if distance <= 0.0 {
        return 0.0;
    }
    let hm = 0.5 * (hs + hr);
    (4.8 - (2.0 * hm / distance) * (17.0 + 300.0 / distance)).max(0.0)
}

/// Ground factor G per ISO 9613-2: 0 = hard, 1 = porous.
pub fn ground_factor(ground: &GroundParams) -> f64 {
    match ground.ground_type {
        SurfaceType::Hard => 0.0,
        SurfaceType::Soft => 1.0,
        SurfaceType::Mixed => ground.mixed_factor.clamp(0.0, 1.0),
    }
}

/// Barrier geometry for the partitioned ground-effect computation:
/// plan-view distances from source to screen and screen to receiver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarrierGeometry {
    pub source_distance: f64,
    pub receiver_distance: f64,
    pub height: f64,
}

// ISO 9613-2 Table 3 coefficient functions. Each vanishes for dp → 0 and
// saturates with distance.

fn a_prime(h: f64, dp: f64) -> f64 {
    1.5 + 3.0 * (-0.12 * (h - 5.0).powi(2)).exp() * (1.0 - (-dp / 50.0).exp())
        + 5.7 * (-0.09 * h * h).exp() * (1.0 - (-2.8e-6 * dp * dp).exp())
}

fn b_prime(h: f64, dp: f64) -> f64 {
    1.5 + 8.6 * (-0.09 * h * h).exp() * (1.0 - (-dp / 50.0).exp())
}

fn c_prime(h: f64, dp: f64) -> f64 {
    1.5 + 14.0 * (-0.46 * h * h).exp() * (1.0 - (-dp / 50.0).exp())
}

fn d_prime(h: f64, dp: f64) -> f64 {
    1.5 + 5.0 * (-0.9 * h * h).exp() * (1.0 - (-dp / 50.0).exp())
}

/// Source- or receiver-region ground attenuation per ISO 9613-2 Table 3
/// for one octave band. `h` is the region's endpoint height, `dp` the
/// region's plan distance, `g` its ground factor.
fn region_attenuation(frequency: f64, h: f64, dp: f64, g: f64) -> f64 {
    match frequency {
        f if f < 100.0 => -1.5,
        f if f < 200.0 => -1.5 + g * a_prime(h, dp),
        f if f < 400.0 => -1.5 + g * b_prime(h, dp),
        f if f < 800.0 => -1.5 + g * c_prime(h, dp),
        f if f < 1600.0 => -1.5 + g * d_prime(h, dp),
        _ => -1.5 * (1.0 - g),
    }
}

/// Middle-region term: −3q at 63 Hz, −3q(1−G) above, with the visibility
/// factor q = max(0, 1 − 30(hs+hr)/d).
fn middle_attenuation(frequency: f64, hs: f64, hr: f64, distance: f64, g: f64) -> f64 {
    if distance <= 0.0 {
        return 0.0;
    }
    let q = (1.0 - 30.0 * (hs + hr) / distance).max(0.0);
    if frequency < 100.0 {
        -3.0 * q
    } else {
        -3.0 * q * (1.0 - g)
    }
}

/// Ground effect for one octave band when barrier geometry is known:
/// the source-side and receiver-side regions are evaluated separately
/// (As + Ar + Am), clamped to a minimum of −3 dB.
pub fn ground_effect_with_barrier(
    frequency: f64,
    hs: f64,
    hr: f64,
    total_distance: f64,
    barrier: &BarrierGeometry,
    ground: &GroundParams,
) -> f64 {
    let g = ground_factor(ground);
    let a_s = region_attenuation(frequency, hs, barrier.source_distance.max(0.0), g);
    let a_r = region_attenuation(frequency, hr, barrier.receiver_distance.max(0.0), g);
    let a_m = middle_attenuation(frequency, hs, hr, total_distance, g);
    (a_s + a_r + a_m).max(-3.0)
}

/// Combination rule when no barrier geometry is available: take the larger
/// of barrier and ground attenuation instead of their sum, avoiding
/// double-counting and negative net insertion loss.
pub fn combine_barrier_and_ground(a_barrier: f64, a_ground: f64) -> f64 {
    a_barrier.max(a_ground)
}
