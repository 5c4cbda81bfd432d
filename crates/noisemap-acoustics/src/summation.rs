//! Spectral phasor summation: per-band path levels and phases, coherent
//! (interference-aware) or energetic combination across paths, energetic
//! combination across sources.
//!
//! Coherent summation adds complex phasors and can cancel or reinforce;
//! energetic summation adds pressure² and never produces destructive
//! interference. Different sources are uncorrelated, so cross-source
//! summation is always energetic.

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::attenuation::{
    atmospheric_absorption, barrier_attenuation, spreading_loss, AtmosphericModel, BarrierKind,
    SpreadingMode,
};
use crate::impedance::reflection_coeff;
use crate::spectrum::{
    db_to_pressure, pressure_to_db, Phasor, SpectralPhasor, Spectrum9, NUM_BANDS, OCTAVE_BANDS,
};
use crate::surface::GroundParams;
use crate::tracer::{PathKind, RayPath};
use crate::{MIN_LEVEL_DB, P_REF};

/// Absorption-factor floor before 20·log10; a fully absorbing surface
/// contributes −100 dB, not −∞.
const MIN_ABSORPTION_FACTOR: f64 = 1e-5;

/// Physical environment for converting traced paths into band phasors.
#[derive(Debug, Clone, PartialEq)]
pub struct SummationConfig {
    pub coherent: bool,
    pub speed_of_sound: f64,
    pub atmospheric: AtmosphericModel,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_kpa: f64,
    pub ground: GroundParams,
    pub barrier_kind: BarrierKind,
}

impl Default for SummationConfig {
    fn default() -> Self {
        Self {
            coherent: true,
            speed_of_sound: crate::DEFAULT_SPEED_OF_SOUND,
            atmospheric: AtmosphericModel::Iso9613,
            temperature_c: 20.0,
            humidity_pct: 50.0,
            pressure_kpa: 101.325,
            ground: GroundParams::default(),
            barrier_kind: BarrierKind::Thin,
        }
    }
}

/// Band level and phase of one path: the path's receiver-side phasor.
///
/// level = L_source − spreading − atmospheric·length
///         + 20·log10(absorption) − diffraction loss,
/// phase = −k·length + reflection/diffraction phase.
/// Ground-reflected paths additionally take the complex reflection
/// coefficient of the ground (magnitude into level, argument into phase).
pub fn path_phasor(
    path: &RayPath,
    band: usize,
    source_level_db: f64,
    config: &SummationConfig,
) -> Phasor {
    if !path.valid {
        return Phasor::silent();
    }
    let frequency = OCTAVE_BANDS[band];
    let c = config.speed_of_sound;

    let mut level = source_level_db
        - spreading_loss(path.total_distance, SpreadingMode::Spherical)
        - atmospheric_absorption(
            config.atmospheric,
            frequency,
            config.temperature_c,
            config.humidity_pct,
            config.pressure_kpa,
        ) * path.total_distance
        + 20.0 * path.absorption_factor.max(MIN_ABSORPTION_FACTOR).log10();

    let mut phase = -(2.0 * PI * frequency / c) * path.total_distance + path.phase_change;

    if path.kind.is_diffraction() {
        level -= barrier_attenuation(path.path_difference, frequency, c, config.barrier_kind);
    }

    if let PathKind::Ground { .. } = path.kind {
        let hs = path.waypoints.first().map_or(0.0, |p| p.z);
        let hr = path.waypoints.last().map_or(0.0, |p| p.z);
        let cos_theta = if path.total_distance > 0.0 {
            (hs + hr) / path.total_distance
        } else {
            1.0
        };
        let gamma = reflection_coeff(frequency, cos_theta, &config.ground, path.total_distance, c);
        level += 20.0 * gamma.norm().max(MIN_ABSORPTION_FACTOR).log10();
        phase += gamma.arg();
    }

    if level <= MIN_LEVEL_DB {
        return Phasor::silent();
    }
    Phasor {
        pressure: db_to_pressure(level),
        phase,
    }
}

/// Per-path phasors for all 9 bands, mainly for visualization output.
pub fn path_spectral_phasor(
    path: &RayPath,
    source_spectrum: &Spectrum9,
    gain_db: f64,
    config: &SummationConfig,
) -> SpectralPhasor {
    std::array::from_fn(|band| {
        path_phasor(path, band, source_spectrum.band(band) + gain_db, config)
    })
}

/// Coherent phasor sum: |Σ pᵢ·e^{jφᵢ}| in dB.
pub fn coherent_sum(phasors: &[Phasor]) -> f64 {
    let total: Complex64 = phasors
        .iter()
        .map(|p| Complex64::from_polar(p.pressure, p.phase))
        .sum();
    pressure_to_db(total.norm())
}

/// Energetic (incoherent) sum: 10·log10(Σ pᵢ²/P_ref²). Always additive.
pub fn energetic_sum(phasors: &[Phasor]) -> f64 {
    let energy: f64 = phasors.iter().map(|p| p.pressure * p.pressure).sum();
    if energy <= 0.0 {
        return MIN_LEVEL_DB;
    }
    (10.0 * (energy / (P_REF * P_REF)).log10()).max(MIN_LEVEL_DB)
}

/// Band spectrum one source produces at the receiver through the given
/// paths. Paths of one source interfere, so they sum coherently when the
/// config says so; otherwise energetically.
pub fn source_spectrum_at_receiver(
    paths: &[RayPath],
    source_spectrum: &Spectrum9,
    gain_db: f64,
    config: &SummationConfig,
) -> Spectrum9 {
    let mut bands = [MIN_LEVEL_DB; NUM_BANDS];
    let mut phasors = Vec::with_capacity(paths.len());
    for (band, slot) in bands.iter_mut().enumerate() {
        phasors.clear();
        for path in paths {
            let p = path_phasor(path, band, source_spectrum.band(band) + gain_db, config);
            if p.pressure > 0.0 {
                phasors.push(p);
            }
        }
        if phasors.is_empty() {
            continue;
        }
        *slot = if config.coherent {
            coherent_sum(&phasors)
        } else {
            energetic_sum(&phasors)
        }
        .max(MIN_LEVEL_DB);
    }
    Spectrum9(bands)
}

/// Combine per-source receiver spectra. Independent sources are
/// uncorrelated: always energetic, band by band.
pub fn combine_sources(spectra: &[Spectrum9]) -> Spectrum9 {
    let mut bands = [MIN_LEVEL_DB; NUM_BANDS];
    for (band, slot) in bands.iter_mut().enumerate() {
        let energy: f64 = spectra
            .iter()
            .map(|s| 10f64.powf(s.band(band) / 10.0))
            .sum();
        if energy > 0.0 {
            *slot = (10.0 * energy.log10()).max(MIN_LEVEL_DB);
        }
    }
    Spectrum9(bands)
}
