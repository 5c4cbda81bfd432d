//! Octave-band spectra, dB/pressure conversion, phasors and A/C/Z
//! frequency weighting (IEC 61672-1).

use serde::{Deserialize, Serialize};

use crate::{MIN_LEVEL_DB, P_REF};

/// Octave band center frequencies, Hz.
pub const OCTAVE_BANDS: [f64; 9] = [
    63.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Number of octave bands carried everywhere.
pub const NUM_BANDS: usize = OCTAVE_BANDS.len();

/// A-weighting offsets per octave band, dB (IEC 61672-1).
pub const A_WEIGHTING: [f64; NUM_BANDS] = [-26.2, -16.1, -8.6, -3.2, 0.0, 1.2, 1.0, -1.1, -6.6];

/// C-weighting offsets per octave band, dB (IEC 61672-1).
pub const C_WEIGHTING: [f64; NUM_BANDS] = [-0.8, -0.2, 0.0, 0.0, 0.0, -0.2, -0.8, -3.0, -8.5];

/// Frequency weighting network applied when collapsing a spectrum into a
/// single overall level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weighting {
    A,
    C,
    /// Unweighted (flat).
    Z,
}

impl Weighting {
    pub fn offset(&self, band: usize) -> f64 {
        match self {
            Weighting::A => A_WEIGHTING[band],
            Weighting::C => C_WEIGHTING[band],
            Weighting::Z => 0.0,
        }
    }
}

/// Fixed 9-band spectrum of dB levels. The band count is a structural
/// invariant: there is no way to build one with the wrong length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Spectrum9(pub [f64; NUM_BANDS]);

impl Spectrum9 {
    /// All bands at the same level.
    pub fn flat(level: f64) -> Self {
        Self([level; NUM_BANDS])
    }

    /// All bands at the silence floor.
    pub fn silent() -> Self {
        Self::flat(MIN_LEVEL_DB)
    }

    pub fn band(&self, i: usize) -> f64 {
        self.0[i]
    }

    /// Per-band energetic sum of two spectra (incoherent addition).
    pub fn energetic_add(&self, other: &Spectrum9) -> Spectrum9 {
        let mut out = [0.0; NUM_BANDS];
        for (i, slot) in out.iter_mut().enumerate() {
            let e = 10f64.powf(self.0[i] / 10.0) + 10f64.powf(other.0[i] / 10.0);
            *slot = (10.0 * e.log10()).max(MIN_LEVEL_DB);
        }
        Spectrum9(out)
    }

    /// Overall level: apply the weighting offsets and energetically sum
    /// the 9 weighted bands.
    pub fn overall_level(&self, weighting: Weighting) -> f64 {
        let energy: f64 = (0..NUM_BANDS)
            .map(|i| 10f64.powf((self.0[i] + weighting.offset(i)) / 10.0))
            .sum();
        if energy <= 0.0 {
            return MIN_LEVEL_DB;
        }
        (10.0 * energy.log10()).max(MIN_LEVEL_DB)
    }
}

impl std::ops::Index<usize> for Spectrum9 {
    type Output = f64;
    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

/// One sinusoidal component: linear sound pressure (Pa) and phase (rad).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Phasor {
    pub pressure: f64,
    pub phase: f64,
}

impl Phasor {
    pub fn silent() -> Self {
        Self {
            pressure: 0.0,
            phase: 0.0,
        }
    }
}

/// One phasor per octave band.
pub type SpectralPhasor = [Phasor; NUM_BANDS];

/// Convert a dB SPL level to linear pressure in Pa (re 20 µPa).
pub fn db_to_pressure(db: f64) -> f64 {
    P_REF * 10f64.powf(db / 20.0)
}

/// Convert linear pressure (Pa) to dB SPL, floored at [`MIN_LEVEL_DB`].
pub fn pressure_to_db(pressure: f64) -> f64 {
    if pressure <= 0.0 {
        return MIN_LEVEL_DB;
    }
    (20.0 * (pressure / P_REF).log10()).max(MIN_LEVEL_DB)
}
