//! Acoustic path tracing and propagation core for outdoor noise mapping.
//!
//! This crate enumerates physically meaningful sound paths between a point
//! source and a receiver (direct, ground-reflected, first-order wall
//! reflections via the image-source method, and edge diffraction over and
//! around obstacles), converts each path's geometry into per-octave-band
//! attenuation using ISO 9613-1/-2 and Maekawa-family formulas, and combines
//! all paths coherently (phase-aware) or energetically into band levels.
//!
//! Every function in this crate is pure, synchronous and total: degenerate
//! geometry resolves to a "no interaction" result, out-of-range physical
//! inputs are clamped, and invalid paths are flagged rather than raised as
//! errors. Batches of evaluations can therefore be fanned out across threads
//! with no locking; the consuming `noisemap` crate does exactly that.

pub mod attenuation;
pub mod geometry;
pub mod impedance;
pub mod spectrum;
pub mod summation;
pub mod surface;
pub mod tracer;

pub use geometry::{Point2D, Point3D, Segment};
pub use spectrum::{Phasor, SpectralPhasor, Spectrum9, Weighting, OCTAVE_BANDS};
pub use surface::{GroundParams, GroundType, ReflectingSurface, SurfaceRole, SurfaceType};
pub use tracer::{PathKind, RayPath, TracerConfig};

/// Geometric tolerance used throughout the crate. Absorbs floating-point
/// noise at segment endpoints and near-parallel intersections.
pub const EPSILON: f64 = 1e-10;

/// Sentinel level for "no audible contribution" (blocked path, silence).
pub const MIN_LEVEL_DB: f64 = -100.0;

/// Reference sound pressure, 20 µPa.
pub const P_REF: f64 = 2e-5;

/// Speed of sound at 20 °C in dry air, m/s.
pub const DEFAULT_SPEED_OF_SOUND: f64 = 343.0;

/// Knife-edge diffraction phase shift (GTD approximation, radians).
/// Angle-independent; full UTD would derive it from the incidence and
/// diffraction angles.
pub const DIFFRACTION_PHASE: f64 = -std::f64::consts::FRAC_PI_4;

/// Speed of sound in air as a function of temperature (°C).
pub fn speed_of_sound(temperature_c: f64) -> f64 {
    331.3 * (1.0 + temperature_c / 273.15).max(0.0).sqrt()
}
