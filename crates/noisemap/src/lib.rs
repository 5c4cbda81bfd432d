//! Outdoor noise propagation engine.
//!
//! Takes a scene of point sources and obstacles (barriers, buildings) plus
//! a compute configuration and produces octave-band sound pressure levels
//! at receiver points, with A/C/Z-weighted overall levels. Path tracing,
//! impedance and attenuation physics live in the `noisemap-acoustics`
//! core crate; this crate adds the scene model, configuration,
//! orchestration, request hashing for cache layers, and result types.
//!
//! ```no_run
//! use noisemap::{compute_receiver, ComputeConfig, NoiseSource, Scene};
//! use noisemap::{Point3D, Spectrum9};
//!
//! let scene = Scene {
//!     sources: vec![NoiseSource::new(
//!         Point3D::new(0.0, 0.0, 2.0),
//!         Spectrum9::flat(95.0),
//!     )],
//!     obstacles: vec![],
//! };
//! let result = compute_receiver(
//!     &scene,
//!     Point3D::new(25.0, 0.0, 1.5),
//!     &ComputeConfig::default(),
//! )
//! .unwrap();
//! println!("LAeq = {:.1} dB(A)", result.laeq);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod hash;
pub mod results;
pub mod scene;

pub use config::ComputeConfig;
pub use engine::{compute_batch, compute_receiver, compute_simple_spl};
pub use error::{NoisemapError, Result};
pub use hash::request_hash;
pub use results::{Marker, MarkerKind, PathDetail, ReceiverResult};
pub use scene::{NoiseSource, Obstacle, Scene, SurfaceBatch};

// Re-export the core vocabulary types callers need to build scenes and
// read results without naming the acoustics crate.
pub use noisemap_acoustics::attenuation::{AtmosphericModel, BarrierKind};
pub use noisemap_acoustics::geometry::{Point2D, Point3D};
pub use noisemap_acoustics::spectrum::{Spectrum9, Weighting, OCTAVE_BANDS};
pub use noisemap_acoustics::surface::{GroundParams, GroundType, SurfaceType};
pub use noisemap_acoustics::tracer::{PathKind, SideDiffractionMode};
