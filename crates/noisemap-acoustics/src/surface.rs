//! Reflecting/diffracting surface and ground-parameter types shared by the
//! path tracer and the impedance model.

use serde::{Deserialize, Serialize};

use crate::geometry::{mirror_point, Point3D, Segment};

/// Acoustic character of a reflecting surface or of the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceType {
    /// Acoustically rigid (concrete, water, asphalt). Reflects in phase.
    Hard,
    /// Porous (grass, soil, snow). Reflects with a π phase inversion.
    Soft,
    /// Partially porous; blended by a mix factor.
    Mixed,
}

/// How the tracer treats a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceRole {
    /// Free-standing noise barrier: reflects, diffracts over its top and
    /// around its ends.
    Barrier,
    /// One edge of a building footprint: reflects only. Roof and corner
    /// diffraction are derived from the footprint polygon, not its edges.
    Building,
}

/// One edge of a barrier or building, as seen by the tracer.
///
/// Built once per compute batch from scene obstacles and shared read-only
/// across all point evaluations in that batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectingSurface {
    pub segment: Segment,
    /// Top elevation of the surface, meters above ground.
    pub height: f64,
    pub surface_type: SurfaceType,
    /// 0 = fully reflective, 1 = fully absorbing.
    pub absorption: f64,
    pub role: SurfaceRole,
    pub id: Option<u32>,
}

impl ReflectingSurface {
    /// Phase change a reflection off this surface imparts: 0 for hard
    /// surfaces, π for soft (pressure-release) ones. Mixed surfaces are
    /// treated as hard for phase.
    pub fn reflection_phase(&self) -> f64 {
        match self.surface_type {
            SurfaceType::Soft => std::f64::consts::PI,
            SurfaceType::Hard | SurfaceType::Mixed => 0.0,
        }
    }

    /// Mirror a 3D source across this surface's line in plan view. The
    /// image keeps the source height; accumulated absorption and phase ride
    /// along for the wall-reflection path.
    pub fn image_source(&self, source: Point3D) -> ImageSource {
        let mirrored = mirror_point(source.xy(), &self.segment);
        ImageSource {
            position: Point3D::new(mirrored.x, mirrored.y, source.z),
            absorption: self.absorption,
            phase_change: self.reflection_phase(),
            surface_id: self.id,
        }
    }
}

/// Mirrored source position for one reflecting surface (image-source
/// method). Transient: created per source per surface during tracing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSource {
    pub position: Point3D,
    pub absorption: f64,
    pub phase_change: f64,
    pub surface_id: Option<u32>,
}

/// Ground surface condition under the whole scene.
pub type GroundType = SurfaceType;

/// Ground plane parameters for the impedance model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundParams {
    #[serde(rename = "type")]
    pub ground_type: GroundType,
    /// Flow resistivity σ in Pa·s/m². Low = soft/absorptive, high = hard.
    pub flow_resistivity: f64,
    /// For mixed ground: 0 = hard, 1 = soft.
    pub mixed_factor: f64,
}

impl GroundParams {
    pub fn new(ground_type: GroundType, flow_resistivity: f64, mixed_factor: f64) -> Self {
        Self {
            ground_type,
            flow_resistivity,
            mixed_factor: mixed_factor.clamp(0.0, 1.0),
        }
    }

    // ========== Ground presets ==========
    // Flow resistivity values from outdoor-acoustics surveys (Embleton et
    // al.); order-of-magnitude figures, which is all Delany-Bazley needs.

    /// Institutional lawn / pasture grass.
    pub fn grass() -> Self {
        Self::new(SurfaceType::Soft, 200_000.0, 1.0)
    }

    /// Fresh powder snow.
    pub fn snow() -> Self {
        Self::new(SurfaceType::Soft, 25_000.0, 1.0)
    }

    /// Forest floor, pine or hemlock.
    pub fn forest_floor() -> Self {
        Self::new(SurfaceType::Soft, 50_000.0, 1.0)
    }

    /// Compacted gravel or dirt road.
    pub fn gravel() -> Self {
        Self::new(SurfaceType::Mixed, 2_000_000.0, 0.5)
    }

    /// Sealed asphalt or concrete. Treated as rigid.
    pub fn asphalt() -> Self {
        Self::new(SurfaceType::Hard, 30_000_000.0, 0.0)
    }

    /// Open water. Rigid for practical purposes.
    pub fn water() -> Self {
        Self::new(SurfaceType::Hard, 100_000_000.0, 0.0)
    }
}

impl Default for GroundParams {
    fn default() -> Self {
        Self::grass()
    }
}
