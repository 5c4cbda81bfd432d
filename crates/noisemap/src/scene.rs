//! Scene model: sources, obstacles, and the conversion of obstacles into
//! the read-only surface batch the tracer consumes.

use serde::{Deserialize, Serialize};

use noisemap_acoustics::geometry::{Point2D, Point3D, Segment};
use noisemap_acoustics::surface::{ReflectingSurface, SurfaceRole, SurfaceType};
use noisemap_acoustics::tracer::BuildingFootprint;
use noisemap_acoustics::Spectrum9;

use crate::error::{NoisemapError, Result};

/// One point source with a per-octave-band power spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseSource {
    #[serde(default)]
    pub name: Option<String>,
    pub position: Point3D,
    /// Source power levels per octave band, dB.
    pub spectrum: Spectrum9,
    /// Broadband gain offset applied on top of the spectrum, dB.
    #[serde(default)]
    pub gain_db: f64,
}

impl NoiseSource {
    pub fn new(position: Point3D, spectrum: Spectrum9) -> Self {
        Self {
            name: None,
            position,
            spectrum,
            gain_db: 0.0,
        }
    }

    pub fn with_gain(mut self, gain_db: f64) -> Self {
        self.gain_db = gain_db;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A scene obstacle: either an open barrier polyline or a closed building
/// footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Obstacle {
    Barrier {
        /// Polyline vertices; each consecutive pair is one screen segment.
        points: Vec<Point2D>,
        height: f64,
        #[serde(default = "default_surface_type")]
        surface: SurfaceType,
        #[serde(default)]
        absorption: f64,
    },
    Building {
        /// Closed footprint polygon (not repeated at the end).
        footprint: Vec<Point2D>,
        height: f64,
        #[serde(default = "default_surface_type")]
        surface: SurfaceType,
        #[serde(default)]
        absorption: f64,
    },
}

fn default_surface_type() -> SurfaceType {
    SurfaceType::Hard
}

/// Full compute scene.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scene {
    pub sources: Vec<NoiseSource>,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

impl Scene {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Flatten the obstacles into tracer inputs. Barriers contribute one
    /// surface per polyline segment; buildings contribute their edges plus
    /// the closed footprint for roof/corner diffraction. All pieces of one
    /// obstacle share its index as id so occlusion tests can exclude the
    /// obstacle itself.
    pub fn build_surfaces(&self) -> Result<SurfaceBatch> {
        let mut surfaces = Vec::new();
        let mut buildings = Vec::new();

        for (index, obstacle) in self.obstacles.iter().enumerate() {
            let id = Some(index as u32);
            match obstacle {
                Obstacle::Barrier {
                    points,
                    height,
                    surface,
                    absorption,
                } => {
                    if points.len() < 2 {
                        return Err(NoisemapError::DegenerateObstacle {
                            index,
                            reason: format!("barrier needs ≥ 2 points, got {}", points.len()),
                        });
                    }
                    for pair in points.windows(2) {
                        surfaces.push(ReflectingSurface {
                            segment: Segment::new(pair[0], pair[1]),
                            height: *height,
                            surface_type: *surface,
                            absorption: absorption.clamp(0.0, 1.0),
                            role: SurfaceRole::Barrier,
                            id,
                        });
                    }
                }
                Obstacle::Building {
                    footprint,
                    height,
                    surface,
                    absorption,
                } => {
                    if footprint.len() < 3 {
                        return Err(NoisemapError::DegenerateObstacle {
                            index,
                            reason: format!(
                                "building footprint needs ≥ 3 vertices, got {}",
                                footprint.len()
                            ),
                        });
                    }
                    for i in 0..footprint.len() {
                        let j = (i + 1) % footprint.len();
                        surfaces.push(ReflectingSurface {
                            segment: Segment::new(footprint[i], footprint[j]),
                            height: *height,
                            surface_type: *surface,
                            absorption: absorption.clamp(0.0, 1.0),
                            role: SurfaceRole::Building,
                            id,
                        });
                    }
                    buildings.push(BuildingFootprint {
                        vertices: footprint.clone(),
                        height: *height,
                        id,
                    });
                }
            }
        }

        Ok(SurfaceBatch {
            surfaces,
            buildings,
        })
    }
}

/// Read-only tracer inputs derived from a scene, built once per batch and
/// shared across all point evaluations.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceBatch {
    pub surfaces: Vec<ReflectingSurface>,
    pub buildings: Vec<BuildingFootprint>,
}
