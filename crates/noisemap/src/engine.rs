//! Compute engine: orchestrates tracing and summation per receiver, and
//! fans batches of receivers out across a rayon pool.
//!
//! Two entry points coexist. [`compute_receiver`] is the accurate path:
//! full path set, per-band coherent or energetic summation, weighted
//! overall levels. [`compute_simple_spl`] is the legacy scalar path: one
//! broadband level per source from spreading, air absorption and the
//! strongest screen, combined energetically.

use log::debug;
use rayon::prelude::*;

use noisemap_acoustics::attenuation::{
    atmospheric_absorption, barrier_attenuation, combine_barrier_and_ground,
    ground_attenuation_iso9613, spreading_loss, SpreadingMode,
};
use noisemap_acoustics::geometry::Point3D;
use noisemap_acoustics::spectrum::{pressure_to_db, db_to_pressure, Weighting};
use noisemap_acoustics::summation::{
    combine_sources, path_spectral_phasor, source_spectrum_at_receiver,
};
use noisemap_acoustics::tracer::{strongest_screen_delta, trace_paths};
use noisemap_acoustics::MIN_LEVEL_DB;

use crate::config::ComputeConfig;
use crate::error::{NoisemapError, Result};
use crate::results::{PathDetail, ReceiverResult};
use crate::scene::{Scene, SurfaceBatch};

/// Representative frequency for the legacy scalar API's barrier and air
/// terms.
const LEGACY_FREQUENCY: f64 = 500.0;

/// Full spectral computation at one receiver.
pub fn compute_receiver(
    scene: &Scene,
    receiver: Point3D,
    config: &ComputeConfig,
) -> Result<ReceiverResult> {
    let batch = scene.build_surfaces()?;
    compute_receiver_with_batch(scene, &batch, receiver, config)
}

/// Same as [`compute_receiver`] but reusing a prebuilt surface batch.
/// This is what the batch entry point calls per point.
pub fn compute_receiver_with_batch(
    scene: &Scene,
    batch: &SurfaceBatch,
    receiver: Point3D,
    config: &ComputeConfig,
) -> Result<ReceiverResult> {
    if scene.sources.is_empty() {
        return Err(NoisemapError::EmptySources);
    }

    let tracer_config = config.tracer_config();
    let summation_config = config.summation_config();

    let mut spectra = Vec::with_capacity(scene.sources.len());
    let mut details: Vec<PathDetail> = Vec::new();

    for (source_index, source) in scene.sources.iter().enumerate() {
        let paths = trace_paths(
            source.position,
            receiver,
            &batch.surfaces,
            &batch.buildings,
            &tracer_config,
        );
        debug!(
            "source {}: {} candidate paths ({} valid)",
            source_index,
            paths.len(),
            paths.iter().filter(|p| p.valid).count()
        );

        spectra.push(source_spectrum_at_receiver(
            &paths,
            &source.spectrum,
            source.gain_db,
            &summation_config,
        ));

        if config.include_paths {
            for path in &paths {
                let phasors =
                    path_spectral_phasor(path, &source.spectrum, source.gain_db, &summation_config);
                details.push(PathDetail {
                    source: source_index,
                    kind: path.kind,
                    polyline: path.waypoints.iter().map(|p| p.xy()).collect(),
                    waypoints: path.waypoints.clone(),
                    markers: PathDetail::markers_for(&path.kind, &path.waypoints),
                    band_levels: phasors.map(|p| pressure_to_db(p.pressure)),
                    band_phases: phasors.map(|p| p.phase),
                    total_distance: path.total_distance,
                    path_difference: path.path_difference,
                    valid: path.valid,
                });
            }
        }
    }

    let spectrum = combine_sources(&spectra);
    Ok(ReceiverResult {
        position: receiver,
        laeq: spectrum.overall_level(Weighting::A),
        lceq: spectrum.overall_level(Weighting::C),
        lzeq: spectrum.overall_level(Weighting::Z),
        spectrum,
        paths: config.include_paths.then_some(details),
    })
}

/// Spectral computation over a batch of receivers, parallelized over the
/// points. The surface batch is built once and shared read-only.
pub fn compute_batch(
    scene: &Scene,
    receivers: &[Point3D],
    config: &ComputeConfig,
) -> Result<Vec<ReceiverResult>> {
    if scene.sources.is_empty() {
        return Err(NoisemapError::EmptySources);
    }
    let batch = scene.build_surfaces()?;
    debug!(
        "batch: {} receivers × {} sources, {} surfaces",
        receivers.len(),
        scene.sources.len(),
        batch.surfaces.len()
    );
    receivers
        .par_iter()
        .map(|&receiver| compute_receiver_with_batch(scene, &batch, receiver, config))
        .collect()
}

/// Legacy broadband SPL at one receiver.
///
/// Per source: overall source level − spherical spreading − air absorption
/// at 500 Hz − max(strongest-screen insertion loss, ISO 9613-2 Eq. 10
/// ground attenuation). Sources combine energetically. Sources beyond the
/// distance limit contribute nothing; if all are out of range the sentinel
/// −100 dB comes back.
pub fn compute_simple_spl(scene: &Scene, receiver: Point3D, config: &ComputeConfig) -> Result<f64> {
    if scene.sources.is_empty() {
        return Err(NoisemapError::EmptySources);
    }
    let batch = scene.build_surfaces()?;
    let tracer_config = config.tracer_config();
    let c = config.effective_speed_of_sound();

    let alpha = atmospheric_absorption(
        config.atmospheric_absorption,
        LEGACY_FREQUENCY,
        config.temperature,
        config.humidity,
        config.pressure_kpa,
    );

    let mut energy = 0.0;
    for source in &scene.sources {
        let distance = source.position.distance_to(&receiver);
        if distance > config.max_distance {
            continue;
        }
        let paths = trace_paths(
            source.position,
            receiver,
            &batch.surfaces,
            &batch.buildings,
            &tracer_config,
        );

        let a_barrier = strongest_screen_delta(&paths)
            .map(|delta| barrier_attenuation(delta, LEGACY_FREQUENCY, c, config.barrier_kind))
            .unwrap_or(0.0);
        let a_ground = if config.ground_reflection {
            ground_attenuation_iso9613(distance, source.position.z, receiver.z)
        } else {
            0.0
        };

        let level = source.spectrum.overall_level(Weighting::Z) + source.gain_db
            - spreading_loss(distance, SpreadingMode::Spherical)
            - alpha * distance
            - combine_barrier_and_ground(a_barrier, a_ground);
        if level > MIN_LEVEL_DB {
            let p = db_to_pressure(level);
            energy += p * p;
        }
    }

    if energy <= 0.0 {
        return Ok(MIN_LEVEL_DB);
    }
    Ok(pressure_to_db(energy.sqrt()).max(MIN_LEVEL_DB))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NoiseSource, Obstacle};
    use noisemap_acoustics::attenuation::AtmosphericModel;
    use noisemap_acoustics::geometry::Point2D;
    use noisemap_acoustics::spectrum::Spectrum9;
    use noisemap_acoustics::surface::SurfaceType;

    fn free_field_config() -> ComputeConfig {
        // No atmosphere and no ground so spreading is the only term.
        ComputeConfig {
            atmospheric_absorption: AtmosphericModel::None,
            ground_reflection: false,
            ..ComputeConfig::default()
        }
    }

    fn single_source_scene(level: f64) -> Scene {
        Scene {
            sources: vec![NoiseSource::new(
                Point3D::new(0.0, 0.0, 2.0),
                Spectrum9::flat(level),
            )],
            obstacles: Vec::new(),
        }
    }

    #[test]
    fn test_empty_sources_rejected() {
        let scene = Scene::default();
        let receiver = Point3D::new(10.0, 0.0, 1.5);
        assert!(matches!(
            compute_receiver(&scene, receiver, &ComputeConfig::default()),
            Err(NoisemapError::EmptySources)
        ));
        assert!(compute_simple_spl(&scene, receiver, &ComputeConfig::default()).is_err());
    }

    #[test]
    fn test_free_field_band_level() {
        // 100 dB flat at 10 m: each band carries 100 − 20·log10(10) − 10.99
        // ≈ 69.0 dB.
        let scene = single_source_scene(100.0);
        let receiver = Point3D::new(10.0, 0.0, 2.0);
        let result = compute_receiver(&scene, receiver, &free_field_config()).expect("compute");
        for band in 0..9 {
            assert!(
                (result.spectrum.band(band) - 69.0).abs() < 0.1,
                "band {band}: {}",
                result.spectrum.band(band)
            );
        }
        // Flat spectrum: A-weighting removes more than it adds.
        assert!(result.laeq < result.lzeq);
        assert!(result.paths.is_none());
    }

    #[test]
    fn test_barrier_lowers_level() {
        let mut scene = single_source_scene(100.0);
        let receiver = Point3D::new(10.0, 0.0, 2.0);
        let config = free_field_config();
        let open = compute_receiver(&scene, receiver, &config).expect("open");

        scene.obstacles.push(Obstacle::Barrier {
            points: vec![Point2D::new(5.0, -10.0), Point2D::new(5.0, 10.0)],
            height: 6.0,
            surface: SurfaceType::Hard,
            absorption: 0.0,
        });
        let screened = compute_receiver(&scene, receiver, &config).expect("screened");
        assert!(
            screened.lzeq < open.lzeq - 5.0,
            "screened {} vs open {}",
            screened.lzeq,
            open.lzeq
        );
    }

    #[test]
    fn test_path_detail_attached_on_request() {
        let scene = single_source_scene(90.0);
        let receiver = Point3D::new(10.0, 0.0, 2.0);
        let config = ComputeConfig {
            include_paths: true,
            ..ComputeConfig::default()
        };
        let result = compute_receiver(&scene, receiver, &config).expect("compute");
        let details = result.paths.expect("paths requested");
        assert!(details.iter().any(|d| matches!(
            d.kind,
            noisemap_acoustics::tracer::PathKind::Direct
        )));
        // Plan-view polyline mirrors the waypoints.
        for d in &details {
            assert_eq!(d.polyline.len(), d.waypoints.len());
        }
    }

    #[test]
    fn test_batch_matches_single() {
        let scene = single_source_scene(95.0);
        let receivers = [
            Point3D::new(10.0, 0.0, 1.5),
            Point3D::new(20.0, 5.0, 1.5),
            Point3D::new(-7.0, 3.0, 4.0),
        ];
        let config = ComputeConfig::default();
        let batch = compute_batch(&scene, &receivers, &config).expect("batch");
        assert_eq!(batch.len(), 3);
        for (result, &receiver) in batch.iter().zip(&receivers) {
            let single = compute_receiver(&scene, receiver, &config).expect("single");
            assert_eq!(result, &single);
        }
    }

    #[test]
    fn test_simple_spl_free_field() {
        // Flat 90 dB over 9 bands → overall 90 + 10·log10(9) ≈ 99.54 dB;
        // minus spreading (31.0 dB at 10 m) ≈ 68.5 dB.
        let scene = single_source_scene(90.0);
        let receiver = Point3D::new(10.0, 0.0, 2.0);
        let spl =
            compute_simple_spl(&scene, receiver, &free_field_config()).expect("simple");
        let expected = 90.0 + 10.0 * 9f64.log10() - (20.0 + 10.0 * (4.0 * std::f64::consts::PI).log10());
        assert!((spl - expected).abs() < 0.1, "spl {spl} vs {expected}");
    }

    #[test]
    fn test_simple_spl_screen_insertion_loss() {
        let mut scene = single_source_scene(90.0);
        let receiver = Point3D::new(10.0, 0.0, 2.0);
        let config = free_field_config();
        let open = compute_simple_spl(&scene, receiver, &config).expect("open");

        scene.obstacles.push(Obstacle::Barrier {
            points: vec![Point2D::new(5.0, -10.0), Point2D::new(5.0, 10.0)],
            height: 6.0,
            surface: SurfaceType::Hard,
            absorption: 0.0,
        });
        let screened = compute_simple_spl(&scene, receiver, &config).expect("screened");
        let loss = open - screened;
        assert!(loss > 5.0 && loss <= 20.0, "insertion loss {loss}");
    }

    #[test]
    fn test_simple_spl_out_of_range_sentinel() {
        let scene = single_source_scene(120.0);
        let receiver = Point3D::new(3000.0, 0.0, 2.0);
        let spl =
            compute_simple_spl(&scene, receiver, &ComputeConfig::default()).expect("simple");
        assert_eq!(spl, MIN_LEVEL_DB);
    }
}
