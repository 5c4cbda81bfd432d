//! Stable request fingerprints for caching computed receivers.
//!
//! Per-element hashes are folded with a commutative wrapping sum, so
//! reordering either list produces the same fingerprint while duplicate
//! elements still count (a scene with two identical sources is +3 dB,
//! not the same request); any change in coordinates, spectra or
//! configuration produces a different one.

use noisemap_acoustics::geometry::Point3D;
use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

use crate::config::ComputeConfig;
use crate::scene::Scene;

const SEED: u64 = 0x6e6f_6973_656d_6170; // "noisemap"

/// Odd multiplier spreading per-element hashes before the commutative sum.
const FOLD_MULTIPLIER: u64 = 0x9e37_79b9_7f4a_7c15;

fn hash_value<T: Serialize>(value: &T) -> u64 {
    // Serialization of these plain structs cannot fail.
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    xxh64(&bytes, SEED)
}

/// Order-independent fold over a list of element hashes. Addition instead
/// of XOR so duplicate elements accumulate rather than cancel.
fn fold_unordered(hashes: impl Iterator<Item = u64>) -> u64 {
    hashes.fold(0u64, |acc, h| {
        acc.wrapping_add(h.wrapping_mul(FOLD_MULTIPLIER))
    })
}

/// Fingerprint of a full compute request.
pub fn request_hash(scene: &Scene, receiver: &Point3D, config: &ComputeConfig) -> u64 {
    let sources = fold_unordered(scene.sources.iter().map(hash_value));
    let obstacles = fold_unordered(scene.obstacles.iter().map(hash_value));

    // Mix the four components with distinct rotations so that, say, a
    // source hash cannot cancel against an identical obstacle hash.
    sources
        .rotate_left(1)
        .wrapping_add(obstacles.rotate_left(17))
        .wrapping_add(hash_value(receiver).rotate_left(33))
        .wrapping_add(hash_value(config).rotate_left(49))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NoiseSource, Obstacle};
    use noisemap_acoustics::geometry::Point2D;
    use noisemap_acoustics::spectrum::Spectrum9;
    use noisemap_acoustics::surface::SurfaceType;

    fn two_source_scene() -> Scene {
        Scene {
            sources: vec![
                NoiseSource::new(Point3D::new(0.0, 0.0, 1.0), Spectrum9::flat(80.0)),
                NoiseSource::new(Point3D::new(5.0, 2.0, 1.0), Spectrum9::flat(75.0)),
            ],
            obstacles: vec![
                Obstacle::Barrier {
                    points: vec![Point2D::new(2.0, -3.0), Point2D::new(2.0, 3.0)],
                    height: 3.0,
                    surface: SurfaceType::Hard,
                    absorption: 0.0,
                },
                Obstacle::Barrier {
                    points: vec![Point2D::new(4.0, -3.0), Point2D::new(4.0, 3.0)],
                    height: 2.0,
                    surface: SurfaceType::Hard,
                    absorption: 0.0,
                },
            ],
        }
    }

    #[test]
    fn test_hash_is_order_independent() {
        let scene = two_source_scene();
        let mut permuted = scene.clone();
        permuted.sources.reverse();
        permuted.obstacles.reverse();

        let receiver = Point3D::new(10.0, 0.0, 1.5);
        let config = ComputeConfig::default();
        assert_eq!(
            request_hash(&scene, &receiver, &config),
            request_hash(&permuted, &receiver, &config)
        );
    }

    #[test]
    fn test_hash_sensitive_to_coordinates() {
        let scene = two_source_scene();
        let mut moved = scene.clone();
        if let Obstacle::Barrier { height, .. } = &mut moved.obstacles[0] {
            *height = 3.5;
        }

        let receiver = Point3D::new(10.0, 0.0, 1.5);
        let config = ComputeConfig::default();
        assert_ne!(
            request_hash(&scene, &receiver, &config),
            request_hash(&moved, &receiver, &config)
        );
        assert_ne!(
            request_hash(&scene, &receiver, &config),
            request_hash(&scene, &Point3D::new(10.0, 0.1, 1.5), &config)
        );
    }

    #[test]
    fn test_duplicate_elements_do_not_cancel() {
        // Two identical sources are a physically different scene (+3 dB)
        // from one or none; the fold must not collapse them.
        let receiver = Point3D::new(10.0, 0.0, 1.5);
        let config = ComputeConfig::default();

        let mut doubled = two_source_scene();
        doubled.sources.push(doubled.sources[0].clone());
        assert_ne!(
            request_hash(&doubled, &receiver, &config),
            request_hash(&two_source_scene(), &receiver, &config)
        );

        let mut stripped = doubled.clone();
        stripped.sources.retain(|s| s != &doubled.sources[0]);
        assert_ne!(
            request_hash(&doubled, &receiver, &config),
            request_hash(&stripped, &receiver, &config)
        );

        let mut doubled_obstacle = two_source_scene();
        let dup = doubled_obstacle.obstacles[0].clone();
        doubled_obstacle.obstacles.push(dup);
        assert_ne!(
            request_hash(&doubled_obstacle, &receiver, &config),
            request_hash(&two_source_scene(), &receiver, &config)
        );
    }

    #[test]
    fn test_hash_sensitive_to_config() {
        let scene = two_source_scene();
        let receiver = Point3D::new(10.0, 0.0, 1.5);
        let coherent = ComputeConfig::default();
        let energetic = ComputeConfig {
            coherent_summation: false,
            ..ComputeConfig::default()
        };
        assert_ne!(
            request_hash(&scene, &receiver, &coherent),
            request_hash(&scene, &receiver, &energetic)
        );
    }
}
