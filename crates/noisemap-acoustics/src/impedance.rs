//! Ground impedance and reflection coefficients.
//!
//! Normalized surface impedance follows the empirical Delany-Bazley model
//! with the Miki (1990) extension above its high-frequency validity limit.
//! Plane-wave reflection coefficients get a Sommerfeld spherical-wave
//! correction through the asymptotic boundary-loss function. All formulas
//! clamp out-of-domain inputs rather than reject them; none can produce
//! NaN or infinity.

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::surface::{GroundParams, SurfaceType};
use crate::EPSILON;

/// Grazing-angle floor for cos θ. Below this the plane-wave formula has a
/// singularity; physically the spherical-wave correction takes over.
const MIN_COS_THETA: f64 = 0.05;

/// Cap on |Γ|. A passive surface cannot amplify.
const MAX_REFLECTION_MAGNITUDE: f64 = 0.98;

/// ε-guarded complex division. A near-zero denominator yields zero rather
/// than an infinity that would poison downstream sums.
pub fn guarded_div(a: Complex64, b: Complex64) -> Complex64 {
    if b.norm_sqr() < EPSILON {
        return Complex64::new(0.0, 0.0);
    }
    a / b
}

/// Principal-branch complex square root (non-negative real part).
///
/// Wrapped as a named operation so the chosen branch is pinned down and
/// testable independently of the num-complex implementation.
pub fn principal_sqrt(z: Complex64) -> Complex64 {
    let r = z.sqrt();
    if r.re < 0.0 {
        -r
    } else {
        r
    }
}

/// Normalized surface impedance ζ(f, σ) for a porous ground.
///
/// Delany-Bazley: ζ = 1 + 9.08·r^−0.75 − j·11.9·r^−0.73 with r = f/σ,
/// valid for 0.01 < r < 1.0. Outside that band:
/// - r < 0.01: the surface is effectively rigid; a very high real
///   impedance is returned (Γ → 1 as ζ → ∞).
/// - r > 1.0: switch to the Miki (1990) extension
///   ζ = 1 + 5.50·r^−0.632 − j·8.43·r^−0.632, valid up to r ≈ 10.
pub fn normalized_impedance(frequency: f64, flow_resistivity: f64) -> Complex64 {
    if flow_resistivity < EPSILON || frequency <= 0.0 {
        return Complex64::new(100.0, 0.0);
    }
    let r = frequency / flow_resistivity;
    if r < 0.01 {
        return Complex64::new(100.0, 0.0);
    }
    if r > 1.0 {
        let m = r.powf(-0.632);
        return Complex64::new(1.0 + 5.50 * m, -8.43 * m);
    }
    Complex64::new(1.0 + 9.08 * r.powf(-0.75), -11.9 * r.powf(-0.73))
}

/// Reflection coefficient Γ of the ground for a wave hitting it at
/// grazing angle θ (cos θ = (hs+hr)/r2 for a two-ray geometry).
///
/// Hard ground is a perfect mirror: Γ = 1+0j. For soft and mixed ground the
/// plane-wave coefficient Γ = (ζ·cosθ − 1)/(ζ·cosθ + 1) is corrected for
/// spherical-wave incidence via the asymptotic boundary-loss function
/// F(w) ≈ −1/(2w²) + 3/(4w⁴), applied when the numerical distance
/// w = √(j·k·r2/2)·(cosθ + 1/ζ) has magnitude ≥ 4:
/// Γ' = Γ + (1−Γ)·F(w). |Γ| is capped at 0.98.
///
/// # Arguments
/// * `frequency` - Hz
/// * `cos_theta` - cosine of the grazing angle, clamped to ≥ 0.05
/// * `ground` - ground type, flow resistivity and mix factor
/// * `r2` - reflected path length, meters
/// * `speed_of_sound` - m/s
pub fn reflection_coeff(
    frequency: f64,
    cos_theta: f64,
    ground: &GroundParams,
    r2: f64,
    speed_of_sound: f64,
) -> Complex64 {
    if ground.ground_type == SurfaceType::Hard {
        return Complex64::new(1.0, 0.0);
    }

    let cos_theta = cos_theta.max(MIN_COS_THETA);

    // Mixed ground stiffens toward hard as the mix factor drops.
    let sigma = match ground.ground_type {
        SurfaceType::Soft => ground.flow_resistivity,
        SurfaceType::Mixed => {
            ground.flow_resistivity * (1.0 + 9.0 * (1.0 - ground.mixed_factor.clamp(0.0, 1.0)))
        }
        SurfaceType::Hard => unreachable!(),
    };

    let zeta = normalized_impedance(frequency, sigma);
    let zc = zeta * cos_theta;
    let one = Complex64::new(1.0, 0.0);
    let mut gamma = guarded_div(zc - one, zc + one);

    // Sommerfeld spherical-wave correction in the far-field asymptotic
    // regime of the numerical distance.
    if r2 > 0.0 && speed_of_sound > 0.0 && frequency > 0.0 {
        let k = 2.0 * PI * frequency / speed_of_sound;
        let w = principal_sqrt(Complex64::new(0.0, k * r2 / 2.0))
            * (Complex64::new(cos_theta, 0.0) + guarded_div(one, zeta));
        if w.norm() >= 4.0 {
            let w2 = w * w;
            let f_w = guarded_div(-one, 2.0 * w2) + guarded_div(Complex64::new(3.0, 0.0), 4.0 * w2 * w2);
            gamma += (one - gamma) * f_w;
        }
    }

    let mag = gamma.norm();
    if mag > MAX_REFLECTION_MAGNITUDE {
        gamma *= MAX_REFLECTION_MAGNITUDE / mag;
    }
    gamma
}

/// Two-ray ground-effect level in dB for a source at height `hs` and a
/// receiver at height `hr`, `d` meters apart horizontally.
///
/// Computes the direct path r1, the ground-reflected path r2, the grazing
/// angle, the reflection coefficient, and returns the interference level
/// −20·log10|1 + Γ·(r1/r2)·e^{−jk(r2−r1)}|.
///
/// The result is signed: negative means constructive interference boosted
/// the level, positive means destructive interference cut it. Both are
/// physically valid; do not clamp. (The legacy ISO 9613-2 Eq. 10 term in
/// [`crate::attenuation::ground_attenuation_iso9613`] clamps to ≥ 0 for
/// callers that require a pure attenuation; the two coexist deliberately.)
pub fn agr_two_ray_db(
    frequency: f64,
    d: f64,
    hs: f64,
    hr: f64,
    ground: &GroundParams,
    speed_of_sound: f64,
) -> f64 {
    if d <= 0.0 || frequency <= 0.0 || speed_of_sound <= 0.0 {
        return 0.0;
    }
    let dh = hs - hr;
    let sh = hs + hr;
    let r1 = (d * d + dh * dh).sqrt();
    let r2 = (d * d + sh * sh).sqrt();
    if r1 <= 0.0 || r2 <= 0.0 {
        return 0.0;
    }

    let cos_theta = sh / r2;
    let gamma = reflection_coeff(frequency, cos_theta, ground, r2, speed_of_sound);

    let k = 2.0 * PI * frequency / speed_of_sound;
    let phase = Complex64::new(0.0, -k * (r2 - r1)).exp();
    let total = Complex64::new(1.0, 0.0) + gamma * (r1 / r2) * phase;

    // Floor before log10: total cancellation maps to a large positive
    // attenuation, not infinity.
    -20.0 * total.norm().max(1e-5).log10()
}
