//! SPH smoothing kernels.
//!
//! All kernels have compact support: they return exactly zero once the
//! separation exceeds the support radius `h`. Kernels whose formula divides by
//! `|r|` return zero for coincident points instead of producing NaN.

use bevy::prelude::*;
use std::f32::consts::PI;

/// Below this separation the direction of `r` is undefined.
const MIN_SEPARATION: f32 = 1e-6;

/// SPH kernel functions (Müller et al. 2003).
pub struct SphKernels;

impl SphKernels {
    /// Poly6 kernel for density estimation.
    /// W(r, h) = (315 / 64πh⁹) * (h² - r²)³ for r ≤ h
    ///
    /// Takes `|r|²` so callers can skip the square root.
    #[inline]
    pub fn poly6(r_sq: f32, h: f32) -> f32 {
        let h_sq = h * h;
        if !(0.0..=h_sq).contains(&r_sq) {
            return 0.0;
        }
        let diff = h_sq - r_sq;
        315.0 / (64.0 * PI * h.powi(9)) * diff * diff * diff
    }

    /// Gradient of the Poly6 kernel, used for the surface color field.
    /// ∇W(r, h) = -(945 / 32πh⁹) * r * (h² - |r|²)²
    #[inline]
    pub fn poly6_gradient(r: Vec3, h: f32) -> Vec3 {
        let r_sq = r.length_squared();
        let h_sq = h * h;
        if r_sq > h_sq {
            return Vec3::ZERO;
        }
        let diff = h_sq - r_sq;
        -945.0 / (32.0 * PI * h.powi(9)) * diff * diff * r
    }

    /// Laplacian of the Poly6 kernel, used for the surface color field.
    /// ∇²W(r, h) = -(945 / 32πh⁹) * (h² - |r|²) * (3h² - 7|r|²)
    #[inline]
    pub fn poly6_laplacian(r: Vec3, h: f32) -> f32 {
        let r_sq = r.length_squared();
        let h_sq = h * h;
        if r_sq > h_sq {
            return 0.0;
        }
        -945.0 / (32.0 * PI * h.powi(9)) * (h_sq - r_sq) * (3.0 * h_sq - 7.0 * r_sq)
    }

    /// Spiky kernel.
    /// W(r, h) = (15 / πh⁶) * (h - |r|)³
    #[inline]
    pub fn spiky(r: Vec3, h: f32) -> f32 {
        let r_len = r.length();
        if r_len > h {
            return 0.0;
        }
        let diff = h - r_len;
        15.0 / (PI * h.powi(6)) * diff * diff * diff
    }

    /// Gradient of Spiky kernel for pressure forces.
    /// ∇W(r, h) = -(45 / πh⁶) * (h - |r|)² * (r / |r|) for r ≤ h
    ///
    /// Unlike the Poly6 gradient it does not vanish near zero, which keeps
    /// particles from clustering under pressure.
    #[inline]
    pub fn spiky_gradient(r: Vec3, h: f32) -> Vec3 {
        let r_len = r.length();
        if r_len > h || r_len < MIN_SEPARATION {
            return Vec3::ZERO;
        }
        let diff = h - r_len;
        -45.0 / (PI * h.powi(6)) * diff * diff * (r / r_len)
    }

    /// Laplacian of the Spiky kernel.
    /// ∇²W(r, h) = -(90 / πh⁶) * (1 / |r|) * (h - |r|) * (h - 2|r|)
    #[inline]
    pub fn spiky_laplacian(r: Vec3, h: f32) -> f32 {
        let r_len = r.length();
        if r_len > h || r_len < MIN_SEPARATION {
            return 0.0;
        }
        -90.0 / (PI * h.powi(6)) / r_len * (h - r_len) * (h - 2.0 * r_len)
    }

    /// Viscosity kernel.
    /// W(r, h) = (15 / 2πh³) * (-|r|³/2h³ + |r|²/h² + h/2|r| - 1)
    #[inline]
    pub fn viscosity(r: Vec3, h: f32) -> f32 {
        let r_len = r.length();
        if r_len > h || r_len < MIN_SEPARATION {
            return 0.0;
        }
        let h3 = h * h * h;
        let term = -r_len.powi(3) / (2.0 * h3) + (r_len * r_len) / (h * h) + h / (2.0 * r_len)
            - 1.0;
        15.0 / (2.0 * PI * h3) * term
    }

    /// Gradient of the viscosity kernel.
    /// ∇W(r, h) = (15 / 2πh³) * r * (-3|r|/2h³ + 2/h² - h/2|r|³)
    #[inline]
    pub fn viscosity_gradient(r: Vec3, h: f32) -> Vec3 {
        let r_len = r.length();
        if r_len > h || r_len < MIN_SEPARATION {
            return Vec3::ZERO;
        }
        let h3 = h * h * h;
        let term = -3.0 * r_len / (2.0 * h3) + 2.0 / (h * h) - h / (2.0 * r_len.powi(3));
        15.0 / (2.0 * PI * h3) * term * r
    }

    /// Laplacian of viscosity kernel.
    /// ∇²W(r, h) = (45 / πh⁶) * (h - |r|)
    #[inline]
    pub fn viscosity_laplacian(r: Vec3, h: f32) -> f32 {
        let r_len = r.length();
        if r_len > h {
            return 0.0;
        }
        45.0 / (PI * h.powi(6)) * (h - r_len)
    }
}
