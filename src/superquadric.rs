use std::f32::consts::PI;

use crate::utils::{Mesh, Vec3};

const MIN_ROUNDNESS: f32 = 0.01;
/// Upper bound for both resolutions; a multiple of 8 so rounding stays within it.
pub const MAX_RESOLUTION: u32 = 1024;

/// Parametric superquadric surface used as the glyph template.
///
/// Roundness 1 in both directions gives an ellipsoid, values towards 0 give a
/// box and values above 1 pinch the surface. Theta runs around the symmetry
/// axis (z), phi from pole to pole. Resolutions are rounded up the way most
/// toolkits do it: theta to a multiple of 8 (at least 8), phi to a multiple of
/// 4 (at least 4), both capped at [`MAX_RESOLUTION`], so the seams of every
/// octant land on a vertex row.
#[derive(Clone, Debug, PartialEq)]
pub struct SuperquadricSource {
    theta_resolution: u32,
    phi_resolution: u32,
    theta_roundness: f32,
    phi_roundness: f32,
    size: f32,
    toroidal: bool,
    thickness: f32,
}

impl Default for SuperquadricSource {
    fn default() -> Self {
        SuperquadricSource {
            theta_resolution: 16,
            phi_resolution: 16,
            theta_roundness: 1.,
            phi_roundness: 1.,
            size: 0.5,
            toroidal: false,
            thickness: 1. / 3.,
        }
    }
}

impl SuperquadricSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_theta_resolution(mut self, resolution: u32) -> Self {
        self.theta_resolution = resolution.clamp(8, MAX_RESOLUTION).div_ceil(8) * 8;
        self
    }

    pub fn with_phi_resolution(mut self, resolution: u32) -> Self {
        self.phi_resolution = resolution.clamp(4, MAX_RESOLUTION).div_ceil(4) * 4;
        self
    }

    pub fn with_theta_roundness(mut self, roundness: f32) -> Self {
        self.theta_roundness = roundness.max(MIN_ROUNDNESS);
        self
    }

    pub fn with_phi_roundness(mut self, roundness: f32) -> Self {
        self.phi_roundness = roundness.max(MIN_ROUNDNESS);
        self
    }

    pub fn toroidal(mut self, toroidal: bool) -> Self {
        self.toroidal = toroidal;
        self
    }

    pub fn theta_resolution(&self) -> u32 {
        self.theta_resolution
    }

    pub fn phi_resolution(&self) -> u32 {
        self.phi_resolution
    }

    pub fn theta_roundness(&self) -> f32 {
        self.theta_roundness
    }

    pub fn phi_roundness(&self) -> f32 {
        self.phi_roundness
    }

    pub fn generate(&self) -> Mesh {
        let (phi_start, phi_end, alpha) = if self.toroidal {
            (-PI, PI, 1. / self.thickness)
        } else {
            (-PI / 2., PI / 2., 0.)
        };
        // the torus ring radius is alpha + 1 in parameter space
        let radius = if self.toroidal {
            self.size / (alpha + 1.)
        } else {
            self.size
        };

        let theta_steps = self.theta_resolution as usize;
        let phi_steps = self.phi_resolution as usize;
        let row = theta_steps + 1;

        let mut mesh = Mesh::default();
        mesh.positions.reserve(row * (phi_steps + 1));
        mesh.normals.reserve(row * (phi_steps + 1));

        for j in 0..=phi_steps {
            let phi = phi_start + (phi_end - phi_start) * j as f32 / phi_steps as f32;
            for i in 0..=theta_steps {
                let theta = -PI + 2. * PI * i as f32 / theta_steps as f32;
                let (position, normal) = self.evaluate(theta, phi, alpha, radius);
                mesh.positions.push(position);
                mesh.normals.push(normal);
            }
        }

        debug_assert!(row * (phi_steps + 1) <= u32::MAX as usize);
        for j in 0..phi_steps {
            for i in 0..theta_steps {
                let a = (j * row + i) as u32;
                let b = a + 1;
                let c = a + 1 + row as u32;
                let d = a + row as u32;
                mesh.indices.extend_from_slice(&[a, b, c, a, c, d]);
            }
        }

        mesh
    }

    fn evaluate(&self, theta: f32, phi: f32, alpha: f32, radius: f32) -> (Vec3, Vec3) {
        let (rt, rp) = (self.theta_roundness, self.phi_roundness);

        let ring = alpha + signed_cos(phi, rp);
        let position = Vec3::new(
            ring * signed_cos(theta, rt),
            ring * signed_sin(theta, rt),
            signed_sin(phi, rp),
        ) * radius;

        // gradient of the implicit form uses the complementary exponents
        let normal_ring = signed_cos(phi, 2. - rp);
        let normal = Vec3::new(
            normal_ring * signed_cos(theta, 2. - rt),
            normal_ring * signed_sin(theta, 2. - rt),
            signed_sin(phi, 2. - rp),
        );
        let normal = match normal.try_normalize(1e-12) {
            Some(n) if n.iter().all(|c| c.is_finite()) => n,
            _ => position.try_normalize(1e-12).unwrap_or(Vec3::z()),
        };

        (position, normal)
    }
}

fn signed_cos(w: f32, exponent: f32) -> f32 {
    let c = w.cos();
    c.signum() * c.abs().powf(exponent)
}

fn signed_sin(w: f32, exponent: f32) -> f32 {
    let s = w.sin();
    s.signum() * s.abs().powf(exponent)
}
