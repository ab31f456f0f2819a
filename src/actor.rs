use glium::implement_vertex;

use crate::tensor_glyph::GlyphMesh;
use crate::utils::Bounds;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

implement_vertex!(Vertex, position, normal, color);

/// Maps scalars to colors along a hue ramp, blue at the low end and red at the high end.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LookupTable {
    pub hue_range: (f32, f32),
    pub saturation: f32,
    pub value: f32,
}

impl Default for LookupTable {
    fn default() -> Self {
        LookupTable {
            hue_range: (0.6667, 0.),
            saturation: 1.,
            value: 1.,
        }
    }
}

impl LookupTable {
    pub fn map(&self, scalar: f32, range: (f32, f32)) -> [f32; 3] {
        let (lo, hi) = range;
        let t = if hi > lo {
            ((scalar - lo) / (hi - lo)).clamp(0., 1.)
        } else {
            0.
        };
        let hue = self.hue_range.0 + (self.hue_range.1 - self.hue_range.0) * t;
        hsv_to_rgb(hue, self.saturation, self.value)
    }
}

fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [f32; 3] {
    let h = (hue.rem_euclid(1.)) * 6.;
    let sector = h.floor();
    let f = h - sector;
    let p = value * (1. - saturation);
    let q = value * (1. - saturation * f);
    let t = value * (1. - saturation * (1. - f));
    match sector as u32 {
        0 => [value, t, p],
        1 => [q, value, p],
        2 => [p, value, t],
        3 => [p, q, value],
        4 => [t, p, value],
        _ => [value, p, q],
    }
}

/// Turns glyph geometry into drawable vertices.
#[derive(Clone, Debug)]
pub struct Mapper {
    pub lookup_table: LookupTable,
    /// Fixed scalar range; the data range is used when unset.
    pub scalar_range: Option<(f32, f32)>,
    pub scalar_visibility: bool,
    /// Used when scalars are hidden or absent.
    pub solid_color: [f32; 3],
}

impl Default for Mapper {
    fn default() -> Self {
        Mapper {
            lookup_table: LookupTable::default(),
            scalar_range: None,
            scalar_visibility: true,
            solid_color: [1., 1., 1.],
        }
    }
}

impl Mapper {
    pub fn map(&self, glyphs: &GlyphMesh) -> Actor {
        let scalars = glyphs
            .scalars
            .as_deref()
            .filter(|_| self.scalar_visibility);
        let range = self
            .scalar_range
            .or_else(|| scalars.and_then(scalar_range))
            .unwrap_or((0., 1.));

        let mesh = &glyphs.mesh;
        let vertices = mesh
            .positions
            .iter()
            .zip(&mesh.normals)
            .enumerate()
            .map(|(i, (position, normal))| Vertex {
                position: [position.x, position.y, position.z],
                normal: [normal.x, normal.y, normal.z],
                color: match scalars {
                    Some(scalars) => self.lookup_table.map(scalars[i], range),
                    None => self.solid_color,
                },
            })
            .collect();

        Actor {
            vertices,
            indices: mesh.indices.clone(),
            bounds: Bounds::from_points(&mesh.positions),
            scalar_range: range,
        }
    }
}

fn scalar_range(scalars: &[f32]) -> Option<(f32, f32)> {
    scalars
        .iter()
        .filter(|s| s.is_finite())
        .fold(None, |range, s| match range {
            None => Some((*s, *s)),
            Some((lo, hi)) => Some((lo.min(*s), hi.max(*s))),
        })
}

/// Drawable object handed to the render window.
#[derive(Clone, Debug)]
pub struct Actor {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub bounds: Bounds,
    pub scalar_range: (f32, f32),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{Mesh, Vec3};

    fn glyphs(scalars: Option<Vec<f32>>) -> GlyphMesh {
        GlyphMesh {
            mesh: Mesh {
                positions: vec![
                    Vec3::new(0., 0., 0.),
                    Vec3::new(1., 0., 0.),
                    Vec3::new(0., 2., 0.),
                ],
                normals: vec![Vec3::z(); 3],
                indices: vec![0, 1, 2],
            },
            scalars,
            num_glyphs: 1,
        }
    }

    #[test]
    fn lookup_table_runs_blue_to_red() {
        let table = LookupTable::default();
        let low = table.map(0., (0., 1.));
        let high = table.map(1., (0., 1.));
        assert!(low[2] > 0.99 && low[0] < 0.01);
        assert_eq!(high, [1., 0., 0.]);
        // out of range values saturate
        assert_eq!(table.map(5., (0., 1.)), high);
    }

    #[test]
    fn data_range_used_by_default() {
        let actor = Mapper::default().map(&glyphs(Some(vec![2., 4., 6.])));
        assert_eq!(actor.scalar_range, (2., 6.));
        assert_eq!(actor.vertices[2].color, [1., 0., 0.]);
        assert_eq!(actor.indices, vec![0, 1, 2]);
        assert_eq!(actor.bounds.max, Vec3::new(1., 2., 0.));
    }

    #[test]
    fn fixed_range_overrides_data() {
        let mapper = Mapper {
            scalar_range: Some((0., 12.)),
            ..Default::default()
        };
        let actor = mapper.map(&glyphs(Some(vec![2., 4., 6.])));
        assert_eq!(actor.scalar_range, (0., 12.));
        assert_ne!(actor.vertices[2].color, [1., 0., 0.]);
    }

    #[test]
    fn hidden_scalars_use_solid_color() {
        let mapper = Mapper {
            scalar_visibility: false,
            solid_color: [0.5, 0.5, 0.5],
            ..Default::default()
        };
        let actor = mapper.map(&glyphs(Some(vec![2., 4., 6.])));
        assert!(actor.vertices.iter().all(|v| v.color == [0.5, 0.5, 0.5]));

        let actor = Mapper::default().map(&glyphs(None));
        assert!(actor.vertices.iter().all(|v| v.color == [1., 1., 1.]));
    }
}
