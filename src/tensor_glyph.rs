use log::{debug, warn};
use nalgebra::SymmetricEigen;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

use crate::utils::{Mesh, Tensor, Vec3};

/// Largest glyph axis once scaling is clamped.
pub const MAX_SCALE_FACTOR: f32 = 2.0;

// keeps inverse scales finite for flat or zero tensors
const MIN_NORMAL_SCALE: f32 = 1e-6;

/// Glyphs placed at each point, plus the per-vertex color scalar when enabled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlyphMesh {
    pub mesh: Mesh,
    pub scalars: Option<Vec<f32>>,
    pub num_glyphs: usize,
}

/// Orientation and scale of one glyph.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GlyphFrame {
    /// Columns are the glyph axes (eigenvectors), largest scale first.
    pub axes: Tensor,
    pub scales: Vec3,
    /// Largest scale after scaling and clamping, used for coloring.
    pub value: f32,
}

/// Copies a template mesh to every point, oriented and scaled by the tensor there.
#[derive(Clone, Debug)]
pub struct TensorGlyph {
    scale_factor: f32,
    extract_eigenvalues: bool,
    clamp_scaling: bool,
    max_scale_factor: f32,
    color_by_eigenvalues: bool,
}

impl Default for TensorGlyph {
    fn default() -> Self {
        TensorGlyph {
            scale_factor: 1.,
            extract_eigenvalues: true,
            clamp_scaling: false,
            max_scale_factor: 100.,
            color_by_eigenvalues: true,
        }
    }
}

impl TensorGlyph {
    pub fn new() -> Self {
        Self::default()
    }

    /// When off, tensor columns are taken as the glyph axes and their lengths as scales.
    pub fn extract_eigenvalues(mut self, extract: bool) -> Self {
        self.extract_eigenvalues = extract;
        self
    }

    pub fn clamp_scaling(mut self, clamp: bool) -> Self {
        self.clamp_scaling = clamp;
        self
    }

    pub fn with_max_scale_factor(mut self, max_scale_factor: f32) -> Self {
        self.max_scale_factor = max_scale_factor;
        self
    }

    pub fn color_by_eigenvalues(mut self, color: bool) -> Self {
        self.color_by_eigenvalues = color;
        self
    }

    pub fn frame(&self, tensor: &Tensor) -> GlyphFrame {
        let (mut axes, values) = if self.extract_eigenvalues {
            principal_axes(tensor)
        } else {
            column_axes(tensor)
        };

        let mut scales = values * self.scale_factor;
        if self.clamp_scaling {
            let max_scale = scales.amax();
            if max_scale > self.max_scale_factor {
                scales *= self.max_scale_factor / max_scale;
            }
        }

        // right handed frames keep the template winding
        if axes.determinant() < 0. {
            let flipped = -axes.column(2).into_owned();
            axes.set_column(2, &flipped);
        }

        GlyphFrame {
            axes,
            scales,
            value: scales.x,
        }
    }

    pub fn generate(&self, template: &Mesh, points: &[Vec3], tensors: &[Tensor]) -> GlyphMesh {
        let per_glyph = template.num_vertices();
        let capacity = glyph_capacity(per_glyph);
        let count = points.len().min(tensors.len());
        if count > capacity {
            warn!(
                "Only {} of {} glyphs fit in a 32 bit index buffer",
                capacity, count
            );
        }
        let count = count.min(capacity);
        let (points, tensors) = (&points[..count], &tensors[..count]);

        let frames = tensors
            .par_iter()
            .map(|tensor| self.frame(tensor))
            .collect::<Vec<GlyphFrame>>();

        let instances = points
            .par_iter()
            .zip(frames.par_iter())
            .map(|(point, frame)| place(template, point, frame))
            .collect::<Vec<(Vec<Vec3>, Vec<Vec3>)>>();

        let mut output = GlyphMesh {
            num_glyphs: instances.len(),
            ..Default::default()
        };
        output.mesh.positions.reserve(per_glyph * instances.len());
        output.mesh.normals.reserve(per_glyph * instances.len());
        output
            .mesh
            .indices
            .reserve(template.indices.len() * instances.len());

        for (glyph, (positions, normals)) in instances.into_iter().enumerate() {
            debug_assert!(glyph * per_glyph <= u32::MAX as usize - per_glyph);
            let offset = (glyph * per_glyph) as u32;
            output.mesh.positions.extend(positions);
            output.mesh.normals.extend(normals);
            output
                .mesh
                .indices
                .extend(template.indices.iter().map(|i| i + offset));
        }

        if self.color_by_eigenvalues {
            output.scalars = Some(
                frames
                    .iter()
                    .take(output.num_glyphs)
                    .flat_map(|frame| std::iter::repeat(frame.value).take(per_glyph))
                    .collect(),
            );
        }

        debug!(
            "Placed {} glyphs with {} vertices each",
            output.num_glyphs, per_glyph
        );
        output
    }
}

/// Number of template copies whose vertices stay addressable by `u32` indices.
fn glyph_capacity(vertices_per_glyph: usize) -> usize {
    u32::MAX as usize / vertices_per_glyph.max(1)
}

fn place(template: &Mesh, point: &Vec3, frame: &GlyphFrame) -> (Vec<Vec3>, Vec<Vec3>) {
    let inverse_scales = frame.scales.map(|s| {
        if s.abs() < MIN_NORMAL_SCALE {
            1. / MIN_NORMAL_SCALE.copysign(s)
        } else {
            1. / s
        }
    });

    let positions = template
        .positions
        .iter()
        .map(|v| point + frame.axes * v.component_mul(&frame.scales))
        .collect();
    let normals = template
        .normals
        .iter()
        .map(|n| {
            (frame.axes * n.component_mul(&inverse_scales))
                .try_normalize(f32::EPSILON)
                .unwrap_or(*n)
        })
        .collect();
    (positions, normals)
}

/// Eigenvectors of the symmetric part of `tensor`, sorted by descending eigenvalue.
fn principal_axes(tensor: &Tensor) -> (Tensor, Vec3) {
    let symmetric = (tensor + tensor.transpose()) * 0.5;
    let eigen = SymmetricEigen::new(symmetric);

    let mut order = [0usize, 1, 2];
    order.sort_by(|a, b| eigen.eigenvalues[*b].total_cmp(&eigen.eigenvalues[*a]));

    let axes = Tensor::from_columns(&[
        eigen.eigenvectors.column(order[0]).into_owned(),
        eigen.eigenvectors.column(order[1]).into_owned(),
        eigen.eigenvectors.column(order[2]).into_owned(),
    ]);
    let values = Vec3::new(
        eigen.eigenvalues[order[0]],
        eigen.eigenvalues[order[1]],
        eigen.eigenvalues[order[2]],
    );
    (axes, values)
}

fn column_axes(tensor: &Tensor) -> (Tensor, Vec3) {
    let mut axes = Tensor::identity();
    let mut values = Vec3::zeros();
    for c in 0..3 {
        let column = tensor.column(c);
        values[c] = column.norm();
        if values[c] > 0. {
            axes.set_column(c, &(column / values[c]));
        }
    }
    (axes, values)
}
