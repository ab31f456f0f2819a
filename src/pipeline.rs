use log::{debug, info, warn};

use crate::actor::{Actor, Mapper};
use crate::cli::Config;
use crate::cut_plane::{CutDataset, Cutter, Plane};
use crate::mask_points::MaskPoints;
use crate::superquadric::SuperquadricSource;
use crate::tensor_glyph::{TensorGlyph, MAX_SCALE_FACTOR};
use crate::volume::VolumeDataset;

/// Slices the volume with the configured plane. Cut scalars are not
/// generated since glyph color comes from the eigenvalues.
pub fn cut_volume(volume: &VolumeDataset, config: &Config) -> CutDataset {
    let plane = Plane::new(config.plane_origin, config.plane_normal);
    let cut = Cutter::new(plane).generate_cut_scalars(false).cut(volume);
    if cut.is_empty() {
        warn!(
            "Cutting plane through {:?} with normal {:?} misses the volume",
            config.plane_origin.as_slice(),
            plane.normal.as_slice()
        );
    } else {
        let bounds = cut.bounds();
        info!(
            "Cutting plane hit {} points spanning {:?} to {:?}",
            cut.len(),
            bounds.min.as_slice(),
            bounds.max.as_slice()
        );
    }
    cut
}

/// Sampler, glyph template, glyph placement and mapper of the glyph stage.
#[derive(Clone, Debug)]
pub struct SuperquadricGlyphs {
    pub mask: MaskPoints,
    pub source: SuperquadricSource,
    pub glyph: TensorGlyph,
    pub mapper: Mapper,
}

impl SuperquadricGlyphs {
    pub fn from_config(config: &Config) -> Self {
        let mask = MaskPoints::new(config.max_points)
            .with_mode(config.sampling)
            .with_seed(config.seed);
        let source = SuperquadricSource::new()
            .with_theta_resolution(config.theta_resolution)
            .with_phi_resolution(config.phi_resolution)
            .with_theta_roundness(config.theta_roundness)
            .with_phi_roundness(config.phi_roundness)
            .toroidal(false);
        let glyph = TensorGlyph::new()
            .extract_eigenvalues(true)
            .clamp_scaling(true)
            .with_max_scale_factor(MAX_SCALE_FACTOR)
            .color_by_eigenvalues(true);
        SuperquadricGlyphs {
            mask,
            source,
            glyph,
            mapper: Mapper::default(),
        }
    }

    pub fn build(&self, cut: &CutDataset) -> Actor {
        let finite = finite_points(cut);
        let sampled = finite.select(&self.mask.sample(&finite.points));
        let template = self.source.generate();
        debug!(
            "Superquadric template has {} vertices and {} triangles",
            template.num_vertices(),
            template.num_triangles()
        );
        let glyphs = self
            .glyph
            .generate(&template, &sampled.points, &sampled.tensors);
        let actor = self.mapper.map(&glyphs);
        info!(
            "Built {} glyphs from {} plane points ({} vertices, eigenvalue range {:?})",
            glyphs.num_glyphs,
            cut.len(),
            actor.vertices.len(),
            actor.scalar_range
        );
        actor
    }
}

/// Plane points whose position and tensor are both finite.
fn finite_points(cut: &CutDataset) -> CutDataset {
    let ids = (0..cut.len())
        .filter(|&id| {
            cut.points[id].iter().all(|c| c.is_finite())
                && cut.tensors[id].iter().all(|c| c.is_finite())
        })
        .collect::<Vec<usize>>();
    if ids.len() < cut.len() {
        warn!(
            "Skipping {} plane points with non-finite tensors",
            cut.len() - ids.len()
        );
    }
    cut.select(&ids)
}

/// Read volume to drawable actor: cut, sample, glyph, map.
pub fn build_glyph_actor(volume: &VolumeDataset, config: &Config) -> Actor {
    let cut = cut_volume(volume, config);
    SuperquadricGlyphs::from_config(config).build(&cut)
}
