use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;
use vtkio::model::{Attribute, DataArray, DataSet, ElementType, Piece};
use vtkio::Vtk;

use crate::utils::{Bounds, Tensor, Vec3};

#[derive(Error, Debug)]
pub enum VolumeError {
    #[error("failed to read {}: {message}", .path.display())]
    Import { path: PathBuf, message: String },
    #[error("{} does not hold structured points", .0.display())]
    UnsupportedDataSet(PathBuf),
    #[error("{} references external piece data", .0.display())]
    ExternalPiece(PathBuf),
    #[error("volume has no point tensors")]
    MissingTensors,
    #[error("tensor array holds {found} values, expected {expected} for a {dims:?} grid")]
    TensorCount {
        dims: [usize; 3],
        expected: usize,
        found: usize,
    },
    #[error("tensor array has a non numeric element type")]
    TensorType,
}

/// Tensor field sampled on a regular grid. Points are ordered x fastest, then y, then z.
#[derive(Clone, Debug)]
pub struct VolumeDataset {
    dims: [usize; 3],
    origin: Vec3,
    spacing: Vec3,
    tensors: Vec<Tensor>,
}

impl VolumeDataset {
    pub fn new(
        dims: [usize; 3],
        origin: Vec3,
        spacing: Vec3,
        tensors: Vec<Tensor>,
    ) -> Result<Self, VolumeError> {
        let expected = dims.iter().product::<usize>();
        if tensors.len() != expected {
            return Err(VolumeError::TensorCount {
                dims,
                expected: expected * 9,
                found: tensors.len() * 9,
            });
        }
        Ok(VolumeDataset {
            dims,
            origin,
            spacing,
            tensors,
        })
    }

    /// Builds a volume from a flat, row major list of 3x3 tensor components.
    pub fn from_components(
        dims: [usize; 3],
        origin: Vec3,
        spacing: Vec3,
        components: &[f32],
    ) -> Result<Self, VolumeError> {
        let expected = dims.iter().product::<usize>() * 9;
        if components.len() != expected {
            return Err(VolumeError::TensorCount {
                dims,
                expected,
                found: components.len(),
            });
        }
        let tensors = components
            .chunks_exact(9)
            .map(Tensor::from_row_slice)
            .collect::<Vec<Tensor>>();
        Self::new(dims, origin, spacing, tensors)
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn num_points(&self) -> usize {
        self.tensors.len()
    }

    pub fn point_id(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.dims[0] * (j + self.dims[1] * k)
    }

    pub fn point(&self, i: usize, j: usize, k: usize) -> Vec3 {
        self.origin
            + Vec3::new(
                i as f32 * self.spacing.x,
                j as f32 * self.spacing.y,
                k as f32 * self.spacing.z,
            )
    }

    pub fn tensor(&self, id: usize) -> &Tensor {
        &self.tensors[id]
    }

    pub fn bounds(&self) -> Bounds {
        if self.tensors.is_empty() {
            return Bounds::empty();
        }
        let [nx, ny, nz] = self.dims;
        Bounds::from_points(&[self.point(0, 0, 0), self.point(nx - 1, ny - 1, nz - 1)])
    }
}

/// Reads a legacy or XML VTK file holding structured points with a point tensor array.
pub fn read_structured_points(path: &Path) -> Result<VolumeDataset, VolumeError> {
    let vtk = Vtk::import(path).map_err(|e| VolumeError::Import {
        path: path.to_path_buf(),
        message: format!("{:?}", e),
    })?;

    let (extent, origin, spacing, pieces) = match vtk.data {
        DataSet::ImageData {
            extent,
            origin,
            spacing,
            pieces,
            ..
        } => (extent, origin, spacing, pieces),
        _ => return Err(VolumeError::UnsupportedDataSet(path.to_path_buf())),
    };

    let dims = extent.into_dims().map(|d| d as usize);

    let piece = match pieces.into_iter().next() {
        Some(Piece::Inline(piece)) => piece,
        Some(_) => return Err(VolumeError::ExternalPiece(path.to_path_buf())),
        None => return Err(VolumeError::MissingTensors),
    };

    let tensors = piece
        .data
        .point
        .into_iter()
        .find_map(|attribute| match attribute {
            Attribute::DataArray(array @ DataArray {
                elem: ElementType::Tensors,
                ..
            }) => Some(array),
            _ => None,
        })
        .ok_or(VolumeError::MissingTensors)?;

    let components = tensors
        .data
        .cast_into::<f32>()
        .ok_or(VolumeError::TensorType)?;

    let volume = VolumeDataset::from_components(
        dims,
        Vec3::from(origin),
        Vec3::from(spacing),
        &components,
    )?;

    let bounds = volume.bounds();
    info!(
        "Read volume {:?} with dimensions {:?} spanning {:?} to {:?}, tensor array '{}'",
        path,
        dims,
        bounds.min.as_slice(),
        bounds.max.as_slice(),
        tensors.name
    );

    Ok(volume)
}
