use std::collections::HashSet;

use log::debug;

use crate::utils::{Bounds, Tensor, Vec3};
use crate::volume::VolumeDataset;

/// Implicit plane `n . (x - origin) = 0`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane {
    pub origin: Vec3,
    pub normal: Vec3,
}

impl Plane {
    pub fn new(origin: Vec3, normal: Vec3) -> Self {
        Plane {
            origin,
            normal: normal.normalize(),
        }
    }

    /// Signed distance from the plane.
    pub fn evaluate(&self, point: &Vec3) -> f32 {
        self.normal.dot(&(point - self.origin))
    }
}

/// Points where the plane crosses the volume, with their interpolated tensors.
#[derive(Clone, Debug, Default)]
pub struct CutDataset {
    pub points: Vec<Vec3>,
    pub tensors: Vec<Tensor>,
    /// Plane function value per point, only filled when requested from the cutter.
    pub cut_scalars: Option<Vec<f32>>,
}

impl CutDataset {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(&self.points)
    }

    /// Keeps the given point ids, in the given order.
    pub fn select(&self, ids: &[usize]) -> CutDataset {
        CutDataset {
            points: ids.iter().map(|id| self.points[*id]).collect(),
            tensors: ids.iter().map(|id| self.tensors[*id]).collect(),
            cut_scalars: self
                .cut_scalars
                .as_ref()
                .map(|scalars| ids.iter().map(|id| scalars[*id]).collect()),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum CutKey {
    Node(usize),
    Edge(usize, usize),
}

/// Slices a structured volume with a plane. Output points are emitted cell by
/// cell, each crossing at most once, so a given volume and plane always give
/// the same ordering.
pub struct Cutter {
    plane: Plane,
    generate_cut_scalars: bool,
}

impl Cutter {
    pub fn new(plane: Plane) -> Self {
        Cutter {
            plane,
            generate_cut_scalars: false,
        }
    }

    pub fn generate_cut_scalars(mut self, generate: bool) -> Self {
        self.generate_cut_scalars = generate;
        self
    }

    pub fn cut(&self, volume: &VolumeDataset) -> CutDataset {
        let [nx, ny, nz] = volume.dims();
        if volume.num_points() == 0 {
            return CutDataset::default();
        }

        let mut values = Vec::with_capacity(volume.num_points());
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    values.push(self.plane.evaluate(&volume.point(i, j, k)));
                }
            }
        }

        let edges = cell_edges(volume.dims());
        // a flat axis still has one layer of cells
        let cells = [
            nx.saturating_sub(1).max(1),
            ny.saturating_sub(1).max(1),
            nz.saturating_sub(1).max(1),
        ];

        let mut output = CutDataset::default();
        let mut emitted = HashSet::<CutKey>::new();

        for ck in 0..cells[2] {
            for cj in 0..cells[1] {
                for ci in 0..cells[0] {
                    for (a, b) in &edges {
                        let na = volume.point_id(ci + a[0], cj + a[1], ck + a[2]);
                        let nb = volume.point_id(ci + b[0], cj + b[1], ck + b[2]);
                        let (fa, fb) = (values[na], values[nb]);

                        if fa == 0. {
                            self.emit(&mut output, &mut emitted, CutKey::Node(na), || {
                                (volume_point(volume, na), *volume.tensor(na))
                            });
                        }
                        if fb == 0. {
                            self.emit(&mut output, &mut emitted, CutKey::Node(nb), || {
                                (volume_point(volume, nb), *volume.tensor(nb))
                            });
                        }
                        if fa != 0. && fb != 0. && (fa < 0.) != (fb < 0.) {
                            let t = fa / (fa - fb);
                            self.emit(&mut output, &mut emitted, CutKey::Edge(na, nb), || {
                                let pa = volume_point(volume, na);
                                let pb = volume_point(volume, nb);
                                let ta = volume.tensor(na);
                                let tb = volume.tensor(nb);
                                (pa + (pb - pa) * t, ta + (tb - ta) * t)
                            });
                        }
                    }
                }
            }
        }

        debug!(
            "Cut volume of {} points into {} plane points",
            volume.num_points(),
            output.len()
        );
        output
    }

    fn emit(
        &self,
        output: &mut CutDataset,
        emitted: &mut HashSet<CutKey>,
        key: CutKey,
        make: impl FnOnce() -> (Vec3, Tensor),
    ) {
        if !emitted.insert(key) {
            return;
        }
        let (point, tensor) = make();
        if self.generate_cut_scalars {
            output
                .cut_scalars
                .get_or_insert_with(Vec::new)
                .push(self.plane.evaluate(&point));
        }
        output.points.push(point);
        output.tensors.push(tensor);
    }
}

fn volume_point(volume: &VolumeDataset, id: usize) -> Vec3 {
    let [nx, ny, _] = volume.dims();
    volume.point(id % nx, (id / nx) % ny, id / (nx * ny))
}

/// Edges of one grid cell as pairs of corner offsets. Axes with a single
/// layer of points contribute no extent, so a slab volume has quad cells.
fn cell_edges(dims: [usize; 3]) -> Vec<([usize; 3], [usize; 3])> {
    let active = dims.map(|d| d > 1);
    let mut corners = vec![[0usize; 3]];
    for axis in 0..3 {
        if !active[axis] {
            continue;
        }
        let mut next = corners.clone();
        for corner in &corners {
            let mut raised = *corner;
            raised[axis] = 1;
            next.push(raised);
        }
        corners = next;
    }

    let mut edges = Vec::new();
    for corner in &corners {
        for axis in 0..3 {
            if active[axis] && corner[axis] == 0 {
                let mut other = *corner;
                other[axis] = 1;
                edges.push((*corner, other));
            }
        }
    }
    edges
}
