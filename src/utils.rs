use clap::ValueEnum;
use nalgebra::{Matrix3, SVector};

pub type Vec3 = SVector<f32, 3>;

pub type Tensor = Matrix3<f32>;

/// Triangle mesh with per-vertex normals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Axis aligned bounding box. A freshly created box is empty (min > max)
/// until a point is added.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn empty() -> Self {
        Bounds {
            min: Vec3::repeat(f32::MAX),
            max: Vec3::repeat(f32::MIN),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut bounds = Bounds::empty();
        for point in points {
            bounds.add_point(point);
        }
        bounds
    }

    pub fn add_point(&mut self, point: &Vec3) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn diagonal(&self) -> f32 {
        (self.max - self.min).magnitude()
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Index of the longest side (0 = x, 1 = y, 2 = z).
    pub fn longest_axis(&self) -> usize {
        let extent = self.max - self.min;
        extent.imax()
    }
}

/// How the point mask picks its subset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SamplingMode {
    /// Walk the point ids with random strides averaging the on-ratio.
    Stride,
    /// Uniform random subset of the point ids.
    Uniform,
    /// Random picks from a median split tree, so the subset covers the slice evenly.
    Stratified,
}

impl ValueEnum for SamplingMode {
    fn from_str(input: &str, _ignore_case: bool) -> Result<Self, String> {
        match input {
            "stride" => Ok(SamplingMode::Stride),
            "uniform" => Ok(SamplingMode::Uniform),
            "stratified" => Ok(SamplingMode::Stratified),
            _ => Err(format!("Invalid sampling mode: {}", input)),
        }
    }
    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            SamplingMode::Stride => Some(clap::builder::PossibleValue::new("stride")),
            SamplingMode::Uniform => Some(clap::builder::PossibleValue::new("uniform")),
            SamplingMode::Stratified => Some(clap::builder::PossibleValue::new("stratified")),
        }
    }
    fn value_variants<'a>() -> &'a [Self] {
        &[
            SamplingMode::Stride,
            SamplingMode::Uniform,
            SamplingMode::Stratified,
        ]
    }
}

impl SamplingMode {
    pub fn name(&self) -> &'static str {
        match self {
            SamplingMode::Stride => "stride",
            SamplingMode::Uniform => "uniform",
            SamplingMode::Stratified => "stratified",
        }
    }
}

/// Parses `x,y,z` into a vector.
pub fn parse_vec3(input: &str) -> Result<Vec3, String> {
    let parts = input
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<Result<Vec<f32>, _>>()
        .map_err(|e| format!("Invalid coordinate in '{}': {}", input, e))?;
    match parts.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(format!(
            "Expected three comma separated values, got '{}'",
            input
        )),
    }
}

pub fn format_vec3(v: &Vec3) -> String {
    format!("{},{},{}", v.x, v.y, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_grow_with_points() {
        let bounds = Bounds::from_points(&[Vec3::new(1., -2., 0.), Vec3::new(-1., 4., 3.)]);
        assert!(bounds.is_valid());
        assert_eq!(bounds.min, Vec3::new(-1., -2., 0.));
        assert_eq!(bounds.max, Vec3::new(1., 4., 3.));
        assert_eq!(bounds.center(), Vec3::new(0., 1., 1.5));
        assert_eq!(bounds.longest_axis(), 1);
    }

    #[test]
    fn empty_bounds_are_invalid() {
        assert!(!Bounds::empty().is_valid());
        assert!(!Bounds::from_points(&Vec::<Vec3>::new()).is_valid());
    }

    #[test]
    fn parse_vec3_accepts_negative_and_spaces() {
        assert_eq!(parse_vec3("0, -1.5,2"), Ok(Vec3::new(0., -1.5, 2.)));
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("a,b,c").is_err());
    }

    #[test]
    fn vec3_formatting_parses_back() {
        let v = Vec3::new(0.1, -3.0, 1e-7);
        assert_eq!(parse_vec3(&format_vec3(&v)), Ok(v));
    }

    #[test]
    fn sampling_mode_names_match_value_enum() {
        for mode in SamplingMode::value_variants() {
            assert_eq!(
                <SamplingMode as ValueEnum>::from_str(mode.name(), false),
                Ok(*mode)
            );
        }
    }
}
