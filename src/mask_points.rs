use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::utils::{Bounds, SamplingMode, Vec3};

pub const DEFAULT_MAX_POINTS: usize = 10000;
pub const DEFAULT_ON_RATIO: usize = 2;

/// Random point subsampler. At most `len / on_ratio` points pass, capped at
/// `maximum`.
#[derive(Clone, Debug)]
pub struct MaskPoints {
    maximum: usize,
    on_ratio: usize,
    mode: SamplingMode,
    seed: Option<u64>,
}

impl Default for MaskPoints {
    fn default() -> Self {
        MaskPoints::new(DEFAULT_MAX_POINTS)
    }
}

impl MaskPoints {
    pub fn new(maximum: usize) -> Self {
        MaskPoints {
            maximum,
            on_ratio: DEFAULT_ON_RATIO,
            mode: SamplingMode::Stratified,
            seed: None,
        }
    }

    pub fn with_mode(mut self, mode: SamplingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_on_ratio(mut self, on_ratio: usize) -> Self {
        self.on_ratio = on_ratio.max(1);
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Number of points a set of `len` points is reduced to.
    pub fn target_count(&self, len: usize) -> usize {
        (len / self.on_ratio).min(self.maximum)
    }

    /// Ids of the kept points, ascending.
    pub fn sample(&self, points: &[Vec3]) -> Vec<usize> {
        let target = self.target_count(points.len());
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut ids = match self.mode {
            SamplingMode::Stride => self.stride(points.len(), target, &mut rng),
            SamplingMode::Uniform => {
                rand::seq::index::sample(&mut rng, points.len(), target).into_vec()
            }
            SamplingMode::Stratified => {
                let mut all = (0..points.len()).collect::<Vec<usize>>();
                let mut picked = Vec::with_capacity(target);
                stratify(points, &mut all, target, &mut rng, &mut picked);
                picked
            }
        };
        ids.sort_unstable();

        debug!(
            "Masked {} points down to {} ({} sampling)",
            points.len(),
            ids.len(),
            self.mode.name()
        );
        ids
    }

    fn stride(&self, len: usize, target: usize, rng: &mut StdRng) -> Vec<usize> {
        let mut ids = Vec::with_capacity(target);
        // strides average the on-ratio
        let max_stride = 2 * self.on_ratio - 1;
        let mut id = 0;
        while id < len && ids.len() < target {
            ids.push(id);
            id += rng.random_range(1..=max_stride);
        }
        ids
    }
}

/// Splits `ids` at the median of its longest axis and shares the budget
/// between the halves until every leaf needs one point or keeps everything.
fn stratify(
    points: &[Vec3],
    ids: &mut [usize],
    budget: usize,
    rng: &mut StdRng,
    picked: &mut Vec<usize>,
) {
    if budget == 0 || ids.is_empty() {
        return;
    }
    if ids.len() <= budget {
        picked.extend_from_slice(ids);
        return;
    }
    if budget == 1 {
        picked.push(ids[rng.random_range(0..ids.len())]);
        return;
    }

    let axis = Bounds::from_points(ids.iter().map(|id| &points[*id])).longest_axis();
    let mid = ids.len() / 2;
    ids.select_nth_unstable_by(mid, |a, b| points[*a][axis].total_cmp(&points[*b][axis]));
    let (left, right) = ids.split_at_mut(mid);

    let mut left_budget = budget / 2;
    if budget % 2 == 1 && rng.random_bool(0.5) {
        left_budget += 1;
    }
    let left_budget = left_budget.min(left.len());
    let right_budget = (budget - left_budget).min(right.len());

    stratify(points, left, left_budget, rng, picked);
    stratify(points, right, right_budget, rng, picked);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> Vec<Vec3> {
        let mut points = Vec::with_capacity(n * n);
        for j in 0..n {
            for i in 0..n {
                points.push(Vec3::new(i as f32, 0., j as f32));
            }
        }
        points
    }

    const MODES: [SamplingMode; 3] = [
        SamplingMode::Stride,
        SamplingMode::Uniform,
        SamplingMode::Stratified,
    ];

    #[test]
    fn target_respects_ratio_and_maximum() {
        let mask = MaskPoints::new(100);
        assert_eq!(mask.target_count(50), 25);
        assert_eq!(mask.target_count(1000), 100);
        assert_eq!(mask.target_count(1), 0);
        assert_eq!(MaskPoints::new(100).with_on_ratio(1).target_count(50), 50);
    }

    #[test]
    fn samples_are_unique_sorted_and_bounded() {
        let points = grid(40);
        for mode in MODES {
            let ids = MaskPoints::new(300)
                .with_mode(mode)
                .with_seed(Some(3))
                .sample(&points);
            assert!(ids.len() <= 300, "{:?}", mode);
            assert!(ids.windows(2).all(|w| w[0] < w[1]), "{:?}", mode);
            assert!(ids.iter().all(|id| *id < points.len()));
        }
    }

    #[test]
    fn uniform_and_stratified_hit_the_target() {
        let points = grid(40);
        for mode in [SamplingMode::Uniform, SamplingMode::Stratified] {
            let ids = MaskPoints::new(300).with_mode(mode).sample(&points);
            assert_eq!(ids.len(), 300, "{:?}", mode);
        }
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let points = grid(30);
        for mode in MODES {
            let mask = MaskPoints::new(120).with_mode(mode).with_seed(Some(99));
            assert_eq!(mask.sample(&points), mask.sample(&points), "{:?}", mode);
        }
    }

    #[test]
    fn stratified_sampling_covers_every_quadrant() {
        let points = grid(64);
        let ids = MaskPoints::new(16).with_seed(Some(1)).sample(&points);
        let mut quadrants = [0; 4];
        for id in ids {
            let p = points[id];
            let q = (p.x >= 32.) as usize + 2 * (p.z >= 32.) as usize;
            quadrants[q] += 1;
        }
        assert_eq!(quadrants, [4, 4, 4, 4]);
    }

    #[test]
    fn small_inputs_pass_through_when_ratio_allows() {
        let points = grid(3);
        let ids = MaskPoints::new(100)
            .with_on_ratio(1)
            .with_seed(Some(5))
            .sample(&points);
        assert_eq!(ids, (0..9).collect::<Vec<usize>>());
    }

    #[test]
    fn empty_input_gives_no_ids() {
        for mode in MODES {
            assert!(MaskPoints::default().with_mode(mode).sample(&[]).is_empty());
        }
    }
}
