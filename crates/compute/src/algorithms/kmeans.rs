use rayon::prelude::*;

/// Parameters for a batch K-means fit.
#[derive(Debug, Clone, Copy)]
pub struct KmeansParams {
    /// Number of clusters (capped to the number of distinct points).
    pub k: usize,
    /// Upper bound on Lloyd's iterations.
    pub max_iterations: usize,
    /// Selects the first initial centroid; the rest follow deterministically.
    pub seed: u64,
}

impl Default for KmeansParams {
    fn default() -> Self {
        Self {
            k: 3,
            max_iterations: 20,
            seed: 1,
        }
    }
}

/// Result of a full batch K-means run.
#[derive(Debug, Clone)]
pub struct KmeansResult {
    /// Cluster index of each input point, in input order.
    pub assignments: Vec<usize>,
    /// Final centroid vectors, indexed by cluster.
    pub centroids: Vec<Vec<f64>>,
    /// Number of Lloyd's iterations performed.
    pub iterations: usize,
    /// Sum of squared distances from each point to its assigned centroid.
    pub inertia: f64,
}

/// Run Lloyd's K-means.
///
/// Initialization is deterministic for a given `seed`: the first centroid is
/// `points[seed % n]`, every further centroid is the point with the largest
/// squared distance to the centroids chosen so far. Seeding stops early once
/// every point coincides with a centroid, so no two centroids are equal and
/// fewer than `k` clusters come back for data with fewer distinct points.
/// The assignment step runs
/// as a rayon parallel iterator, so it uses whatever pool it is installed in.
///
/// Returns `None` when `points` is empty.
pub fn kmeans(points: &[Vec<f64>], params: KmeansParams) -> Option<KmeansResult> {
    if points.is_empty() {
        return None;
    }
    let n = points.len();
    let dim = points[0].len();
    let mut centroids = greedy_init(points, params.k.clamp(1, n), params.seed);
    let k = centroids.len();
    let mut assignments = vec![usize::MAX; n];
    let mut iterations = 0;

    for _ in 0..params.max_iterations.max(1) {
        iterations += 1;

        let next: Vec<usize> = points
            .par_iter()
            .map(|p| nearest_centroid(p, &centroids))
            .collect();
        let changed = next != assignments;
        assignments = next;

        if !changed {
            break;
        }

        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (p, &c) in points.iter().zip(&assignments) {
            counts[c] += 1;
            for (s, v) in sums[c].iter_mut().zip(p) {
                *s += v;
            }
        }

        for (c, sum) in sums.iter_mut().enumerate() {
            if counts[c] == 0 {
                // Empty cluster keeps its previous centroid.
                sum.clone_from(&centroids[c]);
            } else {
                let count = counts[c] as f64;
                sum.iter_mut().for_each(|v| *v /= count);
            }
        }
        centroids = sums;
    }

    let inertia = points
        .par_iter()
        .zip(assignments.par_iter())
        .map(|(p, &c)| squared_euclidean(p, &centroids[c]))
        .sum();

    Some(KmeansResult {
        assignments,
        centroids,
        iterations,
        inertia,
    })
}

fn greedy_init(points: &[Vec<f64>], k: usize, seed: u64) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[(seed % n as u64) as usize].clone());

    for _ in 1..k {
        let mut best_idx = 0;
        let mut best_dist = f64::NEG_INFINITY;

        for (i, p) in points.iter().enumerate() {
            let min_dist = centroids
                .iter()
                .map(|c| squared_euclidean(p, c))
                .fold(f64::MAX, f64::min);
            if min_dist > best_dist {
                best_dist = min_dist;
                best_idx = i;
            }
        }
        if best_dist <= 0.0 {
            break;
        }

        centroids.push(points[best_idx].clone());
    }

    centroids
}

fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best_idx = 0;
    let mut best_dist = f64::MAX;
    for (i, centroid) in centroids.iter().enumerate() {
        let dist = squared_euclidean(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best_idx = i;
        }
    }
    best_idx
}

#[inline]
fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
