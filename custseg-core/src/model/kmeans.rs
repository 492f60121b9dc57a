//! Lloyd's k-means with k-means++ seeding.
//!
//! Runs `n_init` seeded restarts and keeps the one with the lowest inertia.
//! Points are dense `f64` rows that must not contain `NaN`.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fitting parameters.
#[derive(Debug, Clone, Copy)]
pub struct KMeansParams {
    pub n_clusters: usize,
    pub n_init: usize,
    pub max_iter: usize,
    /// Convergence threshold on the summed squared centroid shift.
    pub tol: f64,
    pub seed: u64,
}

/// Fitted centroids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeans {
    pub centroids: Vec<Vec<f64>>,
    pub inertia: f64,
    pub n_iter: usize,
}

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index and squared distance of the closest centroid.
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

impl KMeans {
    /// Fit on `points`. The caller guarantees `1 <= n_clusters <= points.len()`.
    pub fn fit(points: &[Vec<f64>], params: &KMeansParams) -> Self {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut best: Option<KMeans> = None;

        for run in 0..params.n_init.max(1) {
            let candidate = Self::fit_once(points, params, &mut rng);
            debug!(run, inertia = candidate.inertia, n_iter = candidate.n_iter, "k-means restart finished");
            if best.as_ref().is_none_or(|b| candidate.inertia < b.inertia) {
                best = Some(candidate);
            }
        }
        best.unwrap_or(KMeans {
            centroids: Vec::new(),
            inertia: 0.0,
            n_iter: 0,
        })
    }

    fn fit_once(points: &[Vec<f64>], params: &KMeansParams, rng: &mut StdRng) -> Self {
        let k = params.n_clusters;
        let mut centroids = init_plus_plus(points, k, rng);
        let mut labels = vec![0usize; points.len()];
        let mut n_iter = 0;

        for _ in 0..params.max_iter.max(1) {
            n_iter += 1;
            for (label, p) in labels.iter_mut().zip(points) {
                *label = nearest(p, &centroids).0;
            }

            let updated = recompute(points, &labels, &centroids);
            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(a, b)| squared_distance(a, b))
                .sum();
            centroids = updated;
            if shift <= params.tol {
                break;
            }
        }

        let inertia = points.iter().map(|p| nearest(p, &centroids).1).sum();
        KMeans {
            centroids,
            inertia,
            n_iter,
        }
    }

    pub fn predict_one(&self, point: &[f64]) -> usize {
        nearest(point, &self.centroids).0
    }

    pub fn predict(&self, points: &[Vec<f64>]) -> Vec<usize> {
        points.iter().map(|p| self.predict_one(p)).collect()
    }

    /// Sum of squared distances of `points` to their closest centroid.
    pub fn inertia_of(&self, points: &[Vec<f64>]) -> f64 {
        points.iter().map(|p| nearest(p, &self.centroids).1).sum()
    }
}

/// k-means++: first centroid uniform, the rest drawn proportionally to D².
fn init_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())].clone());

    let mut dist: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = dist.iter().sum();
        let idx = if total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            let mut chosen = points.len() - 1;
            for (i, d) in dist.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // Every point already sits on a centroid.
            rng.gen_range(0..points.len())
        };
        let c = points[idx].clone();
        for (d, p) in dist.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &c));
        }
        centroids.push(c);
    }
    centroids
}

/// Mean of each cluster's members; an empty cluster takes the point farthest
/// from its current centroid.
fn recompute(points: &[Vec<f64>], labels: &[usize], previous: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let dim = previous.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dim]; previous.len()];
    let mut counts = vec![0usize; previous.len()];
    for (p, &l) in points.iter().zip(labels) {
        counts[l] += 1;
        for (s, x) in sums[l].iter_mut().zip(p) {
            *s += x;
        }
    }

    let mut taken: Vec<usize> = Vec::new();
    for (c, sum) in sums.iter_mut().enumerate() {
        if counts[c] > 0 {
            let n = counts[c] as f64;
            sum.iter_mut().for_each(|s| *s /= n);
            continue;
        }
        let far = points
            .iter()
            .enumerate()
            .filter(|(i, _)| !taken.contains(i))
            .map(|(i, p)| (i, squared_distance(p, &previous[labels[i]])))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);
        match far {
            Some(i) => {
                taken.push(i);
                *sum = points[i].clone();
            }
            None => *sum = previous[c].clone(),
        }
    }
    sums
}

/// Mean silhouette coefficient. Zero when fewer than two clusters are populated.
pub fn silhouette_score(points: &[Vec<f64>], labels: &[usize]) -> f64 {
    let n = points.len();
    let k = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut sizes = vec![0usize; k];
    for &l in labels {
        sizes[l] += 1;
    }
    if sizes.iter().filter(|&&s| s > 0).count() < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    for i in 0..n {
        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }
        let mut sums = vec![0.0; k];
        for j in 0..n {
            if i != j {
                sums[labels[j]] += squared_distance(&points[i], &points[j]).sqrt();
            }
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    total / n as f64
}
