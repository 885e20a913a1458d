//! Lloyd's k-means over RGB points.

use rand::seq::index::sample;
use rand::Rng;
use rayon::prelude::*;

use crate::error::{CamoError, Result};

pub type Point = [f32; 3];

/// k-means parameters. Defaults: 10 iterations, 1.0 centre-shift epsilon,
/// 10 attempts keeping the most compact result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeans {
    pub k: usize,
    pub max_iterations: usize,
    pub epsilon: f32,
    pub attempts: usize,
}

/// Result of a clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub centres: Vec<Point>,
    /// Cluster index per input point.
    pub labels: Vec<u32>,
    /// Sum of squared distances from each point to its centre.
    pub compactness: f64,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: 10,
            epsilon: 1.0,
            attempts: 10,
        }
    }

    /// Cluster `points`, trying several random initialisations.
    ///
    /// `k` must be between 1 and the number of points.
    pub fn run<R: Rng>(&self, points: &[Point], rng: &mut R) -> Result<Clustering> {
        if points.is_empty() {
            return Err(CamoError::Cluster {
                message: "no pixels to cluster".to_string(),
                help: Some("The image is empty".to_string()),
            });
        }
        if self.k == 0 || self.k > points.len() {
            return Err(CamoError::Cluster {
                message: format!("cannot form {} clusters from {} points", self.k, points.len()),
                help: Some("Lower process.max_colors".to_string()),
            });
        }

        let mut best: Option<Clustering> = None;
        for _ in 0..self.attempts.max(1) {
            let attempt = self.attempt(points, rng);
            if best
                .as_ref()
                .map_or(true, |b| attempt.compactness < b.compactness)
            {
                best = Some(attempt);
            }
        }

        best.ok_or_else(|| CamoError::Cluster {
            message: "k-means produced no result".to_string(),
            help: None,
        })
    }

    fn attempt<R: Rng>(&self, points: &[Point], rng: &mut R) -> Clustering {
        let mut centres: Vec<Point> = sample(rng, points.len(), self.k)
            .into_iter()
            .map(|i| points[i])
            .collect();
        let mut labels = assign(points, &centres);

        for _ in 0..self.max_iterations {
            let updated = update(points, &labels, &centres);
            let shift = centres
                .iter()
                .zip(&updated)
                .map(|(a, b)| dist_sq(*a, *b))
                .fold(0.0f32, f32::max);
            centres = updated;
            labels = assign(points, &centres);
            if shift <= self.epsilon * self.epsilon {
                break;
            }
        }

        let compactness = points
            .iter()
            .zip(&labels)
            .map(|(p, &l)| dist_sq(*p, centres[l as usize]) as f64)
            .sum();

        Clustering {
            centres,
            labels,
            compactness,
        }
    }
}

/// Index of the nearest centre; ties go to the lowest index.
pub fn nearest(point: Point, centres: &[Point]) -> u32 {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (i, c) in centres.iter().enumerate() {
        let d = dist_sq(point, *c);
        if d < best_dist {
            best = i;
            best_dist = d;
        }
    }
    best as u32
}

fn assign(points: &[Point], centres: &[Point]) -> Vec<u32> {
    points.par_iter().map(|p| nearest(*p, centres)).collect()
}

/// Recompute centres as cluster means. An empty cluster takes the point
/// farthest from its current centre.
fn update(points: &[Point], labels: &[u32], previous: &[Point]) -> Vec<Point> {
    let k = previous.len();
    let mut sums = vec![[0.0f64; 3]; k];
    let mut counts = vec![0usize; k];
    for (p, &l) in points.iter().zip(labels) {
        let s = &mut sums[l as usize];
        s[0] += p[0] as f64;
        s[1] += p[1] as f64;
        s[2] += p[2] as f64;
        counts[l as usize] += 1;
    }

    let mut centres: Vec<Point> = sums
        .iter()
        .zip(&counts)
        .zip(previous)
        .map(|((s, &n), prev)| {
            if n == 0 {
                *prev
            } else {
                let n = n as f64;
                [(s[0] / n) as f32, (s[1] / n) as f32, (s[2] / n) as f32]
            }
        })
        .collect();

    for empty in (0..k).filter(|&i| counts[i] == 0) {
        let farthest = points
            .iter()
            .zip(labels)
            .max_by(|a, b| {
                dist_sq(*a.0, centres[*a.1 as usize])
                    .total_cmp(&dist_sq(*b.0, centres[*b.1 as usize]))
            })
            .map(|(p, _)| *p);
        if let Some(p) = farthest {
            centres[empty] = p;
        }
    }

    centres
}

pub fn dist_sq(a: Point, b: Point) -> f32 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    let d2 = a[2] - b[2];
    d0 * d0 + d1 * d1 + d2 * d2
}
