//! KD-tree for nearest-neighbor queries over rescaled 3D point sets.
//!
//! Median-split construction for balanced trees; thread-safe for
//! concurrent read-only queries during the parallel phases. Coordinates
//! are expected to be pre-rescaled so Euclidean distance is meaningful
//! across axes of different physical scale.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Clone, Copy, Debug)]
struct IndexedPoint {
    coords: [f64; 3],
    idx: usize,
}

impl IndexedPoint {
    #[inline]
    fn dist_sq(&self, q: &[f64; 3]) -> f64 {
        let dx = self.coords[0] - q[0];
        let dy = self.coords[1] - q[1];
        let dz = self.coords[2] - q[2];
        dx * dx + dy * dy + dz * dz
    }
}

#[derive(Debug)]
struct KdNode {
    point: IndexedPoint,
    split_dim: usize,
    left: Option<Box<KdNode>>,
    right: Option<Box<KdNode>>,
}

/// Balanced 3D KD-tree storing the index of each input point.
#[derive(Debug)]
pub struct KdTree {
    root: Option<Box<KdNode>>,
    size: usize,
}

/// Max-heap entry for k-nearest search; ordered by distance.
struct HeapEntry {
    dist_sq: f64,
    idx: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.dist_sq == other.dist_sq
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .partial_cmp(&other.dist_sq)
            .unwrap_or(Ordering::Equal)
    }
}

impl KdTree {
    /// Builds a tree from point coordinates; indices follow input order.
    pub fn build(coords: &[[f64; 3]]) -> Self {
        let mut points: Vec<IndexedPoint> = coords
            .iter()
            .enumerate()
            .map(|(idx, &coords)| IndexedPoint { coords, idx })
            .collect();
        let size = points.len();
        let root = Self::build_recursive(&mut points, 0);
        KdTree { root, size }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn build_recursive(points: &mut [IndexedPoint], depth: usize) -> Option<Box<KdNode>> {
        if points.is_empty() {
            return None;
        }
        let split_dim = depth % 3;
        let mid = points.len() / 2;
        points.select_nth_unstable_by(mid, |a, b| {
            a.coords[split_dim]
                .partial_cmp(&b.coords[split_dim])
                .unwrap_or(Ordering::Equal)
        });
        let point = points[mid];
        let (left_pts, rest) = points.split_at_mut(mid);
        let right_pts = &mut rest[1..];
        Some(Box::new(KdNode {
            point,
            split_dim,
            left: Self::build_recursive(left_pts, depth + 1),
            right: Self::build_recursive(right_pts, depth + 1),
        }))
    }

    /// Index and squared distance of the single nearest point.
    pub fn nearest(&self, query: &[f64; 3]) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        if let Some(root) = &self.root {
            Self::nearest_recursive(root, query, &mut best);
        }
        best
    }

    fn nearest_recursive(node: &KdNode, query: &[f64; 3], best: &mut Option<(usize, f64)>) {
        let d = node.point.dist_sq(query);
        if best.map_or(true, |(_, bd)| d < bd) {
            *best = Some((node.point.idx, d));
        }
        let delta = query[node.split_dim] - node.point.coords[node.split_dim];
        let (near, far) = if delta < 0.0 {
            (&node.left, &node.right)
        } else {
            (&node.right, &node.left)
        };
        if let Some(child) = near {
            Self::nearest_recursive(child, query, best);
        }
        // Only cross the split plane if the hypersphere reaches it.
        if let Some(child) = far {
            if best.map_or(true, |(_, bd)| delta * delta < bd) {
                Self::nearest_recursive(child, query, best);
            }
        }
    }

    /// Indices and squared distances of the `k` nearest points, closest
    /// first. Returns fewer entries when the tree holds fewer points.
    pub fn k_nearest(&self, query: &[f64; 3], k: usize) -> Vec<(usize, f64)> {
        if k == 0 {
            return Vec::new();
        }
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(k + 1);
        if let Some(root) = &self.root {
            Self::k_nearest_recursive(root, query, k, &mut heap);
        }
        let mut out: Vec<(usize, f64)> = heap
            .into_sorted_vec()
            .into_iter()
            .map(|e| (e.idx, e.dist_sq))
            .collect();
        out.truncate(k);
        out
    }

    fn k_nearest_recursive(
        node: &KdNode,
        query: &[f64; 3],
        k: usize,
        heap: &mut BinaryHeap<HeapEntry>,
    ) {
        let d = node.point.dist_sq(query);
        if heap.len() < k {
            heap.push(HeapEntry {
                dist_sq: d,
                idx: node.point.idx,
            });
        } else if let Some(worst) = heap.peek() {
            if d < worst.dist_sq {
                heap.pop();
                heap.push(HeapEntry {
                    dist_sq: d,
                    idx: node.point.idx,
                });
            }
        }
        let delta = query[node.split_dim] - node.point.coords[node.split_dim];
        let (near, far) = if delta < 0.0 {
            (&node.left, &node.right)
        } else {
            (&node.right, &node.left)
        };
        if let Some(child) = near {
            Self::k_nearest_recursive(child, query, k, heap);
        }
        if let Some(child) = far {
            let plane_dist = delta * delta;
            let must_cross = heap.len() < k || heap.peek().map_or(true, |w| plane_dist < w.dist_sq);
            if must_cross {
                Self::k_nearest_recursive(child, query, k, heap);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-random point set (no RNG dependency in tests).
    fn scattered_points(n: usize) -> Vec<[f64; 3]> {
        let mut state: u64 = 0x2545F4914F6CDD1D;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        (0..n).map(|_| [next(), next(), next()]).collect()
    }

    fn brute_nearest(points: &[[f64; 3]], q: &[f64; 3]) -> (usize, f64) {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let d = (p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2) + (p[2] - q[2]).powi(2);
                (i, d)
            })
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .unwrap()
    }

    #[test]
    fn nearest_agrees_with_brute_force() {
        let points = scattered_points(400);
        let tree = KdTree::build(&points);
        for q in scattered_points(50) {
            let (bi, bd) = brute_nearest(&points, &q);
            let (ti, td) = tree.nearest(&q).unwrap();
            assert_eq!(ti, bi);
            assert!((td - bd).abs() < 1e-12);
        }
    }

    #[test]
    fn k_nearest_sorted_and_complete() {
        let points = scattered_points(200);
        let tree = KdTree::build(&points);
        let q = [0.5, 0.5, 0.5];
        let knn = tree.k_nearest(&q, 10);
        assert_eq!(knn.len(), 10);
        for w in knn.windows(2) {
            assert!(w[0].1 <= w[1].1);
        }
        // Closest of the k matches the global nearest.
        assert_eq!(knn[0].0, tree.nearest(&q).unwrap().0);
    }

    #[test]
    fn k_larger_than_tree_returns_all() {
        let points = scattered_points(5);
        let tree = KdTree::build(&points);
        assert_eq!(tree.k_nearest(&[0.0, 0.0, 0.0], 16).len(), 5);
    }

    #[test]
    fn empty_tree_has_no_neighbors() {
        let tree = KdTree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.nearest(&[0.0, 0.0, 0.0]).is_none());
        assert!(tree.k_nearest(&[0.0, 0.0, 0.0], 3).is_empty());
    }
}
