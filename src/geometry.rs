//! Corridor resolution over arbitrary point sets.
//!
//! A classical Othello board captures along rows, columns and diagonals. On a
//! board made of arbitrary points those lines have to be inferred. This module
//! derives them as *corridors*: ordered, duplicate-free runs of adjacent points
//! that continue in a straight direction.
//!
//! Two resolvers are provided, one per topology class:
//!
//! - [`resolve_slope`] for boards with exact coordinates (lattices, tilings
//!   generated from a plan). Points are grouped by the slope of the line
//!   through them.
//! - [`resolve_bearing`] for boards whose coordinates are only approximate.
//!   Corridors are grown along the adjacency graph as long as each step stays
//!   less than [`BEARING_TOLERANCE_DEG`] off straight continuation.
//!
//! Resolution never fails. Degenerate input yields fewer corridors, possibly
//! none, which makes the game terminal from the start.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::constants::{
    BEARING_TOLERANCE_DEG, EPSILON, INFINITY_SLOPE, MAX_BEARING_CORRIDOR, MIN_CORRIDOR_LEN,
    NORMALIZE_ROUNDS,
};

/// Index of a point on the board. Ids are dense: `0..points.len()`.
pub type PointId = usize;

/// A board location in the plane.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub(crate) fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Three pairwise adjacent points: a junction where corridors may bend.
///
/// Ids are stored ascending; the position of an id in `ids` is its corner index.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Triangle {
    pub ids: [PointId; 3],
}

impl Triangle {
    /// Corner index of `id`, if it is a vertex of this triangle.
    pub fn corner_of(&self, id: PointId) -> Option<usize> {
        self.ids.iter().position(|&v| v == id)
    }

    pub fn contains(&self, id: PointId) -> bool {
        self.ids.contains(&id)
    }

    /// The two vertices other than corner `k`.
    pub fn opposite(&self, k: usize) -> [PointId; 2] {
        [self.ids[(k + 1) % 3], self.ids[(k + 2) % 3]]
    }
}

/// An ordered, duplicate-free sequence of point ids along which captures run.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Corridor(Vec<PointId>);

impl Corridor {
    pub fn new(ids: Vec<PointId>) -> Self {
        Self(ids)
    }

    pub fn ids(&self) -> &[PointId] {
        &self.0
    }

    pub fn into_ids(self) -> Vec<PointId> {
        self.0
    }

    pub fn reversed(&self) -> Corridor {
        Corridor(self.0.iter().rev().copied().collect())
    }

    /// Equal as a sequence, read in either direction.
    pub fn same_as(&self, other: &Corridor) -> bool {
        self.0 == other.0 || (self.len() == other.len() && self.0.iter().eq(other.0.iter().rev()))
    }

    /// Every point of `self` appears in `other`.
    pub fn is_subset_of(&self, other: &Corridor) -> bool {
        self.0.iter().all(|id| other.0.contains(id))
    }

    pub fn has_duplicates(&self) -> bool {
        self.0
            .iter()
            .enumerate()
            .any(|(i, id)| self.0[i + 1..].contains(id))
    }

    /// Every consecutive triple is collinear within [`EPSILON`].
    pub fn is_straight(&self, points: &[Point]) -> bool {
        self.0.windows(3).all(|w| {
            approx_eq(
                slope(points[w[0]], points[w[1]]),
                slope(points[w[1]], points[w[2]]),
            )
        })
    }
}

impl Deref for Corridor {
    type Target = [PointId];

    fn deref(&self) -> &[PointId] {
        &self.0
    }
}

impl From<Vec<PointId>> for Corridor {
    fn from(ids: Vec<PointId>) -> Self {
        Self(ids)
    }
}

// =============================================================================
// Numeric helpers
// =============================================================================

/// Compare two values within [`EPSILON`]. Slopes steeper than
/// [`INFINITY_SLOPE`] in the same direction compare equal.
pub fn approx_eq(a: f64, b: f64) -> bool {
    if a > INFINITY_SLOPE && b > INFINITY_SLOPE {
        return true;
    }
    if a < -INFINITY_SLOPE && b < -INFINITY_SLOPE {
        return true;
    }
    (a - b).abs() < EPSILON
}

/// Slope of the line through `p1` and `p2`. Vertical lines are `+inf`
/// regardless of direction.
pub fn slope(p1: Point, p2: Point) -> f64 {
    let dx = p2.x - p1.x;
    if dx.abs() < EPSILON {
        return f64::INFINITY;
    }
    (p2.y - p1.y) / dx
}

pub fn distance(p1: Point, p2: Point) -> f64 {
    (p1.x - p2.x).hypot(p1.y - p2.y)
}

/// Absolute deviation, in degrees, of the step `b -> c` from the heading `a -> b`.
fn turn_angle(a: Point, b: Point, c: Point) -> f64 {
    let (ux, uy) = (b.x - a.x, b.y - a.y);
    let (vx, vy) = (c.x - b.x, c.y - b.y);
    let cross = ux * vy - uy * vx;
    let dot = ux * vx + uy * vy;
    cross.atan2(dot).abs().to_degrees()
}

/// Order ids along their common line: ascending x, ties by ascending y.
fn sort_along_line(ids: &mut [PointId], points: &[Point]) {
    ids.sort_by(|&a, &b| {
        let (pa, pb) = (points[a], points[b]);
        let dx = pa.x - pb.x;
        if dx.abs() >= EPSILON {
            return dx.partial_cmp(&0.0).unwrap_or(Ordering::Equal);
        }
        pa.y.partial_cmp(&pb.y).unwrap_or(Ordering::Equal)
    });
}

// =============================================================================
// Slope resolver
// =============================================================================

struct Line {
    slope: f64,
    ids: Vec<PointId>,
}

impl Line {
    fn passes_through(&self, points: &[Point], id: PointId) -> bool {
        self.ids.contains(&id) || approx_eq(slope(points[self.ids[0]], points[id]), self.slope)
    }

    fn touches_end(&self, points: &[Point], id: PointId, edge_len: f64) -> bool {
        let (first, last) = (self.ids[0], self.ids[self.ids.len() - 1]);
        approx_eq(distance(points[first], points[id]), edge_len)
            || approx_eq(distance(points[last], points[id]), edge_len)
    }
}

/// Group points into maximal collinear runs.
///
/// Every point pair is visited once. A pair extends an existing line with the
/// same slope that passes through both points; otherwise it starts a new line.
/// With `edge_len > 0`, a point only joins a line if it lies `edge_len` away
/// from one of the line's ends, and a new line only starts from a pair that far
/// apart. With `edge_len == 0` spacing is unconstrained.
///
/// The result is sorted along each line and still contains two-point lines;
/// junction splicing needs them as bridges. Apply [`cull_short`] before play.
pub fn resolve_slope(points: &[Point], edge_len: f64) -> Vec<Corridor> {
    let constrained = edge_len > EPSILON;
    let mut lines: Vec<Line> = Vec::new();

    for a in 0..points.len() {
        for b in a + 1..points.len() {
            let m = slope(points[a], points[b]);
            let mut placed = false;

            for line in lines.iter_mut() {
                if !approx_eq(line.slope, m)
                    || !line.passes_through(points, a)
                    || !line.passes_through(points, b)
                {
                    continue;
                }
                for p in [a, b] {
                    if !line.ids.contains(&p)
                        && (!constrained || line.touches_end(points, p, edge_len))
                    {
                        line.ids.push(p);
                        sort_along_line(&mut line.ids, points);
                    }
                }
                if line.ids.contains(&a) && line.ids.contains(&b) {
                    placed = true;
                    break;
                }
            }

            if !placed && (!constrained || approx_eq(distance(points[a], points[b]), edge_len)) {
                let mut ids = vec![a, b];
                sort_along_line(&mut ids, points);
                lines.push(Line { slope: m, ids });
            }
        }
    }

    lines.into_iter().map(|line| Corridor(line.ids)).collect()
}

// =============================================================================
// Bearing resolver
// =============================================================================

/// The neighbor of `at` that best continues the heading `from -> at`, if any
/// lies within the bearing tolerance.
fn straightest(
    points: &[Point],
    adjacency: &[Vec<PointId>],
    from: PointId,
    at: PointId,
    taken: &VecDeque<PointId>,
) -> Option<PointId> {
    adjacency[at]
        .iter()
        .copied()
        .filter(|n| !taken.contains(n))
        .map(|n| (n, turn_angle(points[from], points[at], points[n])))
        .filter(|&(_, dev)| dev < BEARING_TOLERANCE_DEG - EPSILON)
        .min_by(|x, y| x.1.partial_cmp(&y.1).unwrap_or(Ordering::Equal))
        .map(|(n, _)| n)
}

/// Grow corridors along the adjacency graph.
///
/// Every edge seeds a corridor which is extended alternately at its tail and
/// head with the straightest neighbor deviating less than
/// [`BEARING_TOLERANCE_DEG`] from the current heading, until
/// neither end can grow or the corridor holds [`MAX_BEARING_CORRIDOR`]
/// vertices. Corridors equal up to reversal are reported once.
pub fn resolve_bearing(points: &[Point], adjacency: &[Vec<PointId>]) -> Vec<Corridor> {
    let mut out: Vec<Corridor> = Vec::new();

    for a in 0..points.len() {
        for &b in &adjacency[a] {
            if b <= a || b >= points.len() {
                continue;
            }
            let mut ids = VecDeque::from([a, b]);
            loop {
                let mut grew = false;
                if ids.len() < MAX_BEARING_CORRIDOR {
                    let (from, at) = (ids[ids.len() - 2], ids[ids.len() - 1]);
                    if let Some(next) = straightest(points, adjacency, from, at, &ids) {
                        ids.push_back(next);
                        grew = true;
                    }
                }
                if ids.len() < MAX_BEARING_CORRIDOR {
                    if let Some(prev) = straightest(points, adjacency, ids[1], ids[0], &ids) {
                        ids.push_front(prev);
                        grew = true;
                    }
                }
                if !grew {
                    break;
                }
            }
            let corridor = Corridor(Vec::from(ids));
            if !out.iter().any(|c| c.same_as(&corridor)) {
                out.push(corridor);
            }
        }
    }

    out
}

// =============================================================================
// Post-processing
// =============================================================================

/// Drop corridors too short to bound a capture.
pub fn cull_short(corridors: Vec<Corridor>) -> Vec<Corridor> {
    corridors
        .into_iter()
        .filter(|c| c.len() >= MIN_CORRIDOR_LEN)
        .collect()
}

/// Drop corridors with a consecutive pair that is not adjacent.
pub fn cull_by_adjacency(corridors: Vec<Corridor>, adjacency: &[Vec<PointId>]) -> Vec<Corridor> {
    corridors
        .into_iter()
        .filter(|c| {
            c.windows(2)
                .all(|w| adjacency.get(w[0]).is_some_and(|ns| ns.contains(&w[1])))
        })
        .collect()
}

/// Join `a` and `b` if a suffix of `a` of at least two points is a prefix of
/// `b`. Shorter overlaps could bend; a full overlap is a subset, not a join.
fn join_overlapping(a: &[PointId], b: &[PointId]) -> Option<Vec<PointId>> {
    let max_overlap = a.len().min(b.len()).saturating_sub(1);
    for k in (2..=max_overlap).rev() {
        if a[a.len() - k..] == b[..k] {
            let mut joined = a.to_vec();
            joined.extend_from_slice(&b[k..]);
            if !Corridor(joined.clone()).has_duplicates() {
                return Some(joined);
            }
        }
    }
    None
}

fn combine_pair(a: &Corridor, b: &Corridor) -> Option<Corridor> {
    let rb = b.reversed();
    join_overlapping(a, b)
        .or_else(|| join_overlapping(a, &rb))
        .or_else(|| join_overlapping(b, a))
        .or_else(|| join_overlapping(&rb, a))
        .map(Corridor)
}

/// Merge corridors that continue one another through a shared segment.
pub fn combine_corridors(mut corridors: Vec<Corridor>) -> Vec<Corridor> {
    let mut i = 0;
    while i < corridors.len() {
        let mut j = i + 1;
        while j < corridors.len() {
            if let Some(merged) = combine_pair(&corridors[i], &corridors[j]) {
                corridors[i] = merged;
                corridors.remove(j);
                j = i + 1;
            } else {
                j += 1;
            }
        }
        i += 1;
    }
    corridors
}

/// Drop corridors equal, in either direction, to an earlier one.
pub fn cull_equal(corridors: Vec<Corridor>) -> Vec<Corridor> {
    let mut keep: Vec<Corridor> = Vec::with_capacity(corridors.len());
    for c in corridors {
        if !keep.iter().any(|k| k.same_as(&c)) {
            keep.push(c);
        }
    }
    keep
}

/// Drop corridors whose points all lie on a longer corridor.
pub fn cull_subsets(corridors: Vec<Corridor>) -> Vec<Corridor> {
    let keep: Vec<bool> = corridors
        .iter()
        .map(|c| {
            !corridors
                .iter()
                .any(|other| other.len() > c.len() && c.is_subset_of(other))
        })
        .collect();
    corridors
        .into_iter()
        .zip(keep)
        .filter_map(|(c, k)| k.then_some(c))
        .collect()
}

/// Combine, then cull duplicates and subsets, until nothing changes or
/// [`NORMALIZE_ROUNDS`] rounds have run.
pub fn normalize(mut corridors: Vec<Corridor>) -> Vec<Corridor> {
    for round in 0..NORMALIZE_ROUNDS {
        let before = corridors.clone();
        corridors = cull_subsets(cull_equal(combine_corridors(corridors)));
        if corridors == before {
            tracing::trace!(round, "corridor set stable");
            return corridors;
        }
    }
    tracing::debug!(
        rounds = NORMALIZE_ROUNDS,
        corridors = corridors.len(),
        "corridor normalization stopped at round limit"
    );
    corridors
}

/// Every 3-clique of the adjacency graph, once, with ascending ids.
pub fn find_triangles(adjacency: &[Vec<PointId>]) -> Vec<Triangle> {
    let adjacent = |p: PointId, q: PointId| adjacency.get(p).is_some_and(|ns| ns.contains(&q));
    let mut tris = Vec::new();
    for (a, ns) in adjacency.iter().enumerate() {
        let mut bs: Vec<PointId> = ns.iter().copied().filter(|&b| b > a).collect();
        bs.sort_unstable();
        bs.dedup();
        for (i, &b) in bs.iter().enumerate() {
            for &c in &bs[i + 1..] {
                if adjacent(b, c) || adjacent(c, b) {
                    tris.push(Triangle { ids: [a, b, c] });
                }
            }
        }
    }
    tris
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two unit triangles joined tip to tip by a unit edge between 0 and 3.
    fn bowtie() -> (Vec<Point>, Vec<Vec<PointId>>) {
        let h = 3f64.sqrt() / 2.0;
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(h, 0.5),
            Point::new(h, -0.5),
            Point::new(-1.0, 0.0),
            Point::new(-1.0 - h, 0.5),
            Point::new(-1.0 - h, -0.5),
        ];
        let adjacency = vec![
            vec![1, 2, 3],
            vec![0, 2],
            vec![0, 1],
            vec![0, 4, 5],
            vec![3, 5],
            vec![3, 4],
        ];
        (points, adjacency)
    }

    fn lattice(n: usize) -> (Vec<Point>, Vec<Vec<PointId>>) {
        let points = (0..n * n)
            .map(|id| Point::new((id % n) as f64, (id / n) as f64))
            .collect();
        let adjacency = (0..n * n)
            .map(|id| {
                let (r, c) = ((id / n) as isize, (id % n) as isize);
                let mut ns = Vec::new();
                for dr in -1..=1 {
                    for dc in -1..=1 {
                        let (nr, nc) = (r + dr, c + dc);
                        if (dr, dc) != (0, 0) && (0..n as isize).contains(&nr) && (0..n as isize).contains(&nc) {
                            ns.push(nr as usize * n + nc as usize);
                        }
                    }
                }
                ns
            })
            .collect();
        (points, adjacency)
    }

    #[test]
    fn test_approx_eq_treats_steep_slopes_as_equal() {
        assert!(approx_eq(1.0, 1.0005));
        assert!(!approx_eq(1.0, 1.01));
        assert!(approx_eq(f64::INFINITY, 5000.0));
        assert!(!approx_eq(f64::INFINITY, f64::NEG_INFINITY));
    }

    #[test]
    fn test_slope_vertical_is_positive_infinity() {
        let up = slope(Point::new(0.0, 0.0), Point::new(0.0, 1.0));
        let down = slope(Point::new(0.0, 1.0), Point::new(0.0, 0.0));
        assert_eq!(up, f64::INFINITY);
        assert_eq!(down, f64::INFINITY);
    }

    #[test]
    fn test_find_triangles_single() {
        let tris = find_triangles(&[vec![1, 2], vec![0, 2], vec![0, 1]]);
        assert_eq!(tris, vec![Triangle { ids: [0, 1, 2] }]);
    }

    #[test]
    fn test_find_triangles_two_disjoint() {
        let ns = vec![
            vec![1, 2, 3],
            vec![0, 2, 4],
            vec![0, 1],
            vec![0, 5],
            vec![1],
            vec![6, 7],
            vec![5, 7],
            vec![5, 6],
        ];
        let tris = find_triangles(&ns);
        assert_eq!(tris.len(), 2);
        assert_eq!(tris[0].ids, [0, 1, 2]);
        assert_eq!(tris[1].ids, [5, 6, 7]);
    }

    #[test]
    fn test_find_triangles_sharing_edge() {
        let ns = vec![vec![1, 2, 3], vec![0, 2], vec![0, 1, 3], vec![0, 2]];
        let tris = find_triangles(&ns);
        assert_eq!(tris.len(), 2);
        assert_eq!(tris[0].ids, [0, 1, 2]);
        assert_eq!(tris[1].ids, [0, 2, 3]);
    }

    #[test]
    fn test_slope_resolver_lattice_rows() {
        let (points, adjacency) = lattice(4);
        let corridors = cull_short(cull_by_adjacency(resolve_slope(&points, 0.0), &adjacency));
        assert_eq!(corridors.len(), 14);
        assert_eq!(corridors[0].ids(), &[0, 1, 2, 3]);
        for c in &corridors {
            assert!(c.is_straight(&points), "{c:?} bends");
            assert!(!c.has_duplicates());
        }
    }

    #[test]
    fn test_slope_resolver_respects_edge_length() {
        let (points, adjacency) = bowtie();
        let unit = distance(points[0], points[1]);
        let corridors = cull_by_adjacency(resolve_slope(&points, unit), &adjacency);
        assert_eq!(corridors.len(), 7);
        assert!(corridors.iter().all(|c| c.len() == 2));
    }

    #[test]
    fn test_slope_resolver_gap_splits_line() {
        // 0 1 _ 3 4 on the x axis with unit spacing
        let points: Vec<Point> = [0.0, 1.0, 3.0, 4.0]
            .iter()
            .map(|&x| Point::new(x, 0.0))
            .collect();
        let corridors = resolve_slope(&points, 1.0);
        assert_eq!(corridors.len(), 2);
        assert_eq!(corridors[0].ids(), &[0, 1]);
        assert_eq!(corridors[1].ids(), &[2, 3]);
    }

    #[test]
    fn test_bearing_resolver_matches_lattice() {
        let (points, adjacency) = lattice(4);
        let corridors = cull_short(normalize(resolve_bearing(&points, &adjacency)));
        assert_eq!(corridors.len(), 14);
        for c in &corridors {
            assert!(c.is_straight(&points), "{c:?} bends");
        }
    }

    #[test]
    fn test_bearing_resolver_caps_growth() {
        let n = 20;
        let points: Vec<Point> = (0..n).map(|i| Point::new(i as f64, 0.0)).collect();
        let adjacency: Vec<Vec<PointId>> = (0..n)
            .map(|i| {
                let mut ns = Vec::new();
                if i > 0 {
                    ns.push(i - 1);
                }
                if i + 1 < n {
                    ns.push(i + 1);
                }
                ns
            })
            .collect();
        let corridors = resolve_bearing(&points, &adjacency);
        assert!(corridors.iter().all(|c| c.len() <= MAX_BEARING_CORRIDOR));
        let merged = normalize(corridors);
        assert!(merged.iter().any(|c| c.len() > MAX_BEARING_CORRIDOR));
    }

    #[test]
    fn test_bearing_resolver_stops_at_sharp_turn() {
        // An L shape: 0-1-2 along x, then 2-3 straight up.
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 1.0),
        ];
        let adjacency = vec![vec![1], vec![0, 2], vec![1, 3], vec![2]];
        let corridors = cull_short(normalize(resolve_bearing(&points, &adjacency)));
        assert_eq!(corridors.len(), 1);
        assert!(corridors[0].same_as(&Corridor::new(vec![0, 1, 2])));
    }

    #[test]
    fn test_cull_short_is_idempotent() {
        let (points, _) = lattice(5);
        let once = cull_short(resolve_slope(&points, 0.0));
        let twice = cull_short(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_combine_joins_overlapping_segments() {
        let merged = combine_corridors(vec![
            Corridor::new(vec![0, 1, 2, 3]),
            Corridor::new(vec![5, 4, 3, 2]),
        ]);
        assert_eq!(merged, vec![Corridor::new(vec![0, 1, 2, 3, 4, 5])]);
    }

    #[test]
    fn test_combine_ignores_single_point_contact() {
        let input = vec![Corridor::new(vec![0, 1, 2]), Corridor::new(vec![2, 3, 4])];
        assert_eq!(combine_corridors(input.clone()), input);
    }

    #[test]
    fn test_cull_equal_and_subsets() {
        let input = vec![
            Corridor::new(vec![0, 1, 2, 3]),
            Corridor::new(vec![3, 2, 1, 0]),
            Corridor::new(vec![1, 2]),
            Corridor::new(vec![4, 5, 6]),
        ];
        let culled = cull_subsets(cull_equal(input));
        assert_eq!(
            culled,
            vec![Corridor::new(vec![0, 1, 2, 3]), Corridor::new(vec![4, 5, 6])]
        );
    }

    #[test]
    fn test_normalize_reaches_fixed_point() {
        let (points, adjacency) = lattice(5);
        let once = normalize(resolve_bearing(&points, &adjacency));
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }
}
