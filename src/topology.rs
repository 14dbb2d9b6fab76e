//! Junction splicing and the resolved board topology.
//!
//! Corridors from [`crate::geometry`] are straight. Where three corridors meet
//! at a triangular cluster of points, a capture line should be able to pass
//! through the triangle and leave along a different bearing. This module finds
//! those continuations and splices corridors through triangles into extended
//! corridors.
//!
//! The main algorithm builds a [`JunctionGraph`] with one node per corridor
//! and one node per triangle corner, enumerates every admissible path between
//! graph endpoints and linearizes each path into a corridor. A cheaper
//! [`splice_direct`] handles topologies where no corridor meets more than one
//! junction.
//!
//! [`Topology`] ties resolution and splicing together and is what a
//! [`crate::board::Board`] shares between its clones.

use serde::{Deserialize, Serialize};

use crate::constants::keystone_factor;
use crate::error::TopologyError;
use crate::geometry::{
    Corridor, Point, PointId, Triangle, approx_eq, cull_by_adjacency, cull_equal, cull_short,
    distance, find_triangles, normalize, resolve_bearing, resolve_slope,
};

/// Corner index through which `corridor` continues into `tri`, if any.
///
/// A corridor ending at corner `k` continues through the triangle when its
/// second point (counted from that end) lies `(1 + sqrt(3)/2)` edge lengths
/// from the midpoint of the opposite triangle edge. The edge length is the
/// corridor's first step.
pub fn triangle_continues_corridor(
    points: &[Point],
    tri: &Triangle,
    corridor: &[PointId],
) -> Option<usize> {
    if corridor.len() < 2 {
        return None;
    }
    let unit = distance(points[corridor[0]], points[corridor[1]]);
    let expected = keystone_factor() * unit;
    let n = corridor.len();
    let ends = [(corridor[0], corridor[1]), (corridor[n - 1], corridor[n - 2])];

    ends.into_iter().find_map(|(end, second)| {
        let k = tri.corner_of(end)?;
        let [a, b] = tri.opposite(k);
        let mid = points[a].midpoint(points[b]);
        approx_eq(distance(mid, points[second]), expected).then_some(k)
    })
}

// =============================================================================
// Junction graph
// =============================================================================

/// A node of the [`JunctionGraph`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JunctionNode {
    Corridor(usize),
    Corner { triangle: usize, corner: usize },
}

/// Corridors and triangle corners, joined where a corridor continues through
/// a corner and between the corners of each triangle.
#[derive(Debug, Clone)]
pub struct JunctionGraph {
    pub nodes: Vec<JunctionNode>,
    pub edges: Vec<Vec<usize>>,
}

impl JunctionGraph {
    pub fn build(points: &[Point], corridors: &[Corridor], triangles: &[Triangle]) -> Self {
        let mut nodes: Vec<JunctionNode> = (0..corridors.len()).map(JunctionNode::Corridor).collect();
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); corridors.len()];

        for (t, tri) in triangles.iter().enumerate() {
            let base = nodes.len();
            for corner in 0..3 {
                nodes.push(JunctionNode::Corner { triangle: t, corner });
                edges.push(vec![base + (corner + 1) % 3, base + (corner + 2) % 3]);
            }
            for (c, corridor) in corridors.iter().enumerate() {
                if let Some(k) = triangle_continues_corridor(points, tri, corridor) {
                    edges[base + k].push(c);
                    edges[c].push(base + k);
                }
            }
        }

        Self { nodes, edges }
    }

    fn is_corner(&self, node: usize) -> bool {
        matches!(self.nodes[node], JunctionNode::Corner { .. })
    }

    /// True when some corridor continues through some triangle.
    pub fn has_junctions(&self) -> bool {
        self.nodes
            .iter()
            .enumerate()
            .any(|(i, n)| matches!(n, JunctionNode::Corridor(_)) && !self.edges[i].is_empty())
    }

    fn components(&self) -> Vec<usize> {
        let mut comp = vec![usize::MAX; self.nodes.len()];
        for start in 0..self.nodes.len() {
            if comp[start] != usize::MAX {
                continue;
            }
            let mut stack = vec![start];
            while let Some(n) = stack.pop() {
                if comp[n] != usize::MAX {
                    continue;
                }
                comp[n] = start;
                stack.extend(self.edges[n].iter().copied().filter(|&m| comp[m] == usize::MAX));
            }
        }
        comp
    }

    /// Every admissible path between endpoints.
    ///
    /// Endpoints are corridors with one connection and triangle corners with no
    /// corridor attached. An unconnected corridor is its own single-node path.
    /// Paths never revisit a node, never take three triangle corners in a row,
    /// and never consist of triangle corners only.
    pub fn paths(&self) -> Vec<Vec<usize>> {
        let mut result = Vec::new();
        let mut ends = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            match (node, self.edges[i].len()) {
                (JunctionNode::Corridor(_), 0) => result.push(vec![i]),
                (JunctionNode::Corridor(_), 1) | (JunctionNode::Corner { .. }, 2) => ends.push(i),
                _ => {}
            }
        }

        let comp = self.components();
        for (i, &start) in ends.iter().enumerate() {
            for &end in &ends[i + 1..] {
                if comp[start] != comp[end] {
                    continue;
                }
                let mut path = vec![start];
                self.walk(&mut path, end, &mut result);
            }
        }
        result
    }

    fn walk(&self, path: &mut Vec<usize>, end: usize, out: &mut Vec<Vec<usize>>) {
        let n = path.len();
        if n >= 3 && path[n - 3..].iter().all(|&i| self.is_corner(i)) {
            return;
        }
        let last = path[n - 1];
        if last == end {
            if !path.iter().all(|&i| self.is_corner(i)) {
                out.push(path.clone());
            }
            return;
        }
        for &next in &self.edges[last] {
            if path.contains(&next) {
                continue;
            }
            path.push(next);
            self.walk(path, end, out);
            path.pop();
        }
    }

    /// Concatenate the segments of `path` into one corridor.
    ///
    /// Returns `Ok(None)` for a path that yields no corridor: a hop between two
    /// corners of one triangle, or a concatenation that would revisit a point.
    pub fn linearize(
        &self,
        path: &[usize],
        corridors: &[Corridor],
        triangles: &[Triangle],
    ) -> Result<Option<Corridor>, TopologyError> {
        match path {
            [] => return Err(TopologyError::EmptyPath),
            [only] => {
                return match self.nodes[*only] {
                    JunctionNode::Corridor(c) => Ok(Some(corridors[c].clone())),
                    JunctionNode::Corner { .. } => Err(TopologyError::IsolatedTriangleCorner),
                };
            }
            [a, b] => {
                return if self.is_corner(*a) && self.is_corner(*b) {
                    Ok(None)
                } else {
                    Err(TopologyError::ShortPathNotCorners)
                };
            }
            _ => {}
        }
        if path.iter().all(|&n| self.is_corner(n)) {
            return Err(TopologyError::NoCorridorSegment);
        }

        let mut res: Vec<PointId> = Vec::new();
        for &node in path {
            match self.nodes[node] {
                JunctionNode::Corridor(c) => {
                    let line = corridors[c].ids();
                    if res.is_empty() {
                        res.extend_from_slice(line);
                        continue;
                    }
                    let (first, last) = (line[0], line[line.len() - 1]);
                    let (head, tail) = (res[0], res[res.len() - 1]);
                    if tail == first {
                        res.extend_from_slice(&line[1..]);
                    } else if tail == last {
                        res.extend(line[..line.len() - 1].iter().rev());
                    } else if head == first {
                        res.reverse();
                        res.extend_from_slice(&line[1..]);
                    } else if head == last {
                        res.reverse();
                        res.extend(line[..line.len() - 1].iter().rev());
                    } else {
                        return Err(TopologyError::Misaligned { corridor: c });
                    }
                }
                JunctionNode::Corner { triangle, corner } => {
                    let point = triangles[triangle].ids[corner];
                    if !res.contains(&point) {
                        res.push(point);
                    } else if res[0] == point {
                        res.reverse();
                    } else if res[res.len() - 1] != point {
                        return Err(TopologyError::CornerInMiddle { point });
                    }
                }
            }
        }

        let corridor = Corridor::new(res);
        if corridor.has_duplicates() {
            tracing::debug!(?path, "junction path revisits a point, skipped");
            return Ok(None);
        }
        Ok(Some(corridor))
    }
}

/// Replace corridors that continue through triangles by their extended forms.
///
/// Corridors untouched by any junction pass through unchanged. The result is
/// culled of corridors too short to capture along.
pub fn extend_through_junctions(
    points: &[Point],
    corridors: &[Corridor],
    triangles: &[Triangle],
) -> Result<Vec<Corridor>, TopologyError> {
    let graph = JunctionGraph::build(points, corridors, triangles);
    if !graph.has_junctions() {
        return Ok(cull_short(corridors.to_vec()));
    }

    let paths = graph.paths();
    tracing::debug!(
        nodes = graph.nodes.len(),
        paths = paths.len(),
        "splicing corridors through junctions"
    );
    let mut out = Vec::with_capacity(paths.len());
    for path in &paths {
        if let Some(corridor) = graph.linearize(path, corridors, triangles)? {
            out.push(corridor);
        }
    }
    Ok(cull_short(cull_equal(out)))
}

/// `corridor` oriented so that it ends at `point`.
fn ending_at(corridor: &Corridor, point: PointId) -> Vec<PointId> {
    if corridor.last() == Some(&point) {
        corridor.ids().to_vec()
    } else {
        corridor.reversed().into_ids()
    }
}

/// Single-junction splice without the path graph.
///
/// For each triangle, a corridor continuing through corner `k` is joined to
/// every corridor continuing through another corner. When a corner has no
/// corridor of its own, the incoming corridor fans out into it, producing one
/// output per free corner. Equivalent to [`extend_through_junctions`] when no
/// corridor meets more than one junction.
pub fn splice_direct(
    points: &[Point],
    corridors: &[Corridor],
    triangles: &[Triangle],
) -> Vec<Corridor> {
    let mut touched = vec![false; corridors.len()];
    let mut out = Vec::new();

    for tri in triangles {
        let mut at_corner: [Vec<usize>; 3] = Default::default();
        for (c, corridor) in corridors.iter().enumerate() {
            if let Some(k) = triangle_continues_corridor(points, tri, corridor) {
                at_corner[k].push(c);
                touched[c] = true;
            }
        }

        for k in 0..3 {
            for &c in &at_corner[k] {
                let head = ending_at(&corridors[c], tri.ids[k]);
                for j in (0..3).filter(|&j| j != k) {
                    if at_corner[j].is_empty() {
                        let mut fan = head.clone();
                        fan.push(tri.ids[j]);
                        out.push(Corridor::new(fan));
                    } else if j > k {
                        for &d in &at_corner[j] {
                            let mut joined = head.clone();
                            joined.extend(ending_at(&corridors[d], tri.ids[j]).into_iter().rev());
                            out.push(Corridor::new(joined));
                        }
                    }
                }
            }
        }
    }

    out.retain(|c| !c.has_duplicates());
    out.extend(
        corridors
            .iter()
            .zip(&touched)
            .filter(|&(_, &t)| !t)
            .map(|(c, _)| c.clone()),
    );
    cull_short(cull_equal(out))
}

// =============================================================================
// Topology
// =============================================================================

/// How corridors are derived from the raw geometry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolver {
    /// Exact coordinates: group points by slope, then splice through junctions.
    #[default]
    Slope,
    /// Approximate coordinates: grow corridors along adjacency by bearing.
    Bearing,
}

/// How slope corridors are carried through triangular junctions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JunctionMode {
    #[default]
    PathGraph,
    Direct,
}

/// Raw board geometry as supplied by a new-game request or a topology file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TopologySpec {
    pub points: Vec<Point>,
    #[serde(default)]
    pub adjacency: Option<Vec<Vec<PointId>>>,
    /// Target edge length for the slope resolver; 0 leaves spacing unconstrained.
    #[serde(default)]
    pub edge_length: f64,
    #[serde(default)]
    pub resolver: Resolver,
    #[serde(default)]
    pub junctions: JunctionMode,
    /// Points seeded with Black and White discs before the first move.
    #[serde(default)]
    pub black: Vec<PointId>,
    #[serde(default)]
    pub white: Vec<PointId>,
    /// Display plan handed back to joining clients; never interpreted here.
    #[serde(default)]
    pub plan: String,
}

/// The immutable part of a board: points, corridors and junctions.
///
/// Computed once per game and shared by every board clone.
#[derive(Debug)]
pub struct Topology {
    points: Vec<Point>,
    triangles: Vec<Triangle>,
    corridors: Vec<Corridor>,
    /// For each point, every `(corridor, index)` at which it appears.
    memberships: Vec<Vec<(usize, usize)>>,
}

impl Topology {
    /// Assemble a topology from already-resolved corridors.
    pub fn from_parts(points: Vec<Point>, triangles: Vec<Triangle>, corridors: Vec<Corridor>) -> Self {
        let mut memberships = vec![Vec::new(); points.len()];
        for (c, corridor) in corridors.iter().enumerate() {
            for (i, &id) in corridor.iter().enumerate() {
                memberships[id].push((c, i));
            }
        }
        Self {
            points,
            triangles,
            corridors,
            memberships,
        }
    }

    /// Derive corridors from raw geometry with the resolver `spec.resolver` names.
    pub fn resolve(spec: &TopologySpec) -> Result<Self, TopologyError> {
        let n = spec.points.len();
        if let Some(adjacency) = &spec.adjacency {
            if adjacency.len() != n {
                return Err(TopologyError::AdjacencyLength {
                    expected: n,
                    got: adjacency.len(),
                });
            }
            for (point, ns) in adjacency.iter().enumerate() {
                if let Some(&neighbor) = ns.iter().find(|&&q| q >= n) {
                    return Err(TopologyError::UnknownNeighbor { point, neighbor });
                }
            }
        }

        let points = spec.points.clone();
        let adjacency = spec.adjacency.as_deref();
        let triangles = adjacency.map(find_triangles).unwrap_or_default();

        let corridors = match (spec.resolver, adjacency) {
            (Resolver::Bearing, Some(adjacency)) => {
                cull_short(normalize(resolve_bearing(&points, adjacency)))
            }
            (Resolver::Bearing, None) => {
                tracing::warn!("bearing resolver needs adjacency, board has no corridors");
                Vec::new()
            }
            (Resolver::Slope, _) => {
                let mut raw = resolve_slope(&points, spec.edge_length);
                if let Some(adjacency) = adjacency {
                    raw = cull_by_adjacency(raw, adjacency);
                }
                let raw = normalize(raw);
                match spec.junctions {
                    JunctionMode::PathGraph => extend_through_junctions(&points, &raw, &triangles)?,
                    JunctionMode::Direct => splice_direct(&points, &raw, &triangles),
                }
            }
        };

        tracing::info!(
            points = n,
            triangles = triangles.len(),
            corridors = corridors.len(),
            resolver = ?spec.resolver,
            "topology resolved"
        );
        Ok(Self::from_parts(points, triangles, corridors))
    }

    /// An `n`×`n` lattice with king-move adjacency: rows, columns and
    /// diagonals of at least three points. Point `r * n + c` sits at `(c, r)`.
    pub fn grid(n: usize) -> Result<Self, TopologyError> {
        Self::resolve(&grid_spec(n))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn corridors(&self) -> &[Corridor] {
        &self.corridors
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Every `(corridor, index)` position of `id`.
    pub fn memberships(&self, id: PointId) -> &[(usize, usize)] {
        self.memberships.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Raw geometry of an `n`×`n` lattice with the standard four-disc start.
pub fn grid_spec(n: usize) -> TopologySpec {
    let points = (0..n * n)
        .map(|id| Point::new((id % n) as f64, (id / n) as f64))
        .collect();
    let adjacency = (0..n * n)
        .map(|id| {
            let (r, c) = ((id / n) as isize, (id % n) as isize);
            let side = 0..n as isize;
            let mut ns = Vec::with_capacity(8);
            for dr in -1..=1 {
                for dc in -1..=1 {
                    let (nr, nc) = (r + dr, c + dc);
                    if (dr, dc) != (0, 0) && side.contains(&nr) && side.contains(&nc) {
                        ns.push(nr as usize * n + nc as usize);
                    }
                }
            }
            ns
        })
        .collect();

    let (black, white) = if n >= 2 {
        let (lo, hi) = (n / 2 - 1, n / 2);
        (
            vec![lo * n + lo, hi * n + hi],
            vec![lo * n + hi, hi * n + lo],
        )
    } else {
        (Vec::new(), Vec::new())
    };

    TopologySpec {
        points,
        adjacency: Some(adjacency),
        edge_length: 0.0,
        black,
        white,
        plan: format!("grid {n}x{n}"),
        ..TopologySpec::default()
    }
}
