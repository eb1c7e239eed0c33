//! The triangulated mesh of the input height map.
//!
//! Every pixel inside the river boundary becomes a vertex; every unit
//! square of pixels becomes two triangles along its NW–SE diagonal. On top
//! of the mesh, vertices are classified as minima, regular points, saddles
//! or maxima by the wedge structure of their outgoing edges, monkey saddles
//! are split, and each non-minimal vertex gets its steepest-descent edge.

use std::cmp::Ordering;
use std::collections::HashMap;

use itertools::Itertools;

use crate::boundary::{Boundary, CellKind};
use crate::dcel::{Dcel, FaceIndex, HalfEdgeIndex, VertexIndex};
use crate::heightmap::HeightMap;
use crate::piecewise::{Cubic, PiecewiseCubicFunction};
use crate::point::Point;
use crate::units::Units;

/// Elevation assigned to pixels on the top and bottom boundary paths: one
/// above the 24-bit elevation range, so the river is walled in but
/// persistence values stay finite.
pub const WALL_ELEVATION: f64 = 16_777_216.0;

/// The critical-point classification of a vertex.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum VertexType {
    Minimum,
    Regular,
    Saddle,
    Maximum,
}

/// Per-vertex data of the input mesh.
#[derive(Clone, Debug)]
pub struct InputVertex {
    /// Position and elevation of the pixel.
    pub p: Point,
    pub kind: VertexType,
    /// The steepest descending outgoing edge; `end()` for minima.
    pub steepest_descent_edge: HalfEdgeIndex,
    /// The Morse–Smale complex vertex made from this vertex, if any.
    pub ms_vertex: VertexIndex,
}

/// Per-half-edge data of the input mesh.
#[derive(Clone, Debug)]
pub struct InputHalfEdge {
    /// Elevation change per meter towards the destination. NaN on
    /// zero-length edges between a split monkey saddle and its clone.
    pub gradient: f64,
    /// Whether the destination is below the origin (simulation of
    /// simplicity; strict).
    pub descending: bool,
    /// Whether this is the unique steepest descending edge of its origin.
    pub steepest: bool,
    /// Whether this is the steepest descending edge within its down-wedge.
    pub wedge_steepest: bool,
    /// The Morse–Smale face this edge lies inside, if it is part of a
    /// steepest-descent path bordering that face.
    pub incident_ms_face: FaceIndex,
    /// The Morse–Smale half-edge whose path starts with this edge, if any.
    pub ms_half_edge: HalfEdgeIndex,
}

impl Default for InputHalfEdge {
    fn default() -> Self {
        InputHalfEdge {
            gradient: 0.0,
            descending: false,
            steepest: false,
            wedge_steepest: false,
            incident_ms_face: FaceIndex::end(),
            ms_half_edge: HalfEdgeIndex::end(),
        }
    }
}

/// Per-triangle data of the input mesh.
#[derive(Clone, Debug)]
pub struct InputFace {
    /// The Morse–Smale face this triangle was assigned to.
    pub ms_face: FaceIndex,
}

impl Default for InputFace {
    fn default() -> Self {
        InputFace {
            ms_face: FaceIndex::end(),
        }
    }
}

/// A directed path of half-edges in the input mesh, as produced by
/// steepest descent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DcelPath {
    pub edges: Vec<HalfEdgeIndex>,
}

impl DcelPath {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// The triangulated DCEL of the part of a height map inside a boundary.
#[derive(Clone, Debug)]
pub struct InputDcel {
    pub(crate) dcel: Dcel<InputVertex, InputHalfEdge, InputFace>,
    units: Units,
    source: VertexIndex,
    sink: VertexIndex,
}

impl InputDcel {
    /// Triangulates `map` inside `boundary` and classifies all vertices.
    ///
    /// Pixels on the source and sink paths are pushed down to `-inf`
    /// (separated by simulation of simplicity, so each contributes exactly
    /// one minimum), and pixels on the top and bottom paths are raised to
    /// [`WALL_ELEVATION`], so that water can only enter and leave the river
    /// area at the source and the sink.
    pub fn new(map: &HeightMap, boundary: &Boundary, units: Units) -> Self {
        let mask = boundary.rasterize(map);
        let mut dcel = Dcel::new();

        let width = map.width();
        let height = map.height();
        let grid_index = |x: i32, y: i32| (y * width + x) as usize;

        // vertices, in row-major order
        let mut grid = vec![VertexIndex::end(); (width * height) as usize];
        for y in 0..height {
            for x in 0..width {
                let kind = mask.kind(x, y);
                if kind == CellKind::Outside {
                    continue;
                }
                let h = match kind {
                    CellKind::Source | CellKind::Sink => f64::NEG_INFINITY,
                    CellKind::Wall => WALL_ELEVATION,
                    _ => f64::from(map.elevation_at(x, y)),
                };
                grid[grid_index(x, y)] = dcel.add_vertex(InputVertex {
                    p: Point::new(x, y, h),
                    kind: VertexType::Regular,
                    steepest_descent_edge: HalfEdgeIndex::end(),
                    ms_vertex: VertexIndex::end(),
                });
            }
        }

        // triangles: two per unit square, along the NW-SE diagonal
        let mut edges: HashMap<(VertexIndex, VertexIndex), HalfEdgeIndex> = HashMap::new();
        let mut edge_between = |dcel: &mut Dcel<InputVertex, InputHalfEdge, InputFace>,
                                from: VertexIndex,
                                to: VertexIndex|
         -> HalfEdgeIndex {
            if let Some(&e) = edges.get(&(from, to)) {
                return e;
            }
            let (e, twin) = dcel.add_edge_pair(
                from,
                to,
                InputHalfEdge::default(),
                InputHalfEdge::default(),
            );
            edges.insert((from, to), e);
            edges.insert((to, from), twin);
            if dcel.outgoing(from).is_end() {
                dcel.set_outgoing(from, e);
            }
            if dcel.outgoing(to).is_end() {
                dcel.set_outgoing(to, twin);
            }
            e
        };

        for y in 0..height - 1 {
            for x in 0..width - 1 {
                let nw = grid[grid_index(x, y)];
                let ne = grid[grid_index(x + 1, y)];
                let sw = grid[grid_index(x, y + 1)];
                let se = grid[grid_index(x + 1, y + 1)];
                if nw.is_end() || ne.is_end() || sw.is_end() || se.is_end() {
                    continue;
                }
                for triangle in [[nw, ne, se], [nw, se, sw]] {
                    let e0 = edge_between(&mut dcel, triangle[0], triangle[1]);
                    let e1 = edge_between(&mut dcel, triangle[1], triangle[2]);
                    let e2 = edge_between(&mut dcel, triangle[2], triangle[0]);
                    dcel.set_next(e0, e1);
                    dcel.set_next(e1, e2);
                    dcel.set_next(e2, e0);
                    dcel.add_face(e0, InputFace::default());
                }
            }
        }

        // stitch the outer boundary cycle: the half-edges without a face
        // are linked by rotating around their destination until the gap
        for i in 0..dcel.half_edge_count() {
            let e = HalfEdgeIndex::new(i);
            if !dcel.face_of(e).is_end() || !dcel.next(e).is_end() {
                continue;
            }
            let mut c = e.twin();
            while !dcel.face_of(c).is_end() {
                c = dcel.prev(c).twin();
            }
            dcel.set_next(e, c);
        }

        let mut result = InputDcel {
            dcel,
            units,
            source: VertexIndex::end(),
            sink: VertexIndex::end(),
        };

        for v in result.dcel.vertex_indices().collect::<Vec<_>>() {
            result.classify_vertex(v);
        }

        // the SoS-lowest pixel of the source path is its unique minimum,
        // and likewise for the sink
        let lowest = |result: &InputDcel, wanted: CellKind| {
            let mut best = VertexIndex::end();
            for y in 0..height {
                for x in 0..width {
                    if mask.kind(x, y) != wanted {
                        continue;
                    }
                    let v = grid[grid_index(x, y)];
                    if best.is_end() || result.cmp_vertices(v, best) == Ordering::Less {
                        best = v;
                    }
                }
            }
            best
        };
        result.source = lowest(&result, CellKind::Source);
        result.sink = lowest(&result, CellKind::Sink);
        debug_assert!(
            result.source.is_end()
                || result.dcel[result.source].kind == VertexType::Minimum
        );

        result
    }

    pub fn units(&self) -> Units {
        self.units
    }

    /// The mesh vertex of the source minimum.
    pub fn source(&self) -> VertexIndex {
        self.source
    }

    /// The mesh vertex of the sink minimum.
    pub fn sink(&self) -> VertexIndex {
        self.sink
    }

    pub fn vertex_count(&self) -> usize {
        self.dcel.vertex_count()
    }

    pub fn half_edge_count(&self) -> usize {
        self.dcel.half_edge_count()
    }

    /// The number of triangles of the mesh.
    pub fn face_count(&self) -> usize {
        self.dcel.face_count()
    }

    pub fn vertex(&self, v: VertexIndex) -> &InputVertex {
        &self.dcel[v]
    }

    pub fn vertex_indices(&self) -> impl Iterator<Item = VertexIndex> {
        self.dcel.vertex_indices()
    }

    pub fn face_indices(&self) -> impl Iterator<Item = FaceIndex> {
        self.dcel.face_indices()
    }

    pub fn origin(&self, e: HalfEdgeIndex) -> VertexIndex {
        self.dcel.origin(e)
    }

    pub fn destination(&self, e: HalfEdgeIndex) -> VertexIndex {
        self.dcel.destination(e)
    }

    /// Compares two vertices by simulation of simplicity. Clones made by
    /// monkey-saddle splitting share their point with the original; the
    /// later clone is treated as infinitesimally lower.
    pub fn cmp_vertices(&self, a: VertexIndex, b: VertexIndex) -> Ordering {
        self.dcel[a]
            .p
            .cmp(&self.dcel[b].p)
            .then_with(|| a.index().cmp(&b.index()).reverse())
    }

    /// Compares two descending edges of one vertex by steepness; `Less`
    /// means steeper. Gradient ties (and NaN gradients on the source, sink
    /// and clone edges) fall back to the lower destination.
    fn cmp_steepness(&self, a: HalfEdgeIndex, b: HalfEdgeIndex) -> Ordering {
        match self.dcel[a].gradient.partial_cmp(&self.dcel[b].gradient) {
            Some(Ordering::Less) => Ordering::Less,
            Some(Ordering::Greater) => Ordering::Greater,
            _ => self.cmp_vertices(self.destination(a), self.destination(b)),
        }
    }

    /// Recomputes gradients, wedges, type and steepest-edge flags of `v`.
    fn classify_vertex(&mut self, v: VertexIndex) {
        let rotation: Vec<HalfEdgeIndex> = self.dcel.outgoing_edges(v).collect();
        if rotation.is_empty() {
            self.dcel[v].kind = VertexType::Minimum;
            self.dcel[v].steepest_descent_edge = HalfEdgeIndex::end();
            return;
        }

        for &e in &rotation {
            let dest = self.destination(e);
            let descending = self.cmp_vertices(dest, v) == Ordering::Less;
            let p1 = self.dcel[v].p;
            let p2 = self.dcel[dest].p;
            let gradient = (p2.h - p1.h) / self.units.length(p1, p2);
            let data = &mut self.dcel[e];
            data.descending = descending;
            data.gradient = gradient;
            data.steepest = false;
            data.wedge_steepest = false;
        }

        let wedges = self.down_wedges_of_rotation(&rotation);
        let down_edges: usize = wedges.iter().map(Vec::len).sum();

        if wedges.is_empty() {
            self.dcel[v].kind = VertexType::Minimum;
            self.dcel[v].steepest_descent_edge = HalfEdgeIndex::end();
            return;
        }

        self.dcel[v].kind = if down_edges == rotation.len() {
            VertexType::Maximum
        } else if wedges.len() == 1 {
            VertexType::Regular
        } else {
            VertexType::Saddle
        };

        let mut steepest = HalfEdgeIndex::end();
        for wedge in &wedges {
            let champion = *wedge
                .iter()
                .min_by(|&&a, &&b| self.cmp_steepness(a, b))
                .unwrap();
            self.dcel[champion].wedge_steepest = true;
            if steepest.is_end() || self.cmp_steepness(champion, steepest) == Ordering::Less {
                steepest = champion;
            }
        }
        self.dcel[steepest].steepest = true;
        self.dcel[v].steepest_descent_edge = steepest;
    }

    /// Groups a rotation into maximal runs of descending edges. A vertex
    /// whose outgoing edges all descend yields a single wedge.
    fn down_wedges_of_rotation(&self, rotation: &[HalfEdgeIndex]) -> Vec<Vec<HalfEdgeIndex>> {
        let start = rotation
            .iter()
            .position(|&e| !self.dcel[e].descending)
            .unwrap_or(0);

        let mut wedges: Vec<Vec<HalfEdgeIndex>> = Vec::new();
        let mut in_wedge = false;
        for i in 0..rotation.len() {
            let e = rotation[(start + i) % rotation.len()];
            if self.dcel[e].descending {
                if !in_wedge {
                    wedges.push(Vec::new());
                    in_wedge = true;
                }
                wedges.last_mut().unwrap().push(e);
            } else {
                in_wedge = false;
            }
        }
        wedges
    }

    /// The number of down-wedges of `v`. After
    /// [`InputDcel::split_monkey_saddles`], this is at most two for every
    /// vertex.
    pub fn down_wedge_count(&self, v: VertexIndex) -> usize {
        let rotation: Vec<HalfEdgeIndex> = self.dcel.outgoing_edges(v).collect();
        self.down_wedges_of_rotation(&rotation).len()
    }

    /// Splits every monkey saddle (three or more down-wedges) into simple
    /// saddles with exactly two down-wedges each.
    ///
    /// Splitting is purely combinatorial: a clone vertex with the same
    /// point takes over two consecutive down-wedges, and a zero-length edge
    /// pair between the original and the clone is spliced into both
    /// rotations, which keeps the Euler characteristic intact. The clone
    /// counts as infinitesimally lower than the original, so the connecting
    /// edge descends from the original to the clone.
    pub fn split_monkey_saddles(&mut self) {
        let original_count = self.dcel.vertex_count();
        for i in 0..original_count {
            let v = VertexIndex::new(i);
            while self.down_wedge_count(v) > 2 {
                self.peel_saddle(v);
            }
        }
        log::debug!(
            "split monkey saddles: {} clone(s)",
            self.dcel.vertex_count() - original_count
        );
    }

    /// Splits one simple saddle off the monkey saddle `v`.
    fn peel_saddle(&mut self, v: VertexIndex) {
        let rotation: Vec<HalfEdgeIndex> = self.dcel.outgoing_edges(v).collect();
        let start = rotation
            .iter()
            .position(|&e| !self.dcel[e].descending)
            .expect("monkey saddle has an up-wedge");
        let rotated: Vec<HalfEdgeIndex> = (0..rotation.len())
            .map(|i| rotation[(start + i) % rotation.len()])
            .collect();

        // ranges of the down-wedges within `rotated`
        let mut wedge_ranges: Vec<(usize, usize)> = Vec::new();
        let mut in_wedge = false;
        for (i, &e) in rotated.iter().enumerate() {
            if self.dcel[e].descending {
                if !in_wedge {
                    wedge_ranges.push((i, i));
                    in_wedge = true;
                } else {
                    wedge_ranges.last_mut().unwrap().1 = i;
                }
            } else {
                in_wedge = false;
            }
        }
        debug_assert!(wedge_ranges.len() >= 3);

        // the clone takes the second and third down-wedge, and everything
        // between them
        let arc_start = wedge_ranges[1].0;
        let arc_end = wedge_ranges[2].1;
        let before = rotated[arc_start - 1];
        let after = rotated[(arc_end + 1) % rotated.len()];
        let first = rotated[arc_start];
        let last = rotated[arc_end];
        let arc = &rotated[arc_start..=arc_end];

        let p = self.dcel[v].p;
        let clone = self.dcel.add_vertex(InputVertex {
            p,
            kind: VertexType::Saddle,
            steepest_descent_edge: HalfEdgeIndex::end(),
            ms_vertex: VertexIndex::end(),
        });

        let arc: Vec<HalfEdgeIndex> = arc.to_vec();
        for &e in &arc {
            self.dcel.set_origin(e, clone);
        }

        let (t1, t2) = self.dcel.add_edge_pair(
            v,
            clone,
            InputHalfEdge::default(),
            InputHalfEdge::default(),
        );

        // faces of the two corners the new edge pair is inserted into
        let face_before = self.dcel.face_of(before.twin());
        let face_after = self.dcel.face_of(last.twin());

        // splice the pair into the rotations of `v` and the clone
        self.dcel.set_next(before.twin(), t1);
        self.dcel.set_next(t2, after);
        self.dcel.set_next(last.twin(), t2);
        self.dcel.set_next(t1, first);
        self.dcel.set_face_of(t1, face_before);
        self.dcel.set_face_of(t2, face_after);

        self.dcel.set_outgoing(clone, first);
        if arc.contains(&self.dcel.outgoing(v)) {
            self.dcel.set_outgoing(v, t1);
        }

        self.classify_vertex(v);
        self.classify_vertex(clone);
    }

    /// The path obtained by following `start` and then repeatedly the
    /// steepest-descent edge, until a minimum is reached. `start` must be a
    /// descending edge.
    pub fn steepest_descent_path(&self, start: HalfEdgeIndex) -> DcelPath {
        debug_assert!(self.dcel[start].descending);
        let mut edges = vec![start];
        let mut v = self.destination(start);
        loop {
            let e = self.dcel[v].steepest_descent_edge;
            if e.is_end() {
                break;
            }
            edges.push(e);
            v = self.destination(e);
        }
        DcelPath { edges }
    }

    pub fn path_origin(&self, path: &DcelPath) -> VertexIndex {
        self.origin(path.edges[0])
    }

    pub fn path_destination(&self, path: &DcelPath) -> VertexIndex {
        self.destination(*path.edges.last().unwrap())
    }

    /// All vertex points along a path, including both endpoints.
    pub fn path_points(&self, path: &DcelPath) -> Vec<Point> {
        let mut points: Vec<Point> = path
            .edges
            .iter()
            .map(|&e| self.dcel[self.origin(e)].p)
            .collect();
        points.push(self.dcel[self.path_destination(path)].p);
        points
    }

    /// Whether `f` is a proper triangle; faces stretched by monkey-saddle
    /// splitting have four boundary edges.
    pub fn is_triangle(&self, f: FaceIndex) -> bool {
        self.dcel.face_edges(f).count() == 3
    }

    /// The function mapping a water level to the volume of this triangle
    /// above that level.
    ///
    /// The result has a linear piece below the lowest corner, up to two
    /// cubic pieces between the corners, and is zero above the highest
    /// corner. All corners must be finite; callers skip triangles touching
    /// the `-inf` source and sink.
    pub fn volume_above_function(&self, f: FaceIndex) -> PiecewiseCubicFunction {
        let (a, b, c) = self
            .dcel
            .face_edges(f)
            .map(|e| self.dcel[self.origin(e)].p.h)
            .collect_tuple()
            .expect("volume of a non-triangle face");
        debug_assert!([a, b, c].iter().all(|h| h.is_finite()));

        let mut h = [a, b, c];
        h.sort_by(f64::total_cmp);
        let [h1, h2, h3] = h;
        let area = 0.5 * self.units.x_resolution * self.units.y_resolution;
        let mean = (h1 + h2 + h3) / 3.0;

        let mut breakpoints = vec![h1];
        let mut pieces = vec![Cubic::new(area * mean, -area, 0.0, 0.0)];
        if h2 > h1 {
            // rising part of the deficit near the lowest corner
            let k = area / (3.0 * (h2 - h1) * (h3 - h1));
            pieces.push(Cubic::new(
                area * mean - k * h1.powi(3),
                -area + 3.0 * k * h1 * h1,
                -3.0 * k * h1,
                k,
            ));
            breakpoints.push(h2);
        }
        if h3 > h2 {
            // shrinking cap near the highest corner
            let m = area / (3.0 * (h3 - h1) * (h3 - h2));
            pieces.push(Cubic::new(
                m * h3.powi(3),
                -3.0 * m * h3 * h3,
                3.0 * m * h3,
                -m,
            ));
            breakpoints.push(h3);
        }
        pieces.push(Cubic::ZERO);

        PiecewiseCubicFunction::new(breakpoints, pieces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dcel_for(widths: i32, heights: i32, data: Vec<u32>) -> InputDcel {
        let map = HeightMap::new(widths, heights, data);
        let boundary = Boundary::around(&map);
        InputDcel::new(&map, &boundary, Units::default())
    }

    #[test]
    fn pit_is_a_minimum() {
        let dcel = dcel_for(
            5,
            5,
            vec![
                10, 10, 10, 10, 10, //
                10, 10, 10, 10, 10, //
                10, 10, 0, 10, 10, //
                10, 10, 10, 10, 10, //
                10, 10, 10, 10, 10,
            ],
        );
        let pit = dcel
            .vertex_indices()
            .find(|&v| dcel.vertex(v).p.x == 2 && dcel.vertex(v).p.y == 2)
            .unwrap();
        assert_eq!(dcel.vertex(pit).kind, VertexType::Minimum);
        assert!(dcel.vertex(pit).steepest_descent_edge.is_end());
    }

    #[test]
    fn interior_points_descend_to_a_minimum() {
        let dcel = dcel_for(
            5,
            5,
            vec![
                10, 10, 10, 10, 10, //
                10, 9, 8, 7, 10, //
                10, 8, 6, 4, 10, //
                10, 7, 4, 2, 10, //
                10, 10, 10, 10, 10,
            ],
        );
        for v in dcel.vertex_indices() {
            let vertex = dcel.vertex(v);
            if vertex.kind == VertexType::Minimum {
                continue;
            }
            let start = vertex.steepest_descent_edge;
            let path = dcel.steepest_descent_path(start);
            let end = dcel.path_destination(&path);
            assert_eq!(dcel.vertex(end).kind, VertexType::Minimum);
        }
    }

    #[test]
    fn no_monkey_saddles_after_splitting() {
        // three pits in alternating directions around (3, 3) produce a
        // monkey saddle there
        let mut data = vec![40u32; 49];
        let set = |data: &mut Vec<u32>, x: usize, y: usize, h: u32| data[y * 7 + x] = h;
        set(&mut data, 3, 3, 30);
        set(&mut data, 2, 2, 1);
        set(&mut data, 4, 3, 2);
        set(&mut data, 3, 4, 3);
        let mut dcel = dcel_for(7, 7, data);
        dcel.split_monkey_saddles();
        for v in dcel.vertex_indices() {
            assert!(
                dcel.down_wedge_count(v) <= 2,
                "vertex {:?} still has {} down-wedges",
                v,
                dcel.down_wedge_count(v)
            );
        }
    }

    #[test]
    fn volume_above_matches_hand_computation() {
        let dcel = dcel_for(
            4,
            4,
            vec![
                20, 20, 20, 20, //
                20, 0, 3, 20, //
                20, 6, 6, 20, //
                20, 20, 20, 20,
            ],
        );
        // triangle (1,1)-(2,1)-(2,2) has corner heights 0, 3, 6
        let f = dcel
            .face_indices()
            .find(|&f| {
                let mut h: Vec<f64> = dcel
                    .dcel
                    .face_edges(f)
                    .map(|e| dcel.vertex(dcel.origin(e)).p.h)
                    .collect();
                h.sort_by(f64::total_cmp);
                h == vec![0.0, 3.0, 6.0]
            })
            .unwrap();
        let volume = dcel.volume_above_function(f);
        assert_relative_eq!(volume.value_at(0.0), 1.5);
        assert_relative_eq!(volume.value_at(3.0), 0.25);
        assert_relative_eq!(volume.value_at(6.0), 0.0);
        assert_relative_eq!(volume.value_at(-2.0), 2.5);
        assert_relative_eq!(volume.value_at(100.0), 0.0);
    }
}
