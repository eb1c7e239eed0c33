use std::collections::VecDeque;

use crate::dcel::{FaceIndex, HalfEdgeIndex, VertexIndex};
use crate::input_dcel::{DcelPath, InputDcel, VertexType};
use crate::ms_complex::{MsComplex, MsHalfEdge, MsVertex};
use crate::piecewise::PiecewiseCubicFunction;
use crate::progress::Progress;
use crate::unionfind::UnionFind;

/// Builds a [`MsComplex`] on top of a classified input mesh.
///
/// The construction runs in phases: complex vertices for all minima and
/// saddles, half-edges by walking the steepest-descent trees around each
/// minimum, the rotation order around saddles, faces, the assignment of
/// mesh edges and triangles to complex faces, persistence, and finally the
/// sand function of every face.
pub struct MsComplexCreator<'a> {
    dcel: &'a mut InputDcel,
    msc: &'a mut MsComplex,
    progress: Progress<'a>,
}

impl<'a> MsComplexCreator<'a> {
    pub fn new(dcel: &'a mut InputDcel, msc: &'a mut MsComplex, progress: Progress<'a>) -> Self {
        MsComplexCreator {
            dcel,
            msc,
            progress,
        }
    }

    pub fn create(&mut self) {
        self.progress.signal(0);

        // vertices for all minima and saddles
        for v in self.dcel.vertex_indices().collect::<Vec<_>>() {
            let kind = self.dcel.vertex(v).kind;
            if kind == VertexType::Minimum || kind == VertexType::Saddle {
                let p = self.dcel.vertex(v).p;
                let ms = self.msc.dcel.add_vertex(MsVertex {
                    p,
                    dcel_vertex: v,
                    kind,
                });
                self.dcel.dcel[v].ms_vertex = ms;
            }
        }
        self.progress.signal(10);

        for m in self.ms_vertices_of_kind(VertexType::Minimum) {
            self.add_edges_from_minimum(m);
        }
        self.progress.signal(30);

        for s in self.ms_vertices_of_kind(VertexType::Saddle) {
            self.add_edge_order_around_saddle(s);
        }
        self.progress.signal(50);

        self.msc.dcel.add_faces();
        self.progress.signal(60);

        for m in self.ms_vertices_of_kind(VertexType::Minimum) {
            self.set_dcel_ms_faces_around_minimum(m);
        }
        self.progress.signal(70);

        for f in self.msc.face_indices().collect::<Vec<_>>() {
            self.set_dcel_faces_of_face(f);
        }
        debug_assert_eq!(
            self.msc
                .face_indices()
                .map(|f| self.msc.face(f).triangles.len())
                .sum::<usize>(),
            self.dcel.face_count()
        );
        self.progress.signal(80);

        self.compute_persistence();
        self.progress.signal(90);

        for f in self.msc.face_indices().collect::<Vec<_>>() {
            self.set_sand_function_of_face(f);
        }
        self.progress.signal(100);

        log::debug!(
            "Morse-Smale complex: {} vertices, {} half-edges, {} faces",
            self.msc.vertex_count(),
            self.msc.half_edge_count(),
            self.msc.face_count()
        );
    }

    fn ms_vertices_of_kind(&self, kind: VertexType) -> Vec<VertexIndex> {
        self.msc
            .vertex_indices()
            .filter(|&v| self.msc.vertex(v).kind == kind)
            .collect()
    }

    /// Adds the half-edge pairs between the minimum `m` and every saddle
    /// whose steepest-descent path ends in `m`, in the cyclic order around
    /// `m` that the paths arrive in. That order later determines the face
    /// boundaries of the complex.
    fn add_edges_from_minimum(&mut self, m: VertexIndex) {
        let m_dcel = self.msc.vertex(m).dcel_vertex;
        let order = self.saddle_order(m_dcel);

        let mut added = Vec::with_capacity(order.len());
        for path in order {
            let first = path.edges[0];
            debug_assert!(self.dcel.dcel[first].ms_half_edge.is_end());

            let saddle = self.dcel.vertex(self.dcel.path_origin(&path)).ms_vertex;
            let (edge, twin) = self.msc.dcel.add_edge_pair(
                m,
                saddle,
                MsHalfEdge::default(),
                MsHalfEdge {
                    dcel_path: Some(path),
                    delta: 0.0,
                },
            );
            self.dcel.dcel[first].ms_half_edge = twin;
            added.push(edge);
        }

        for i in 0..added.len() {
            let edge = added[i];
            let next_edge = added[(i + 1) % added.len()];
            if i == 0 {
                self.msc.dcel.set_outgoing(m, edge);
            }
            self.msc.dcel.set_next(edge.twin(), next_edge);
        }
    }

    /// Enumerates, in rotation order around the minimum `m_dcel`, the
    /// steepest-descent paths of all saddles that drain into it.
    ///
    /// This walks the tree formed by the incoming wedge-steepest edges of
    /// `m_dcel` with an explicit stack, so arbitrarily large meshes do not
    /// overflow the call stack.
    fn saddle_order(&self, m_dcel: VertexIndex) -> Vec<DcelPath> {
        let mut order = Vec::new();
        let mut stack: Vec<(HalfEdgeIndex, HalfEdgeIndex)> = Vec::new();

        // either emits the saddle's path right away, or opens a frame to
        // explore the vertices draining through `wsde`'s origin
        fn visit(
            dcel: &InputDcel,
            wsde: HalfEdgeIndex,
            order: &mut Vec<DcelPath>,
            stack: &mut Vec<(HalfEdgeIndex, HalfEdgeIndex)>,
        ) {
            debug_assert!(dcel.dcel[wsde].wedge_steepest);
            let v = dcel.origin(wsde);
            if dcel.vertex(v).kind == VertexType::Saddle && !dcel.dcel[wsde].steepest {
                order.push(dcel.steepest_descent_path(wsde));
            } else {
                stack.push((wsde, wsde));
            }
        }

        let rotation: Vec<HalfEdgeIndex> = self.dcel.dcel.outgoing_edges(m_dcel).collect();
        for edge in rotation {
            if self.dcel.dcel[edge.twin()].wedge_steepest {
                visit(self.dcel, edge.twin(), &mut order, &mut stack);
            }
            while let Some(&(wsde, cursor)) = stack.last() {
                let e = self.dcel.dcel.next_outgoing(cursor);
                if e == wsde {
                    stack.pop();
                    continue;
                }
                stack.last_mut().unwrap().1 = e;
                if self.dcel.dcel[e.twin()].wedge_steepest {
                    visit(self.dcel, e.twin(), &mut order, &mut stack);
                } else if self.dcel.dcel[e].wedge_steepest {
                    // the other down-wedge of a saddle that drains into `m`
                    debug_assert_eq!(self.dcel.vertex(self.dcel.origin(e)).kind, VertexType::Saddle);
                    order.push(self.dcel.steepest_descent_path(wsde));
                }
            }
        }

        order
    }

    /// Threads the Morse–Smale half-edges of the saddle `s` into the cyclic
    /// order its wedge-steepest edges have in the input mesh.
    fn add_edge_order_around_saddle(&mut self, s: VertexIndex) {
        let s_dcel = self.msc.vertex(s).dcel_vertex;
        let wedge_edges: Vec<HalfEdgeIndex> = self
            .dcel
            .dcel
            .outgoing_edges(s_dcel)
            .filter(|&e| self.dcel.dcel[e].wedge_steepest)
            .collect();
        debug_assert_eq!(wedge_edges.len(), 2);

        let first_ms = self.dcel.dcel[wedge_edges[0]].ms_half_edge;
        debug_assert!(!first_ms.is_end());
        self.msc.dcel.set_outgoing(s, first_ms);

        let mut prev_ms = first_ms;
        for &w in wedge_edges[1..].iter().chain(&wedge_edges[..1]) {
            let cur_ms = self.dcel.dcel[w].ms_half_edge;
            debug_assert!(!cur_ms.is_end());
            self.msc.dcel.set_next(prev_ms.twin(), cur_ms);
            prev_ms = cur_ms;
        }
    }

    /// Assigns the mesh edges of the steepest-descent paths around the
    /// minimum `m` to the Morse–Smale faces on their two sides. Where two
    /// neighboring paths share a suffix, the shared part separates nothing
    /// and is skipped.
    fn set_dcel_ms_faces_around_minimum(&mut self, m: VertexIndex) {
        for edge in self.msc.outgoing_edges(m) {
            let next = self.msc.dcel.next_outgoing(edge);
            let p1 = self.msc.dcel[edge.twin()]
                .dcel_path
                .clone()
                .expect("saddle edge without path");
            let p2 = self.msc.dcel[next.twin()]
                .dcel_path
                .clone()
                .expect("saddle edge without path");

            let mut j = 0;
            while j < p1.len()
                && j < p2.len()
                && p1.edges[p1.len() - 1 - j] == p2.edges[p2.len() - 1 - j]
            {
                j += 1;
            }

            let face1 = self.msc.face_of(edge.twin());
            let face2 = self.msc.face_of(next);
            for k in 0..p1.len() - j {
                // paths towards different minima never share mesh edges, so
                // each assignment happens only once
                debug_assert!(self.dcel.dcel[p1.edges[k]].incident_ms_face.is_end());
                self.dcel.dcel[p1.edges[k]].incident_ms_face = face1;
            }
            for k in 0..p2.len() - j {
                debug_assert!(self.dcel.dcel[p2.edges[k].twin()].incident_ms_face.is_end());
                self.dcel.dcel[p2.edges[k].twin()].incident_ms_face = face2;
            }
        }
    }

    /// Collects the mesh triangles inside the Morse–Smale face `f` by
    /// flood fill, and finds the face's maximum and the minimum reachable
    /// from it.
    fn set_dcel_faces_of_face(&mut self, f: FaceIndex) {
        let boundary = self.msc.dcel.boundary(f);
        let saddle = if self.msc.vertex(self.msc.origin(boundary)).kind == VertexType::Saddle {
            self.msc.origin(boundary)
        } else {
            self.msc.destination(boundary)
        };
        debug_assert_eq!(self.msc.vertex(saddle).kind, VertexType::Saddle);

        // seed: an outgoing mesh edge of the saddle that borders `f`
        let s_dcel = self.msc.vertex(saddle).dcel_vertex;
        let mut seed = HalfEdgeIndex::end();
        for e in self.dcel.dcel.outgoing_edges(s_dcel) {
            if self.dcel.dcel[e].incident_ms_face == f {
                seed = e;
                break;
            }
        }
        if seed.is_end() {
            // with a single face in the complex every choice is equivalent
            debug_assert_eq!(self.msc.face_count(), 1);
            seed = self.dcel.dcel.outgoing(s_dcel);
        }
        let mut start_face = self.dcel.dcel.face_of(seed);
        if start_face.is_end() {
            start_face = self.dcel.dcel.face_of(seed.twin());
        }
        debug_assert!(!start_face.is_end());

        let mut triangles = vec![start_face];
        self.dcel.dcel[start_face].ms_face = f;
        let mut maximum = VertexIndex::end();
        self.update_maximum(start_face, &mut maximum);

        let mut i = 0;
        while i < triangles.len() {
            let face = triangles[i];
            i += 1;
            let edges: Vec<HalfEdgeIndex> = self.dcel.dcel.face_edges(face).collect();
            for e in edges {
                if !self.dcel.dcel[e].incident_ms_face.is_end() {
                    // a path bordering this face; do not cross
                    debug_assert_eq!(self.dcel.dcel[e].incident_ms_face, f);
                    continue;
                }
                let opposite = self.dcel.dcel.face_of(e.twin());
                if opposite.is_end() {
                    continue;
                }
                if !self.dcel.dcel[opposite].ms_face.is_end() {
                    debug_assert_eq!(self.dcel.dcel[opposite].ms_face, f);
                    continue;
                }
                self.dcel.dcel[opposite].ms_face = f;
                triangles.push(opposite);
                self.update_maximum(opposite, &mut maximum);
            }
        }

        debug_assert!(!maximum.is_end());
        let descent = self.dcel.vertex(maximum).steepest_descent_edge;
        debug_assert!(!descent.is_end());
        let path = self.dcel.steepest_descent_path(descent);
        let lowest = self.dcel.vertex(self.dcel.path_destination(&path)).ms_vertex;

        let face = &mut self.msc.dcel[f];
        face.triangles = triangles;
        face.maximum = maximum;
        face.lowest_path_vertex = lowest;
    }

    fn update_maximum(&self, triangle: FaceIndex, maximum: &mut VertexIndex) {
        for e in self.dcel.dcel.face_edges(triangle) {
            let v = self.dcel.origin(e);
            if maximum.is_end()
                || self.dcel.cmp_vertices(v, *maximum) == std::cmp::Ordering::Greater
            {
                *maximum = v;
            }
        }
    }

    /// Computes the persistence of every face: saddles are processed from
    /// high to low; at each saddle, the neighboring face components merge
    /// into the one with the highest maximum, and every merged face is
    /// paired with the saddle at height difference `maximum - saddle`.
    fn compute_persistence(&mut self) {
        let mut saddles = self.ms_vertices_of_kind(VertexType::Saddle);
        saddles.sort_by(|&a, &b| self.msc.cmp_vertices(b, a));

        let mut uf = UnionFind::new(self.msc.face_count());

        for s in saddles {
            let mut neighboring: Vec<FaceIndex> = self
                .msc
                .outgoing_edges(s)
                .iter()
                .map(|&e| FaceIndex::new(uf.find(self.msc.face_of(e).index())))
                .collect();
            neighboring.sort_unstable();
            neighboring.dedup();

            let highest = *neighboring
                .iter()
                .max_by(|&&a, &&b| {
                    self.dcel
                        .cmp_vertices(self.msc.face(a).maximum, self.msc.face(b).maximum)
                })
                .expect("saddle without neighboring faces");

            if neighboring.len() > 1 {
                let saddle_height = self.msc.vertex(s).p.h;
                for f in neighboring {
                    if f != highest {
                        uf.merge(highest.index(), f.index());
                        let max_height = self.dcel.vertex(self.msc.face(f).maximum).p.h;
                        let face = &mut self.msc.dcel[f];
                        face.persistence = max_height - saddle_height;
                        face.paired_saddle = s;
                    }
                }
            }
        }
    }

    /// Sums the volume-above functions of the face's triangles, pairwise to
    /// keep the merged breakpoint lists balanced. Triangles touching the
    /// `-inf` source or sink, and the degenerate quads left by
    /// monkey-saddle splitting, contribute nothing.
    fn set_sand_function_of_face(&mut self, f: FaceIndex) {
        let mut queue: VecDeque<PiecewiseCubicFunction> = VecDeque::new();
        for &tri in &self.msc.face(f).triangles {
            if !self.dcel.is_triangle(tri) {
                continue;
            }
            let finite = self
                .dcel
                .dcel
                .face_edges(tri)
                .all(|e| self.dcel.vertex(self.dcel.origin(e)).p.h.is_finite());
            if !finite {
                continue;
            }
            queue.push_back(self.dcel.volume_above_function(tri));
        }

        if queue.is_empty() {
            self.msc.dcel[f].volume_above = PiecewiseCubicFunction::zero();
            return;
        }
        while queue.len() > 1 {
            let f1 = queue.pop_front().unwrap();
            let f2 = queue.pop_front().unwrap();
            queue.push_back(f1.add(&f2));
        }
        self.msc.dcel[f].volume_above = queue.pop_front().unwrap();
    }
}
