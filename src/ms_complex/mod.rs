//! The Morse–Smale complex of a height map.
//!
//! Vertices are the minima and saddles of the input mesh; every saddle has
//! one outgoing half-edge per down-wedge, leading to the minimum its
//! steepest-descent path ends in. Faces carry the triangles of the input
//! mesh that drain through them, their highest boundary point, the
//! persistence value of that maximum, and the sand function of the face.

mod creator;
mod simplifier;

pub use creator::MsComplexCreator;
pub use simplifier::MsComplexSimplifier;

use fixedbitset::FixedBitSet;

use crate::dcel::{Dcel, FaceIndex, HalfEdgeIndex, VertexIndex};
use crate::input_dcel::{DcelPath, VertexType};
use crate::piecewise::PiecewiseCubicFunction;
use crate::point::Point;

/// Data of a Morse–Smale vertex (a minimum or saddle of the input mesh).
#[derive(Clone, Debug)]
pub struct MsVertex {
    pub p: Point,
    /// The input-mesh vertex this vertex was made from.
    pub dcel_vertex: VertexIndex,
    pub kind: VertexType,
}

/// Data of a Morse–Smale half-edge.
#[derive(Clone, Debug, Default)]
pub struct MsHalfEdge {
    /// For saddle-to-minimum half-edges, the steepest-descent path in the
    /// input mesh that realizes this edge.
    pub dcel_path: Option<DcelPath>,
    /// The sand-volume significance of this edge; assigned by the
    /// simplifier from the persistence of the bordering faces.
    pub delta: f64,
}

/// Data of a Morse–Smale face.
#[derive(Clone, Debug)]
pub struct MsFace {
    /// The input-mesh triangles inside this face.
    pub triangles: Vec<FaceIndex>,
    /// The highest input-mesh vertex on the face, by simulation of
    /// simplicity.
    pub maximum: VertexIndex,
    /// How long this face survives persistence simplification: the height
    /// difference between its maximum and the saddle that merges it away.
    /// The globally oldest face keeps `+inf`.
    pub persistence: f64,
    /// The saddle at which this face was merged during persistence
    /// computation; `end()` for the surviving face.
    pub paired_saddle: VertexIndex,
    /// The sand function of the face: water level to volume above it.
    pub volume_above: PiecewiseCubicFunction,
    /// The Morse–Smale vertex reached by steepest descent from the face's
    /// maximum.
    pub lowest_path_vertex: VertexIndex,
}

impl Default for MsFace {
    fn default() -> Self {
        MsFace {
            triangles: Vec::new(),
            maximum: VertexIndex::end(),
            persistence: f64::INFINITY,
            paired_saddle: VertexIndex::end(),
            volume_above: PiecewiseCubicFunction::zero(),
            lowest_path_vertex: VertexIndex::end(),
        }
    }
}

/// The Morse–Smale complex itself: a half-edge graph over minima and
/// saddles, plus removal marks used while the complex is being simplified.
#[derive(Clone, Debug, Default)]
pub struct MsComplex {
    pub(crate) dcel: Dcel<MsVertex, MsHalfEdge, MsFace>,
    pub(crate) removed_vertices: FixedBitSet,
    pub(crate) removed_half_edges: FixedBitSet,
    pub(crate) removed_faces: FixedBitSet,
}

impl MsComplex {
    pub fn new() -> Self {
        MsComplex::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.dcel.vertex_count()
    }

    pub fn half_edge_count(&self) -> usize {
        self.dcel.half_edge_count()
    }

    pub fn face_count(&self) -> usize {
        self.dcel.face_count()
    }

    pub fn vertex(&self, v: VertexIndex) -> &MsVertex {
        &self.dcel[v]
    }

    pub fn half_edge(&self, e: HalfEdgeIndex) -> &MsHalfEdge {
        &self.dcel[e]
    }

    pub fn face(&self, f: FaceIndex) -> &MsFace {
        &self.dcel[f]
    }

    pub fn vertex_indices(&self) -> impl Iterator<Item = VertexIndex> {
        self.dcel.vertex_indices()
    }

    pub fn half_edge_indices(&self) -> impl Iterator<Item = HalfEdgeIndex> {
        self.dcel.half_edge_indices()
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

    pub fn face_of(&self, e: HalfEdgeIndex) -> FaceIndex {
        self.dcel.face_of(e)
    }

    /// The outgoing half-edges of `v`, in rotation order.
    pub fn outgoing_edges(&self, v: VertexIndex) -> Vec<HalfEdgeIndex> {
        self.dcel.outgoing_edges(v).collect()
    }

    /// The steepest-descent path of the saddle-to-minimum half-edge `e` (or
    /// of its twin, for minimum-to-saddle edges).
    pub fn dcel_path(&self, e: HalfEdgeIndex) -> &DcelPath {
        self.dcel[e]
            .dcel_path
            .as_ref()
            .or_else(|| self.dcel[e.twin()].dcel_path.as_ref())
            .expect("half-edge without a stored path")
    }

    /// Compares two vertices by simulation of simplicity, with the vertex
    /// index (reversed) as the final tie-breaker for monkey-saddle clones.
    pub fn cmp_vertices(&self, a: VertexIndex, b: VertexIndex) -> std::cmp::Ordering {
        self.dcel[a]
            .p
            .cmp(&self.dcel[b].p)
            .then_with(|| a.index().cmp(&b.index()).reverse())
    }

    pub fn is_vertex_removed(&self, v: VertexIndex) -> bool {
        self.removed_vertices.contains(v.index())
    }

    pub fn is_half_edge_removed(&self, e: HalfEdgeIndex) -> bool {
        self.removed_half_edges.contains(e.index())
    }

    pub fn is_face_removed(&self, f: FaceIndex) -> bool {
        self.removed_faces.contains(f.index())
    }

    pub(crate) fn grow_removal_marks(&mut self) {
        self.removed_vertices.grow(self.dcel.vertex_count());
        self.removed_half_edges.grow(self.dcel.half_edge_count());
        self.removed_faces.grow(self.dcel.face_count());
    }

    /// Rebuilds the arenas densely after simplification, dropping removed
    /// vertices, half-edges and faces and remapping all indices.
    ///
    /// Back-references from the input mesh into this complex are not
    /// updated; a compacted complex stands on its own.
    pub fn compact(&mut self) {
        if self.removed_vertices.count_ones(..) == 0
            && self.removed_half_edges.count_ones(..) == 0
            && self.removed_faces.count_ones(..) == 0
        {
            return;
        }

        let old = &self.dcel;
        let mut new = Dcel::new();

        let mut vertex_map = vec![VertexIndex::end(); old.vertex_count()];
        for v in old.vertex_indices() {
            if !self.removed_vertices.contains(v.index()) {
                vertex_map[v.index()] = new.add_vertex(old[v].clone());
            }
        }

        // twins are removed together, so surviving edges stay paired
        let mut edge_map = vec![HalfEdgeIndex::end(); old.half_edge_count()];
        for pair in 0..old.half_edge_count() / 2 {
            let e = HalfEdgeIndex::new(2 * pair);
            let t = e.twin();
            if self.removed_half_edges.contains(e.index()) {
                debug_assert!(self.removed_half_edges.contains(t.index()));
                continue;
            }
            let from = vertex_map[old.origin(e).index()];
            let to = vertex_map[old.origin(t).index()];
            debug_assert!(!from.is_end() && !to.is_end());
            let (a, b) = new.add_edge_pair(from, to, old[e].clone(), old[t].clone());
            edge_map[e.index()] = a;
            edge_map[t.index()] = b;
        }

        let mut face_map = vec![FaceIndex::end(); old.face_count()];
        for f in old.face_indices() {
            if !self.removed_faces.contains(f.index()) {
                let mut data = old[f].clone();
                data.paired_saddle = remap_vertex(&vertex_map, data.paired_saddle);
                data.lowest_path_vertex = remap_vertex(&vertex_map, data.lowest_path_vertex);
                face_map[f.index()] = new.add_face_raw(data);
            }
        }

        for e in old.half_edge_indices() {
            if self.removed_half_edges.contains(e.index()) {
                continue;
            }
            let mapped = edge_map[e.index()];
            let next = edge_map[old.next(e).index()];
            debug_assert!(!next.is_end());
            new.set_next(mapped, next);
            let face = face_map[old.face_of(e).index()];
            debug_assert!(!face.is_end());
            new.set_face_of(mapped, face);
            if new.boundary(face).is_end() {
                new.set_boundary(face, mapped);
            }
        }

        for v in old.vertex_indices() {
            if self.removed_vertices.contains(v.index()) {
                continue;
            }
            let outgoing = edge_map[old.outgoing(v).index()];
            debug_assert!(!outgoing.is_end());
            new.set_outgoing(vertex_map[v.index()], outgoing);
        }

        self.dcel = new;
        self.removed_vertices = FixedBitSet::with_capacity(self.dcel.vertex_count());
        self.removed_half_edges = FixedBitSet::with_capacity(self.dcel.half_edge_count());
        self.removed_faces = FixedBitSet::with_capacity(self.dcel.face_count());
    }
}

fn remap_vertex(map: &[VertexIndex], v: VertexIndex) -> VertexIndex {
    if v.is_end() {
        v
    } else {
        map[v.index()]
    }
}
