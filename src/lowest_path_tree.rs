use std::collections::VecDeque;

use fixedbitset::FixedBitSet;

use crate::dcel::{HalfEdgeIndex, VertexIndex};
use crate::input_dcel::VertexType;
use crate::ms_complex::MsComplex;
use crate::unionfind::UnionFind;
use crate::units::Units;

/// A spanning tree of the Morse–Smale complex that prefers low, gently
/// climbing connections, with direction pointers for O(1)-per-step path
/// reconstruction towards the source and the sink.
///
/// Saddles are processed from low to high; around each saddle, edges are
/// tried in order of least steepness (`destination height / edge length`,
/// ties by destination height) and accepted when they do not close a cycle.
pub struct LowestPathTree {
    source: VertexIndex,
    sink: VertexIndex,
    direction_to_source: Vec<HalfEdgeIndex>,
    direction_to_sink: Vec<HalfEdgeIndex>,
}

impl LowestPathTree {
    pub fn new(msc: &MsComplex, source: VertexIndex, sink: VertexIndex, units: Units) -> Self {
        let n = msc.vertex_count();

        // saddles reachable from the source, low to high
        let mut reachable = FixedBitSet::with_capacity(n);
        reachable.insert(source.index());
        let mut queue = VecDeque::from([source]);
        let mut saddles = Vec::new();
        while let Some(v) = queue.pop_front() {
            if msc.vertex(v).kind == VertexType::Saddle {
                saddles.push(v);
            }
            for e in msc.outgoing_edges(v) {
                let dest = msc.destination(e);
                if !reachable.contains(dest.index()) {
                    reachable.insert(dest.index());
                    queue.push_back(dest);
                }
            }
        }
        saddles.sort_by(|&a, &b| msc.cmp_vertices(a, b));

        // build the forest, avoiding cycles with a union-find
        let mut in_tree = FixedBitSet::with_capacity(msc.half_edge_count());
        let mut uf = UnionFind::new(n);
        for &s in &saddles {
            let mut neighbors = msc.outgoing_edges(s);
            let steepness = |e: &HalfEdgeIndex| {
                let p = msc.vertex(msc.destination(*e)).p;
                p.h / units.length(p, msc.vertex(s).p)
            };
            neighbors.sort_by(|a, b| {
                steepness(a).total_cmp(&steepness(b)).then_with(|| {
                    let pa = msc.vertex(msc.destination(*a)).p;
                    let pb = msc.vertex(msc.destination(*b)).p;
                    pa.h.total_cmp(&pb.h)
                        .then_with(|| msc.cmp_vertices(msc.destination(*a), msc.destination(*b)))
                })
            });
            for e in neighbors {
                let from = msc.origin(e).index();
                let to = msc.destination(e).index();
                if uf.find(from) != uf.find(to) {
                    in_tree.insert(e.index());
                    in_tree.insert(e.twin().index());
                    uf.merge(from, to);
                }
            }
        }

        let direction_to_source = Self::directions_from(msc, source, &in_tree, n);
        let direction_to_sink = Self::directions_from(msc, sink, &in_tree, n);

        LowestPathTree {
            source,
            sink,
            direction_to_source,
            direction_to_sink,
        }
    }

    /// BFS over the tree edges from `root`; every reached vertex gets a
    /// pointer to the half-edge leading one step back towards the root.
    fn directions_from(
        msc: &MsComplex,
        root: VertexIndex,
        in_tree: &FixedBitSet,
        n: usize,
    ) -> Vec<HalfEdgeIndex> {
        let mut directions = vec![HalfEdgeIndex::end(); n];
        let mut visited = FixedBitSet::with_capacity(n);
        visited.insert(root.index());
        let mut queue = VecDeque::from([root]);
        while let Some(v) = queue.pop_front() {
            for e in msc.outgoing_edges(v) {
                if !in_tree.contains(e.index()) {
                    continue;
                }
                let dest = msc.destination(e);
                if !visited.contains(dest.index()) {
                    visited.insert(dest.index());
                    directions[dest.index()] = e.twin();
                    queue.push_back(dest);
                }
            }
        }
        directions
    }

    /// The tree path from `from` to the source, as half-edges directed
    /// towards the source.
    pub fn lowest_path_to_source(&self, msc: &MsComplex, from: VertexIndex) -> Vec<HalfEdgeIndex> {
        self.walk(msc, from, &self.direction_to_source, self.source)
    }

    /// The tree path from `from` to the sink, as half-edges directed
    /// towards the sink.
    pub fn lowest_path_to_sink(&self, msc: &MsComplex, from: VertexIndex) -> Vec<HalfEdgeIndex> {
        self.walk(msc, from, &self.direction_to_sink, self.sink)
    }

    fn walk(
        &self,
        msc: &MsComplex,
        from: VertexIndex,
        directions: &[HalfEdgeIndex],
        target: VertexIndex,
    ) -> Vec<HalfEdgeIndex> {
        let mut path = Vec::new();
        let mut v = from;
        while !directions[v.index()].is_end() {
            let e = directions[v.index()];
            path.push(e);
            v = msc.destination(e);
        }
        debug_assert_eq!(v, target);
        path
    }
}
