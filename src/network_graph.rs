//! The output graph of the pipeline, and the two ways of producing it:
//! projecting a simplified Morse–Smale complex, or tracing the paths of a
//! striation-based network.

use fixedbitset::FixedBitSet;

use crate::dcel::HalfEdgeIndex;
use crate::input_dcel::{InputDcel, VertexType};
use crate::ms_complex::MsComplex;
use crate::network::Network;
use crate::point::Point;
use crate::progress::Progress;

/// A vertex of the representative network.
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkVertex {
    pub id: usize,
    pub p: Point,
    /// The ids of the edges incident to this vertex.
    pub incident_edges: Vec<usize>,
}

/// An edge of the representative network: a channel between two vertices,
/// traced as a polyline over the height map, with its δ significance.
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkEdge {
    pub id: usize,
    pub from: usize,
    pub to: usize,
    pub path: Vec<Point>,
    pub delta: f64,
}

/// A flat directed graph of channels.
#[derive(Clone, Debug, Default)]
pub struct NetworkGraph {
    vertices: Vec<NetworkVertex>,
    edges: Vec<NetworkEdge>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        NetworkGraph::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertex(&self, i: usize) -> &NetworkVertex {
        &self.vertices[i]
    }

    pub fn edge(&self, i: usize) -> &NetworkEdge {
        &self.edges[i]
    }

    pub fn vertices(&self) -> impl Iterator<Item = &NetworkVertex> {
        self.vertices.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &NetworkEdge> {
        self.edges.iter()
    }

    pub fn add_vertex(&mut self, p: Point) -> usize {
        let id = self.vertices.len();
        self.vertices.push(NetworkVertex {
            id,
            p,
            incident_edges: Vec::new(),
        });
        id
    }

    pub fn add_edge(&mut self, from: usize, to: usize, path: Vec<Point>, delta: f64) -> usize {
        let id = self.edges.len();
        self.edges.push(NetworkEdge {
            id,
            from,
            to,
            path,
            delta,
        });
        self.vertices[from].incident_edges.push(id);
        self.vertices[to].incident_edges.push(id);
        id
    }

    /// Removes every edge whose δ value is below `threshold`, re-numbering
    /// the remaining edges and rebuilding the incidence lists.
    pub fn filter_on_delta(&mut self, threshold: f64) {
        self.edges.retain(|e| e.delta >= threshold);
        for v in &mut self.vertices {
            v.incident_edges.clear();
        }
        for (id, e) in self.edges.iter_mut().enumerate() {
            e.id = id;
        }
        for id in 0..self.edges.len() {
            let (from, to) = (self.edges[id].from, self.edges[id].to);
            self.vertices[from].incident_edges.push(id);
            self.vertices[to].incident_edges.push(id);
        }
    }
}

/// Converts a (simplified and compacted) Morse–Smale complex into a
/// [`NetworkGraph`]: one graph vertex per complex vertex, one edge per
/// saddle-originating half-edge, traced along its steepest-descent path.
pub struct MsToNetworkGraphCreator<'a> {
    msc: &'a MsComplex,
    input: &'a InputDcel,
    graph: &'a mut NetworkGraph,
    progress: Progress<'a>,
}

impl<'a> MsToNetworkGraphCreator<'a> {
    pub fn new(
        msc: &'a MsComplex,
        input: &'a InputDcel,
        graph: &'a mut NetworkGraph,
        progress: Progress<'a>,
    ) -> Self {
        MsToNetworkGraphCreator {
            msc,
            input,
            graph,
            progress,
        }
    }

    pub fn create(&mut self) {
        self.progress.signal(0);

        for v in self.msc.vertex_indices() {
            self.graph.add_vertex(self.msc.vertex(v).p);
        }

        let total = self.msc.half_edge_count().max(1);
        for (i, e) in self.msc.half_edge_indices().enumerate() {
            self.progress.signal((100 * i / total) as u32);

            // every channel is stored on its saddle-originating half-edge
            if self.msc.vertex(self.msc.origin(e)).kind != VertexType::Saddle {
                continue;
            }
            let path = self.input.path_points(self.msc.dcel_path(e));
            let delta = self.msc.half_edge(e).delta;
            self.graph.add_edge(
                self.msc.origin(e).index(),
                self.msc.destination(e).index(),
                path,
                delta,
            );
        }

        self.progress.signal(100);
    }
}

/// Converts a striation network (a set of source-to-sink paths) into a
/// [`NetworkGraph`].
///
/// All half-edges used by any path are marked; a depth-first search from
/// the source then emits one graph edge per maximal run of marked edges.
/// With `simplify` set, *boring* vertices (one marked edge in and one out
/// that are not twins, or two marked twin pairs) are skipped, so runs
/// through degree-2 vertices collapse into single edges.
pub struct NetworkGraphCreator<'a> {
    msc: &'a MsComplex,
    input: &'a InputDcel,
    network: &'a Network,
    graph: &'a mut NetworkGraph,
    simplify: bool,
    marked: FixedBitSet,
    progress: Progress<'a>,
}

impl<'a> NetworkGraphCreator<'a> {
    pub fn new(
        msc: &'a MsComplex,
        input: &'a InputDcel,
        network: &'a Network,
        graph: &'a mut NetworkGraph,
        simplify: bool,
        progress: Progress<'a>,
    ) -> Self {
        NetworkGraphCreator {
            msc,
            input,
            network,
            graph,
            simplify,
            marked: FixedBitSet::with_capacity(msc.half_edge_count()),
            progress,
        }
    }

    pub fn create(&mut self) {
        self.progress.signal(0);
        if self.network.paths.is_empty() {
            return;
        }

        for path in &self.network.paths {
            for &e in &path.edges {
                self.marked.insert(e.index());
            }
        }

        let source = self.msc.origin(self.network.paths[0].edges[0]);

        let mut visited = FixedBitSet::with_capacity(self.msc.vertex_count());
        let mut graph_vertices = vec![usize::MAX; self.msc.vertex_count()];

        visited.insert(source.index());
        graph_vertices[source.index()] = self.graph.add_vertex(self.msc.vertex(source).p);

        let mut stack = vec![source];
        while let Some(v) = stack.pop() {
            for outgoing in self.msc.outgoing_edges(v) {
                if !self.marked.contains(outgoing.index()) {
                    continue;
                }
                let v_graph = graph_vertices[v.index()];
                let edges = self.edges_to_interesting_vertex(outgoing);
                let v_new = self.msc.destination(*edges.last().unwrap());
                let mut v_new_graph = graph_vertices[v_new.index()];
                if v_new_graph == usize::MAX {
                    v_new_graph = self.graph.add_vertex(self.msc.vertex(v_new).p);
                    graph_vertices[v_new.index()] = v_new_graph;
                }

                let mut points: Vec<Point> = Vec::new();
                for &edge in &edges {
                    let mut part = self.input.path_points(self.msc.dcel_path(edge));
                    if self.msc.vertex(self.msc.origin(edge)).kind != VertexType::Saddle {
                        // paths are stored from the saddle down
                        part.reverse();
                    }
                    if points.is_empty() {
                        points.extend(part);
                    } else {
                        debug_assert_eq!(*points.last().unwrap(), part[0]);
                        points.extend(part.into_iter().skip(1));
                    }
                }
                debug_assert!(!points.is_empty());

                self.graph.add_edge(v_graph, v_new_graph, points, 0.0);
                if !visited.contains(v_new.index()) {
                    visited.insert(v_new.index());
                    stack.push(v_new);
                }
            }
        }

        self.progress.signal(100);
    }

    /// Follows marked edges from `edge` until the next interesting vertex,
    /// returning all half-edges passed.
    fn edges_to_interesting_vertex(&self, edge: HalfEdgeIndex) -> Vec<HalfEdgeIndex> {
        let mut result = vec![edge];
        let mut edge = edge;
        while self.is_boring(self.msc.destination(edge)) {
            edge = self
                .other_marked_outgoing_edge(edge.twin())
                .expect("boring vertex without continuation");
            result.push(edge);
        }
        result
    }

    fn is_boring(&self, v: crate::dcel::VertexIndex) -> bool {
        if !self.simplify {
            return false;
        }

        let mut incoming = Vec::new();
        let mut outgoing = Vec::new();
        for e in self.msc.outgoing_edges(v) {
            if self.marked.contains(e.index()) {
                outgoing.push(e);
            }
            if self.marked.contains(e.twin().index()) {
                incoming.push(e.twin());
            }
        }

        (incoming.len() == 1
            && outgoing.len() == 1
            && !self.marked.contains(incoming[0].twin().index()))
            || (incoming.len() == 2
                && outgoing.len() == 2
                && self.marked.contains(incoming[0].twin().index())
                && self.marked.contains(incoming[1].twin().index()))
    }

    /// Another marked outgoing edge of `e`'s origin; if several exist, the
    /// last one in rotation order.
    fn other_marked_outgoing_edge(&self, e: HalfEdgeIndex) -> Option<HalfEdgeIndex> {
        let mut result = None;
        for other in self.msc.outgoing_edges(self.msc.origin(e)) {
            if other != e && self.marked.contains(other.index()) {
                result = Some(other);
            }
        }
        result
    }
}
