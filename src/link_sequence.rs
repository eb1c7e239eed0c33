use crate::network_graph::{NetworkEdge, NetworkGraph};
use crate::point::Point;

/// A maximal chain of network edges that share one δ value.
#[derive(Clone, Debug)]
pub struct Link {
    pub delta: f64,
    pub path: Vec<Point>,
}

/// The partition of a [`NetworkGraph`]'s edges into links.
///
/// Vertices 0 and 1 are taken to be the source and the sink and count as
/// visited from the start. Edges are considered from high δ to low; each
/// unvisited edge incident to a visited vertex starts a link, which then
/// greedily absorbs unvisited incident edges of the same δ. An edge whose
/// endpoints are both still unvisited starts a new link at its `from`
/// vertex, so every edge ends up in exactly one link.
#[derive(Clone, Debug)]
pub struct LinkSequence {
    links: Vec<Link>,
}

impl LinkSequence {
    pub fn new(graph: &NetworkGraph) -> Self {
        let mut visited_vertex = vec![false; graph.vertex_count()];
        for sentinel in [0, 1] {
            if sentinel < visited_vertex.len() {
                visited_vertex[sentinel] = true;
            }
        }
        let mut visited_edge = vec![false; graph.edge_count()];

        let mut order: Vec<usize> = (0..graph.edge_count()).collect();
        order.sort_by(|&a, &b| graph.edge(b).delta.total_cmp(&graph.edge(a).delta));

        let mut links = Vec::new();
        for id in order {
            if visited_edge[id] {
                continue;
            }
            let edge = graph.edge(id);
            let start = if visited_vertex[edge.from] {
                edge.from
            } else if visited_vertex[edge.to] {
                edge.to
            } else {
                edge.from
            };
            visited_vertex[start] = true;

            let delta = edge.delta;
            let mut link = Link {
                delta,
                path: vec![graph.vertex(start).p],
            };

            // consume the edge that started the link, then extend greedily
            visited_edge[id] = true;
            Self::append_edge_to_link(&mut link, graph, edge);
            let mut v = Self::other_end_of(edge, start);
            visited_vertex[v] = true;

            loop {
                let next = graph
                    .vertex(v)
                    .incident_edges
                    .iter()
                    .copied()
                    .find(|&i| !visited_edge[i] && graph.edge(i).delta == delta);
                let Some(next) = next else {
                    break;
                };
                visited_edge[next] = true;
                Self::append_edge_to_link(&mut link, graph, graph.edge(next));
                v = Self::other_end_of(graph.edge(next), v);
                visited_vertex[v] = true;
            }

            links.push(link);
        }

        LinkSequence { links }
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn link(&self, id: usize) -> &Link {
        &self.links[id]
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Appends the polyline of `e` to the link, reversed if needed so the
    /// endpoints match up.
    fn append_edge_to_link(link: &mut Link, graph: &NetworkGraph, e: &NetworkEdge) {
        debug_assert!(!link.path.is_empty());
        let last = *link.path.last().unwrap();
        if last == graph.vertex(e.from).p {
            link.path.extend(e.path.iter().skip(1).copied());
        } else {
            link.path.extend(e.path.iter().rev().skip(1).copied());
        }
    }

    fn other_end_of(e: &NetworkEdge, one_end: usize) -> usize {
        debug_assert!(one_end == e.from || one_end == e.to);
        if one_end == e.from {
            e.to
        } else {
            e.from
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_deltas(deltas: &[f64]) -> NetworkGraph {
        // a path graph source(0) - 2 - 3 - ... - sink(1)
        let mut graph = NetworkGraph::new();
        let source = graph.add_vertex(Point::new(0, 0, 0.0));
        let sink = graph.add_vertex(Point::new(deltas.len() as i32, 0, 0.0));
        let mut prev = source;
        for (i, &delta) in deltas.iter().enumerate() {
            let next = if i + 1 == deltas.len() {
                sink
            } else {
                graph.add_vertex(Point::new(i as i32 + 1, 0, 0.0))
            };
            let path = vec![graph.vertex(prev).p, graph.vertex(next).p];
            graph.add_edge(prev, next, path, delta);
            prev = next;
        }
        graph
    }

    #[test]
    fn equal_delta_run_becomes_one_link() {
        let graph = graph_with_deltas(&[5.0, 5.0, 5.0]);
        let links = LinkSequence::new(&graph);
        assert_eq!(links.link_count(), 1);
        assert_eq!(links.link(0).path.len(), 4);
        assert_eq!(links.link(0).delta, 5.0);
    }

    #[test]
    fn links_partition_the_edges() {
        let graph = graph_with_deltas(&[5.0, 2.0, 5.0, 7.0]);
        let links = LinkSequence::new(&graph);
        let segments: usize = links.links().map(|l| l.path.len() - 1).sum();
        assert_eq!(segments, graph.edge_count());
    }
}
