//! Randomized properties of the pipeline.

use quickcheck::{quickcheck, Arbitrary, Gen, TestResult};

use braidnet::{
    Boundary, HeightMap, InputDcel, LinkSequence, MsComplex, MsComplexCreator, NetworkGraph,
    Point, Progress, UnionFind, Units, VertexType,
};

/// A small random elevation model. Heights are drawn from a narrow range
/// so that plateaus and simulation-of-simplicity tie-breaking are
/// exercised constantly.
#[derive(Clone, Debug)]
struct Dem {
    width: i32,
    height: i32,
    data: Vec<u32>,
}

impl Arbitrary for Dem {
    fn arbitrary(g: &mut Gen) -> Self {
        let width = 4 + (u8::arbitrary(g) % 6) as i32;
        let height = 4 + (u8::arbitrary(g) % 4) as i32;
        let data = (0..width * height)
            .map(|_| u32::arbitrary(g) % 32)
            .collect();
        Dem {
            width,
            height,
            data,
        }
    }
}

fn build(dem: &Dem) -> (InputDcel, MsComplex) {
    let map = HeightMap::new(dem.width, dem.height, dem.data.clone());
    let boundary = Boundary::around(&map);
    let mut dcel = InputDcel::new(&map, &boundary, Units::default());
    dcel.split_monkey_saddles();
    let mut complex = MsComplex::new();
    MsComplexCreator::new(&mut dcel, &mut complex, Progress::none()).create();
    (dcel, complex)
}

/// Whether every complex vertex has at least one edge and all of them hang
/// together. The Euler and persistence properties below only apply to
/// connected complexes, which is the overwhelmingly common case.
fn is_connected(complex: &MsComplex) -> bool {
    let mut uf = UnionFind::new(complex.vertex_count());
    let mut any = None;
    for v in complex.vertex_indices() {
        let outgoing = complex.outgoing_edges(v);
        if outgoing.is_empty() {
            return false;
        }
        any = Some(v);
        for e in outgoing {
            uf.merge(v.index(), complex.destination(e).index());
        }
    }
    let Some(root) = any else {
        return false;
    };
    let root = uf.find(root.index());
    complex
        .vertex_indices()
        .all(|v| uf.find(v.index()) == root)
}

quickcheck! {
    /// On a connected complex, faces = edges - vertices + 2.
    fn prop_euler_formula(dem: Dem) -> TestResult {
        let (_, complex) = build(&dem);
        if !is_connected(&complex) {
            return TestResult::discard();
        }
        let v = complex.vertex_count() as isize;
        let e = (complex.half_edge_count() / 2) as isize;
        let f = complex.face_count() as isize;
        TestResult::from_bool(f == e - v + 2)
    }

    /// Every mesh triangle is assigned to exactly one complex face.
    fn prop_triangle_sum(dem: Dem) -> bool {
        let (dcel, complex) = build(&dem);
        complex
            .face_indices()
            .map(|f| complex.face(f).triangles.len())
            .sum::<usize>()
            == dcel.face_count()
    }

    /// Exactly one face outlives persistence computation.
    fn prop_single_infinite_face(dem: Dem) -> TestResult {
        let (_, complex) = build(&dem);
        if !is_connected(&complex) {
            return TestResult::discard();
        }
        let infinite = complex
            .face_indices()
            .filter(|&f| complex.face(f).persistence.is_infinite())
            .count();
        TestResult::from_bool(infinite == 1)
    }

    /// After splitting, no vertex keeps more than two down-wedges.
    fn prop_no_monkey_saddles(dem: Dem) -> bool {
        let (dcel, _) = build(&dem);
        dcel.vertex_indices().all(|v| dcel.down_wedge_count(v) <= 2)
    }

    /// Steepest descent from any non-minimal vertex ends in a minimum.
    fn prop_descent_terminates(dem: Dem) -> bool {
        let (dcel, _) = build(&dem);
        dcel.vertex_indices().all(|v| {
            let start = dcel.vertex(v).steepest_descent_edge;
            if start.is_end() {
                dcel.vertex(v).kind == VertexType::Minimum
            } else {
                let path = dcel.steepest_descent_path(start);
                dcel.vertex(dcel.path_destination(&path)).kind == VertexType::Minimum
            }
        })
    }

    /// Filtering on δ keeps exactly the edges at or above the threshold.
    fn prop_filter_on_delta(deltas: Vec<u16>, threshold: u16) -> bool {
        let mut graph = path_graph(&deltas);
        let expected = deltas
            .iter()
            .filter(|&&d| f64::from(d) >= f64::from(threshold))
            .count();
        graph.filter_on_delta(f64::from(threshold));
        graph.edge_count() == expected
            && graph.edges().all(|e| e.delta >= f64::from(threshold))
            && graph.edges().enumerate().all(|(i, e)| e.id == i)
    }

    /// A link sequence partitions the edges of the graph: every edge shows
    /// up as exactly one polyline segment of exactly one link.
    fn prop_links_partition_edges(deltas: Vec<u16>, parents: Vec<u16>) -> TestResult {
        if deltas.is_empty() {
            return TestResult::discard();
        }
        let graph = tree_graph(&deltas, &parents);
        let links = LinkSequence::new(&graph);
        let segments: usize = links.links().map(|l| l.path.len() - 1).sum();
        TestResult::from_bool(segments == graph.edge_count())
    }

    /// Writing a graph and parsing it back preserves its structure.
    fn prop_graph_roundtrip(deltas: Vec<u16>) -> bool {
        // identity units, so δ values survive the conversion to m³ exactly
        let units = Units {
            x_resolution: 1.0,
            y_resolution: 1.0,
            min_elevation: 0.0,
            max_elevation: 0xff_ff_ff as f64,
        };
        let graph = path_graph(&deltas);
        let mut buffer = Vec::new();
        braidnet::io::write_graph(&graph, &units, &mut buffer).unwrap();
        let parsed = braidnet::io::parse_graph(std::str::from_utf8(&buffer).unwrap()).unwrap();

        parsed.vertex_count() == graph.vertex_count()
            && parsed.edge_count() == graph.edge_count()
            && graph.edges().zip(parsed.edges()).all(|(a, b)| {
                a.from == b.from
                    && a.to == b.to
                    && a.delta == b.delta
                    && a.path.len() == b.path.len()
                    && a.path
                        .iter()
                        .zip(&b.path)
                        .all(|(p, q)| p.x == q.x && p.y == q.y)
            })
    }
}

/// A path graph `0 - 2 - 3 - ... - 1` with the given edge δ values.
fn path_graph(deltas: &[u16]) -> NetworkGraph {
    let mut graph = NetworkGraph::new();
    let source = graph.add_vertex(Point::new(0, 0, 0.0));
    let sink = graph.add_vertex(Point::new(deltas.len().max(1) as i32, 0, 0.0));
    let mut prev = source;
    for (i, &delta) in deltas.iter().enumerate() {
        let next = if i + 1 == deltas.len() {
            sink
        } else {
            graph.add_vertex(Point::new(i as i32 + 1, 0, 0.0))
        };
        let path = vec![graph.vertex(prev).p, graph.vertex(next).p];
        graph.add_edge(prev, next, path, f64::from(delta));
        prev = next;
    }
    graph
}

/// A random tree on `deltas.len() + 1` vertices: vertex `i + 1` hangs off
/// `parents[i] % (i + 1)`.
fn tree_graph(deltas: &[u16], parents: &[u16]) -> NetworkGraph {
    let mut graph = NetworkGraph::new();
    graph.add_vertex(Point::new(0, 0, 0.0));
    for (i, &delta) in deltas.iter().enumerate() {
        let parent = parents
            .get(i)
            .map(|&p| (p as usize) % (i + 1))
            .unwrap_or(0);
        let child = graph.add_vertex(Point::new(i as i32 + 1, 1, 0.0));
        let path = vec![graph.vertex(parent).p, graph.vertex(child).p];
        graph.add_edge(parent, child, path, f64::from(delta));
    }
    graph
}
