//! End-to-end tests of the extraction pipeline on small, hand-checked
//! elevation models.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use braidnet::{
    Boundary, HeightMap, InputDcel, LinkSequence, MsComplex, MsComplexCreator,
    MsComplexSimplifier, MsToNetworkGraphCreator, Network, NetworkCreator, NetworkGraph,
    NetworkGraphCreator, Point, Progress, SandCache, SortedPathsCreator, Striation,
    StriationCreator, StriationStrategy, Units, VertexType,
};

fn build_complex(width: i32, height: i32, data: Vec<u32>) -> (InputDcel, MsComplex) {
    let map = HeightMap::new(width, height, data);
    let boundary = Boundary::around(&map);
    let mut dcel = InputDcel::new(&map, &boundary, Units::default());
    dcel.split_monkey_saddles();
    let mut complex = MsComplex::new();
    MsComplexCreator::new(&mut dcel, &mut complex, Progress::none()).create();
    (dcel, complex)
}

fn persistence_graph(dcel: &InputDcel, complex: &MsComplex) -> NetworkGraph {
    let mut simplified = complex.clone();
    MsComplexSimplifier::new(&mut simplified, Progress::none()).simplify();
    simplified.compact();
    let mut graph = NetworkGraph::new();
    MsToNetworkGraphCreator::new(&simplified, dcel, &mut graph, Progress::none()).create();
    graph
}

fn euler_characteristic(complex: &MsComplex) -> isize {
    complex.vertex_count() as isize - (complex.half_edge_count() / 2) as isize
        + complex.face_count() as isize
}

/// A flat plateau with a single pit drains through one minimum; after full
/// simplification a single face remains and every channel has infinite δ.
#[test]
fn plateau_with_pit() {
    let mut data = vec![10u32; 25];
    data[2 * 5 + 2] = 0;
    let (dcel, complex) = build_complex(5, 5, data);

    let minima: Vec<_> = complex
        .vertex_indices()
        .filter(|&v| complex.vertex(v).kind == VertexType::Minimum)
        .collect();
    assert_eq!(minima.len(), 3, "source, sink and the pit");
    assert_eq!(
        complex
            .vertex_indices()
            .filter(|&v| complex.vertex(v).p.h == f64::NEG_INFINITY)
            .count(),
        2,
        "source and sink minima"
    );
    assert_eq!(euler_characteristic(&complex), 2);

    let graph = persistence_graph(&dcel, &complex);
    assert_eq!(
        graph
            .vertices()
            .filter(|v| v.p.x == 2 && v.p.y == 2)
            .count(),
        1,
        "the pit survives simplification"
    );
    assert!(graph.edge_count() > 0);
    for e in graph.edges() {
        assert_eq!(e.delta, f64::INFINITY);
    }
}

/// A pit between two higher shelves: two saddles at elevation 5 connect
/// the pit's basin to the source and sink sides.
#[test]
fn pit_between_two_shelves() {
    let data = vec![
        9, 9, 9, 9, 9, //
        5, 5, 0, 5, 5, //
        9, 9, 9, 9, 9,
    ];
    let (dcel, complex) = build_complex(5, 3, data);

    let minima: Vec<_> = complex
        .vertex_indices()
        .filter(|&v| complex.vertex(v).kind == VertexType::Minimum)
        .collect();
    assert_eq!(minima.len(), 3);
    let pit = minima
        .iter()
        .copied()
        .find(|&v| complex.vertex(v).p.h.is_finite())
        .expect("an interior minimum");
    assert_eq!(complex.vertex(pit).p, Point::new(2, 1, 0.0));

    let saddles: Vec<_> = complex
        .vertex_indices()
        .filter(|&v| complex.vertex(v).kind == VertexType::Saddle)
        .collect();
    assert_eq!(saddles.len(), 2);
    for &s in &saddles {
        assert_eq!(complex.vertex(s).p.h, 5.0);
        assert_eq!(complex.vertex(s).p.h - complex.vertex(pit).p.h, 5.0);
    }

    // every saddle connects the pit to one of the boundary minima
    for &s in &saddles {
        let targets: Vec<_> = complex
            .outgoing_edges(s)
            .iter()
            .map(|&e| complex.destination(e))
            .collect();
        assert!(targets.contains(&pit));
    }

    assert_eq!(euler_characteristic(&complex), 2);
    assert_eq!(
        complex
            .face_indices()
            .map(|f| complex.face(f).triangles.len())
            .sum::<usize>(),
        dcel.face_count()
    );

    let _ = persistence_graph(&dcel, &complex);
}

/// 7x5 model with a high island in the middle of the channel: the water
/// splits around it, producing a bounded face of persistence 7 that is
/// cancelled away by the simplifier.
fn island_dem() -> (InputDcel, MsComplex) {
    let data = vec![
        7, 7, 7, 7, 7, 7, 7, //
        7, 2, 2, 2, 2, 2, 7, //
        7, 2, 9, 9, 9, 2, 7, //
        7, 2, 2, 2, 2, 2, 7, //
        7, 7, 7, 7, 7, 7, 7,
    ];
    build_complex(7, 5, data)
}

#[test]
fn island_face_has_finite_persistence() {
    let (dcel, complex) = island_dem();

    assert_eq!(complex.face_count(), 2);
    let persistences: Vec<f64> = complex
        .face_indices()
        .map(|f| complex.face(f).persistence)
        .collect();
    assert!(persistences.contains(&7.0), "island maximum 9, saddle 2");
    assert_eq!(
        persistences.iter().filter(|p| p.is_infinite()).count(),
        1,
        "exactly one face survives"
    );
    assert_eq!(euler_characteristic(&complex), 2);
    assert_eq!(
        complex
            .face_indices()
            .map(|f| complex.face(f).triangles.len())
            .sum::<usize>(),
        dcel.face_count()
    );
}

#[test]
fn island_is_cancelled_by_persistence_simplification() {
    let (dcel, complex) = island_dem();
    let mut simplified = complex.clone();
    MsComplexSimplifier::new(&mut simplified, Progress::none()).simplify();
    simplified.compact();

    // the higher of the two channel saddles is gone, along with the face
    assert_eq!(simplified.vertex_count(), complex.vertex_count() - 1);
    assert_eq!(simplified.face_count(), 1);
    assert_eq!(
        simplified
            .face_indices()
            .map(|f| simplified.face(f).triangles.len())
            .sum::<usize>(),
        dcel.face_count(),
        "cancelled faces donate their triangles"
    );

    let mut graph = NetworkGraph::new();
    MsToNetworkGraphCreator::new(&simplified, &dcel, &mut graph, Progress::none()).create();
    assert_eq!(graph.vertex_count(), simplified.vertex_count());
    assert!(graph.edge_count() > 0);
    for e in graph.edges() {
        assert_eq!(e.delta, f64::INFINITY);
    }
}

#[test]
fn pipeline_is_deterministic() {
    let mut outputs = Vec::new();
    for _ in 0..2 {
        let (dcel, complex) = island_dem();
        let graph = persistence_graph(&dcel, &complex);
        let mut buffer = Vec::new();
        braidnet::io::write_graph(&graph, &Units::default(), &mut buffer).unwrap();
        outputs.push(buffer);
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn striation_selects_source_to_sink_paths() {
    for strategy in [
        StriationStrategy::HighestPersistenceFirst,
        StriationStrategy::Hybrid,
    ] {
        let (dcel, complex) = island_dem();
        let source = dcel.vertex(dcel.source()).ms_vertex;
        let sink = dcel.vertex(dcel.sink()).ms_vertex;

        let mut striation = Striation::new();
        StriationCreator::new(
            &complex,
            &mut striation,
            source,
            sink,
            Units::default(),
            strategy,
            Progress::none(),
        )
        .create();
        assert!(striation.item_count() > 0);

        for item in &striation.items {
            let first = item.path.first().expect("non-empty path");
            let last = item.path.last().unwrap();
            assert_eq!(complex.origin(*first), source);
            assert_eq!(complex.destination(*last), sink);
            assert_eq!(
                item.left.len() + item.right.len(),
                item.region.len(),
                "left and right sides partition the region"
            );
        }

        let mut sorted_paths = Vec::new();
        SortedPathsCreator::new(&complex, &striation, &mut sorted_paths, Progress::none())
            .create();
        let mut cache = SandCache::new(
            &complex,
            &striation,
            braidnet::water_flow_sand_function,
        );
        let mut network = Network::new();
        NetworkCreator::new(&mut cache, &sorted_paths, 0.0, &mut network, Progress::none())
            .create();
        assert_eq!(
            network.paths.len(),
            sorted_paths.len(),
            "at threshold zero every path is selected"
        );

        let mut graph = NetworkGraph::new();
        NetworkGraphCreator::new(
            &complex,
            &dcel,
            &network,
            &mut graph,
            false,
            Progress::none(),
        )
        .create();
        assert!(graph.vertex_count() > 0);
        assert!(graph.edge_count() > 0);
        // vertex 0 is the source by construction
        assert_eq!(graph.vertex(0).p, complex.vertex(source).p);
    }
}

/// Rough terrain from a fixed seed: structural guarantees that must hold
/// for any input.
#[test]
fn seeded_rough_terrain() {
    let mut rng = StdRng::seed_from_u64(0xb41d);
    let (width, height) = (12, 8);
    let data: Vec<u32> = (0..width * height).map(|_| rng.gen_range(0..64)).collect();
    let (dcel, complex) = build_complex(width, height, data);

    for v in dcel.vertex_indices() {
        assert!(dcel.down_wedge_count(v) <= 2);
    }
    assert_eq!(
        complex
            .face_indices()
            .map(|f| complex.face(f).triangles.len())
            .sum::<usize>(),
        dcel.face_count()
    );

    let graph = persistence_graph(&dcel, &complex);
    let links = LinkSequence::new(&graph);
    let link_segments: usize = links.links().map(|l| l.path.len() - 1).sum();
    let edge_segments: usize = graph.edges().map(|e| e.path.len() - 1).sum();
    assert_eq!(
        link_segments, edge_segments,
        "every polyline segment ends up in exactly one link"
    );
}

#[test]
fn delta_filter_keeps_only_heavy_edges() {
    let mut graph = NetworkGraph::new();
    let a = graph.add_vertex(Point::new(0, 0, 0.0));
    let b = graph.add_vertex(Point::new(1, 0, 0.0));
    let c = graph.add_vertex(Point::new(2, 0, 0.0));
    let d = graph.add_vertex(Point::new(3, 0, 0.0));
    let path = |from: usize, to: usize, g: &NetworkGraph| vec![g.vertex(from).p, g.vertex(to).p];
    graph.add_edge(a, b, path(a, b, &graph), 10.0);
    graph.add_edge(b, c, path(b, c, &graph), 50.0);
    graph.add_edge(c, d, path(c, d, &graph), 200.0);

    graph.filter_on_delta(60.0);
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.edge(0).delta, 200.0);
    assert_eq!(graph.edge(0).id, 0);
    assert_eq!(graph.vertex(c).incident_edges, vec![0]);
    assert!(graph.vertex(a).incident_edges.is_empty());
}
