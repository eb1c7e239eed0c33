//! **braidnet** extracts representative channel networks from digital
//! elevation models of braided rivers.
//!
//! The elevation model is triangulated into a half-edge mesh
//! ([`InputDcel`]), on which the Morse–Smale complex of the elevation
//! function is built ([`MsComplex`]): a graph of the minima and saddles of
//! the terrain whose faces carry persistence values and *sand functions*
//! (volume above a water level). The complex is then either simplified by
//! persistence and projected to a [`NetworkGraph`], or carved into a
//! [`Striation`] of source-to-sink paths from which a network is selected
//! at a sand-volume threshold δ.
//!
//! All graph-like structures are index arenas: cross-references are dense
//! integer indices and topological walks are plain index traversals.
//!
//! ```no_run
//! use braidnet::{
//!     Boundary, HeightMap, InputDcel, MsComplex, MsComplexCreator,
//!     MsComplexSimplifier, MsToNetworkGraphCreator, NetworkGraph, Progress,
//!     Units,
//! };
//!
//! let map = HeightMap::new(5, 5, vec![10; 25]);
//! let boundary = Boundary::around(&map);
//! let units = Units::default();
//!
//! let mut dcel = InputDcel::new(&map, &boundary, units);
//! dcel.split_monkey_saddles();
//!
//! let mut complex = MsComplex::new();
//! MsComplexCreator::new(&mut dcel, &mut complex, Progress::none()).create();
//!
//! let mut simplified = complex.clone();
//! MsComplexSimplifier::new(&mut simplified, Progress::none()).simplify();
//! simplified.compact();
//!
//! let mut graph = NetworkGraph::new();
//! MsToNetworkGraphCreator::new(&simplified, &dcel, &mut graph, Progress::none()).create();
//! ```

pub mod boundary;
pub mod dcel;
pub mod heightmap;
pub mod input_dcel;
pub mod io;
pub mod link_sequence;
pub mod lowest_path_tree;
pub mod ms_complex;
pub mod network;
pub mod network_graph;
pub mod piecewise;
pub mod point;
pub mod progress;
pub mod sand_cache;
pub mod striation;
pub mod unionfind;
pub mod units;

pub use boundary::{Boundary, BoundaryError, BoundaryPath};
pub use heightmap::{Coordinate, HeightMap};
pub use input_dcel::{InputDcel, VertexType};
pub use link_sequence::LinkSequence;
pub use lowest_path_tree::LowestPathTree;
pub use ms_complex::{MsComplex, MsComplexCreator, MsComplexSimplifier};
pub use network::{Network, NetworkCreator, NetworkPath, SortedPathsCreator};
pub use network_graph::{MsToNetworkGraphCreator, NetworkGraph, NetworkGraphCreator};
pub use piecewise::PiecewiseCubicFunction;
pub use point::Point;
pub use progress::Progress;
pub use sand_cache::{
    bidirectional_sand_function, water_flow_sand_function, SandCache,
};
pub use striation::{Striation, StriationCreator, StriationStrategy};
pub use unionfind::UnionFind;
pub use units::Units;
