use crate::dcel::{HalfEdgeIndex, VertexIndex};
use crate::ms_complex::MsComplex;
use crate::progress::Progress;
use crate::sand_cache::SandCache;
use crate::striation::Striation;

/// One source-to-sink path selected into the network.
#[derive(Clone, Debug)]
pub struct NetworkPath {
    /// Index of the striation item the path came from.
    pub item: usize,
    /// The saddle the path was routed through.
    pub saddle: VertexIndex,
    /// The Morse–Smale half-edges of the path, in walking order.
    pub edges: Vec<HalfEdgeIndex>,
}

/// The representative network: the set of striation paths that carry at
/// least the requested amount of sand.
#[derive(Clone, Debug, Default)]
pub struct Network {
    pub paths: Vec<NetworkPath>,
}

impl Network {
    pub fn new() -> Self {
        Network::default()
    }
}

/// Collects the striation paths sorted on saddle height, from low to high,
/// so the network selection considers channels in flooding order.
pub struct SortedPathsCreator<'a> {
    msc: &'a MsComplex,
    striation: &'a Striation,
    paths: &'a mut Vec<NetworkPath>,
    progress: Progress<'a>,
}

impl<'a> SortedPathsCreator<'a> {
    pub fn new(
        msc: &'a MsComplex,
        striation: &'a Striation,
        paths: &'a mut Vec<NetworkPath>,
        progress: Progress<'a>,
    ) -> Self {
        SortedPathsCreator {
            msc,
            striation,
            paths,
            progress,
        }
    }

    pub fn create(&mut self) {
        self.progress.signal(0);
        let total = self.striation.item_count().max(1);
        for (i, item) in self.striation.items.iter().enumerate() {
            self.progress.signal((100 * i / total) as u32);
            self.paths.push(NetworkPath {
                item: i,
                saddle: item.saddle,
                edges: item.path.clone(),
            });
        }
        self.paths
            .sort_by(|a, b| self.msc.cmp_vertices(a.saddle, b.saddle));
        self.progress.signal(100);
    }
}

/// Selects the network for one δ value: every sorted path whose sand
/// volume reaches δ, plus the primary path (striation item 0), which keeps
/// the network connected from source to sink.
pub struct NetworkCreator<'a, 'c> {
    sand_cache: &'a mut SandCache<'c>,
    sorted_paths: &'a [NetworkPath],
    delta: f64,
    network: &'a mut Network,
    progress: Progress<'a>,
}

impl<'a, 'c> NetworkCreator<'a, 'c> {
    pub fn new(
        sand_cache: &'a mut SandCache<'c>,
        sorted_paths: &'a [NetworkPath],
        delta: f64,
        network: &'a mut Network,
        progress: Progress<'a>,
    ) -> Self {
        NetworkCreator {
            sand_cache,
            sorted_paths,
            delta,
            network,
            progress,
        }
    }

    pub fn create(&mut self) {
        self.progress.signal(0);
        let total = self.sorted_paths.len().max(1);
        for (i, path) in self.sorted_paths.iter().enumerate() {
            self.progress.signal((100 * i / total) as u32);
            let volume = self.sand_cache.sand_volume(path.item);
            if path.item == 0 || volume >= self.delta {
                self.network.paths.push(path.clone());
            }
        }
        self.progress.signal(100);
        log::debug!(
            "network with {} of {} paths at delta {}",
            self.network.paths.len(),
            self.sorted_paths.len(),
            self.delta
        );
    }
}
