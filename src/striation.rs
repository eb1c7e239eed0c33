//! The striation: a recursive ordering of source-to-sink paths through the
//! Morse–Smale complex.
//!
//! Each item carves the current region of faces along a lowest path through
//! a chosen saddle, splitting it into a left and a right part which are
//! then striated in turn. The order in which saddles are chosen is a
//! strategy; the item order is what the network selection later works with.

use fixedbitset::FixedBitSet;

use crate::dcel::{FaceIndex, HalfEdgeIndex, VertexIndex};
use crate::input_dcel::VertexType;
use crate::lowest_path_tree::LowestPathTree;
use crate::ms_complex::MsComplex;
use crate::progress::Progress;
use crate::units::Units;

/// How the striation picks the next saddle to carve along.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum StriationStrategy {
    /// Carve along the saddle whose paired face has the greatest
    /// persistence, so the most important channels come first.
    #[default]
    HighestPersistenceFirst,
    /// Carve along the lowest saddle first, so channels appear in the
    /// order rising water would flood them.
    Hybrid,
}

/// One carving step of the striation.
#[derive(Clone, Debug)]
pub struct StriationItem {
    /// The saddle the path was routed through.
    pub saddle: VertexIndex,
    /// The source-to-sink path, as Morse–Smale half-edges in walking
    /// order.
    pub path: Vec<HalfEdgeIndex>,
    /// The faces of the region this item was chosen in.
    pub region: Vec<FaceIndex>,
    /// The part of the region on the left of the path.
    pub left: Vec<FaceIndex>,
    /// The part of the region on the right of the path.
    pub right: Vec<FaceIndex>,
}

/// The ordered list of striation items.
#[derive(Clone, Debug, Default)]
pub struct Striation {
    pub items: Vec<StriationItem>,
}

impl Striation {
    pub fn new() -> Self {
        Striation::default()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn item(&self, i: usize) -> &StriationItem {
        &self.items[i]
    }
}

/// Builds a [`Striation`] for a Morse–Smale complex.
pub struct StriationCreator<'a> {
    msc: &'a MsComplex,
    striation: &'a mut Striation,
    source: VertexIndex,
    sink: VertexIndex,
    units: Units,
    strategy: StriationStrategy,
    progress: Progress<'a>,
}

impl<'a> StriationCreator<'a> {
    pub fn new(
        msc: &'a MsComplex,
        striation: &'a mut Striation,
        source: VertexIndex,
        sink: VertexIndex,
        units: Units,
        strategy: StriationStrategy,
        progress: Progress<'a>,
    ) -> Self {
        StriationCreator {
            msc,
            striation,
            source,
            sink,
            units,
            strategy,
            progress,
        }
    }

    pub fn create(&mut self) {
        self.progress.signal(0);

        let tree = LowestPathTree::new(self.msc, self.source, self.sink, self.units);

        // a saddle inherits the persistence of the face it cancels
        let mut saddle_persistence = vec![f64::NEG_INFINITY; self.msc.vertex_count()];
        for f in self.msc.face_indices() {
            let face = self.msc.face(f);
            if !face.paired_saddle.is_end() {
                saddle_persistence[face.paired_saddle.index()] = face.persistence;
            }
        }

        // the region to striate initially: the whole complex
        let root: Vec<FaceIndex> = self.msc.face_indices().collect();
        let total = self
            .msc
            .vertex_indices()
            .filter(|&v| self.msc.vertex(v).kind == VertexType::Saddle)
            .count()
            .max(1);
        let mut carved = 0usize;
        let mut used = FixedBitSet::with_capacity(self.msc.vertex_count());

        let mut stack = vec![root];
        while let Some(region) = stack.pop() {
            if region.is_empty() {
                continue;
            }
            let Some(saddle) = self.choose_saddle(&region, &saddle_persistence, &used) else {
                continue;
            };
            used.insert(saddle.index());
            carved += 1;

            // route source -> saddle -> sink along the lowest-path tree
            let mut path: Vec<HalfEdgeIndex> = tree
                .lowest_path_to_source(self.msc, saddle)
                .iter()
                .rev()
                .map(|e| e.twin())
                .collect();
            path.extend(tree.lowest_path_to_sink(self.msc, saddle));

            let (left, right) = self.split_region(&region, &path);
            self.progress.signal((100 * carved / total).min(99) as u32);

            self.striation.items.push(StriationItem {
                saddle,
                path,
                region: region.clone(),
                left: left.clone(),
                right: right.clone(),
            });
            stack.push(right);
            stack.push(left);
        }

        self.progress.signal(100);
        log::debug!("striation with {} items", self.striation.item_count());
    }

    /// Picks the saddle to carve along: an unused one whose two sides both
    /// lie in the region, by the configured strategy.
    fn choose_saddle(
        &self,
        region: &[FaceIndex],
        persistence: &[f64],
        used: &FixedBitSet,
    ) -> Option<VertexIndex> {
        let mut in_region = FixedBitSet::with_capacity(self.msc.face_count());
        for f in region {
            in_region.insert(f.index());
        }

        let mut best: Option<VertexIndex> = None;
        for s in self.msc.vertex_indices() {
            if self.msc.vertex(s).kind != VertexType::Saddle || used.contains(s.index()) {
                continue;
            }
            let out = self.msc.outgoing_edges(s);
            let interior = out
                .iter()
                .all(|&e| in_region.contains(self.msc.face_of(e).index()));
            if !interior {
                continue;
            }
            best = Some(match best {
                None => s,
                Some(b) => match self.strategy {
                    StriationStrategy::HighestPersistenceFirst => {
                        let (ps, pb) = (persistence[s.index()], persistence[b.index()]);
                        match ps.total_cmp(&pb) {
                            std::cmp::Ordering::Greater => s,
                            std::cmp::Ordering::Less => b,
                            std::cmp::Ordering::Equal => {
                                if self.msc.cmp_vertices(s, b) == std::cmp::Ordering::Greater {
                                    s
                                } else {
                                    b
                                }
                            }
                        }
                    }
                    StriationStrategy::Hybrid => {
                        if self.msc.cmp_vertices(s, b) == std::cmp::Ordering::Less {
                            s
                        } else {
                            b
                        }
                    }
                },
            });
        }
        best
    }

    /// Splits a region along a path: the faces on the left of the path
    /// edges are flooded without crossing the path; the rest is the right
    /// part.
    fn split_region(
        &self,
        region: &[FaceIndex],
        path: &[HalfEdgeIndex],
    ) -> (Vec<FaceIndex>, Vec<FaceIndex>) {
        let mut in_region = FixedBitSet::with_capacity(self.msc.face_count());
        for f in region {
            in_region.insert(f.index());
        }
        let mut on_path = FixedBitSet::with_capacity(self.msc.half_edge_count());
        for &e in path {
            on_path.insert(e.index());
            on_path.insert(e.twin().index());
        }

        let mut left_set = FixedBitSet::with_capacity(self.msc.face_count());
        let mut queue: Vec<FaceIndex> = Vec::new();
        for &e in path {
            let f = self.msc.face_of(e);
            if in_region.contains(f.index()) && !left_set.contains(f.index()) {
                left_set.insert(f.index());
                queue.push(f);
            }
        }
        while let Some(f) = queue.pop() {
            for e in self.msc.dcel.face_edges(f) {
                if on_path.contains(e.index()) {
                    continue;
                }
                let neighbor = self.msc.face_of(e.twin());
                if in_region.contains(neighbor.index()) && !left_set.contains(neighbor.index()) {
                    left_set.insert(neighbor.index());
                    queue.push(neighbor);
                }
            }
        }

        let left: Vec<FaceIndex> = region
            .iter()
            .copied()
            .filter(|f| left_set.contains(f.index()))
            .collect();
        let right: Vec<FaceIndex> = region
            .iter()
            .copied()
            .filter(|f| !left_set.contains(f.index()))
            .collect();
        (left, right)
    }
}
