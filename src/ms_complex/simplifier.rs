use crate::dcel::{FaceIndex, HalfEdgeIndex, VertexIndex};
use crate::ms_complex::MsComplex;
use crate::progress::Progress;
use crate::unionfind::UnionFind;

/// Persistence-based simplification of a [`MsComplex`].
///
/// Faces are cancelled against their paired saddles in order of increasing
/// persistence: the saddle and its two half-edge pairs are removed and the
/// face merges into the neighboring one, which keeps the Euler
/// characteristic intact. A cancellation is skipped when both sides of the
/// saddle already belong to the same face, since removing the saddle would
/// then change the topology. Run to completion, only the face of infinite
/// persistence remains (plus any faces whose cancellation was never valid).
///
/// Afterwards every surviving half-edge carries a δ value: the smaller
/// persistence of the two faces it borders, which is the persistence level
/// at which the channel it represents disappears.
///
/// The simplifier mutates the complex it is given; callers that still need
/// the unsimplified complex clone it first. [`MsComplex::compact`] rebuilds
/// dense index arrays afterwards.
pub struct MsComplexSimplifier<'a> {
    msc: &'a mut MsComplex,
    threshold: f64,
    progress: Progress<'a>,
}

impl<'a> MsComplexSimplifier<'a> {
    pub fn new(msc: &'a mut MsComplex, progress: Progress<'a>) -> Self {
        MsComplexSimplifier {
            msc,
            threshold: f64::INFINITY,
            progress,
        }
    }

    /// Stops the cancellation process at the given persistence value:
    /// cancellations below it are committed, the first one at or above it
    /// ends the pass.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn simplify(&mut self) {
        self.progress.signal(0);
        self.msc.grow_removal_marks();

        let mut cancellations: Vec<FaceIndex> = self
            .msc
            .face_indices()
            .filter(|&f| self.msc.face(f).persistence.is_finite())
            .collect();
        cancellations.sort_by(|&a, &b| {
            self.msc
                .face(a)
                .persistence
                .total_cmp(&self.msc.face(b).persistence)
                .then_with(|| a.cmp(&b))
        });

        let mut uf = UnionFind::new(self.msc.face_count());
        let total = cancellations.len().max(1);
        let mut cancelled = 0usize;

        for (i, &f) in cancellations.iter().enumerate() {
            self.progress.signal((100 * i / total) as u32);
            if self.msc.face(f).persistence >= self.threshold {
                break;
            }
            if self.cancel_face(f, &mut uf) {
                cancelled += 1;
            }
        }

        self.merge_face_data(&mut uf);
        self.assign_deltas();
        self.progress.signal(100);

        log::debug!(
            "simplified Morse-Smale complex: {} of {} pairs cancelled",
            cancelled,
            cancellations.len()
        );
    }

    /// Cancels `f` against its paired saddle. Returns whether the
    /// cancellation was valid and committed.
    fn cancel_face(&mut self, f: FaceIndex, uf: &mut UnionFind) -> bool {
        let saddle = self.msc.face(f).paired_saddle;
        debug_assert!(!saddle.is_end());
        debug_assert!(!self.msc.is_vertex_removed(saddle));

        let out = self.msc.outgoing_edges(saddle);
        debug_assert_eq!(out.len(), 2);

        let side1 = uf.find(self.msc.face_of(out[0]).index());
        let side2 = uf.find(self.msc.face_of(out[1]).index());
        if side1 == side2 {
            // both sides are already one face; removing the saddle would
            // break the Euler characteristic
            return false;
        }
        let fr = uf.find(f.index());
        debug_assert!(side1 == fr || side2 == fr);
        let survivor = if side1 == fr { side2 } else { side1 };

        self.remove_saddle(saddle, &out);
        uf.merge(survivor, fr);
        true
    }

    /// Removes the saddle and its two half-edge pairs from the mesh,
    /// splicing the surrounding face cycles back together.
    fn remove_saddle(&mut self, saddle: VertexIndex, out: &[HalfEdgeIndex]) {
        let dying: Vec<HalfEdgeIndex> = out
            .iter()
            .flat_map(|&e| [e, e.twin()])
            .collect();
        let is_dying = |e: HalfEdgeIndex| dying.contains(&e);

        // remember the rotations of the minima before breaking them
        let minima: Vec<VertexIndex> = out.iter().map(|&e| self.msc.destination(e)).collect();
        let rotations: Vec<Vec<HalfEdgeIndex>> = minima
            .iter()
            .map(|&m| self.msc.outgoing_edges(m))
            .collect();

        // splice every cycle that enters the dying set: the continuation of
        // a dying half-edge is on its twin's cycle
        for &d in &dying {
            let a = self.msc.dcel.prev(d);
            if is_dying(a) {
                continue;
            }
            let mut b = self.msc.dcel.next(a);
            let mut guard = 0;
            while is_dying(b) {
                b = self.msc.dcel.next(b.twin());
                guard += 1;
                debug_assert!(guard <= dying.len());
            }
            self.msc.dcel.set_next(a, b);
        }

        for (m, rotation) in minima.iter().zip(&rotations) {
            if is_dying(self.msc.dcel.outgoing(*m)) {
                let replacement = rotation
                    .iter()
                    .copied()
                    .find(|&e| !is_dying(e))
                    .unwrap_or(HalfEdgeIndex::end());
                self.msc.dcel.set_outgoing(*m, replacement);
            }
        }

        self.msc.removed_vertices.insert(saddle.index());
        for &d in &dying {
            self.msc.removed_half_edges.insert(d.index());
        }
    }

    /// Folds the data of every cancelled face into its surviving
    /// representative and marks the cancelled faces as removed.
    fn merge_face_data(&mut self, uf: &mut UnionFind) {
        for f in self.msc.face_indices().collect::<Vec<_>>() {
            let rep = FaceIndex::new(uf.find(f.index()));
            if rep == f {
                continue;
            }
            let (triangles, volume) = {
                let face = &mut self.msc.dcel[f];
                (
                    std::mem::take(&mut face.triangles),
                    std::mem::replace(
                        &mut face.volume_above,
                        crate::piecewise::PiecewiseCubicFunction::zero(),
                    ),
                )
            };
            let rep_face = &mut self.msc.dcel[rep];
            rep_face.triangles.extend(triangles);
            rep_face.volume_above = rep_face.volume_above.add(&volume);
            self.msc.removed_faces.insert(f.index());
        }

        // point all surviving half-edges at their representative face, and
        // repair boundary pointers that died with a cancelled saddle
        for e in self.msc.half_edge_indices().collect::<Vec<_>>() {
            if self.msc.is_half_edge_removed(e) {
                continue;
            }
            let rep = FaceIndex::new(uf.find(self.msc.face_of(e).index()));
            self.msc.dcel.set_face_of(e, rep);
            let boundary = self.msc.dcel.boundary(rep);
            if boundary.is_end() || self.msc.is_half_edge_removed(boundary) {
                self.msc.dcel.set_boundary(rep, e);
            }
        }
    }

    /// Tags every surviving half-edge with the persistence level at which
    /// its channel disappears: the smaller persistence of its two faces.
    fn assign_deltas(&mut self) {
        for e in self.msc.half_edge_indices().collect::<Vec<_>>() {
            if self.msc.is_half_edge_removed(e) {
                continue;
            }
            let left = self.msc.face(self.msc.face_of(e)).persistence;
            let right = self.msc.face(self.msc.face_of(e.twin())).persistence;
            self.msc.dcel[e].delta = left.min(right);
        }
    }
}
