/// A disjoint-set ("union & find") structure over `0..n`.
///
/// Uses path compression but deliberately no union-by-rank: `merge(p1, p2)`
/// always makes the representative of `p1` the representative of the merged
/// set. This determinism is part of the contract; persistence computation
/// breaks ties through it, so the merge direction is observable in the
/// output.
#[derive(Clone, Debug)]
pub struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    /// Creates a structure with `n` singleton sets.
    pub fn new(n: usize) -> Self {
        UnionFind {
            parent: (0..n).collect(),
        }
    }

    /// Returns the representative of the set containing `p`.
    ///
    /// **Panics** if `p` is out of bounds.
    pub fn find(&mut self, p: usize) -> usize {
        let mut root = p;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // path compression
        let mut cursor = p;
        while self.parent[cursor] != root {
            let next = self.parent[cursor];
            self.parent[cursor] = root;
            cursor = next;
        }
        root
    }

    /// Merges the set of `p2` into the set of `p1`: afterwards, the
    /// representative of `p1` is the representative of both.
    pub fn merge(&mut self, p1: usize, p2: usize) {
        let r1 = self.find(p1);
        let r2 = self.find(p2);
        self.parent[r2] = r1;
    }

    /// Returns whether `p1` and `p2` are in the same set.
    pub fn same_set(&mut self, p1: usize, p2: usize) -> bool {
        self.find(p1) == self.find(p2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_deterministic() {
        let mut uf = UnionFind::new(4);
        uf.merge(1, 2);
        assert_eq!(uf.find(2), 1);
        uf.merge(3, 1);
        assert_eq!(uf.find(1), 3);
        assert_eq!(uf.find(2), 3);
        assert_eq!(uf.find(0), 0);
    }

    #[test]
    fn find_compresses_paths() {
        let mut uf = UnionFind::new(5);
        uf.merge(1, 0);
        uf.merge(2, 1);
        uf.merge(3, 2);
        assert_eq!(uf.find(0), 3);
        assert!(uf.same_set(0, 3));
        assert!(!uf.same_set(0, 4));
    }
}
