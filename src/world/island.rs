use std::collections::BTreeMap;

use crate::collision::ContactKey;
use crate::world::{BodyHandle, JointHandle};

/// One connected group of bodies solved and put to sleep together.
///
/// `bodies` holds the non-static members; static bodies a contact or joint
/// leans on are pulled in at solve time and may appear in several islands,
/// which is harmless because their state never changes.
#[derive(Debug, Default)]
pub(crate) struct Island {
    pub bodies: Vec<BodyHandle>,
    pub contacts: Vec<ContactKey>,
    pub joints: Vec<JointHandle>,
}

/// Union-find over non-static bodies.
///
/// Contacts and joints merge the sets of their endpoints; edges touching a
/// static body never merge, so static geometry anchors islands without
/// connecting them.
#[derive(Debug)]
pub(crate) struct IslandBuilder {
    index_of: BTreeMap<BodyHandle, usize>,
    handles: Vec<BodyHandle>,
    parent: Vec<usize>,
}

impl IslandBuilder {
    /// Starts a partition over the given non-static bodies
    pub fn new(bodies: impl IntoIterator<Item = BodyHandle>) -> Self {
        let handles: Vec<BodyHandle> = bodies.into_iter().collect();
        let index_of = handles
            .iter()
            .enumerate()
            .map(|(i, &h)| (h, i))
            .collect();
        let parent = (0..handles.len()).collect();

        Self {
            index_of,
            handles,
            parent,
        }
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.index_of.contains_key(&handle)
    }

    /// Merges the sets of two bodies; a no-op if either is not tracked
    /// (static bodies are never tracked)
    pub fn union(&mut self, a: BodyHandle, b: BodyHandle) {
        let (ia, ib) = match (self.index_of.get(&a), self.index_of.get(&b)) {
            (Some(&ia), Some(&ib)) => (ia, ib),
            _ => return,
        };

        let ra = self.find(ia);
        let rb = self.find(ib);
        if ra != rb {
            // Lower root wins so the partition is independent of edge order
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }

    /// Root of the set containing the body, if it is tracked
    pub fn root_of(&mut self, handle: BodyHandle) -> Option<usize> {
        let index = *self.index_of.get(&handle)?;
        Some(self.find(index))
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            // Path halving
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Groups all tracked bodies into islands, keyed by set root.
    ///
    /// Bodies inside each island stay in handle order, and the islands
    /// themselves are ordered by their lowest body handle.
    pub fn islands(&mut self) -> (Vec<Island>, BTreeMap<usize, usize>) {
        let mut island_of_root = BTreeMap::new();
        let mut islands = Vec::new();

        for i in 0..self.handles.len() {
            let root = self.find(i);
            let island_index = *island_of_root.entry(root).or_insert_with(|| {
                islands.push(Island::default());
                islands.len() - 1
            });
            islands[island_index].bodies.push(self.handles[i]);
        }

        (islands, island_of_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(index: u32) -> BodyHandle {
        BodyHandle::new(index, 0, 0)
    }

    #[test]
    fn disconnected_bodies_form_separate_islands() {
        let mut builder = IslandBuilder::new([handle(0), handle(1), handle(2)]);
        let (islands, _) = builder.islands();
        assert_eq!(islands.len(), 3);
    }

    #[test]
    fn unions_merge_islands() {
        let mut builder = IslandBuilder::new([handle(0), handle(1), handle(2), handle(3)]);
        builder.union(handle(0), handle(1));
        builder.union(handle(1), handle(2));

        let (islands, _) = builder.islands();
        assert_eq!(islands.len(), 2);
        assert_eq!(islands[0].bodies, vec![handle(0), handle(1), handle(2)]);
        assert_eq!(islands[1].bodies, vec![handle(3)]);
    }

    #[test]
    fn untracked_bodies_never_merge() {
        let mut builder = IslandBuilder::new([handle(0), handle(1)]);
        // handle(9) stands in for a static body: not tracked
        builder.union(handle(0), handle(9));
        builder.union(handle(1), handle(9));

        let (islands, _) = builder.islands();
        assert_eq!(islands.len(), 2);
    }

    #[test]
    fn partition_is_edge_order_independent() {
        let mut a = IslandBuilder::new([handle(0), handle(1), handle(2)]);
        a.union(handle(0), handle(1));
        a.union(handle(1), handle(2));

        let mut b = IslandBuilder::new([handle(0), handle(1), handle(2)]);
        b.union(handle(1), handle(2));
        b.union(handle(0), handle(1));

        let (islands_a, _) = a.islands();
        let (islands_b, _) = b.islands();
        assert_eq!(islands_a.len(), islands_b.len());
        assert_eq!(islands_a[0].bodies, islands_b[0].bodies);
    }
}
