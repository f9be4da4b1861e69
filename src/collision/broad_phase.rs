use crate::collision::{AABB_MARGIN, AABB_MULTIPLIER};
use crate::math::{Aabb, Vec2};
use crate::world::FixtureHandle;

/// Sentinel index for a missing tree node
pub const NULL_PROXY: u32 = u32::MAX;

/// Identifies one broad-phase child of a fixture (chains have many)
pub(crate) type ProxyKey = (FixtureHandle, u32);

struct TreeNode {
    /// Fattened AABB enclosing the node's subtree
    aabb: Aabb,

    parent: u32,
    child1: u32,
    child2: u32,

    /// Leaf height is 0; free nodes use -1
    height: i32,

    /// Fixture child stored at this leaf, None for internal nodes
    key: Option<ProxyKey>,
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.child1 == NULL_PROXY
    }
}

/// A dynamic bounding-volume tree over fattened fixture AABBs
///
/// Leaves store fixture children with their AABB expanded by a fixed margin
/// plus a velocity-proportional term so small movements do not require
/// re-insertion. Internal nodes are rebalanced with AVL-style rotations on
/// the enclosing-perimeter cost metric.
pub struct DynamicTree {
    nodes: Vec<TreeNode>,
    root: u32,
    free_list: u32,
}

impl DynamicTree {
    /// Creates a new empty tree
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: NULL_PROXY,
            free_list: NULL_PROXY,
        }
    }

    fn allocate_node(&mut self) -> u32 {
        if self.free_list != NULL_PROXY {
            let id = self.free_list;
            self.free_list = self.nodes[id as usize].parent;
            let node = &mut self.nodes[id as usize];
            node.parent = NULL_PROXY;
            node.child1 = NULL_PROXY;
            node.child2 = NULL_PROXY;
            node.height = 0;
            node.key = None;
            return id;
        }

        let id = self.nodes.len() as u32;
        self.nodes.push(TreeNode {
            aabb: Aabb::new(Vec2::zero(), Vec2::zero()),
            parent: NULL_PROXY,
            child1: NULL_PROXY,
            child2: NULL_PROXY,
            height: 0,
            key: None,
        });
        id
    }

    fn free_node(&mut self, id: u32) {
        let node = &mut self.nodes[id as usize];
        node.parent = self.free_list;
        node.height = -1;
        node.key = None;
        self.free_list = id;
    }

    /// Inserts a proxy with the given tight AABB and key, returning its id
    pub(crate) fn create_proxy(&mut self, aabb: Aabb, key: ProxyKey) -> u32 {
        let id = self.allocate_node();
        self.nodes[id as usize].aabb = aabb.expanded(AABB_MARGIN);
        self.nodes[id as usize].key = Some(key);
        self.nodes[id as usize].height = 0;
        self.insert_leaf(id);
        id
    }

    /// Removes a proxy from the tree
    pub(crate) fn destroy_proxy(&mut self, proxy: u32) {
        self.remove_leaf(proxy);
        self.free_node(proxy);
    }

    /// Moves a proxy to a new tight AABB
    ///
    /// Returns false (no re-insertion) when the new AABB is still contained
    /// by the proxy's fattened box. The displacement predicts where the
    /// proxy is heading so the fat box stretches in the direction of travel.
    pub(crate) fn move_proxy(&mut self, proxy: u32, aabb: Aabb, displacement: Vec2) -> bool {
        if self.nodes[proxy as usize].aabb.contains_aabb(&aabb) {
            return false;
        }

        self.remove_leaf(proxy);

        let mut fat = aabb.expanded(AABB_MARGIN);
        let d = displacement * AABB_MULTIPLIER;

        if d.x < 0.0 {
            fat.min.x += d.x;
        } else {
            fat.max.x += d.x;
        }

        if d.y < 0.0 {
            fat.min.y += d.y;
        } else {
            fat.max.y += d.y;
        }

        self.nodes[proxy as usize].aabb = fat;
        self.insert_leaf(proxy);
        true
    }

    /// Returns the fattened AABB of a proxy
    pub(crate) fn fat_aabb(&self, proxy: u32) -> Aabb {
        self.nodes[proxy as usize].aabb
    }

    /// Returns the key stored at a proxy
    pub(crate) fn key(&self, proxy: u32) -> ProxyKey {
        self.nodes[proxy as usize].key.expect("proxy is not a leaf")
    }

    fn insert_leaf(&mut self, leaf: u32) {
        if self.root == NULL_PROXY {
            self.root = leaf;
            self.nodes[leaf as usize].parent = NULL_PROXY;
            return;
        }

        // Find the best sibling by descending along the cheaper child
        let leaf_aabb = self.nodes[leaf as usize].aabb;
        let mut index = self.root;

        while !self.nodes[index as usize].is_leaf() {
            let child1 = self.nodes[index as usize].child1;
            let child2 = self.nodes[index as usize].child2;

            let area = self.nodes[index as usize].aabb.perimeter();
            let combined = self.nodes[index as usize].aabb.combine(&leaf_aabb);
            let combined_area = combined.perimeter();

            // Cost of making a new parent for this node and the leaf
            let cost = 2.0 * combined_area;
            let inheritance = 2.0 * (combined_area - area);

            let child_cost = |tree: &Self, child: u32| {
                let child_aabb = &tree.nodes[child as usize].aabb;
                let merged = child_aabb.combine(&leaf_aabb).perimeter();
                if tree.nodes[child as usize].is_leaf() {
                    merged + inheritance
                } else {
                    (merged - child_aabb.perimeter()) + inheritance
                }
            };

            let cost1 = child_cost(self, child1);
            let cost2 = child_cost(self, child2);

            if cost < cost1 && cost < cost2 {
                break;
            }

            index = if cost1 < cost2 { child1 } else { child2 };
        }

        let sibling = index;

        // Create a new parent above the sibling
        let old_parent = self.nodes[sibling as usize].parent;
        let new_parent = self.allocate_node();

        self.nodes[new_parent as usize].parent = old_parent;
        self.nodes[new_parent as usize].aabb = leaf_aabb.combine(&self.nodes[sibling as usize].aabb);
        self.nodes[new_parent as usize].height = self.nodes[sibling as usize].height + 1;
        self.nodes[new_parent as usize].child1 = sibling;
        self.nodes[new_parent as usize].child2 = leaf;
        self.nodes[sibling as usize].parent = new_parent;
        self.nodes[leaf as usize].parent = new_parent;

        if old_parent != NULL_PROXY {
            if self.nodes[old_parent as usize].child1 == sibling {
                self.nodes[old_parent as usize].child1 = new_parent;
            } else {
                self.nodes[old_parent as usize].child2 = new_parent;
            }
        } else {
            self.root = new_parent;
        }

        // Walk back up, refitting AABBs and rebalancing
        let mut index = self.nodes[leaf as usize].parent;
        while index != NULL_PROXY {
            index = self.balance(index);

            let child1 = self.nodes[index as usize].child1;
            let child2 = self.nodes[index as usize].child2;

            self.nodes[index as usize].height =
                1 + self.nodes[child1 as usize].height.max(self.nodes[child2 as usize].height);
            self.nodes[index as usize].aabb = self.nodes[child1 as usize]
                .aabb
                .combine(&self.nodes[child2 as usize].aabb);

            index = self.nodes[index as usize].parent;
        }
    }

    fn remove_leaf(&mut self, leaf: u32) {
        if leaf == self.root {
            self.root = NULL_PROXY;
            return;
        }

        let parent = self.nodes[leaf as usize].parent;
        let grand_parent = self.nodes[parent as usize].parent;

        let sibling = if self.nodes[parent as usize].child1 == leaf {
            self.nodes[parent as usize].child2
        } else {
            self.nodes[parent as usize].child1
        };

        if grand_parent != NULL_PROXY {
            if self.nodes[grand_parent as usize].child1 == parent {
                self.nodes[grand_parent as usize].child1 = sibling;
            } else {
                self.nodes[grand_parent as usize].child2 = sibling;
            }
            self.nodes[sibling as usize].parent = grand_parent;
            self.free_node(parent);

            let mut index = grand_parent;
            while index != NULL_PROXY {
                index = self.balance(index);

                let child1 = self.nodes[index as usize].child1;
                let child2 = self.nodes[index as usize].child2;

                self.nodes[index as usize].aabb = self.nodes[child1 as usize]
                    .aabb
                    .combine(&self.nodes[child2 as usize].aabb);
                self.nodes[index as usize].height =
                    1 + self.nodes[child1 as usize].height.max(self.nodes[child2 as usize].height);

                index = self.nodes[index as usize].parent;
            }
        } else {
            self.root = sibling;
            self.nodes[sibling as usize].parent = NULL_PROXY;
            self.free_node(parent);
        }
    }

    /// Rebalances the subtree at `a` with one rotation if needed, returning
    /// the index of the new subtree root
    fn balance(&mut self, a: u32) -> u32 {
        if self.nodes[a as usize].is_leaf() || self.nodes[a as usize].height < 2 {
            return a;
        }

        let b = self.nodes[a as usize].child1;
        let c = self.nodes[a as usize].child2;

        let balance = self.nodes[c as usize].height - self.nodes[b as usize].height;

        if balance > 1 {
            self.rotate(a, c, b)
        } else if balance < -1 {
            self.rotate(a, b, c)
        } else {
            a
        }
    }

    // Promote `up` above `a`; `other` is a's remaining child.
    fn rotate(&mut self, a: u32, up: u32, other: u32) -> u32 {
        let f = self.nodes[up as usize].child1;
        let g = self.nodes[up as usize].child2;

        self.nodes[up as usize].child1 = a;
        self.nodes[up as usize].parent = self.nodes[a as usize].parent;
        self.nodes[a as usize].parent = up;

        let up_parent = self.nodes[up as usize].parent;
        if up_parent != NULL_PROXY {
            if self.nodes[up_parent as usize].child1 == a {
                self.nodes[up_parent as usize].child1 = up;
            } else {
                self.nodes[up_parent as usize].child2 = up;
            }
        } else {
            self.root = up;
        }

        // Move the shallower grandchild under `a`
        let (keep, lower) = if self.nodes[f as usize].height > self.nodes[g as usize].height {
            (f, g)
        } else {
            (g, f)
        };

        self.nodes[up as usize].child2 = keep;
        if self.nodes[a as usize].child1 == up {
            self.nodes[a as usize].child1 = lower;
        } else {
            self.nodes[a as usize].child2 = lower;
        }
        self.nodes[lower as usize].parent = a;

        self.nodes[a as usize].aabb = self.nodes[other as usize]
            .aabb
            .combine(&self.nodes[lower as usize].aabb);
        self.nodes[up as usize].aabb = self.nodes[a as usize]
            .aabb
            .combine(&self.nodes[keep as usize].aabb);

        self.nodes[a as usize].height =
            1 + self.nodes[other as usize].height.max(self.nodes[lower as usize].height);
        self.nodes[up as usize].height =
            1 + self.nodes[a as usize].height.max(self.nodes[keep as usize].height);

        up
    }

    /// Visits every leaf whose fattened AABB overlaps `aabb`
    ///
    /// The visitor returns false to stop the query early.
    pub(crate) fn query<F>(&self, aabb: &Aabb, mut visitor: F)
    where
        F: FnMut(u32) -> bool,
    {
        let mut stack = Vec::with_capacity(64);
        if self.root != NULL_PROXY {
            stack.push(self.root);
        }

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];

            if !node.aabb.intersects(aabb) {
                continue;
            }

            if node.is_leaf() {
                if !visitor(index) {
                    return;
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }

    /// Visits every leaf whose fattened AABB intersects the segment `p1..p2`
    pub(crate) fn ray_cast<F>(&self, p1: Vec2, p2: Vec2, mut visitor: F)
    where
        F: FnMut(u32) -> bool,
    {
        let segment_aabb = Aabb::new(p1.min(&p2), p1.max(&p2));

        let mut stack = Vec::with_capacity(64);
        if self.root != NULL_PROXY {
            stack.push(self.root);
        }

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];

            if !node.aabb.intersects(&segment_aabb) {
                continue;
            }

            if node.aabb.ray_intersect(p1, p2).is_none() {
                continue;
            }

            if node.is_leaf() {
                if !visitor(index) {
                    return;
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }
}

impl Default for DynamicTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Broad-phase pair manager over the dynamic tree
///
/// Tracks proxies that moved since the last step and produces candidate
/// fixture pairs, sorted and deduplicated so the step result does not
/// depend on insertion history.
pub struct BroadPhase {
    tree: DynamicTree,
    moved: Vec<u32>,
}

impl BroadPhase {
    /// Creates a new empty broad-phase
    pub fn new() -> Self {
        Self {
            tree: DynamicTree::new(),
            moved: Vec::new(),
        }
    }

    /// Returns the underlying dynamic tree
    pub(crate) fn tree(&self) -> &DynamicTree {
        &self.tree
    }

    /// Inserts a proxy and schedules it for pair generation
    pub(crate) fn create_proxy(&mut self, aabb: Aabb, key: ProxyKey) -> u32 {
        let proxy = self.tree.create_proxy(aabb, key);
        self.moved.push(proxy);
        proxy
    }

    /// Removes a proxy
    pub(crate) fn destroy_proxy(&mut self, proxy: u32) {
        self.moved.retain(|&p| p != proxy);
        self.tree.destroy_proxy(proxy);
    }

    /// Moves a proxy, scheduling it for pair generation if it left its fat box
    pub(crate) fn move_proxy(&mut self, proxy: u32, aabb: Aabb, displacement: Vec2) {
        if self.tree.move_proxy(proxy, aabb, displacement) {
            self.moved.push(proxy);
        }
    }

    /// Returns the fattened AABB of a proxy
    pub(crate) fn fat_aabb(&self, proxy: u32) -> Aabb {
        self.tree.fat_aabb(proxy)
    }

    /// Re-queues a proxy for pair generation without moving it
    ///
    /// Used after a filter change so overlapping pairs the filter previously
    /// rejected get another chance at the next `update_pairs`.
    pub(crate) fn touch_proxy(&mut self, proxy: u32) {
        if !self.moved.contains(&proxy) {
            self.moved.push(proxy);
        }
    }

    /// Emits candidate pairs involving proxies that moved since the last call
    ///
    /// Pairs are keyed by fixture, deduplicated, and sorted for determinism.
    /// No truly overlapping pair is ever missed; false positives are left to
    /// the narrow phase.
    pub(crate) fn update_pairs<F>(&mut self, mut callback: F)
    where
        F: FnMut(ProxyKey, ProxyKey),
    {
        let mut pairs: Vec<(ProxyKey, ProxyKey)> = Vec::new();

        for &proxy in &self.moved {
            // The proxy may have been destroyed after it moved
            if self.tree.nodes[proxy as usize].height < 0 {
                continue;
            }

            let fat = self.tree.fat_aabb(proxy);
            let key = self.tree.key(proxy);

            self.tree.query(&fat, |other| {
                if other == proxy {
                    return true;
                }

                let other_key = self.tree.key(other);
                if other_key.0 == key.0 {
                    // Children of the same fixture never collide
                    return true;
                }

                let pair = if key < other_key {
                    (key, other_key)
                } else {
                    (other_key, key)
                };
                pairs.push(pair);
                true
            });
        }

        self.moved.clear();

        pairs.sort();
        pairs.dedup();

        for (a, b) in pairs {
            callback(a, b);
        }
    }
}

impl Default for BroadPhase {
    fn default() -> Self {
        Self::new()
    }
}
