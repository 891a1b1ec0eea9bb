//! Arena-backed red-black tree ordered by position rather than by key.
//!
//! Callers locate an insertion point themselves (the beachline compares against breakpoints
//! that move with the sweep line) and insert the new node as the in-order successor of an
//! existing node. Every node also carries `prev`/`next` links to its in-order neighbours.
//! Removed slots go to a free list and are reused by later insertions.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    red: bool,
}

#[derive(Debug, Clone)]
pub struct RbTree<T> {
    nodes: Vec<Node<T>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    len: usize,
}

impl<T> Default for RbTree<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
        }
    }
}

impl<T: Copy> RbTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every node but keeps the allocated storage.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> &T {
        &self.nodes[id.idx()].value
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.nodes[id.idx()].value
    }

    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.idx()].left
    }

    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.idx()].right
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.idx()].prev
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.idx()].next
    }

    /// Left-most node.
    pub fn first(&self) -> Option<NodeId> {
        self.root.map(|r| self.leftmost(r))
    }

    /// In-order iteration following the `next` links.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.first(), move |&n| self.next(n))
    }

    fn leftmost(&self, mut n: NodeId) -> NodeId {
        while let Some(l) = self.nodes[n.idx()].left {
            n = l;
        }
        n
    }

    fn alloc(&mut self, value: T) -> NodeId {
        let node = Node {
            value,
            parent: None,
            left: None,
            right: None,
            prev: None,
            next: None,
            red: true,
        };
        self.len += 1;
        if let Some(id) = self.free.pop() {
            self.nodes[id.idx()] = node;
            id
        } else {
            let id = NodeId(self.nodes.len() as u32);
            self.nodes.push(node);
            id
        }
    }

    fn is_red(&self, n: Option<NodeId>) -> bool {
        n.is_some_and(|n| self.nodes[n.idx()].red)
    }

    fn set_red(&mut self, n: NodeId, red: bool) {
        self.nodes[n.idx()].red = red;
    }

    /// Inserts `value` immediately after `after` in visual order, or at the very front when
    /// `after` is `None`.
    pub fn insert_successor(&mut self, after: Option<NodeId>, value: T) -> NodeId {
        let id = self.alloc(value);
        let parent = match after {
            Some(node) => {
                let old_next = self.nodes[node.idx()].next;
                self.nodes[id.idx()].prev = Some(node);
                self.nodes[id.idx()].next = old_next;
                if let Some(n) = old_next {
                    self.nodes[n.idx()].prev = Some(id);
                }
                self.nodes[node.idx()].next = Some(id);
                match self.nodes[node.idx()].right {
                    Some(r) => {
                        let p = self.leftmost(r);
                        self.nodes[p.idx()].left = Some(id);
                        Some(p)
                    }
                    None => {
                        self.nodes[node.idx()].right = Some(id);
                        Some(node)
                    }
                }
            }
            None => match self.root {
                Some(root) => {
                    let first = self.leftmost(root);
                    self.nodes[id.idx()].next = Some(first);
                    self.nodes[first.idx()].prev = Some(id);
                    self.nodes[first.idx()].left = Some(id);
                    Some(first)
                }
                None => {
                    self.root = Some(id);
                    None
                }
            },
        };
        self.nodes[id.idx()].parent = parent;
        self.fix_after_insert(id);
        id
    }

    fn fix_after_insert(&mut self, mut node: NodeId) {
        let mut parent = self.nodes[node.idx()].parent;
        while let Some(p) = parent {
            if !self.nodes[p.idx()].red {
                break;
            }
            // A red parent is never the root, so the grandparent exists.
            let Some(g) = self.nodes[p.idx()].parent else {
                break;
            };
            if self.nodes[g.idx()].left == Some(p) {
                let uncle = self.nodes[g.idx()].right;
                if let Some(u) = uncle.filter(|u| self.nodes[u.idx()].red) {
                    self.set_red(p, false);
                    self.set_red(u, false);
                    self.set_red(g, true);
                    node = g;
                } else {
                    let mut p = p;
                    if self.nodes[p.idx()].right == Some(node) {
                        self.rotate_left(p);
                        node = p;
                        p = self.nodes[node.idx()].parent.unwrap_or(g);
                    }
                    self.set_red(p, false);
                    self.set_red(g, true);
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.nodes[g.idx()].left;
                if let Some(u) = uncle.filter(|u| self.nodes[u.idx()].red) {
                    self.set_red(p, false);
                    self.set_red(u, false);
                    self.set_red(g, true);
                    node = g;
                } else {
                    let mut p = p;
                    if self.nodes[p.idx()].left == Some(node) {
                        self.rotate_right(p);
                        node = p;
                        p = self.nodes[node.idx()].parent.unwrap_or(g);
                    }
                    self.set_red(p, false);
                    self.set_red(g, true);
                    self.rotate_left(g);
                }
            }
            parent = self.nodes[node.idx()].parent;
        }
        if let Some(root) = self.root {
            self.set_red(root, false);
        }
    }

    /// Unlinks `id` from the tree and returns its value. The slot is recycled.
    pub fn remove(&mut self, id: NodeId) -> T {
        let (prev, next) = {
            let n = &self.nodes[id.idx()];
            (n.prev, n.next)
        };
        if let Some(nx) = next {
            self.nodes[nx.idx()].prev = prev;
        }
        if let Some(pv) = prev {
            self.nodes[pv.idx()].next = next;
        }

        let Node {
            value,
            parent,
            left,
            right,
            red,
            ..
        } = self.nodes[id.idx()].clone();

        let succ = match (left, right) {
            (None, _) => right,
            (_, None) => left,
            (Some(_), Some(r)) => Some(self.leftmost(r)),
        };
        match parent {
            Some(p) => {
                if self.nodes[p.idx()].left == Some(id) {
                    self.nodes[p.idx()].left = succ;
                } else {
                    self.nodes[p.idx()].right = succ;
                }
            }
            None => self.root = succ,
        }

        let removed_red;
        let child;
        let mut child_parent;
        match (left, right, succ) {
            (Some(l), Some(r), Some(s)) => {
                removed_red = self.nodes[s.idx()].red;
                self.nodes[s.idx()].red = red;
                self.nodes[s.idx()].left = Some(l);
                self.nodes[l.idx()].parent = Some(s);
                if s != r {
                    child_parent = self.nodes[s.idx()].parent;
                    self.nodes[s.idx()].parent = parent;
                    child = self.nodes[s.idx()].right;
                    if let Some(cp) = child_parent {
                        self.nodes[cp.idx()].left = child;
                    }
                    self.nodes[s.idx()].right = Some(r);
                    self.nodes[r.idx()].parent = Some(s);
                } else {
                    self.nodes[s.idx()].parent = parent;
                    child_parent = Some(s);
                    child = self.nodes[s.idx()].right;
                }
            }
            _ => {
                removed_red = red;
                child = succ;
                child_parent = parent;
            }
        }

        if let Some(c) = child {
            self.nodes[c.idx()].parent = child_parent;
        }

        self.len -= 1;
        self.free.push(id);

        if removed_red {
            return value;
        }
        if let Some(c) = child.filter(|c| self.nodes[c.idx()].red) {
            self.set_red(c, false);
            return value;
        }

        let mut node = child;
        loop {
            if node == self.root {
                break;
            }
            let Some(p) = child_parent else {
                break;
            };
            if self.nodes[p.idx()].left == node {
                let Some(mut sibling) = self.nodes[p.idx()].right else {
                    break;
                };
                if self.nodes[sibling.idx()].red {
                    self.set_red(sibling, false);
                    self.set_red(p, true);
                    self.rotate_left(p);
                    let Some(s) = self.nodes[p.idx()].right else {
                        break;
                    };
                    sibling = s;
                }
                let sl = self.nodes[sibling.idx()].left;
                let sr = self.nodes[sibling.idx()].right;
                if self.is_red(sl) || self.is_red(sr) {
                    if !self.is_red(sr) {
                        if let Some(sl) = sl {
                            self.set_red(sl, false);
                        }
                        self.set_red(sibling, true);
                        self.rotate_right(sibling);
                        let Some(s) = self.nodes[p.idx()].right else {
                            break;
                        };
                        sibling = s;
                    }
                    let parent_red = self.nodes[p.idx()].red;
                    self.set_red(sibling, parent_red);
                    self.set_red(p, false);
                    if let Some(sr) = self.nodes[sibling.idx()].right {
                        self.set_red(sr, false);
                    }
                    self.rotate_left(p);
                    node = self.root;
                    break;
                }
                self.set_red(sibling, true);
            } else {
                let Some(mut sibling) = self.nodes[p.idx()].left else {
                    break;
                };
                if self.nodes[sibling.idx()].red {
                    self.set_red(sibling, false);
                    self.set_red(p, true);
                    self.rotate_right(p);
                    let Some(s) = self.nodes[p.idx()].left else {
                        break;
                    };
                    sibling = s;
                }
                let sl = self.nodes[sibling.idx()].left;
                let sr = self.nodes[sibling.idx()].right;
                if self.is_red(sl) || self.is_red(sr) {
                    if !self.is_red(sl) {
                        if let Some(sr) = sr {
                            self.set_red(sr, false);
                        }
                        self.set_red(sibling, true);
                        self.rotate_left(sibling);
                        let Some(s) = self.nodes[p.idx()].left else {
                            break;
                        };
                        sibling = s;
                    }
                    let parent_red = self.nodes[p.idx()].red;
                    self.set_red(sibling, parent_red);
                    self.set_red(p, false);
                    if let Some(sl) = self.nodes[sibling.idx()].left {
                        self.set_red(sl, false);
                    }
                    self.rotate_right(p);
                    node = self.root;
                    break;
                }
                self.set_red(sibling, true);
            }
            node = Some(p);
            child_parent = self.nodes[p.idx()].parent;
            if self.nodes[p.idx()].red {
                break;
            }
        }
        if let Some(n) = node {
            self.set_red(n, false);
        }
        value
    }

    fn rotate_left(&mut self, p: NodeId) {
        let Some(q) = self.nodes[p.idx()].right else {
            return;
        };
        let parent = self.nodes[p.idx()].parent;
        match parent {
            Some(pp) => {
                if self.nodes[pp.idx()].left == Some(p) {
                    self.nodes[pp.idx()].left = Some(q);
                } else {
                    self.nodes[pp.idx()].right = Some(q);
                }
            }
            None => self.root = Some(q),
        }
        self.nodes[q.idx()].parent = parent;
        self.nodes[p.idx()].parent = Some(q);
        let inner = self.nodes[q.idx()].left;
        self.nodes[p.idx()].right = inner;
        if let Some(i) = inner {
            self.nodes[i.idx()].parent = Some(p);
        }
        self.nodes[q.idx()].left = Some(p);
    }

    fn rotate_right(&mut self, p: NodeId) {
        let Some(q) = self.nodes[p.idx()].left else {
            return;
        };
        let parent = self.nodes[p.idx()].parent;
        match parent {
            Some(pp) => {
                if self.nodes[pp.idx()].left == Some(p) {
                    self.nodes[pp.idx()].left = Some(q);
                } else {
                    self.nodes[pp.idx()].right = Some(q);
                }
            }
            None => self.root = Some(q),
        }
        self.nodes[q.idx()].parent = parent;
        self.nodes[p.idx()].parent = Some(q);
        let inner = self.nodes[q.idx()].right;
        self.nodes[p.idx()].left = inner;
        if let Some(i) = inner {
            self.nodes[i.idx()].parent = Some(p);
        }
        self.nodes[q.idx()].right = Some(p);
    }
}

#[cfg(test)]
impl<T: Copy> RbTree<T> {
    /// Checks the red-black invariants and the consistency of parent and neighbour links.
    /// Returns the black height.
    pub(crate) fn check_invariants(&self) -> usize {
        fn walk<T: Copy>(t: &RbTree<T>, n: Option<NodeId>, out: &mut Vec<NodeId>) -> usize {
            let Some(n) = n else {
                return 1;
            };
            let node = &t.nodes[n.idx()];
            for c in [node.left, node.right].into_iter().flatten() {
                assert_eq!(t.nodes[c.idx()].parent, Some(n), "broken parent link");
                if node.red {
                    assert!(!t.nodes[c.idx()].red, "red node with red child");
                }
            }
            let lh = walk(t, node.left, out);
            out.push(n);
            let rh = walk(t, node.right, out);
            assert_eq!(lh, rh, "unequal black height");
            lh + usize::from(!node.red)
        }

        if let Some(r) = self.root {
            assert!(!self.nodes[r.idx()].red, "red root");
            assert_eq!(self.nodes[r.idx()].parent, None);
        }
        let mut in_order = Vec::new();
        let h = walk(self, self.root, &mut in_order);
        let linked: Vec<NodeId> = self.iter().collect();
        assert_eq!(in_order, linked, "prev/next links disagree with tree order");
        assert_eq!(in_order.len(), self.len);
        h
    }
}

#[cfg(test)]
mod tests {
    use super::{NodeId, RbTree};

    fn values(t: &RbTree<u32>) -> Vec<u32> {
        t.iter().map(|n| *t.get(n)).collect()
    }

    #[test]
    fn insert_successor_keeps_visual_order() {
        let mut t = RbTree::new();
        let a = t.insert_successor(None, 1);
        let c = t.insert_successor(Some(a), 3);
        t.insert_successor(Some(a), 2);
        t.insert_successor(Some(c), 4);
        t.insert_successor(None, 0);
        assert_eq!(values(&t), vec![0, 1, 2, 3, 4]);
        t.check_invariants();
    }

    #[test]
    fn appending_many_nodes_stays_balanced() {
        let mut t = RbTree::new();
        let mut last = None;
        for i in 0..1024u32 {
            last = Some(t.insert_successor(last, i));
            t.check_invariants();
        }
        assert_eq!(values(&t), (0..1024).collect::<Vec<_>>());
        let black_height = t.check_invariants();
        // A red-black tree with n nodes has black height <= log2(n + 1) + 1.
        assert!(black_height <= 12, "black height {black_height}");
    }

    #[test]
    fn removal_relinks_neighbours_and_rebalances() {
        let mut t = RbTree::new();
        let mut ids: Vec<NodeId> = Vec::new();
        let mut last = None;
        for i in 0..200u32 {
            let id = t.insert_successor(last, i);
            ids.push(id);
            last = Some(id);
        }
        // Remove every third node, then the remaining odd ones.
        let mut expected: Vec<u32> = (0..200).collect();
        for (i, id) in ids.iter().enumerate() {
            if i % 3 == 0 {
                assert_eq!(t.remove(*id), i as u32);
                expected.retain(|v| *v != i as u32);
                t.check_invariants();
            }
        }
        assert_eq!(values(&t), expected);
        for (i, id) in ids.iter().enumerate() {
            if i % 3 != 0 && i % 2 == 1 {
                t.remove(*id);
                expected.retain(|v| *v != i as u32);
                t.check_invariants();
            }
        }
        assert_eq!(values(&t), expected);
    }

    #[test]
    fn interleaved_insert_and_remove_reuses_slots() {
        let mut t = RbTree::new();
        let mut live: Vec<NodeId> = Vec::new();
        let mut state = 0x2545F4914F6CDD1Du64;
        let mut step = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };
        for i in 0..2000u32 {
            let r = step();
            if live.is_empty() || r % 3 != 0 {
                let after = if live.is_empty() || r % 5 == 0 {
                    None
                } else {
                    Some(live[(r as usize / 7) % live.len()])
                };
                live.push(t.insert_successor(after, i));
            } else {
                let idx = (r as usize / 11) % live.len();
                let id = live.swap_remove(idx);
                t.remove(id);
            }
            t.check_invariants();
        }
        assert_eq!(t.len(), live.len());
        for id in live.drain(..) {
            t.remove(id);
        }
        assert!(t.is_empty());
        assert_eq!(t.root(), None);
        assert_eq!(t.first(), None);
    }
}
