//! Arena-backed splay tree.
//!
//! Nodes live in a `Vec` and link to each other by index. Every lookup,
//! insert and removal splays the touched node (or the last node visited on a
//! miss) to the root, so hot keys stay near the top and any access sequence
//! costs O(log n) amortized.
//!
//! Lookups restructure the tree, so even `get` needs `&mut self`.

use std::borrow::Borrow;
use std::cmp::Ordering;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

#[derive(Debug)]
pub struct SplayTree<K, V> {
    nodes: Vec<Node<K, V>>,
    root: Option<usize>,
}

impl<K: Ord, V> SplayTree<K, V> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up `key`, splaying it (or its nearest neighbour on a miss) to the root.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let idx = self.find(key)?;
        Some(&self.nodes[idx].value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let idx = self.find(key)?;
        Some(&mut self.nodes[idx].value)
    }

    pub fn contains_key<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Insert or overwrite. Returns the previous value for `key`, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let Some(mut cur) = self.root else {
            self.root = Some(self.alloc(key, value, None));
            return None;
        };

        loop {
            match key.cmp(&self.nodes[cur].key) {
                Ordering::Equal => {
                    let old = std::mem::replace(&mut self.nodes[cur].value, value);
                    self.splay(cur);
                    return Some(old);
                }
                Ordering::Less => match self.nodes[cur].left {
                    Some(next) => cur = next,
                    None => {
                        let idx = self.alloc(key, value, Some(cur));
                        self.nodes[cur].left = Some(idx);
                        self.splay(idx);
                        return None;
                    }
                },
                Ordering::Greater => match self.nodes[cur].right {
                    Some(next) => cur = next,
                    None => {
                        let idx = self.alloc(key, value, Some(cur));
                        self.nodes[cur].right = Some(idx);
                        self.splay(idx);
                        return None;
                    }
                },
            }
        }
    }

    /// Remove `key`, returning its value if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        // `find` leaves the target at the root.
        let target = self.find(key)?;
        let left = self.nodes[target].left.take();
        let right = self.nodes[target].right.take();
        if let Some(l) = left {
            self.nodes[l].parent = None;
        }
        if let Some(r) = right {
            self.nodes[r].parent = None;
        }

        self.root = match (left, right) {
            (None, None) => None,
            (Some(l), None) => Some(l),
            (None, Some(r)) => Some(r),
            (Some(l), Some(r)) => {
                // Join: bring the left subtree's maximum up, it has no right child.
                let mut max = l;
                while let Some(next) = self.nodes[max].right {
                    max = next;
                }
                self.splay(max);
                self.nodes[max].right = Some(r);
                self.nodes[r].parent = Some(max);
                Some(max)
            }
        };

        Some(self.release(target).value)
    }

    fn find<Q>(&mut self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cur = self.root;
        let mut last = None;
        while let Some(idx) = cur {
            last = Some(idx);
            match key.cmp(self.nodes[idx].key.borrow()) {
                Ordering::Equal => {
                    self.splay(idx);
                    return Some(idx);
                }
                Ordering::Less => cur = self.nodes[idx].left,
                Ordering::Greater => cur = self.nodes[idx].right,
            }
        }
        if let Some(idx) = last {
            self.splay(idx);
        }
        None
    }

    fn alloc(&mut self, key: K, value: V, parent: Option<usize>) -> usize {
        self.nodes.push(Node {
            key,
            value,
            parent,
            left: None,
            right: None,
        });
        self.nodes.len() - 1
    }

    /// Drop a fully detached node from the arena. The last node moves into
    /// its slot, so links that pointed at the old last index are rewritten.
    fn release(&mut self, idx: usize) -> Node<K, V> {
        let last = self.nodes.len() - 1;
        let node = self.nodes.swap_remove(idx);
        if idx == last {
            return node;
        }

        let moved = &self.nodes[idx];
        let (parent, left, right) = (moved.parent, moved.left, moved.right);
        match parent {
            Some(p) => {
                if self.nodes[p].left == Some(last) {
                    self.nodes[p].left = Some(idx);
                } else {
                    self.nodes[p].right = Some(idx);
                }
            }
            None => self.root = Some(idx),
        }
        if let Some(l) = left {
            self.nodes[l].parent = Some(idx);
        }
        if let Some(r) = right {
            self.nodes[r].parent = Some(idx);
        }
        node
    }

    fn rotate(&mut self, x: usize) {
        let Some(p) = self.nodes[x].parent else {
            return;
        };
        let grand = self.nodes[p].parent;

        if self.nodes[p].left == Some(x) {
            let inner = self.nodes[x].right;
            self.nodes[p].left = inner;
            if let Some(i) = inner {
                self.nodes[i].parent = Some(p);
            }
            self.nodes[x].right = Some(p);
        } else {
            let inner = self.nodes[x].left;
            self.nodes[p].right = inner;
            if let Some(i) = inner {
                self.nodes[i].parent = Some(p);
            }
            self.nodes[x].left = Some(p);
        }
        self.nodes[p].parent = Some(x);
        self.nodes[x].parent = grand;

        match grand {
            None => self.root = Some(x),
            Some(g) => {
                if self.nodes[g].left == Some(p) {
                    self.nodes[g].left = Some(x);
                } else {
                    self.nodes[g].right = Some(x);
                }
            }
        }
    }

    fn splay(&mut self, x: usize) {
        while let Some(p) = self.nodes[x].parent {
            match self.nodes[p].parent {
                None => self.rotate(x),
                Some(g) => {
                    let x_is_left = self.nodes[p].left == Some(x);
                    let p_is_left = self.nodes[g].left == Some(p);
                    if x_is_left == p_is_left {
                        // zig-zig
                        self.rotate(p);
                        self.rotate(x);
                    } else {
                        // zig-zag
                        self.rotate(x);
                        self.rotate(x);
                    }
                }
            }
        }
    }
}

impl<K: Ord, V> Default for SplayTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
