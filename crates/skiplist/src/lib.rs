//! Concurrent ordered map backed by a skip list.
//!
//! A single [`std::sync::RwLock`] guards the whole structure: reads take a
//! shared lock, `insert`/`delete` take an exclusive one, for the entire
//! duration of the operation. This is the simple, coarse-grained discipline
//! rather than a lock-free CAS scheme - correct first, fast second.

use rand::Rng;
use std::sync::RwLock;

/// Maximum number of levels a node's forward-pointer array may span.
pub const MAX_LEVEL: usize = 32;

struct Node {
    key: Vec<u8>,
    value: Vec<u8>,
    /// `forward[i]` is the index (into `Inner::nodes`) of the next node at
    /// level `i`, or `None` at the tail.
    forward: Vec<Option<usize>>,
}

struct Inner {
    /// Arena of all live nodes. Deleted slots are reclaimed via `free`.
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    /// `head[i]` is the first node at level `i`.
    head: Vec<Option<usize>>,
    /// Highest level currently populated by any node.
    level: usize,
    node_count: usize,
    approx_size: usize,
}

impl Inner {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: vec![None; MAX_LEVEL],
            level: 0,
            node_count: 0,
            approx_size: 0,
        }
    }

    fn alloc(&mut self, node: Node) -> usize {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx] = Some(node);
            idx
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn node(&self, idx: usize) -> &Node {
        self.nodes[idx].as_ref().expect("dangling skip-list index")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node {
        self.nodes[idx].as_mut().expect("dangling skip-list index")
    }

    /// Top-down descent, gathering the last node at each level that sorts
    /// strictly before `key` (the "predecessor array").
    fn find_predecessors(&self, key: &[u8]) -> [Option<usize>; MAX_LEVEL] {
        let mut preds: [Option<usize>; MAX_LEVEL] = [None; MAX_LEVEL];
        let mut cur: Option<usize> = None;
        for lvl in (0..MAX_LEVEL).rev() {
            loop {
                let next = match cur {
                    Some(c) => self.node(c).forward.get(lvl).copied().flatten(),
                    None => self.head[lvl],
                };
                match next {
                    Some(n) if self.node(n).key.as_slice() < key => cur = Some(n),
                    _ => break,
                }
            }
            preds[lvl] = cur;
        }
        preds
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let preds = self.find_predecessors(key);
        let candidate = match preds[0] {
            Some(p) => self.node(p).forward.first().copied().flatten(),
            None => self.head[0],
        };
        candidate
            .filter(|&idx| self.node(idx).key == key)
            .map(|idx| self.node(idx).value.clone())
    }

    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        let preds = self.find_predecessors(&key);
        let existing = match preds[0] {
            Some(p) => self.node(p).forward.first().copied().flatten(),
            None => self.head[0],
        }
        .filter(|&idx| self.node(idx).key == key);

        if let Some(idx) = existing {
            let old_len = self.node(idx).value.len();
            self.node_mut(idx).value = value.clone();
            self.approx_size = self.approx_size + value.len() - old_len;
            return;
        }

        let height = random_height();
        if height > self.level {
            self.level = height;
        }
        self.approx_size += key.len() + value.len();

        let forward = vec![None; height + 1];
        let idx = self.alloc(Node {
            key,
            value,
            forward,
        });

        for lvl in 0..=height {
            let next = match preds[lvl] {
                Some(p) => self.node(p).forward.get(lvl).copied().flatten(),
                None => self.head[lvl],
            };
            self.node_mut(idx).forward[lvl] = next;
            match preds[lvl] {
                Some(p) => self.node_mut(p).forward[lvl] = Some(idx),
                None => self.head[lvl] = Some(idx),
            }
        }
        self.node_count += 1;
    }

    fn delete(&mut self, key: &[u8]) -> bool {
        let preds = self.find_predecessors(key);
        let target = match preds[0] {
            Some(p) => self.node(p).forward.first().copied().flatten(),
            None => self.head[0],
        }
        .filter(|&idx| self.node(idx).key == key);

        let Some(idx) = target else {
            return false;
        };

        let height = self.node(idx).forward.len() - 1;
        for lvl in 0..=height {
            let next = self.node(idx).forward[lvl];
            match preds[lvl] {
                Some(p) => self.node_mut(p).forward[lvl] = next,
                None => self.head[lvl] = next,
            }
        }

        self.approx_size -= self.node(idx).key.len() + self.node(idx).value.len();
        self.nodes[idx] = None;
        self.free.push(idx);
        self.node_count -= 1;

        while self.level > 0 && self.head[self.level].is_none() {
            self.level -= 1;
        }
        true
    }

    fn iter_entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut out = Vec::with_capacity(self.node_count);
        let mut cur = self.head[0];
        while let Some(idx) = cur {
            let node = self.node(idx);
            out.push((node.key.clone(), node.value.clone()));
            cur = node.forward[0];
        }
        out
    }
}

/// Draws a random node height as `1 + geometric(p=1/2)`, capped at
/// [`MAX_LEVEL`] (expressed here as a zero-based level index in
/// `[0, MAX_LEVEL - 1]`).
fn random_height() -> usize {
    let mut rng = rand::thread_rng();
    let mut height = 0;
    while height < MAX_LEVEL - 1 && rng.gen_bool(0.5) {
        height += 1;
    }
    height
}

/// A concurrent ordered map from byte-string keys to byte-string values.
///
/// Keys are unique and compared lexicographically. `approx_size` tracks a
/// running sum of `|key| + |value|` bytes and is advisory only, used by
/// callers to decide when to rotate the structure out of service.
pub struct SkipList {
    inner: RwLock<Inner>,
}

impl SkipList {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::new()),
        }
    }

    /// Inserts `key -> value`, overwriting any existing value for `key`.
    pub fn insert(&self, key: Vec<u8>, value: Vec<u8>) {
        self.inner.write().unwrap().insert(key, value);
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.read().unwrap().get(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Removes `key`. Returns whether it was present. Not used by the LSM
    /// write path (deletes there are logical, via tombstone `insert`), but
    /// kept for parity with the spec's generic skip-list contract.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.inner.write().unwrap().delete(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().node_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn approx_size(&self) -> usize {
        self.inner.read().unwrap().approx_size
    }

    /// Snapshots all entries in ascending key order. Used by the memtable to
    /// hand a sorted stream to the SST writer.
    pub fn iter(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.inner.read().unwrap().iter_entries()
    }
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
