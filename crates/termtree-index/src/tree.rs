//! Hybrid radix trie / BK-tree over one node arena
//!
//! Every key lives in a compressed trie (edges carry multi-character labels, no two
//! sibling edges start with the same character). Keys inserted with fuzzy indexing
//! are additionally linked into a BK-tree whose edges are keyed by edit distance.
//! Both structures point at the same arena slots, so a node reachable through
//! its radix edge and through a BK link is one node, not two.

use crate::distance::distance;
use crate::error::{IndexError, Result};
use std::collections::{BTreeMap, HashSet, VecDeque};

pub(crate) type NodeId = usize;

pub(crate) const ROOT: NodeId = 0;

/// Edit budget used by fuzzy matching when callers do not pick one
pub const DEFAULT_MAX_ERRORS: usize = 2;

#[derive(Debug, Clone)]
pub(crate) struct Node<V> {
    /// `(parent, label of the edge leading here)`, only walked upward to rebuild keys
    pub(crate) parent: Option<(NodeId, String)>,
    /// Radix edges ordered by first character
    pub(crate) edges: Vec<(String, NodeId)>,
    pub(crate) bk_children: BTreeMap<usize, NodeId>,
    pub(crate) values: Vec<V>,
}

impl<V> Node<V> {
    pub(crate) fn new(parent: Option<(NodeId, String)>) -> Self {
        Self {
            parent,
            edges: Vec::new(),
            bk_children: BTreeMap::new(),
            values: Vec::new(),
        }
    }

    fn edge_position(&self, first: char) -> std::result::Result<usize, usize> {
        self.edges
            .binary_search_by(|(label, _)| label.chars().next().cmp(&Some(first)))
    }
}

/// Predicate over a key's values, used to drop matches during prefix/fuzzy search
pub type ValueFilter<'f, V> = &'f dyn Fn(&[V]) -> bool;

/// Options for [`TermTree::prefix_matches`]
pub struct PrefixOptions<'f, V> {
    /// Stop after this many matches (must be > 0 when set)
    pub limit: Option<usize>,
    pub filter: Option<ValueFilter<'f, V>>,
    /// Copy each key's values into the result
    pub include_values: bool,
}

impl<V> Default for PrefixOptions<'_, V> {
    fn default() -> Self {
        Self {
            limit: None,
            filter: None,
            include_values: false,
        }
    }
}

/// Options for [`TermTree::fuzzy_matches`]
pub struct FuzzyOptions<'f, V> {
    pub max_errors: usize,
    /// Keep only the best `limit` matches (must be > 0 when set)
    pub limit: Option<usize>,
    pub filter: Option<ValueFilter<'f, V>>,
    pub include_values: bool,
}

impl<V> Default for FuzzyOptions<'_, V> {
    fn default() -> Self {
        Self {
            max_errors: DEFAULT_MAX_ERRORS,
            limit: None,
            filter: None,
            include_values: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrefixMatch<V> {
    pub key: String,
    pub values: Option<Vec<V>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch<V> {
    pub key: String,
    pub distance: usize,
    pub values: Option<Vec<V>>,
}

/// Term index supporting exact, prefix and edit-distance lookups
#[derive(Debug, Clone)]
pub struct TermTree<V> {
    pub(crate) nodes: Vec<Node<V>>,
    pub(crate) bk_root: Option<NodeId>,
    pub(crate) key_count: usize,
}

impl<V> Default for TermTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TermTree<V> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(None)],
            bk_root: None,
            key_count: 0,
        }
    }

    /// Number of keys holding at least one value
    pub fn len(&self) -> usize {
        self.key_count
    }

    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Number of arena slots, including the root and split-only intermediate nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Insert `key` with `values` and register it for fuzzy matching
    pub fn insert<I>(&mut self, key: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
    {
        self.insert_node(key, values, true).map(|_| ())
    }

    /// Insert `key` so it is visible to exact and prefix lookups only
    pub fn insert_no_fuzzy<I>(&mut self, key: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
    {
        self.insert_node(key, values, false).map(|_| ())
    }

    pub(crate) fn insert_node<I>(&mut self, key: &str, values: I, fuzzy: bool) -> Result<NodeId>
    where
        I: IntoIterator<Item = V>,
    {
        if key.is_empty() {
            return Err(IndexError::EmptyKey);
        }
        let values: Vec<V> = values.into_iter().collect();
        if values.is_empty() {
            return Err(IndexError::NoValues(key.to_string()));
        }

        let leaf = self.radix_insert(key);

        let node = &mut self.nodes[leaf];
        if node.values.is_empty() {
            self.key_count += 1;
        }
        node.values.extend(values);

        if fuzzy {
            self.bk_insert(leaf, key);
        }
        Ok(leaf)
    }

    /// Find or create the node for `key` (non-empty), splitting edges as needed
    fn radix_insert(&mut self, key: &str) -> NodeId {
        let mut node = ROOT;
        let mut rest = key;

        loop {
            let first = match rest.chars().next() {
                Some(c) => c,
                None => return node,
            };

            let pos = match self.nodes[node].edge_position(first) {
                Ok(pos) => pos,
                Err(pos) => {
                    let child = self.alloc(Some((node, rest.to_string())));
                    self.nodes[node].edges.insert(pos, (rest.to_string(), child));
                    return child;
                }
            };

            let (common, label_len, child) = {
                let (label, child) = &self.nodes[node].edges[pos];
                (common_prefix_len(label, rest), label.len(), *child)
            };

            if common == label_len {
                rest = &rest[common..];
                node = child;
                continue;
            }

            // The key diverges inside this edge: split it at the shared prefix
            let mut shared = std::mem::take(&mut self.nodes[node].edges[pos].0);
            let old_suffix = shared.split_off(common);
            let mid = self.alloc(Some((node, shared.clone())));
            self.nodes[node].edges[pos] = (shared, mid);
            self.nodes[child].parent = Some((mid, old_suffix.clone()));
            self.nodes[mid].edges.push((old_suffix, child));

            let new_suffix = &rest[common..];
            if new_suffix.is_empty() {
                return mid;
            }
            let leaf = self.alloc(Some((mid, new_suffix.to_string())));
            // Suffixes differ in their first char, so comparing whole labels orders them
            let slot = usize::from(new_suffix > self.nodes[mid].edges[0].0.as_str());
            self.nodes[mid]
                .edges
                .insert(slot, (new_suffix.to_string(), leaf));
            return leaf;
        }
    }

    fn bk_insert(&mut self, id: NodeId, key: &str) {
        let mut current = match self.bk_root {
            Some(root) => root,
            None => {
                self.bk_root = Some(id);
                return;
            }
        };

        loop {
            if current == id {
                return;
            }
            let d = distance(key, &self.word(current));
            if d == 0 {
                return;
            }
            match self.nodes[current].bk_children.get(&d) {
                Some(&next) => current = next,
                None => {
                    self.nodes[current].bk_children.insert(d, id);
                    return;
                }
            }
        }
    }

    fn alloc(&mut self, parent: Option<(NodeId, String)>) -> NodeId {
        self.nodes.push(Node::new(parent));
        self.nodes.len() - 1
    }

    /// Rebuild a node's key from its parent chain
    pub(crate) fn word(&self, id: NodeId) -> String {
        let mut labels = Vec::new();
        let mut current = id;
        while let Some((parent, label)) = &self.nodes[current].parent {
            labels.push(label.as_str());
            current = *parent;
        }
        labels.reverse();
        labels.concat()
    }

    pub(crate) fn find(&self, key: &str) -> Option<NodeId> {
        let mut node = ROOT;
        let mut rest = key;
        while let Some(first) = rest.chars().next() {
            let pos = self.nodes[node].edge_position(first).ok()?;
            let (label, child) = &self.nodes[node].edges[pos];
            rest = rest.strip_prefix(label.as_str())?;
            node = *child;
        }
        Some(node)
    }

    /// Values stored under exactly `key`.
    ///
    /// A key that only exists as the shared prefix of longer keys yields an empty slice.
    pub fn lookup(&self, key: &str) -> Option<&[V]> {
        if key.is_empty() {
            return None;
        }
        self.find(key).map(|id| self.nodes[id].values.as_slice())
    }

    /// True when `key` was inserted with at least one value
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some_and(|values| !values.is_empty())
    }

    /// Walk down as far as `prefix` reaches. The last edge may extend past the prefix.
    fn descend_prefix(&self, prefix: &str) -> Option<(NodeId, String)> {
        let mut node = ROOT;
        let mut rest = prefix;
        let mut key = String::new();

        while let Some(first) = rest.chars().next() {
            let pos = self.nodes[node].edge_position(first).ok()?;
            let (label, child) = &self.nodes[node].edges[pos];
            if let Some(after) = rest.strip_prefix(label.as_str()) {
                rest = after;
            } else if label.starts_with(rest) {
                rest = "";
            } else {
                return None;
            }
            key.push_str(label);
            node = *child;
        }
        Some((node, key))
    }

    /// All keys starting with `prefix`, in code point order
    pub fn prefix_matches(
        &self,
        prefix: &str,
        options: &PrefixOptions<'_, V>,
    ) -> Result<Vec<PrefixMatch<V>>>
    where
        V: Clone,
    {
        let limit = check_limit(options.limit)?;
        let mut matches = Vec::new();
        let (start, start_key) = match self.descend_prefix(prefix) {
            Some(found) => found,
            None => return Ok(matches),
        };

        let mut stack = vec![(start, start_key)];
        while let Some((id, key)) = stack.pop() {
            let node = &self.nodes[id];
            if !node.values.is_empty() && accepts(options.filter, &node.values) {
                matches.push(PrefixMatch {
                    key: key.clone(),
                    values: options.include_values.then(|| node.values.clone()),
                });
                if limit.is_some_and(|limit| matches.len() >= limit) {
                    break;
                }
            }
            for (label, child) in node.edges.iter().rev() {
                stack.push((*child, format!("{}{}", key, label)));
            }
        }

        Ok(matches)
    }

    /// Fuzzy-registered keys within `max_errors` edits of `query`, best first.
    ///
    /// Results are ordered by `(distance, key)`.
    pub fn fuzzy_matches(
        &self,
        query: &str,
        options: &FuzzyOptions<'_, V>,
    ) -> Result<Vec<FuzzyMatch<V>>>
    where
        V: Clone,
    {
        let limit = check_limit(options.limit)?;
        let mut matches: Vec<FuzzyMatch<V>> = Vec::new();
        let bk_root = match self.bk_root {
            Some(root) => root,
            None => return Ok(matches),
        };

        let mut queue = VecDeque::from([bk_root]);
        while let Some(id) = queue.pop_front() {
            let node = &self.nodes[id];
            let word = self.word(id);
            let d = distance(query, &word);

            if d <= options.max_errors && accepts(options.filter, &node.values) {
                let pos = matches
                    .partition_point(|m| (m.distance, m.key.as_str()) < (d, word.as_str()));
                matches.insert(
                    pos,
                    FuzzyMatch {
                        key: word,
                        distance: d,
                        values: options.include_values.then(|| node.values.clone()),
                    },
                );
                if let Some(limit) = limit {
                    matches.truncate(limit);
                }
            }

            // Triangle inequality: a child at edge distance e only holds words whose
            // distance to the query is at least e - d.
            for (_, &child) in node.bk_children.range(..=d.saturating_add(options.max_errors)) {
                queue.push_back(child);
            }
        }

        Ok(matches)
    }

    /// Union of the keys fuzzy-matching any of `queries`, first occurrence wins
    pub fn batch_fuzzy_matches<I>(
        &self,
        queries: I,
        options: &FuzzyOptions<'_, V>,
    ) -> Result<Vec<String>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        V: Clone,
    {
        let per_query = FuzzyOptions {
            max_errors: options.max_errors,
            limit: options.limit,
            filter: options.filter,
            include_values: false,
        };

        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for query in queries {
            for m in self.fuzzy_matches(query.as_ref(), &per_query)? {
                if seen.insert(m.key.clone()) {
                    keys.push(m.key);
                }
            }
        }
        Ok(keys)
    }
}

fn check_limit(limit: Option<usize>) -> Result<Option<usize>> {
    match limit {
        Some(0) => Err(IndexError::ZeroLimit),
        other => Ok(other),
    }
}

fn accepts<V>(filter: Option<ValueFilter<'_, V>>, values: &[V]) -> bool {
    filter.map_or(true, |f| f(values))
}

/// Byte length of the longest common prefix, always on a char boundary of both strings
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()))
}
