//! Flat, index-addressed form of a [`TermTree`]
//!
//! Every node becomes one entry and every reference (radix edge, BK link, BK
//! anchor) becomes an entry index. A node reachable from two places is emitted
//! once. Entry 0 is always the structural root.

use crate::error::{IndexError, Result};
use crate::tree::{Node, NodeId, TermTree, ROOT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactEntry<V> {
    /// Entry index of the BK anchor, only ever set on the root entry
    #[serde(rename = "b", default, skip_serializing_if = "Option::is_none")]
    pub bk_root: Option<usize>,
    /// `(label, entry index)` radix edges in first-character order
    #[serde(rename = "r", default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<(String, usize)>,
    /// `(edit distance, entry index)` BK links in ascending distance
    #[serde(rename = "k", default, skip_serializing_if = "Vec::is_empty")]
    pub bk_children: Vec<(usize, usize)>,
    #[serde(rename = "v", default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<V>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompactTree<V> {
    pub entries: Vec<CompactEntry<V>>,
}

impl<V: Serialize> CompactTree<V> {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<V: DeserializeOwned> CompactTree<V> {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

const UNVISITED: usize = usize::MAX;

impl<V: Clone> TermTree<V> {
    /// Flatten the graph. Entry order is the depth-first first-visit order from the
    /// root (BK anchor, then radix edges, then BK links), so equal graphs always
    /// produce equal output.
    pub fn to_compact(&self) -> CompactTree<V> {
        let mut index_of = vec![UNVISITED; self.nodes.len()];
        let mut order: Vec<NodeId> = Vec::with_capacity(self.nodes.len());

        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            if index_of[id] != UNVISITED {
                continue;
            }
            index_of[id] = order.len();
            order.push(id);

            let node = &self.nodes[id];
            let mut children: Vec<NodeId> = Vec::new();
            if id == ROOT {
                children.extend(self.bk_root);
            }
            children.extend(node.edges.iter().map(|(_, child)| *child));
            children.extend(node.bk_children.values().copied());
            stack.extend(children.into_iter().rev());
        }

        let entries: Vec<CompactEntry<V>> = order
            .iter()
            .map(|&id| {
                let node = &self.nodes[id];
                CompactEntry {
                    bk_root: if id == ROOT {
                        self.bk_root.map(|b| index_of[b])
                    } else {
                        None
                    },
                    edges: node
                        .edges
                        .iter()
                        .map(|(label, child)| (label.clone(), index_of[*child]))
                        .collect(),
                    bk_children: node
                        .bk_children
                        .iter()
                        .map(|(&d, &child)| (d, index_of[child]))
                        .collect(),
                    values: node.values.clone(),
                }
            })
            .collect();

        debug!(
            entries = entries.len(),
            keys = self.key_count,
            "compacted term tree"
        );
        CompactTree { entries }
    }

    /// Rebuild a tree from its compact form.
    ///
    /// Entry `i` becomes arena slot `i`. Any reference that cannot belong to a
    /// well-formed graph is rejected instead of producing a corrupt tree.
    pub fn from_compact(compact: CompactTree<V>) -> Result<Self> {
        let count = compact.entries.len();
        if count == 0 {
            return Err(malformed("no entries"));
        }
        let in_range = |index: usize, what: &str| {
            if index < count {
                Ok(index)
            } else {
                Err(malformed(format!(
                    "{} index {} out of range ({} entries)",
                    what, index, count
                )))
            }
        };

        let mut nodes: Vec<Node<V>> = (0..count).map(|_| Node::new(None)).collect();
        let mut bk_linked = vec![false; count];
        let mut bk_root = None;

        for (id, entry) in compact.entries.into_iter().enumerate() {
            if let Some(anchor) = entry.bk_root {
                if id != ROOT {
                    return Err(malformed(format!("entry {} carries a BK root", id)));
                }
                bk_root = Some(in_range(anchor, "BK root")?);
            }

            let mut last_first: Option<char> = None;
            for (label, child) in entry.edges {
                let child = in_range(child, "radix child")?;
                let first = label.chars().next();
                if first.is_none() {
                    return Err(malformed(format!("entry {} has an empty edge label", id)));
                }
                if last_first.is_some() && first <= last_first {
                    return Err(malformed(format!("entry {} edges are not ordered", id)));
                }
                last_first = first;
                if child == ROOT || nodes[child].parent.is_some() {
                    return Err(malformed(format!(
                        "entry {} is attached under more than one parent",
                        child
                    )));
                }
                nodes[child].parent = Some((id, label.clone()));
                nodes[id].edges.push((label, child));
            }

            for (d, child) in entry.bk_children {
                let child = in_range(child, "BK child")?;
                if d == 0 || child == ROOT || bk_linked[child] {
                    return Err(malformed(format!("invalid BK link {} -> {}", id, child)));
                }
                bk_linked[child] = true;
                if nodes[id].bk_children.insert(d, child).is_some() {
                    return Err(malformed(format!(
                        "entry {} repeats BK distance {}",
                        id, d
                    )));
                }
            }

            nodes[id].values = entry.values;
        }

        check_radix_reachability(&nodes)?;
        check_bk_reachability(&nodes, bk_root, &bk_linked)?;

        let key_count = nodes.iter().filter(|n| !n.values.is_empty()).count();
        debug!(entries = count, keys = key_count, "restored term tree");

        Ok(Self {
            nodes,
            bk_root,
            key_count,
        })
    }
}

impl<V: Clone + Serialize> TermTree<V> {
    pub fn to_json(&self) -> Result<String> {
        self.to_compact().to_json()
    }
}

impl<V: Clone + DeserializeOwned> TermTree<V> {
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_compact(CompactTree::from_json(json)?)
    }
}

fn malformed(reason: impl Into<String>) -> IndexError {
    IndexError::Malformed(reason.into())
}

// Each non-root node has exactly one parent, so anything the root cannot reach
// sits on a detached cycle.
fn check_radix_reachability<V>(nodes: &[Node<V>]) -> Result<()> {
    let mut reached = 0;
    let mut stack = vec![ROOT];
    while let Some(id) = stack.pop() {
        reached += 1;
        stack.extend(nodes[id].edges.iter().map(|(_, child)| *child));
    }
    if reached != nodes.len() {
        return Err(malformed(format!(
            "{} entries are not reachable from the root",
            nodes.len() - reached
        )));
    }
    Ok(())
}

fn check_bk_reachability<V>(
    nodes: &[Node<V>],
    bk_root: Option<NodeId>,
    bk_linked: &[bool],
) -> Result<()> {
    let linked = bk_linked.iter().filter(|&&l| l).count();
    let anchor = match bk_root {
        Some(anchor) => anchor,
        None if linked == 0 => return Ok(()),
        None => return Err(malformed("BK links without a BK root")),
    };
    if anchor == ROOT || bk_linked[anchor] {
        return Err(malformed("BK root is the tree root or has a BK parent"));
    }

    let mut reached = 0;
    let mut stack = vec![anchor];
    while let Some(id) = stack.pop() {
        reached += 1;
        stack.extend(nodes[id].bk_children.values().copied());
    }
    if reached != linked + 1 {
        return Err(malformed("BK links do not form a single tree"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::{build, check_invariants, SURVEY_CORPUS};
    use crate::tree::FuzzyOptions;

    fn roundtrip(tree: &TermTree<u32>) -> TermTree<u32> {
        TermTree::from_json(&tree.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_wire_format() {
        let mut tree = TermTree::new();
        tree.insert("ab", [1u32]).unwrap();
        tree.insert_no_fuzzy("ac", [2]).unwrap();

        assert_eq!(
            tree.to_json().unwrap(),
            r#"[{"b":1,"r":[["a",2]]},{"v":[1]},{"r":[["b",1],["c",3]]},{"v":[2]}]"#
        );
    }

    #[test]
    fn test_empty_tree_roundtrip() {
        let tree: TermTree<u32> = TermTree::new();
        assert_eq!(tree.to_json().unwrap(), "[{}]");
        let restored = roundtrip(&tree);
        assert!(restored.is_empty());
        assert_eq!(restored.node_count(), 1);
    }

    #[test]
    fn test_roundtrip_preserves_lookups() {
        let mut tree = build(SURVEY_CORPUS);
        tree.insert_no_fuzzy("surge", [42]).unwrap();

        let restored = roundtrip(&tree);
        check_invariants(&restored);
        assert_eq!(restored.len(), tree.len());
        assert_eq!(restored.node_count(), tree.node_count());
        for (i, word) in SURVEY_CORPUS.iter().enumerate() {
            assert_eq!(restored.lookup(word), Some(&[i as u32][..]));
        }
        assert_eq!(restored.lookup("surge"), Some(&[42][..]));

        let found = restored
            .fuzzy_matches("survey", &FuzzyOptions::default())
            .unwrap();
        let found: Vec<_> = found.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(found, vec!["survey", "surveys", "serve", "surgery"]);
    }

    #[test]
    fn test_reserialization_is_byte_identical() {
        let tree = build(SURVEY_CORPUS);
        let first = tree.to_json().unwrap();
        let second = TermTree::<u32>::from_json(&first)
            .unwrap()
            .to_json()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_shared_nodes_stay_shared() {
        let tree = roundtrip(&build(SURVEY_CORPUS));

        let anchor = tree.bk_root.unwrap();
        assert_eq!(tree.find(&tree.word(anchor)), Some(anchor));

        let mut links = 0;
        for node in &tree.nodes {
            for &child in node.bk_children.values() {
                let word = tree.word(child);
                assert!(SURVEY_CORPUS.contains(&word.as_str()));
                assert_eq!(tree.find(&word), Some(child));
                links += 1;
            }
        }
        assert_eq!(links, SURVEY_CORPUS.len() - 1);
    }

    #[test]
    fn test_restored_tree_accepts_inserts() {
        let mut tree = roundtrip(&build(SURVEY_CORPUS));
        tree.insert("surveyor", [99]).unwrap();
        tree.insert("sur", [100]).unwrap();
        check_invariants(&tree);

        assert_eq!(tree.lookup("surveyor"), Some(&[99][..]));
        assert_eq!(tree.lookup("sur"), Some(&[100][..]));
        let options = FuzzyOptions {
            max_errors: 0,
            ..FuzzyOptions::default()
        };
        assert_eq!(tree.fuzzy_matches("surveyor", &options).unwrap().len(), 1);
    }

    fn rejects(json: &str) {
        let result = TermTree::<u32>::from_json(json);
        assert!(
            matches!(result, Err(IndexError::Malformed(_))),
            "accepted {}",
            json
        );
    }

    #[test]
    fn test_rejects_malformed_input() {
        rejects("[]");
        rejects(r#"[{"r":[["a",5]]}]"#);
        rejects(r#"[{"b":3,"r":[["a",1]]},{"v":[1]}]"#);
        rejects(r#"[{"r":[["a",1],["b",1]]},{"v":[1]}]"#);
        rejects(r#"[{"r":[["",1]]},{"v":[1]}]"#);
        rejects(r#"[{"r":[["b",1],["a",2]]},{"v":[1]},{"v":[2]}]"#);
        rejects(r#"[{"r":[["a",0]]}]"#);
        // detached radix cycle
        rejects(r#"[{},{"r":[["x",2]]},{"r":[["y",1]]}]"#);
        // BK root outside the root entry
        rejects(r#"[{"r":[["a",1]]},{"b":1,"v":[1]}]"#);
        // BK cycle back to the anchor
        rejects(
            r#"[{"b":1,"r":[["a",1],["b",2]]},{"k":[[1,2]],"v":[1]},{"k":[[1,1]],"v":[2]}]"#,
        );
        // BK links with no anchor
        rejects(r#"[{"r":[["a",1],["b",2]]},{"k":[[1,2]],"v":[1]},{"v":[2]}]"#);
    }

    #[test]
    fn test_json_type_errors_surface() {
        let result = TermTree::<u32>::from_json("{not json");
        assert!(matches!(result, Err(IndexError::Json(_))));
    }
}
