//! Arena-allocated prefix tree (trie) over dictionary words.
//!
//! Nodes are referenced by a stable `NodeId` index into an arena `Vec`
//! rather than by pointer, so "is this the same node" is index equality
//! and the tree can be shared across beams (and threads) without any
//! interior mutability. See §9 of the design document.

use std::collections::HashMap;

/// Index into `PrefixTree`'s node arena. The root is always `NodeId(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

struct Node {
    children: HashMap<char, NodeId>,
    /// Id of the word in the language model's vocabulary table, if the
    /// path from root to this node spells a complete dictionary word.
    word_id: Option<u32>,
    /// Precomputed: characters that legally extend this prefix toward
    /// some dictionary word. Root's `next_chars` is the dictionary's
    /// first-character set.
    next_chars: Vec<char>,
    /// Precomputed: word ids of every dictionary word reachable from
    /// this node (including this node itself, if it is terminal). Used
    /// by the n-gram forecast scoring modes.
    completions: Vec<u32>,
}

/// Dictionary of known words, as a trie over word-characters.
pub struct PrefixTree {
    nodes: Vec<Node>,
}

impl PrefixTree {
    pub const ROOT: NodeId = NodeId(0);

    /// Build a tree from `words`, where `words[i]` has vocabulary id `i`.
    pub fn new(words: &[String]) -> Self {
        let mut tree = PrefixTree {
            nodes: vec![Node {
                children: HashMap::new(),
                word_id: None,
                next_chars: Vec::new(),
                completions: Vec::new(),
            }],
        };
        for (id, word) in words.iter().enumerate() {
            tree.insert(word, id as u32);
        }
        tree.precompute();
        tree
    }

    fn insert(&mut self, word: &str, word_id: u32) {
        let mut node = Self::ROOT;
        for ch in word.chars() {
            node = match self.nodes[node.0 as usize].children.get(&ch) {
                Some(&child) => child,
                None => {
                    let child = NodeId(self.nodes.len() as u32);
                    self.nodes.push(Node {
                        children: HashMap::new(),
                        word_id: None,
                        next_chars: Vec::new(),
                        completions: Vec::new(),
                    });
                    self.nodes[node.0 as usize].children.insert(ch, child);
                    child
                }
            };
        }
        self.nodes[node.0 as usize].word_id = Some(word_id);
    }

    /// Bottom-up pass filling in `next_chars` and `completions` for every
    /// node. Nodes are inserted in pre-order during `insert`, so visiting
    /// the arena in reverse guarantees every child is processed before
    /// its parent.
    fn precompute(&mut self) {
        for idx in (0..self.nodes.len()).rev() {
            let children: Vec<(char, NodeId)> = self.nodes[idx]
                .children
                .iter()
                .map(|(&ch, &child)| (ch, child))
                .collect();

            let mut next_chars = Vec::with_capacity(children.len());
            let mut completions = Vec::new();
            if let Some(id) = self.nodes[idx].word_id {
                completions.push(id);
            }
            for (ch, child) in children {
                next_chars.push(ch);
                completions.extend_from_slice(&self.nodes[child.0 as usize].completions);
            }
            next_chars.sort_unstable();
            completions.sort_unstable();
            completions.dedup();

            self.nodes[idx].next_chars = next_chars;
            self.nodes[idx].completions = completions;
        }
    }

    pub fn child(&self, node: NodeId, ch: char) -> Option<NodeId> {
        self.nodes[node.0 as usize].children.get(&ch).copied()
    }

    pub fn next_chars(&self, node: NodeId) -> &[char] {
        &self.nodes[node.0 as usize].next_chars
    }

    pub fn word_id(&self, node: NodeId) -> Option<u32> {
        self.nodes[node.0 as usize].word_id
    }

    pub fn is_word(&self, node: NodeId) -> bool {
        self.word_id(node).is_some()
    }

    pub fn completions(&self, node: NodeId) -> &[u32] {
        &self.nodes[node.0 as usize].completions
    }
}
