use bitvec::prelude::*;
use derivative::Derivative;
use log::trace;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::{HuffmanError, Result};
use crate::frequency::FrequencyTable;
use crate::{ALPHABET_SIZE, MAX_CODE_LEN};

/// A node of a prefix-code tree. Branching left reads a 0 bit, right reads a 1.
///
/// Trees built from frequencies always have both children on every internal
/// node. Trees rebuilt from a file header may leave a branch empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(u8),
    Internal {
        left: Option<Box<Node>>,
        right: Option<Box<Node>>,
    },
}

impl Node {
    fn empty() -> Self {
        Node::Internal {
            left: None,
            right: None,
        }
    }

    fn from_children(left: Node, right: Node) -> Self {
        Node::Internal {
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }

    pub fn child(&self, bit: bool) -> Option<&Node> {
        match self {
            Node::Leaf(_) => None,
            Node::Internal { left, right } => {
                if bit {
                    right.as_deref()
                } else {
                    left.as_deref()
                }
            }
        }
    }

    /// Number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Internal { left, right } => {
                let l = left.as_deref().map_or(0, |n| n.depth() + 1);
                let r = right.as_deref().map_or(0, |n| n.depth() + 1);
                l.max(r)
            }
        }
    }

    /// Walk `code` down from this node, creating branches as needed, and turn
    /// the node it ends on into a leaf for `symbol`.
    fn insert(&mut self, symbol: u8, code: &BitSlice<u8, Msb0>) -> Result<()> {
        let mut cur = self;
        for bit in code.iter().by_vals() {
            cur = match cur {
                Node::Leaf(other) => {
                    return Err(HuffmanError::MalformedHeader(format!(
                        "code for {:#04x} runs through the leaf for {:#04x}",
                        symbol, other
                    )))
                }
                Node::Internal { left, right } => {
                    let slot = if bit { right } else { left };
                    &mut **slot.get_or_insert_with(|| Box::new(Node::empty()))
                }
            };
        }

        if !matches!(cur, Node::Internal { left: None, right: None }) {
            return Err(HuffmanError::MalformedHeader(format!(
                "code for {:#04x} collides with another code",
                symbol
            )));
        }
        *cur = Node::Leaf(symbol);
        Ok(())
    }

    /// Replay `bits` against the tree, emitting a symbol at every leaf.
    ///
    /// A root that is itself a leaf (single-symbol tree) answers to the one-bit
    /// code `0`. Running out of bits partway down a path is a truncation.
    pub fn decode(&self, bits: &BitSlice<u8, Msb0>) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut cur = self;
        let mut depth = 0usize;

        for (bit_offset, bit) in bits.iter().by_vals().enumerate() {
            if let Node::Leaf(symbol) = cur {
                if bit {
                    return Err(HuffmanError::InvalidCode { bit_offset });
                }
                out.push(*symbol);
                continue;
            }

            cur = cur
                .child(bit)
                .ok_or(HuffmanError::InvalidCode { bit_offset })?;
            depth += 1;

            if let Node::Leaf(symbol) = cur {
                out.push(*symbol);
                cur = self;
                depth = 0;
            }
        }

        if depth != 0 {
            return Err(HuffmanError::Truncated("body ends partway through a code"));
        }
        Ok(out)
    }
}

/// Queue entry for tree construction: ordered by weight, then by insertion.
#[derive(Debug, Derivative)]
#[derivative(PartialEq, Eq, PartialOrd, Ord)]
struct Pending {
    weight: u64,
    seq: usize,

    #[derivative(PartialEq = "ignore")]
    #[derivative(PartialOrd = "ignore")]
    #[derivative(Ord = "ignore")]
    node: Node,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
    root: Node,
    leaf_order: Vec<u8>,
}

impl HuffmanTree {
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Symbols in the order they left the queue during construction, or in
    /// header order for a rebuilt tree.
    pub fn leaf_order(&self) -> &[u8] {
        &self.leaf_order
    }

    /// Rebuild a tree from `(symbol, code)` pairs as read from a file header.
    pub fn from_codes<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u8, BitVec<u8, Msb0>)>,
    {
        let mut root = Node::empty();
        let mut seen = [false; ALPHABET_SIZE];
        let mut leaf_order = Vec::new();

        for (symbol, code) in entries {
            let slot = seen.get_mut(symbol as usize).ok_or_else(|| {
                HuffmanError::MalformedHeader(format!(
                    "symbol {:#04x} is outside the 7-bit alphabet",
                    symbol
                ))
            })?;
            if *slot {
                return Err(HuffmanError::MalformedHeader(format!(
                    "symbol {:#04x} appears twice",
                    symbol
                )));
            }
            *slot = true;

            if code.is_empty() || code.len() > MAX_CODE_LEN {
                return Err(HuffmanError::MalformedHeader(format!(
                    "code for {:#04x} has invalid length {}",
                    symbol,
                    code.len()
                )));
            }
            root.insert(symbol, &code)?;
            leaf_order.push(symbol);
        }

        Ok(Self { root, leaf_order })
    }
}

/// Build the Huffman tree for `freqs` by repeatedly merging the two lightest
/// nodes. The first node taken from the queue becomes the left child.
pub fn huffman(freqs: &FrequencyTable) -> Result<HuffmanTree> {
    let mut pq: BinaryHeap<_> = freqs
        .present()
        .enumerate()
        .map(|(seq, (symbol, weight))| {
            Reverse(Pending {
                weight,
                seq,
                node: Node::Leaf(symbol),
            })
        })
        .collect();

    if pq.is_empty() {
        return Err(HuffmanError::EmptyInput);
    }

    let mut next_seq = pq.len();
    let mut leaf_order = Vec::with_capacity(pq.len());

    while let Some(Reverse(left)) = pq.pop() {
        let right = match pq.pop() {
            Some(Reverse(right)) => right,
            None => {
                if let Node::Leaf(symbol) = left.node {
                    leaf_order.push(symbol);
                }
                trace!("huffman tree: {:?}", left.node);
                return Ok(HuffmanTree {
                    root: left.node,
                    leaf_order,
                });
            }
        };

        for pending in [&left, &right] {
            if let Node::Leaf(symbol) = pending.node {
                leaf_order.push(symbol);
            }
        }

        pq.push(Reverse(Pending {
            weight: left.weight + right.weight,
            seq: next_seq,
            node: Node::from_children(left.node, right.node),
        }));
        next_seq += 1;
    }

    Err(HuffmanError::EmptyInput)
}
