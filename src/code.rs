use bitvec::prelude::*;
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{HuffmanError, Result};
use crate::tree::{HuffmanTree, Node};
use crate::{CODE_FIELD_BYTES, MAX_CODE_LEN};

/// A Huffman code, most significant (first walked) bit first.
pub type Code = BitVec<u8, Msb0>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    codes: HashMap<u8, Code>,
    order: Vec<u8>,
}

impl CodeTable {
    /// Assign every leaf its root-to-leaf path. A tree that is a single leaf
    /// gets the code `0` so that each occurrence still costs one bit.
    pub fn from_tree(tree: &HuffmanTree) -> Self {
        fn traverse(node: &Node, v: &mut Code, codes: &mut HashMap<u8, Code>) {
            match node {
                Node::Leaf(symbol) => {
                    codes.insert(*symbol, v.clone());
                }
                Node::Internal { left, right } => {
                    if let Some(left) = left {
                        v.push(false);
                        traverse(left, v, codes);
                        v.pop();
                    }
                    if let Some(right) = right {
                        v.push(true);
                        traverse(right, v, codes);
                        v.pop();
                    }
                }
            }
        }

        let mut codes = HashMap::new();
        if let Node::Leaf(symbol) = tree.root() {
            codes.insert(*symbol, bitvec![u8, Msb0; 0]);
        } else {
            traverse(tree.root(), &mut Code::new(), &mut codes);
        }

        for (symbol, code) in &codes {
            trace!("code {:#04x} -> {}", symbol, bit_string(code));
        }

        Self {
            codes,
            order: tree.leaf_order().to_vec(),
        }
    }

    pub fn get(&self, symbol: u8) -> Option<&BitSlice<u8, Msb0>> {
        self.codes.get(&symbol).map(|c| c.as_bitslice())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in the order they are written to a file header.
    pub fn header_order(&self) -> impl Iterator<Item = (u8, &BitSlice<u8, Msb0>)> + '_ {
        self.order
            .iter()
            .filter_map(move |&s| self.get(s).map(|c| (s, c)))
    }

    pub fn encode(&self, stream: impl IntoIterator<Item = u8>) -> Result<Code> {
        let mut out = Code::new();
        for s in stream {
            let code = self.get(s).ok_or(HuffmanError::UnknownSymbol(s))?;
            out.extend_from_bitslice(code);
        }

        Ok(out)
    }
}

/// Render a code as a string of `0`s and `1`s.
pub fn bit_string(code: &BitSlice<u8, Msb0>) -> String {
    code.iter()
        .by_vals()
        .map(|b| if b { '1' } else { '0' })
        .collect()
}

/// Pack `code` into the fixed 128-bit header field: zero fill, a sentinel
/// `1`, then the code itself in the lowest bits.
pub fn encode_code_field(code: &BitSlice<u8, Msb0>) -> [u8; CODE_FIELD_BYTES] {
    debug_assert!(!code.is_empty() && code.len() <= MAX_CODE_LEN);

    let mut field = [0u8; CODE_FIELD_BYTES];
    let bits = field.view_bits_mut::<Msb0>();
    let start = bits.len() - code.len();
    bits.set(start - 1, true);
    bits[start..].copy_from_bitslice(code);
    field
}

/// Recover a code from its header field by dropping everything up to and
/// including the first set bit.
pub fn decode_code_field(field: &[u8; CODE_FIELD_BYTES]) -> Result<Code> {
    let bits = field.view_bits::<Msb0>();
    let sentinel = bits.first_one().ok_or_else(|| {
        HuffmanError::MalformedHeader("code field has no sentinel bit".to_string())
    })?;

    let code = bits[sentinel + 1..].to_bitvec();
    if code.is_empty() {
        return Err(HuffmanError::MalformedHeader(
            "code field holds an empty code".to_string(),
        ));
    }
    Ok(code)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SerializableCodeTable {
    // (symbol, bit length, packed bits) in header order
    codes: Vec<(u8, usize, Box<[u8]>)>,
}

impl<'a> From<&'a CodeTable> for SerializableCodeTable {
    fn from(other: &'a CodeTable) -> Self {
        Self {
            codes: other
                .header_order()
                .map(|(s, code)| {
                    let len = code.len();
                    let packed = code.to_bitvec().into_vec().into_boxed_slice();

                    (s, len, packed)
                })
                .collect(),
        }
    }
}

impl From<SerializableCodeTable> for CodeTable {
    fn from(other: SerializableCodeTable) -> Self {
        let mut codes = HashMap::with_capacity(other.codes.len());
        let mut order = Vec::with_capacity(other.codes.len());
        for (s, len, packed) in other.codes {
            let mut bv = Code::from_vec(packed.into_vec());
            bv.resize(len, false);
            codes.insert(s, bv);
            order.push(s);
        }

        Self { codes, order }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::FrequencyTable;
    use crate::tree::huffman;

    fn table(data: &[u8]) -> CodeTable {
        let tree = huffman(&FrequencyTable::count(data).unwrap()).unwrap();
        CodeTable::from_tree(&tree)
    }

    fn code(s: &str) -> Code {
        s.chars().map(|c| c == '1').collect()
    }

    fn assert_prefix_free(t: &CodeTable) {
        for (a, ca) in t.header_order() {
            for (b, cb) in t.header_order() {
                if a != b {
                    assert!(!cb.starts_with(ca), "{} is a prefix of {}", a, b);
                }
            }
        }
    }

    #[test]
    fn left_zero_right_one() {
        let t = table(b"cccccccbaaac");
        assert_eq!(bit_string(t.get(b'b').unwrap()), "00");
        assert_eq!(bit_string(t.get(b'a').unwrap()), "01");
        assert_eq!(bit_string(t.get(b'c').unwrap()), "1");
        assert_eq!(t.get(b'z'), None);
    }

    #[test]
    fn header_order_follows_queue() {
        let t = table(b"cccccccbaaac");
        let order: Vec<u8> = t.header_order().map(|(s, _)| s).collect();
        assert_eq!(order, b"bac");
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn single_symbol_gets_one_bit() {
        let t = table(b"AAAAAAAA");
        assert_eq!(bit_string(t.get(b'A').unwrap()), "0");
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn codes_are_prefix_free() {
        let inputs: [&[u8]; 4] = [
            b"This is a really long message, I sure do hope it encodes and decodes properly.",
            b"aaaaaaaaaabbbbbcccd",
            b"ab",
            b"the quick brown fox jumps over the lazy dog 0123456789",
        ];
        for input in inputs {
            assert_prefix_free(&table(input));
        }

        let all: Vec<u8> = (0..128u8).collect();
        let t = table(&all);
        assert_prefix_free(&t);
        for (_, c) in t.header_order() {
            assert_eq!(c.len(), 7);
        }
    }

    #[test]
    fn encode_concatenates_codes() {
        let t = table(b"cccccccbaaac");
        let bits = t.encode(b"cba".iter().copied()).unwrap();
        assert_eq!(bit_string(&bits), "10001");
        assert!(matches!(
            t.encode(b"x".iter().copied()),
            Err(HuffmanError::UnknownSymbol(b'x'))
        ));
    }

    #[test]
    fn code_field_layout() {
        let field = encode_code_field(&code("00"));
        assert_eq!(&field[..15], &[0u8; 15]);
        assert_eq!(field[15], 0b0000_0100);

        let field = encode_code_field(&code("1"));
        assert_eq!(field[15], 0b0000_0011);

        // longest code: sentinel lands in the very first bit
        let long = code(&"10".repeat(63)).into_iter().chain([true]).collect::<Code>();
        assert_eq!(long.len(), MAX_CODE_LEN);
        let field = encode_code_field(&long);
        assert_eq!(field[0], 0b1101_0101);
        assert_eq!(decode_code_field(&field).unwrap(), long);
    }

    #[test]
    fn code_field_keeps_leading_zeros() {
        let c = code("0001011");
        assert_eq!(decode_code_field(&encode_code_field(&c)).unwrap(), c);
    }

    #[test]
    fn code_field_without_sentinel() {
        assert!(matches!(
            decode_code_field(&[0u8; CODE_FIELD_BYTES]),
            Err(HuffmanError::MalformedHeader(_))
        ));

        let mut field = [0u8; CODE_FIELD_BYTES];
        field[15] = 1;
        assert!(matches!(
            decode_code_field(&field),
            Err(HuffmanError::MalformedHeader(_))
        ));
    }

    #[test]
    fn serializable_table_msgpack() {
        let t = table(b"This is a really long message, I sure do hope it encodes and decodes properly.");
        let packed = rmp_serde::to_vec(&SerializableCodeTable::from(&t)).unwrap();
        let back: SerializableCodeTable = rmp_serde::from_slice(&packed).unwrap();

        assert_eq!(CodeTable::from(back), t);
    }
}
