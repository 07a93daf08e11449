//! On-disk layout:
//!
//! ```text
//! [1]   symbol count (1..=128)
//! per symbol:
//!   [1]   symbol
//!   [16]  code, sentinel-padded to 128 bits, MSB first
//! [N]   body, codes packed MSB first
//! [1]   number of zero bits padding the last body byte (0..=7)
//! ```

use bitvec::prelude::*;
use log::debug;
use std::io::{Read, Write};

use crate::code::{decode_code_field, encode_code_field, CodeTable};
use crate::error::{HuffmanError, Result};
use crate::tree::HuffmanTree;
use crate::{ALPHABET_SIZE, CODE_FIELD_BYTES, HEADER_ENTRY_LEN};

/// Streams codes to a sink a byte at a time, keeping a byte's worth of bits
/// or fewer buffered.
struct BodyWriter<W> {
    sink: W,
    pending: BitVec<u8, Msb0>,
    bytes: u64,
    bits: u64,
}

impl<W: Write> BodyWriter<W> {
    fn new(sink: W) -> Self {
        Self {
            sink,
            pending: BitVec::with_capacity(2 * ALPHABET_SIZE),
            bytes: 0,
            bits: 0,
        }
    }

    fn push(&mut self, code: &BitSlice<u8, Msb0>) -> Result<()> {
        self.pending.extend_from_bitslice(code);
        self.bits += code.len() as u64;
        while self.pending.len() > 8 {
            let byte = self.pending[..8].load_be::<u8>();
            self.sink.write_all(&[byte])?;
            self.pending.drain(..8);
            self.bytes += 1;
        }
        Ok(())
    }

    /// Zero-fill and write the last partial byte, then the padding count.
    /// Returns the sink, body length in bytes and the padding count.
    fn finish(mut self) -> Result<(W, u64, u8)> {
        let mut padding = 0u8;
        if !self.pending.is_empty() {
            padding = (8 - self.pending.len()) as u8;
            self.pending.resize(8, false);
            let byte = self.pending.load_be::<u8>();
            self.sink.write_all(&[byte])?;
            self.bytes += 1;
        }
        self.sink.write_all(&[padding])?;
        Ok((self.sink, self.bytes, padding))
    }
}

/// Summary of a finished write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub header_len: u64,
    pub body_len: u64,
    pub body_bits: u64,
    pub padding: u8,
}

impl WriteSummary {
    /// Total bytes written, padding byte included.
    pub fn total_len(&self) -> u64 {
        self.header_len + self.body_len + 1
    }
}

pub fn write_header<W: Write>(out: &mut W, codes: &CodeTable) -> Result<u64> {
    // ALPHABET_SIZE (128) still fits in the count byte
    let count = u8::try_from(codes.len()).map_err(|_| {
        HuffmanError::MalformedHeader(format!("{} symbols do not fit the header", codes.len()))
    })?;
    out.write_all(&[count])?;

    for (symbol, code) in codes.header_order() {
        out.write_all(&[symbol])?;
        out.write_all(&encode_code_field(code))?;
    }
    Ok(1 + codes.len() as u64 * HEADER_ENTRY_LEN as u64)
}

/// Write header and body for every byte of `source`. The source must yield
/// the same bytes the code table was built from.
pub fn write_compressed<R: Read, W: Write>(
    source: R,
    mut out: W,
    codes: &CodeTable,
) -> Result<(W, WriteSummary)> {
    let header_len = write_header(&mut out, codes)?;

    let mut body = BodyWriter::new(out);
    for byte in source.bytes() {
        let byte = byte?;
        let code = codes.get(byte).ok_or(HuffmanError::UnknownSymbol(byte))?;
        body.push(code)?;
    }
    let body_bits = body.bits;
    let (out, body_len, padding) = body.finish()?;

    debug!(
        "wrote {} header bytes, {} body bits in {} bytes, {} padding bits",
        header_len, body_bits, body_len, padding
    );
    Ok((
        out,
        WriteSummary {
            header_len,
            body_len,
            body_bits,
            padding,
        },
    ))
}

/// Parse the header at the start of `data`, returning the rebuilt tree and
/// the header length in bytes.
pub fn read_header(data: &[u8]) -> Result<(HuffmanTree, usize)> {
    let (&count, rest) = data
        .split_first()
        .ok_or(HuffmanError::Truncated("missing symbol count"))?;

    let count = count as usize;
    if count == 0 || count > ALPHABET_SIZE {
        return Err(HuffmanError::MalformedHeader(format!(
            "symbol count {} is outside 1..={}",
            count, ALPHABET_SIZE
        )));
    }

    let entries_len = count * HEADER_ENTRY_LEN;
    if rest.len() < entries_len {
        return Err(HuffmanError::Truncated(
            "header is shorter than its symbol count declares",
        ));
    }

    let mut entries = Vec::with_capacity(count);
    for entry in rest[..entries_len].chunks_exact(HEADER_ENTRY_LEN) {
        let mut field = [0u8; CODE_FIELD_BYTES];
        field.copy_from_slice(&entry[1..]);
        entries.push((entry[0], decode_code_field(&field)?));
    }

    let tree = HuffmanTree::from_codes(entries)?;
    Ok((tree, 1 + entries_len))
}

/// Decode a complete compressed file held in memory.
pub fn read_compressed(data: &[u8]) -> Result<(Vec<u8>, usize)> {
    let (tree, header_len) = read_header(data)?;

    let (&padding, body) = data[header_len..]
        .split_last()
        .ok_or(HuffmanError::Truncated("missing padding byte"))?;
    if padding > 7 {
        return Err(HuffmanError::Truncated("padding byte is out of range"));
    }

    let bits = body.view_bits::<Msb0>();
    let padding = padding as usize;
    if padding > bits.len() {
        return Err(HuffmanError::Truncated("padding is longer than the body"));
    }
    let bits = &bits[..bits.len() - padding];
    debug!(
        "read {} symbols, {} body bits, {} padding bits",
        tree.leaf_order().len(),
        bits.len(),
        padding
    );

    let out = tree.root().decode(bits)?;
    Ok((out, tree.leaf_order().len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::FrequencyTable;
    use crate::tree::huffman;

    fn codes_for(data: &[u8]) -> CodeTable {
        CodeTable::from_tree(&huffman(&FrequencyTable::count(data).unwrap()).unwrap())
    }

    fn write(data: &[u8]) -> (Vec<u8>, WriteSummary) {
        write_compressed(data, Vec::new(), &codes_for(data)).unwrap()
    }

    #[test]
    fn exact_layout() {
        let (file, summary) = write(b"cccccccbaaac");

        assert_eq!(file.len(), 1 + 3 * 17 + 2 + 1);
        assert_eq!(file[0], 3);

        // b = 00, a = 01, c = 1, lightest first
        let entries: Vec<(u8, u8)> = file[1..52]
            .chunks_exact(17)
            .map(|e| (e[0], e[16]))
            .collect();
        assert_eq!(entries, vec![(b'b', 0x04), (b'a', 0x05), (b'c', 0x03)]);
        for e in file[1..52].chunks_exact(17) {
            assert!(e[1..16].iter().all(|&b| b == 0));
        }

        // 1111111 00 01 01 01 1
        assert_eq!(&file[52..], &[0xFE, 0x2B, 0x00]);
        assert_eq!(
            summary,
            WriteSummary {
                header_len: 52,
                body_len: 2,
                body_bits: 16,
                padding: 0,
            }
        );
        assert_eq!(summary.total_len(), file.len() as u64);
    }

    #[test]
    fn pads_last_byte() {
        // a = 0, b = 1 -> 011
        let (file, summary) = write(b"abb");
        assert_eq!(&file[35..], &[0x60, 0x05]);
        assert_eq!(summary.padding, 5);
        assert_eq!(read_compressed(&file).unwrap().0, b"abb");
    }

    #[test]
    fn single_byte_file() {
        let (file, _) = write(b"x");
        let mut expected = vec![1, b'x'];
        expected.extend_from_slice(&[0u8; 15]);
        expected.extend_from_slice(&[0x02, 0x00, 0x07]);
        assert_eq!(file, expected);
        assert_eq!(read_compressed(&file).unwrap(), (b"x".to_vec(), 1));
    }

    #[test]
    fn header_count_128() {
        let all: Vec<u8> = (0..128u8).rev().collect();
        let (file, summary) = write(&all);
        assert_eq!(file[0], 128);
        assert_eq!(summary.header_len, 1 + 128 * 17);
        // 128 seven-bit codes fill 112 bytes exactly
        assert_eq!(summary.padding, 0);
        assert_eq!(read_compressed(&file).unwrap().0, all);
    }

    #[test]
    fn header_errors() {
        assert!(matches!(
            read_header(&[]),
            Err(HuffmanError::Truncated(_))
        ));
        assert!(matches!(
            read_header(&[0]),
            Err(HuffmanError::MalformedHeader(_))
        ));
        assert!(matches!(
            read_header(&[129]),
            Err(HuffmanError::MalformedHeader(_))
        ));

        let (file, _) = write(b"cccccccbaaac");
        assert!(matches!(
            read_header(&file[..30]),
            Err(HuffmanError::Truncated(_))
        ));

        let mut bad = file.clone();
        bad[1] = 0xC8;
        assert!(matches!(
            read_header(&bad),
            Err(HuffmanError::MalformedHeader(_))
        ));

        let mut bad = file.clone();
        bad[18] = b'b';
        assert!(matches!(
            read_header(&bad),
            Err(HuffmanError::MalformedHeader(_))
        ));

        let mut bad = file;
        bad[17] = 0;
        assert!(matches!(
            read_header(&bad),
            Err(HuffmanError::MalformedHeader(_))
        ));
    }

    #[test]
    fn missing_or_bad_padding() {
        let (file, _) = write(b"cccccccbaaac");
        assert!(matches!(
            read_compressed(&file[..52]),
            Err(HuffmanError::Truncated(_))
        ));

        let mut bad = file.clone();
        *bad.last_mut().unwrap() = 9;
        assert!(matches!(
            read_compressed(&bad),
            Err(HuffmanError::Truncated(_))
        ));

        // body dropped, padding of 5 left with nothing to pad
        let (file, _) = write(b"abb");
        let cut = [&file[..35], &file[36..]].concat();
        assert!(matches!(
            read_compressed(&cut),
            Err(HuffmanError::Truncated(_))
        ));
    }

    #[test]
    fn body_cut_mid_code() {
        let (file, _) = write(b"cccccccbaaac");
        // drop 0x2B: 1111111 then a lone 0 on the way to b or a
        let cut = [&file[..53], &file[54..]].concat();
        assert!(matches!(
            read_compressed(&cut),
            Err(HuffmanError::Truncated(_))
        ));
    }

    #[test]
    fn long_codes_cross_bytes() {
        // fibonacci weights give the deepest possible tree
        let mut data = Vec::new();
        let (mut a, mut b) = (1usize, 1usize);
        for symbol in 0..20u8 {
            data.extend(std::iter::repeat(b'A' + symbol).take(a));
            let next = a + b;
            a = b;
            b = next;
        }

        let codes = codes_for(&data);
        let longest = codes.header_order().map(|(_, c)| c.len()).max().unwrap();
        assert_eq!(longest, 19);

        let (file, _) = write_compressed(&data[..], Vec::new(), &codes).unwrap();
        assert_eq!(read_compressed(&file).unwrap().0, data);
    }
}
