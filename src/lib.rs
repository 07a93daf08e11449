//! Static Huffman coding for files over the 7-bit alphabet.
//!
//! ```no_run
//! use std::fs::File;
//!
//! let stats = huff7::compress(File::open("notes.txt")?, File::create("notes.txt.huff")?)?;
//! println!("{} -> {} bytes", stats.input_len, stats.output_len);
//!
//! huff7::decompress(File::open("notes.txt.huff")?, File::create("notes.out")?)?;
//! # Ok::<(), huff7::HuffmanError>(())
//! ```

use log::{debug, info};
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};

pub mod code;
pub mod error;
pub mod format;
pub mod frequency;
pub mod tree;

pub use code::{decode_code_field, encode_code_field, Code, CodeTable, SerializableCodeTable};
pub use error::{HuffmanError, Result};
pub use frequency::FrequencyTable;
pub use tree::{huffman, HuffmanTree, Node};

/// Number of distinct symbols: byte values `0..128`.
pub const ALPHABET_SIZE: usize = 128;
/// Longest code the sentinel field can carry.
pub const MAX_CODE_LEN: usize = 127;
/// Width of a code field in the header.
pub const CODE_FIELD_BYTES: usize = 16;
/// One symbol byte plus its code field.
pub const HEADER_ENTRY_LEN: usize = 1 + CODE_FIELD_BYTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressStats {
    pub input_len: u64,
    pub output_len: u64,
    pub symbols: usize,
    pub body_bits: u64,
    pub padding: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompressStats {
    pub input_len: u64,
    pub output_len: u64,
    pub symbols: usize,
}

/// Compress `input` into `output`.
///
/// The input is read twice: once to count symbols and once to encode them,
/// rewinding in between. Nothing is written until the first pass has
/// accepted every byte.
pub fn compress<R, W>(mut input: R, output: W) -> Result<CompressStats>
where
    R: Read + Seek,
    W: Write,
{
    let freqs = FrequencyTable::count(&mut input)?;
    let tree = huffman(&freqs)?;
    let codes = CodeTable::from_tree(&tree);
    debug!(
        "{} distinct symbols, tree depth {}",
        codes.len(),
        tree.root().depth()
    );

    input.rewind()?;
    let (mut out, summary) =
        format::write_compressed(BufReader::new(input), BufWriter::new(output), &codes)?;
    out.flush()?;

    let stats = CompressStats {
        input_len: freqs.total(),
        output_len: summary.total_len(),
        symbols: codes.len(),
        body_bits: summary.body_bits,
        padding: summary.padding,
    };
    info!("compressed {} bytes to {}", stats.input_len, stats.output_len);
    Ok(stats)
}

/// Decompress `input` into `output`.
///
/// The whole file is decoded before anything is written, so a malformed or
/// truncated file leaves `output` untouched.
pub fn decompress<R, W>(mut input: R, mut output: W) -> Result<DecompressStats>
where
    R: Read,
    W: Write,
{
    let mut data = Vec::new();
    input.read_to_end(&mut data)?;

    let (decoded, symbols) = format::read_compressed(&data)?;
    output.write_all(&decoded)?;
    output.flush()?;

    let stats = DecompressStats {
        input_len: data.len() as u64,
        output_len: decoded.len() as u64,
        symbols,
    };
    info!("decompressed {} bytes to {}", stats.input_len, stats.output_len);
    Ok(stats)
}

pub fn compress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    compress(Cursor::new(data), &mut out)?;
    Ok(out)
}

pub fn decompress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decompress(data, &mut out)?;
    Ok(out)
}
