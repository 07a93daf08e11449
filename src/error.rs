use std::io;

#[derive(thiserror::Error, Debug)]
pub enum HuffmanError {
    #[error("byte {byte:#04x} at offset {offset} is outside the 7-bit alphabet")]
    OutOfDomain { byte: u8, offset: u64 },

    #[error("input is empty, nothing to compress")]
    EmptyInput,

    #[error("truncated file: {0}")]
    Truncated(&'static str),

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("body bit {bit_offset} follows a branch the header never defined")]
    InvalidCode { bit_offset: usize },

    #[error("symbol {0:#04x} has no code; input changed between passes")]
    UnknownSymbol(u8),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, HuffmanError>;
