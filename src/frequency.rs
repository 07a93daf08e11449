use std::io::{BufReader, Read};

use log::trace;

use crate::error::{HuffmanError, Result};
use crate::ALPHABET_SIZE;

/// Occurrence counts for every symbol of the 7-bit alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u64; ALPHABET_SIZE],
}

impl FrequencyTable {
    /// Consume `source` to the end, tallying each byte.
    ///
    /// Fails on the first byte outside `0..128`.
    pub fn count<R: Read>(source: R) -> Result<Self> {
        let mut counts = [0u64; ALPHABET_SIZE];
        for (offset, byte) in BufReader::new(source).bytes().enumerate() {
            let byte = byte?;
            if byte as usize >= ALPHABET_SIZE {
                return Err(HuffmanError::OutOfDomain {
                    byte,
                    offset: offset as u64,
                });
            }
            counts[byte as usize] += 1;
        }

        let table = Self { counts };
        trace!("symbol frequencies: {:?}", table.present().collect::<Vec<_>>());
        Ok(table)
    }

    pub fn get(&self, symbol: u8) -> u64 {
        self.counts.get(symbol as usize).copied().unwrap_or(0)
    }

    /// Symbols with a non-zero count, in ascending symbol order.
    pub fn present(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(s, &c)| (s as u8, c))
    }

    pub fn distinct(&self) -> usize {
        self.present().count()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}
