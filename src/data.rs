//! Data-region analysis.
//!
//! A maximal DATA run is split into three kinds of item, in order of
//! precedence:
//!
//! 1. **Strings**: runs of printable ASCII. High-bit runs (bytes whose
//!    low seven bits are printable, at least one with bit 7 set, the way
//!    Apple II text is stored) are found first; plain runs may only use
//!    bytes no high-bit run claimed.
//! 2. **Pointer tables**: at least `min_pointer_entries` consecutive
//!    little-endian words that all point inside the binary, found greedily
//!    in the bytes no string claimed.
//! 3. **Raw chunks** of at most `raw_chunk_len` bytes for the rest, split
//!    wherever a label or one of the items above begins.

use crate::types::{Address, AnalysisOptions, Binary};
use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

/// A run of text inside a data region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringRun {
    /// Offset from the start of the region
    pub offset: usize,
    /// Address of the first byte
    pub address: Address,
    /// Decoded text with bit 7 stripped
    pub text: String,
    /// Whether the run was found by the high-bit scan
    pub high_bit: bool,
    /// Length in bytes
    pub len: usize,
}

/// Consecutive in-range address words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointerTableRun {
    /// Offset from the start of the region
    pub offset: usize,
    /// Address of the first byte
    pub address: Address,
    /// The decoded words
    pub entries: Vec<Address>,
}

impl PointerTableRun {
    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.entries.len() * 2
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One rendered piece of a data region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataItem {
    /// Text
    String(StringRun),
    /// Address table
    PointerTable(PointerTableRun),
    /// Anything else
    Bytes {
        /// Address of the first byte
        address: Address,
        /// The bytes
        bytes: Vec<u8>,
    },
}

impl DataItem {
    /// Address of the first byte.
    pub fn address(&self) -> Address {
        match self {
            DataItem::String(s) => s.address,
            DataItem::PointerTable(t) => t.address,
            DataItem::Bytes { address, .. } => *address,
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        match self {
            DataItem::String(s) => s.len,
            DataItem::PointerTable(t) => t.len(),
            DataItem::Bytes { bytes, .. } => bytes.len(),
        }
    }

    /// Whether the item covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The analysed form of one DATA run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataRegion {
    /// First address
    pub start: Address,
    /// Length in bytes
    pub len: usize,
    /// Strings found, by offset
    pub strings: Vec<StringRun>,
    /// Pointer tables found, by offset
    pub pointer_tables: Vec<PointerTableRun>,
    /// Items covering every byte exactly once, by address
    pub items: Vec<DataItem>,
}

/// Printable 7-bit ASCII, space through tilde.
pub fn is_printable(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte)
}

/// Splits DATA runs into strings, pointer tables and raw chunks.
#[derive(Debug, Clone, Copy)]
pub struct DataRegionAnalyzer<'a> {
    binary: &'a Binary,
    min_string_len: usize,
    min_pointer_entries: usize,
    raw_chunk_len: usize,
}

impl<'a> DataRegionAnalyzer<'a> {
    /// Analyzer with the thresholds from `options`.
    pub fn new(binary: &'a Binary, options: &AnalysisOptions) -> Self {
        Self::with_limits(
            binary,
            options.min_string_len,
            options.min_pointer_entries,
            options.raw_chunk_len,
        )
    }

    /// Analyzer with explicit thresholds. Zero thresholds are treated as 1.
    pub fn with_limits(
        binary: &'a Binary,
        min_string_len: usize,
        min_pointer_entries: usize,
        raw_chunk_len: usize,
    ) -> Self {
        Self {
            binary,
            min_string_len: min_string_len.max(1),
            min_pointer_entries: min_pointer_entries.max(1),
            raw_chunk_len: raw_chunk_len.max(1),
        }
    }

    /// String runs in `bytes`, which start at `start`.
    pub fn find_strings(&self, bytes: &[u8], start: Address) -> Vec<StringRun> {
        let mut strings: Vec<StringRun> = maximal_runs(bytes, |b| is_printable(b & 0x7F))
            .filter(|&(s, e)| e - s >= self.min_string_len)
            .filter(|&(s, e)| bytes[s..e].iter().any(|b| b & 0x80 != 0))
            .map(|(s, e)| self.string_run(bytes, start, s, e, true))
            .collect();

        let mut claimed = vec![false; bytes.len()];
        for run in &strings {
            claimed[run.offset..run.offset + run.len].fill(true);
        }

        let plain: Vec<StringRun> =
            maximal_runs(bytes, is_printable)
                .filter(|&(s, e)| e - s >= self.min_string_len)
                .filter(|&(s, e)| !claimed[s..e].iter().any(|c| *c))
                .map(|(s, e)| self.string_run(bytes, start, s, e, false))
                .collect();

        strings.extend(plain);
        strings.sort_by_key(|s| s.offset);
        strings
    }

    fn string_run(
        &self,
        bytes: &[u8],
        start: Address,
        s: usize,
        e: usize,
        high_bit: bool,
    ) -> StringRun {
        StringRun {
            offset: s,
            address: offset_address(start, s),
            text: bytes[s..e].iter().map(|b| char::from(b & 0x7F)).collect(),
            high_bit,
            len: e - s,
        }
    }

    /// Greedy pointer-table scan over the bytes of `bytes` not in `strings`.
    pub fn find_pointer_tables(
        &self,
        bytes: &[u8],
        start: Address,
        strings: &[StringRun],
    ) -> Vec<PointerTableRun> {
        let mut claimed = vec![false; bytes.len()];
        for run in strings {
            claimed[run.offset..run.offset + run.len].fill(true);
        }

        let word_at = |i: usize| -> Option<Address> {
            if i + 1 >= bytes.len() || claimed[i] || claimed[i + 1] {
                return None;
            }
            let word = LittleEndian::read_u16(&bytes[i..i + 2]);
            self.binary.contains(word).then_some(word)
        };

        let mut tables = Vec::new();
        let mut i = 0;
        while i + 1 < bytes.len() {
            let entries: Vec<Address> = (0..)
                .map(|k| word_at(i + 2 * k))
                .take_while(Option::is_some)
                .flatten()
                .collect();
            if entries.len() >= self.min_pointer_entries {
                let len = entries.len() * 2;
                tables.push(PointerTableRun {
                    offset: i,
                    address: offset_address(start, i),
                    entries,
                });
                i += len;
            } else {
                i += 1;
            }
        }
        tables
    }

    /// Analyse the `len` bytes at `start`.
    ///
    /// `is_boundary` reports addresses that must begin a new item, usually
    /// labelled ones. The range must lie inside the binary.
    pub fn analyze(
        &self,
        start: Address,
        len: usize,
        is_boundary: impl Fn(Address) -> bool,
    ) -> DataRegion {
        let bytes = self
            .binary
            .slice_from(start)
            .map(|s| &s[..len.min(s.len())])
            .unwrap_or_default();
        let len = bytes.len();

        let strings = self.find_strings(bytes, start);
        let pointer_tables = self.find_pointer_tables(bytes, start, &strings);

        let mut special: Vec<(usize, DataItem)> = strings
            .iter()
            .cloned()
            .map(|s| (s.offset, DataItem::String(s)))
            .chain(
                pointer_tables
                    .iter()
                    .cloned()
                    .map(|t| (t.offset, DataItem::PointerTable(t))),
            )
            .collect();
        special.sort_by_key(|(off, _)| *off);

        let mut items = Vec::new();
        let mut next_special = special.into_iter().peekable();
        let mut i = 0;
        while i < len {
            if let Some((_, item)) = next_special.next_if(|(off, _)| *off == i) {
                i += item.len();
                items.push(item);
                continue;
            }

            let limit = next_special.peek().map_or(len, |(off, _)| *off);
            let begin = i;
            i += 1;
            while i < limit
                && i - begin < self.raw_chunk_len
                && !is_boundary(offset_address(start, i))
            {
                i += 1;
            }
            items.push(DataItem::Bytes {
                address: offset_address(start, begin),
                bytes: bytes[begin..i].to_vec(),
            });
        }

        DataRegion {
            start,
            len,
            strings,
            pointer_tables,
            items,
        }
    }
}

fn offset_address(start: Address, offset: usize) -> Address {
    (usize::from(start) + offset) as Address
}

/// Maximal `[start, end)` runs of bytes satisfying `pred`.
fn maximal_runs<'a>(
    bytes: &'a [u8],
    pred: impl Fn(u8) -> bool + 'a,
) -> impl Iterator<Item = (usize, usize)> + 'a {
    let mut i = 0;
    std::iter::from_fn(move || {
        while i < bytes.len() && !pred(bytes[i]) {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        let start = i;
        while i < bytes.len() && pred(bytes[i]) {
            i += 1;
        }
        Some((start, i))
    })
}
