// Copyright 2024 Spiral, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![doc = include_str!("../README.md")]

/// Throw a compiler error if a type isn't guaranteed to have a specific size in bytes.
macro_rules! assert_sizeof {
    ($typ:ty => $size_in_bytes:expr) => {
        const _: [u8; $size_in_bytes] = [0; std::mem::size_of::<$typ>()];
    };
}

use std::fmt::{Debug, Formatter};

use thiserror::Error;

pub use builder::build;

mod builder;
mod dict;
mod longest;

/// Maximum number of bytes a symbol can hold.
pub const MAX_SYMBOL_LEN: usize = 8;

/// Number of runtime code points, including the escape marker.
pub const NUM_SYMBOLS: usize = 256;

/// Code used to indicate bytes that are not in the symbol table.
///
/// When compressing a string that cannot fully be expressed with the symbol table, the compressed
/// output will contain an `ESCAPE_CODE` byte followed by a raw byte. At decompression time, the
/// presence of `ESCAPE_CODE` indicates that the next byte should be appended directly to the
/// result instead of being looked up in the symbol table.
pub const ESCAPE_CODE: u8 = 0xFF;

/// First code of the learned-symbol region of the table.
///
/// Codes 0..256 map to the implicit single-byte symbols used as escape fallbacks during
/// training; learned symbols occupy 256..511 and serialise to the wire as `code - 256`.
pub(crate) const CODE_BASE: u16 = 256;

/// Total number of code slots: 256 singletons plus up to 255 learned symbols.
pub(crate) const CODE_SLOTS: usize = 511;

/// Errors surfaced by dictionary parsing and decompression.
///
/// Compression itself cannot fail: any byte string is encodable. Building a
/// dictionary with [`build`] cannot fail either.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The dictionary blob is structurally malformed.
    #[error("invalid dictionary: {0}")]
    InvalidDict(&'static str),

    /// The compressed stream ends with an escape byte and no literal after it.
    #[error("malformed input: stream ends with an escape code")]
    TruncatedStream,

    /// A byte of the compressed stream refers to a code that has no symbol in
    /// the dictionary.
    #[error("malformed input: symbol code {0} does not exist in dictionary")]
    UnknownCode(u8),
}

/// `Symbol`s are small (up to 8-byte) segments of strings, stored in a [`SymbolTable`] and
/// identified in the compressed stream by a 1-byte code.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    /// The symbol's bytes, zero-padded past `len`.
    bytes: [u8; MAX_SYMBOL_LEN],

    /// Number of meaningful bytes. Always 1..=8 for a real symbol; 0 only for
    /// [`Symbol::ZERO`], which marks an unoccupied table slot.
    ///
    /// The length is stored explicitly rather than derived from the zero
    /// padding, so that symbols with embedded or trailing 0x00 bytes stay
    /// unambiguous.
    len: u8,
}

assert_sizeof!(Symbol => 9);

impl Symbol {
    /// Zero value for `Symbol`.
    pub const ZERO: Self = Self::zero();

    /// Return a zero symbol
    const fn zero() -> Self {
        Self {
            bytes: [0u8; MAX_SYMBOL_LEN],
            len: 0,
        }
    }

    /// Create a new single-byte symbol
    pub fn from_u8(value: u8) -> Self {
        Self {
            bytes: [value, 0, 0, 0, 0, 0, 0, 0],
            len: 1,
        }
    }

    /// Constructor for a `Symbol` from a byte slice.
    ///
    /// # Panics
    /// Panics if the slice holds more than 8 bytes.
    pub fn from_slice(slice: &[u8]) -> Self {
        assert!(
            slice.len() <= MAX_SYMBOL_LEN,
            "cannot build symbol with length > 8"
        );

        let mut bytes = [0u8; MAX_SYMBOL_LEN];
        bytes[..slice.len()].copy_from_slice(slice);
        Self {
            bytes,
            len: slice.len() as u8,
        }
    }

    /// Calculate the length of the symbol in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns true if the symbol does not encode any bytes.
    ///
    /// Note that this should only be true for [`Symbol::ZERO`].
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the first byte of the symbol as a `u8`.
    #[inline]
    pub fn first_byte(&self) -> u8 {
        self.bytes[0]
    }

    /// Access the Symbol as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Returns true if the symbol is a prefix of the provided text.
    pub fn is_prefix(&self, text: &[u8]) -> bool {
        text.starts_with(self.as_slice())
    }

    /// Return a new `Symbol` by logically concatenating ourselves with another `Symbol`.
    ///
    /// # Panics
    /// Panics if the combined length exceeds 8 bytes.
    pub fn concat(&self, other: &Self) -> Self {
        let new_len = self.len() + other.len();
        assert!(
            new_len <= MAX_SYMBOL_LEN,
            "cannot build symbol with length > 8"
        );

        let mut result = *self;
        result.bytes[self.len()..new_len].copy_from_slice(other.as_slice());
        result.len = new_len as u8;

        result
    }
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_slice())
    }
}

/// The static symbol table used for compression and decompression.
///
/// Slots 0..256 hold the implicit single-byte symbols, so that the trainer's
/// pair statistics can refer to escaped bytes and learned symbols in one code
/// space. Learned symbols are appended at 256..511.
///
/// After [`make_index`][Self::make_index] has run, `index` maps every first
/// byte to its bucket of learned symbols, sorted longest first, which makes
/// the greedy longest-prefix lookup a short linear scan.
#[derive(Clone, Debug)]
pub(crate) struct SymbolTable {
    /// Table mapping codes to symbols.
    pub(crate) symbols: [Symbol; CODE_SLOTS],

    /// Number of learned symbols in the table, not counting the implicit
    /// single-byte entries.
    pub(crate) n_symbols: u16,

    /// For each first byte `b`, `index[b]` is the code of the first learned
    /// symbol starting with `b`; `index[256]` is the one-past-the-end
    /// sentinel. The entries are non-decreasing.
    pub(crate) index: [u16; 257],
}

impl Default for SymbolTable {
    fn default() -> Self {
        let mut table = Self {
            symbols: [Symbol::ZERO; CODE_SLOTS],
            n_symbols: 0,
            index: [CODE_BASE; 257],
        };

        // Populate the escape byte entries.
        for byte in 0..=255u8 {
            table.symbols[byte as usize] = Symbol::from_u8(byte);
        }

        table
    }
}

impl SymbolTable {
    /// Insert a new learned symbol at the next free code.
    ///
    /// # Panics
    /// Panics if the table is already full.
    pub(crate) fn insert(&mut self, symbol: Symbol) {
        assert!(
            self.n_symbols < (NUM_SYMBOLS - 1) as u16,
            "cannot insert into full symbol table"
        );

        self.symbols[(CODE_BASE + self.n_symbols) as usize] = symbol;
        self.n_symbols += 1;
    }

    /// One past the last populated code.
    #[inline]
    pub(crate) fn code_end(&self) -> u16 {
        CODE_BASE + self.n_symbols
    }

    /// The learned symbols, in table order.
    #[inline]
    pub(crate) fn learned(&self) -> &[Symbol] {
        &self.symbols[CODE_BASE as usize..self.code_end() as usize]
    }
}

/// Compresses byte strings against a fixed dictionary.
///
/// A `Compressor` is immutable after construction and may be shared across
/// threads without synchronisation.
pub struct Compressor {
    table: SymbolTable,
}

impl Compressor {
    /// Create a compressor from a serialised dictionary produced by [`build`].
    ///
    /// Returns [`Error::InvalidDict`] if the blob is structurally malformed.
    pub fn new(dict: &[u8]) -> Result<Self, Error> {
        Ok(Self {
            table: SymbolTable::from_dict(dict)?,
        })
    }

    /// Use the symbol table to compress the plaintext into a sequence of codes and escapes.
    ///
    /// Any input is encodable; the output is deterministic for a given
    /// dictionary and never exceeds twice the input length (the all-escape
    /// case).
    pub fn compress(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut compressed: Vec<u8> = Vec::with_capacity(plaintext.len() / 2);

        let mut pos = 0;
        while pos < plaintext.len() {
            let (code, len) = self.table.find_longest_symbol(&plaintext[pos..]);
            if code < CODE_BASE {
                compressed.push(ESCAPE_CODE);
                compressed.push(plaintext[pos]);
                pos += 1;
            } else {
                compressed.push((code - CODE_BASE) as u8);
                pos += len;
            }
        }

        compressed
    }
}

/// Size of the flattened symbol-data array inside [`Decompressor`].
const DECODE_DATA_SIZE: usize = NUM_SYMBOLS * MAX_SYMBOL_LEN;

/// Decompresses byte strings against a fixed dictionary.
///
/// The dictionary is unpacked into two flat arrays for cache-friendly access:
/// `data` holds each symbol's bytes at offset `code * 8`, and `lens` holds the
/// per-code length, with 0 marking a code that does not exist in the
/// dictionary.
pub struct Decompressor {
    data: [u8; DECODE_DATA_SIZE],
    lens: [u8; NUM_SYMBOLS],
}

impl Decompressor {
    /// Create a decompressor from a serialised dictionary produced by [`build`].
    ///
    /// Returns [`Error::InvalidDict`] if the blob is structurally malformed.
    pub fn new(dict: &[u8]) -> Result<Self, Error> {
        let table = SymbolTable::from_dict(dict)?;

        let mut decompressor = Self {
            data: [0u8; DECODE_DATA_SIZE],
            lens: [0u8; NUM_SYMBOLS],
        };
        for (code, symbol) in table.learned().iter().enumerate() {
            let offset = code * MAX_SYMBOL_LEN;
            decompressor.data[offset..offset + symbol.len()].copy_from_slice(symbol.as_slice());
            decompressor.lens[code] = symbol.len() as u8;
        }

        Ok(decompressor)
    }

    /// Decompress a byte slice that was previously returned by [`Compressor::compress`].
    ///
    /// Decoding is the only operation that can fail on input data at runtime:
    /// [`Error::TruncatedStream`] if the stream ends on an escape byte, and
    /// [`Error::UnknownCode`] if a code has no symbol in the dictionary.
    pub fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>, Error> {
        // First pass: compute the exact output size, rejecting malformed streams.
        let mut output_size = 0usize;
        let mut pos = 0;
        while pos < compressed.len() {
            let code = compressed[pos];
            if code == ESCAPE_CODE {
                if pos + 1 >= compressed.len() {
                    return Err(Error::TruncatedStream);
                }
                output_size += 1;
                pos += 2;
            } else {
                let len = self.lens[code as usize] as usize;
                if len == 0 {
                    return Err(Error::UnknownCode(code));
                }
                output_size += len;
                pos += 1;
            }
        }

        // Second pass: the stream is known to be well-formed, copy the symbol
        // bodies out.
        let mut output: Vec<u8> = Vec::with_capacity(output_size);
        let mut pos = 0;
        while pos < compressed.len() {
            let code = compressed[pos];
            if code == ESCAPE_CODE {
                output.push(compressed[pos + 1]);
                pos += 2;
            } else {
                let len = self.lens[code as usize] as usize;
                let offset = code as usize * MAX_SYMBOL_LEN;
                output.extend_from_slice(&self.data[offset..offset + len]);
                pos += 1;
            }
        }

        Ok(output)
    }
}
