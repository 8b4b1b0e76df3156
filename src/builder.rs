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

//! Functions and types used for building a [`SymbolTable`] from a corpus of text.
//!
//! This module implements the generational algorithm from the [FSST Paper]:
//! several passes over a sampled corpus, each tokenising the admitted records
//! with the previous pass's table, counting token and token-pair frequencies,
//! and rebuilding the table from the highest-gain candidate symbols.
//!
//! [FSST Paper]: https://www.vldb.org/pvldb/vol13/p2649-boncz.pdf

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::{Symbol, SymbolTable, CODE_SLOTS, MAX_SYMBOL_LEN, NUM_SYMBOLS};

/// Admission budget of the first training pass.
const SAMPLE_FRAC_FIRST: usize = 8;

/// How much the admission budget grows per pass.
const SAMPLE_FRAC_STEP: usize = 30;

/// Admission budget of the final pass; admits every record.
const SAMPLE_FRAC_FULL: usize = 128;

#[derive(Debug, Clone)]
struct Counter {
    /// Frequency count for each code.
    counts1: Vec<usize>,

    /// Frequency count for each code-pair.
    counts2: Vec<Vec<usize>>,
}

impl Counter {
    fn new() -> Self {
        Self {
            counts1: vec![0; CODE_SLOTS],
            counts2: vec![vec![0; CODE_SLOTS]; CODE_SLOTS],
        }
    }

    #[inline]
    fn record_count1(&mut self, code1: u16) {
        self.counts1[code1 as usize] += 1;
    }

    #[inline]
    fn record_count2(&mut self, code1: u16, code2: u16) {
        self.counts2[code1 as usize][code2 as usize] += 1;
    }

    #[inline]
    fn count1(&self, code: u16) -> usize {
        self.counts1[code as usize]
    }

    #[inline]
    fn count2(&self, code1: u16, code2: u16) -> usize {
        self.counts2[code1 as usize][code2 as usize]
    }
}

/// Mixing hash deciding which records participate in a training pass.
///
/// The multiplier and shift come from the FSST reference implementation; note
/// that the shift applies to the already-multiplied value. The sampler must
/// stay fixed to keep [`build`] reproducible.
#[inline]
fn record_hash(w: u64) -> u64 {
    let x = w.wrapping_mul(2971215073);
    x ^ (x >> 15)
}

/// Build a serialised dictionary from a sample corpus.
///
/// Runs five training passes with increasing sample fractions. Each pass
/// tokenises the admitted records with the previous pass's table and rebuilds
/// the table from the highest-gain candidates; the final table is serialised
/// into the blob accepted by [`Compressor::new`][crate::Compressor::new] and
/// [`Decompressor::new`][crate::Decompressor::new].
///
/// Building never fails. An empty corpus yields a dictionary with no learned
/// symbols (eight zero bytes), which makes the compressor escape every byte.
///
/// The output is deterministic for a given corpus: records are admitted by a
/// fixed hash of their position, and equal-gain candidates are ordered by
/// length, then by their bytes.
pub fn build<T: AsRef<[u8]>>(samples: &[T]) -> Vec<u8> {
    let mut table = SymbolTable::default();

    let mut sample_frac = SAMPLE_FRAC_FIRST;
    while sample_frac <= SAMPLE_FRAC_FULL {
        let counter = table.compress_count(sample_frac, samples);
        table = table.optimize(&counter);
        sample_frac += SAMPLE_FRAC_STEP;
    }

    table.to_dict()
}

impl SymbolTable {
    /// Tokenise the admitted records using the current symbol table. Count the
    /// code occurrences and code-pair occurrences to allow us to calculate
    /// apparent gain.
    fn compress_count<T: AsRef<[u8]>>(&self, sample_frac: usize, samples: &[T]) -> Counter {
        let mut counter = Counter::new();

        for (i, record) in samples.iter().enumerate() {
            if sample_frac < SAMPLE_FRAC_FULL
                && (record_hash(i as u64) & 127) as usize > sample_frac
            {
                continue;
            }

            let record = record.as_ref();
            if record.is_empty() {
                continue;
            }

            let (mut code1, mut len1) = self.find_longest_symbol(record);
            let mut pos = 0;
            loop {
                counter.record_count1(code1);
                pos += len1;
                if pos == record.len() {
                    break;
                }

                let (code2, len2) = self.find_longest_symbol(&record[pos..]);
                counter.record_count2(code1, code2);
                code1 = code2;
                len1 = len2;
            }
        }

        counter
    }

    /// Using a set of counters and the existing set of symbols, build a new
    /// set of symbols/codes that optimizes the gain over the distribution in
    /// `counter`.
    fn optimize(&self, counter: &Counter) -> Self {
        let mut pqueue = BinaryHeap::new();

        for code1 in 0..self.code_end() {
            let symbol1 = self.symbols[code1 as usize];

            let count = counter.count1(code1);
            if count > 0 {
                // Bias single bytes upward so frequent characters are not
                // crowded out of the table by longer but rarer pairings.
                let mut gain = symbol1.len() * count;
                if symbol1.len() == 1 {
                    gain *= 8;
                }
                pqueue.push(Candidate {
                    symbol: symbol1,
                    gain,
                });
            }

            for code2 in 0..self.code_end() {
                let count = counter.count2(code1, code2);
                if count == 0 {
                    continue;
                }

                let symbol2 = &self.symbols[code2 as usize];
                // Merged symbols are capped at 8 bytes; longer pairings are
                // skipped rather than truncated.
                if symbol1.len() + symbol2.len() > MAX_SYMBOL_LEN {
                    continue;
                }

                let merged = symbol1.concat(symbol2);
                pqueue.push(Candidate {
                    symbol: merged,
                    gain: merged.len() * count,
                });
            }
        }

        // Pop the best candidates into a fresh table. The same byte string can
        // be reached through different code pairs; only the first copy is kept.
        let mut res = SymbolTable::default();
        let mut seen = HashSet::new();
        while res.n_symbols < (NUM_SYMBOLS - 1) as u16 {
            let Some(candidate) = pqueue.pop() else {
                break;
            };
            if seen.insert(candidate.symbol) {
                res.insert(candidate.symbol);
            }
        }

        res.make_index();
        res
    }
}

/// A candidate for inclusion in a symbol table.
///
/// This is really only useful for the `optimize` step of training.
struct Candidate {
    gain: usize,
    symbol: Symbol,
}

impl Eq for Candidate {}

impl PartialEq<Self> for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Equal-gain candidates pop longest first, then by ascending bytes,
        // keeping the heap order (and the trained dictionary) deterministic.
        self.gain
            .cmp(&other.gain)
            .then_with(|| self.symbol.len().cmp(&other.symbol.len()))
            .then_with(|| other.symbol.as_slice().cmp(self.symbol.as_slice()))
    }
}

#[cfg(test)]
mod test {
    use crate::{build, Compressor, Decompressor, ESCAPE_CODE, MAX_SYMBOL_LEN};

    #[test]
    fn test_build_on_empty() {
        assert_eq!(build::<&[u8]>(&[]), vec![0u8; MAX_SYMBOL_LEN]);
    }

    #[test]
    fn test_learns_repeated_substring() {
        let samples = vec!["abcdabcdabcd"; 10];
        let dict = build(&samples);
        let compressor = Compressor::new(&dict).unwrap();

        // "abcd" must have been learned as a single symbol.
        assert_eq!(compressor.compress(b"abcd").len(), 1);
    }

    #[test]
    fn test_unseen_bytes_escape() {
        let dict = build(&["hello world"]);
        let compressor = Compressor::new(&dict).unwrap();

        // None of x, y, z appear in the sample, so every byte escapes.
        assert_eq!(
            compressor.compress(b"xyz"),
            vec![ESCAPE_CODE, b'x', ESCAPE_CODE, b'y', ESCAPE_CODE, b'z']
        );
    }

    #[test]
    fn test_roundtrip_trained() {
        let text = "hello world";
        let dict = build(&[text]);
        let compressor = Compressor::new(&dict).unwrap();
        let decompressor = Decompressor::new(&dict).unwrap();

        let compressed = compressor.compress(text.as_bytes());
        assert!(compressed.len() < text.len());
        assert!(compressed.iter().all(|byte| *byte != ESCAPE_CODE));
        assert_eq!(
            decompressor.decompress(&compressed).unwrap(),
            text.as_bytes()
        );
    }

    #[test]
    fn test_deterministic() {
        let samples = [
            "hello world, this is a test",
            "hello world, this is another test",
        ];
        assert_eq!(build(&samples), build(&samples));
    }

    #[test]
    fn test_empty_records_skipped() {
        let samples: Vec<&[u8]> = vec![b"", b"abab", b""];
        let dict = build(&samples);
        let compressor = Compressor::new(&dict).unwrap();
        assert!(compressor.compress(b"abab").len() < 4);
    }
}
