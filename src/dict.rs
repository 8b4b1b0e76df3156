//! Serialised dictionary format.
//!
//! A dictionary blob starts with an 8-byte header in which `header[i]` counts
//! the learned symbols of length `8 - i`. The symbol payloads follow, grouped
//! by length from 8 bytes down to 1, with no padding or separators. An empty
//! dictionary is exactly 8 zero bytes.
//!
//! The blob is immutable once produced; [`Compressor`][crate::Compressor] and
//! [`Decompressor`][crate::Decompressor] each parse their own read-only copy.

use crate::{Error, Symbol, SymbolTable, MAX_SYMBOL_LEN, NUM_SYMBOLS};

impl SymbolTable {
    /// Serialise the learned symbols into a dictionary blob.
    ///
    /// Walks the canonical symbol order once per length group, so the blob is
    /// a pure function of the symbol set.
    pub(crate) fn to_dict(&self) -> Vec<u8> {
        let mut dict = vec![0u8; MAX_SYMBOL_LEN];

        for sym_len in (1..=MAX_SYMBOL_LEN).rev() {
            let mut count: u8 = 0;
            for symbol in self.learned() {
                if symbol.len() == sym_len {
                    dict.extend_from_slice(symbol.as_slice());
                    count += 1;
                }
            }
            dict[MAX_SYMBOL_LEN - sym_len] = count;
        }

        dict
    }

    /// Parse a dictionary blob into a table ready for lookups.
    ///
    /// Fails with [`Error::InvalidDict`] if the blob is shorter than its
    /// header, if the header claims more symbols than a table can hold, or if
    /// a symbol payload would run past the end of the blob. Bytes after the
    /// last payload are ignored.
    pub(crate) fn from_dict(dict: &[u8]) -> Result<Self, Error> {
        if dict.len() < MAX_SYMBOL_LEN {
            return Err(Error::InvalidDict("data is too short"));
        }

        let header = &dict[..MAX_SYMBOL_LEN];
        // The symbol count is validated up front: the table's slots are fixed,
        // so ingestion must never run past 255 entries.
        let total: usize = header.iter().map(|&count| count as usize).sum();
        if total > NUM_SYMBOLS - 1 {
            return Err(Error::InvalidDict("too many symbols"));
        }

        let mut table = SymbolTable::default();
        let mut from = MAX_SYMBOL_LEN;
        for (i, &count) in header.iter().enumerate() {
            let sym_len = MAX_SYMBOL_LEN - i;
            for _ in 0..count {
                let to = from + sym_len;
                if to > dict.len() {
                    return Err(Error::InvalidDict("header claims more data than available"));
                }
                table.insert(Symbol::from_slice(&dict[from..to]));
                from = to;
            }
        }

        table.make_index();

        Ok(table)
    }
}

#[cfg(test)]
mod test {
    use crate::{Error, Symbol, SymbolTable, MAX_SYMBOL_LEN};

    #[test]
    fn test_empty_dict_is_header_of_zeros() {
        let table = SymbolTable::default();
        assert_eq!(table.to_dict(), vec![0u8; MAX_SYMBOL_LEN]);

        let parsed = SymbolTable::from_dict(&vec![0u8; MAX_SYMBOL_LEN]).unwrap();
        assert_eq!(parsed.n_symbols, 0);
    }

    #[test]
    fn test_roundtrip_table() {
        let mut table = SymbolTable::default();
        table.insert(Symbol::from_slice(b"http://"));
        table.insert(Symbol::from_slice(b"www."));
        table.insert(Symbol::from_slice(b"e"));
        table.insert(Symbol::from_slice(b".com"));
        table.make_index();

        let dict = table.to_dict();
        assert_eq!(dict.len(), MAX_SYMBOL_LEN + 7 + 4 + 4 + 1);
        assert_eq!(dict[1], 1); // one 7-byte symbol
        assert_eq!(dict[4], 2); // two 4-byte symbols
        assert_eq!(dict[7], 1); // one 1-byte symbol

        let parsed = SymbolTable::from_dict(&dict).unwrap();
        assert_eq!(parsed.learned(), table.learned());
        assert_eq!(parsed.to_dict(), dict);
    }

    #[test]
    fn test_roundtrip_full_table() {
        let mut table = SymbolTable::default();
        for i in 0..255u16 {
            // 255 distinct two-byte symbols.
            table.insert(Symbol::from_slice(&[(i / 16) as u8, (i % 16) as u8 + 1]));
        }
        table.make_index();

        let dict = table.to_dict();
        assert_eq!(dict.len(), MAX_SYMBOL_LEN + 2 * 255);
        assert_eq!(dict[6], 255);

        let parsed = SymbolTable::from_dict(&dict).unwrap();
        assert_eq!(parsed.learned(), table.learned());
    }

    #[test]
    fn test_short_blob_rejected() {
        assert_eq!(
            SymbolTable::from_dict(&[0, 0, 0, 0]).unwrap_err(),
            Error::InvalidDict("data is too short")
        );
        assert_eq!(
            SymbolTable::from_dict(&[]).unwrap_err(),
            Error::InvalidDict("data is too short")
        );
    }

    #[test]
    fn test_header_overrunning_payload_rejected() {
        // Header claims one 8-byte symbol but no payload follows.
        let mut dict = vec![0u8; MAX_SYMBOL_LEN];
        dict[0] = 1;
        assert_eq!(
            SymbolTable::from_dict(&dict).unwrap_err(),
            Error::InvalidDict("header claims more data than available")
        );
    }

    #[test]
    fn test_too_many_symbols_rejected() {
        // 200 + 56 = 256 symbols claimed, one over the limit.
        let mut dict = vec![0u8; MAX_SYMBOL_LEN];
        dict[6] = 200;
        dict[7] = 56;
        assert_eq!(
            SymbolTable::from_dict(&dict).unwrap_err(),
            Error::InvalidDict("too many symbols")
        );
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut table = SymbolTable::default();
        table.insert(Symbol::from_slice(b"ab"));
        table.make_index();

        let mut dict = table.to_dict();
        dict.extend_from_slice(b"junk");

        let parsed = SymbolTable::from_dict(&dict).unwrap();
        assert_eq!(parsed.learned(), table.learned());
    }
}
