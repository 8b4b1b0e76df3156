#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let dict = fsst_codec::build(&["the quick brown fox jumped over the lazy dog"]);
    let compressor = fsst_codec::Compressor::new(&dict).unwrap();
    let decompressor = fsst_codec::Decompressor::new(&dict).unwrap();

    let compressed = compressor.compress(data);
    assert!(compressed.len() <= 2 * data.len());
    let decompressed = decompressor.decompress(&compressed).unwrap();
    assert_eq!(decompressed, data);
});
