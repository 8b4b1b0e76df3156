//! Line-oriented compression driver.
//!
//! Trains a dictionary on the lines of the input file, compresses every line
//! with it, and writes the dictionary followed by the compressed records to
//! the output file.

use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use fsst_codec::{build, Compressor};

fn main() -> io::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <infile> <outfile>", args[0]);
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Expected two arguments: infile and outfile",
        ));
    }

    let infile = &args[1];
    let outfile = &args[2];

    let input_file = File::open(infile)?;
    let reader = BufReader::new(input_file);
    let mut lines: Vec<Vec<u8>> = Vec::new();
    for line in reader.lines() {
        let line = line?;
        lines.push(line.into_bytes());
    }

    let dict = build(&lines);
    let compressor =
        Compressor::new(&dict).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut output_file = File::create(outfile)?;
    output_file.write_all(&dict)?;

    let mut raw_size = 0;
    let mut compressed_size = dict.len();
    for line in &lines {
        let compressed = compressor.compress(line);
        raw_size += line.len();
        compressed_size += compressed.len();
        output_file.write_all(&compressed)?;
    }

    println!(
        "Compressed {} lines: {} -> {} bytes (dictionary: {} bytes)",
        lines.len(),
        raw_size,
        compressed_size,
        dict.len()
    );

    Ok(())
}
