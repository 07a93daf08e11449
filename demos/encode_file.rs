use std::env;
use std::fs::{self, File};

fn main() {
    let fp = env::args().nth(1).expect("Please provide path to input file as first argument.");

    // encode scope - save to file
    {
        let input = File::open(&fp).expect("First argument was not a valid filepath.");
        let output = File::create("encoded.huff").unwrap();
        let stats = huff7::compress(input, output).unwrap();

        println!(
            "{} bytes -> {} bytes ({} symbols, {} padding bits)",
            stats.input_len, stats.output_len, stats.symbols, stats.padding
        );
    }

    // decode scope - read from file
    {
        let input = File::open("encoded.huff").unwrap();
        let output = File::create("decoded.txt").unwrap();
        huff7::decompress(input, output).unwrap();
    }

    assert_eq!(fs::read(&fp).unwrap(), fs::read("decoded.txt").unwrap());
}
