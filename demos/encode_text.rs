use huff7::{huffman, CodeTable, FrequencyTable};

fn main() {
    let s = String::from("Hello my name is Sam!");
    let freqs = FrequencyTable::count(s.as_bytes()).unwrap();
    let codes = CodeTable::from_tree(&huffman(&freqs).unwrap());

    let out = codes.encode(s.bytes()).unwrap();
    println!("{} bytes -> {} bits", s.len(), out.len());

    let packed = huff7::compress_bytes(s.as_bytes()).unwrap();
    let dec = String::from_utf8(huff7::decompress_bytes(&packed).unwrap());

    println!("{:?}", dec);
}
