use std::env;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use atf_codec::WordCodec;
use atf_mapping::MappingTable;
use atf_types::Direction;

fn main() -> Result<()> {
    let mut direction = Direction::CdliToOracc;
    let mut words = Vec::new();
    for arg in env::args().skip(1) {
        if arg == "--reverse" {
            direction = direction.reverse();
        } else {
            words.push(arg);
        }
    }
    if words.is_empty() {
        bail!("usage: cargo run -p atf-codec --example convert -- [--reverse] <word>...");
    }

    let table = MappingTable::builtin().context("loading builtin mapping table")?;
    let codec = WordCodec::new(Arc::new(table));

    println!("Direction: {direction}");
    for word in words {
        match codec.convert(&word, direction) {
            Ok(out) => println!("  {:<24} -> {}", word, out),
            Err(err) => println!("  {:<24} !! {}", word, err.kind),
        }
    }

    Ok(())
}
