use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use atf_mapping::MappingTable;
use atf_types::Direction;

fn main() -> Result<()> {
    let table = match env::args().nth(1).map(PathBuf::from) {
        Some(path) => MappingTable::from_path(&path)
            .with_context(|| format!("loading mapping table from {}", path.display()))?,
        None => MappingTable::builtin().context("loading builtin mapping table")?,
    };

    println!("Entries      : {}", table.len());
    println!("Numerals     : {}", table.numerals().len());
    for dir in [Direction::CdliToOracc, Direction::OraccToCdli] {
        let signs = table.signs(dir);
        let longest = signs.keys_by_length_desc().next().unwrap_or("-");
        println!("{dir}: {} sign keys, longest {longest:?}", signs.len());
    }

    // Spot-check a few lookups.
    for word in ["szu", "s,e", "lu2"] {
        let hit = table.signs(Direction::CdliToOracc).longest_match(word);
        println!("Prefix match for '{}': {:?}", word, hit);
    }

    Ok(())
}
