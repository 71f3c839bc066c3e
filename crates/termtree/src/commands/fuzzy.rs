use anyhow::Result;
use std::path::Path;
use termtree_engine::SearchEngine;

pub fn run(index: &Path, term: &str, max_errors: usize, limit: usize) -> Result<()> {
    let engine = SearchEngine::load(index)?;
    let matches = engine.expand(term, max_errors, limit)?;

    if matches.is_empty() {
        println!("No terms within {} edits of {:?}", max_errors, term);
        return Ok(());
    }
    for (key, distance) in matches {
        println!("{}\t{}", distance, key);
    }
    Ok(())
}
