use anyhow::Result;
use std::path::Path;
use termtree_engine::SearchEngine;

pub fn run(index: &Path, prefix: &str, limit: usize) -> Result<()> {
    let engine = SearchEngine::load(index)?;
    for term in engine.suggest(prefix, limit)? {
        println!("{}", term);
    }
    Ok(())
}
