use anyhow::{bail, Result};
use std::path::Path;
use termtree_engine::{read_documents, EngineConfig, SearchEngine};

pub fn run(input: &Path, output: &Path, config: Option<&Path>) -> Result<()> {
    let config = match config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::new(),
    };

    let docs = read_documents(input)?;
    if docs.is_empty() {
        bail!("no documents found in {}", input.display());
    }

    let mut engine = SearchEngine::new(config)?;
    engine.add_documents(&docs)?;
    engine.save(output)?;

    let summary = engine.summary();
    println!(
        "Indexed {} documents ({} terms, {} nodes) -> {}",
        summary.documents,
        summary.keys,
        summary.nodes,
        output.display()
    );
    Ok(())
}
