use anyhow::Result;
use std::path::Path;
use termtree_engine::SearchEngine;

pub fn run(index: &Path) -> Result<()> {
    let engine = SearchEngine::load(index)?;
    let summary = engine.summary();

    println!("Index Statistics");
    println!("================");
    println!("  Documents: {}", summary.documents);
    println!("  Terms:     {}", summary.keys);
    println!("  Nodes:     {}", summary.nodes);
    println!();
    println!("  {:<20} {:>8} {:>10} {:>12}", "field", "weight", "docs", "avg length");
    for field in &summary.fields {
        let avg = if field.totals.doc_count == 0 {
            0.0
        } else {
            field.totals.total_length as f64 / field.totals.doc_count as f64
        };
        println!(
            "  {:<20} {:>8.2} {:>10} {:>12.2}",
            field.name, field.weight, field.totals.doc_count, avg
        );
    }
    Ok(())
}
