use anyhow::Result;
use std::path::Path;
use termtree_engine::{QueryOptions, SearchEngine};

pub struct SearchArgs {
    pub limit: usize,
    pub no_fuzzy: bool,
    pub max_errors: Option<usize>,
    pub weights: Vec<(String, f64)>,
    pub json: bool,
}

pub fn run(index: &Path, query: &str, args: SearchArgs) -> Result<()> {
    let engine = SearchEngine::load(index)?;
    let options = QueryOptions {
        limit: args.limit,
        fuzzy: args.no_fuzzy.then_some(false),
        max_errors: args.max_errors,
        weights: args.weights.into_iter().collect(),
    };

    let hits = engine.search(query, &options)?;

    if args.json {
        println!("{}", serde_json::to_string(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No matches for {:?}", query);
        return Ok(());
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!("{:>3}. {:<32} {:.4}", rank + 1, hit.id, hit.score);
    }
    Ok(())
}
