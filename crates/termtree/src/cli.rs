use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_INDEX: &str = "termtree.json";

#[derive(Parser)]
#[command(name = "termtree")]
#[command(version)]
#[command(about = "Fuzzy and prefix term index with BM25F document search")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build an index from a JSONL file of documents
    Index {
        /// JSONL input, one document object per line
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the index
        #[arg(short, long, default_value = DEFAULT_INDEX)]
        output: PathBuf,

        /// Engine config (JSON); built-in defaults if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Rank documents for a query
    Search {
        #[arg(long, default_value = DEFAULT_INDEX)]
        index: PathBuf,

        query: String,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Match query terms exactly
        #[arg(long)]
        no_fuzzy: bool,

        #[arg(long)]
        max_errors: Option<usize>,

        /// Override a field weight, e.g. --weight title=3
        #[arg(long = "weight", value_parser = parse_weight)]
        weights: Vec<(String, f64)>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Complete a prefix against indexed terms
    Suggest {
        #[arg(long, default_value = DEFAULT_INDEX)]
        index: PathBuf,

        prefix: String,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// List indexed terms close to a term
    Fuzzy {
        #[arg(long, default_value = DEFAULT_INDEX)]
        index: PathBuf,

        term: String,

        #[arg(long, default_value_t = 2)]
        max_errors: usize,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Show index statistics
    Stats {
        #[arg(long, default_value = DEFAULT_INDEX)]
        index: PathBuf,
    },

    /// Print version information
    Version,
}

fn parse_weight(s: &str) -> Result<(String, f64), String> {
    let (name, weight) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=weight, got {:?}", s))?;
    if name.is_empty() {
        return Err("field name is empty".to_string());
    }
    let weight: f64 = weight
        .parse()
        .map_err(|e| format!("invalid weight {:?}: {}", weight, e))?;
    Ok((name.to_string(), weight))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_version() {
        let cli = Cli::try_parse_from(["termtree", "version"]);
        assert!(cli.is_ok());
        assert!(matches!(cli.unwrap().command, Commands::Version));
    }

    #[test]
    fn test_cli_parse_index() {
        let cli = Cli::try_parse_from(["termtree", "index", "--input", "docs.jsonl"]).unwrap();
        if let Commands::Index {
            input,
            output,
            config,
        } = cli.command
        {
            assert_eq!(input, PathBuf::from("docs.jsonl"));
            assert_eq!(output, PathBuf::from(DEFAULT_INDEX));
            assert!(config.is_none());
        } else {
            panic!("Expected Index command");
        }
    }

    #[test]
    fn test_cli_parse_search() {
        let cli = Cli::try_parse_from([
            "termtree",
            "search",
            "--index",
            "idx.json",
            "rust guide",
            "--limit",
            "3",
            "--no-fuzzy",
            "--weight",
            "title=3",
            "--weight",
            "body=0.5",
        ])
        .unwrap();
        if let Commands::Search {
            index,
            query,
            limit,
            no_fuzzy,
            max_errors,
            weights,
            json,
        } = cli.command
        {
            assert_eq!(index, PathBuf::from("idx.json"));
            assert_eq!(query, "rust guide");
            assert_eq!(limit, 3);
            assert!(no_fuzzy);
            assert!(max_errors.is_none());
            assert!(!json);
            assert_eq!(
                weights,
                vec![("title".to_string(), 3.0), ("body".to_string(), 0.5)]
            );
        } else {
            panic!("Expected Search command");
        }
    }

    #[test]
    fn test_cli_rejects_bad_weight() {
        for bad in ["title", "=2", "title=heavy"] {
            let cli = Cli::try_parse_from(["termtree", "search", "q", "--weight", bad]);
            assert!(cli.is_err(), "accepted {}", bad);
        }
    }

    #[test]
    fn test_cli_parse_fuzzy_defaults() {
        let cli = Cli::try_parse_from(["termtree", "fuzzy", "survy"]).unwrap();
        if let Commands::Fuzzy {
            index,
            term,
            max_errors,
            limit,
        } = cli.command
        {
            assert_eq!(index, PathBuf::from(DEFAULT_INDEX));
            assert_eq!(term, "survy");
            assert_eq!(max_errors, 2);
            assert_eq!(limit, 10);
        } else {
            panic!("Expected Fuzzy command");
        }
    }
}
