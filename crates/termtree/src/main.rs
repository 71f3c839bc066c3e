mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Index {
            input,
            output,
            config,
        } => commands::index::run(&input, &output, config.as_deref()),
        Commands::Search {
            index,
            query,
            limit,
            no_fuzzy,
            max_errors,
            weights,
            json,
        } => commands::search::run(
            &index,
            &query,
            commands::search::SearchArgs {
                limit,
                no_fuzzy,
                max_errors,
                weights,
                json,
            },
        ),
        Commands::Suggest {
            index,
            prefix,
            limit,
        } => commands::suggest::run(&index, &prefix, limit),
        Commands::Fuzzy {
            index,
            term,
            max_errors,
            limit,
        } => commands::fuzzy::run(&index, &term, max_errors, limit),
        Commands::Stats { index } => commands::stats::run(&index),
        Commands::Version => commands::version::run(),
    }
}
