use anyhow::bail;
use clap::Parser;

mod activity;
mod analytics;
mod cli;
mod config;
mod corpus;
mod encoder;
mod engine;
mod extract;
mod index;
mod scans;
mod scorer;
#[cfg(test)]
mod tests;

use analytics::Analytics;
use config::Config;
use encoder::EmbeddingModel;
use engine::{EngineOptions, ScanEngine};
use scans::ScanStore;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = cli::Args::parse();
    let config = Config::load_with(&args.storage);

    match args.command {
        cli::Command::Load {} => {
            let engine = build_engine(&config)?;
            let report = engine.reload()?;
            println!("{}", serde_json::to_string_pretty(&report).unwrap());
            Ok(())
        }

        cli::Command::Scan { user, text, file } => {
            let text = match (text, file) {
                (Some(text), None) => text,
                (None, Some(path)) => match extract::extract_text(&path) {
                    Some(text) => text,
                    None => bail!("no text could be extracted from {}", path.display()),
                },
                (Some(_), Some(_)) => bail!("pass either the text or --file, not both"),
                (None, None) => bail!("pass the text to scan, or --file"),
            };

            let engine = build_engine(&config)?;
            let outcome = engine.scan(&user, &text)?;
            println!("{}", serde_json::to_string_pretty(&outcome).unwrap());
            Ok(())
        }

        // The read-only commands go straight to the stores. No point
        // paying for model startup to print json that is already on disk.
        cli::Command::Matches { user } => {
            let store = ScanStore::open(&config.scans_path())?;
            let matches = store.list_by_username(&user);
            println!("{}", serde_json::to_string_pretty(&matches).unwrap());
            Ok(())
        }

        cli::Command::History { user } => {
            let store = ScanStore::open(&config.scans_path())?;
            let history = store.history(&user);
            println!("{}", serde_json::to_string_pretty(&history).unwrap());
            Ok(())
        }

        cli::Command::Stats {} => {
            let analytics = Analytics::new(&config.analytics_path());
            let snapshot = analytics.snapshot();
            println!("{}", serde_json::to_string_pretty(&snapshot).unwrap());
            Ok(())
        }
    }
}

fn build_engine(config: &Config) -> anyhow::Result<ScanEngine> {
    let encoder = EmbeddingModel::new(&config.matching.model, config.base_path().to_path_buf())?;
    let engine = ScanEngine::new(Box::new(encoder), EngineOptions::from_config(config))?;
    Ok(engine)
}
