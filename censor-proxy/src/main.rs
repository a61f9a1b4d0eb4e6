use anyhow::Context;
use censor_proxy::{ConfigLoader, ProxyServer, ProxyServerConfig, WordList};
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::filter::EnvFilter;

const USAGE_EXIT: u8 = 2;
const FAILURE_EXIT: u8 = 1;

#[derive(Parser, Debug)]
#[command(name = "censor-proxy", version)]
#[command(about = "HTTP forward proxy that censors listed words in text responses")]
struct Args {
    /// Port to accept proxy connections on
    port: u16,

    /// Config file path
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn usage() -> String {
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "censor-proxy".to_string());
    format!("usage: {} <incoming-proxy-port-number>", program)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(_) => {
            println!("{}", usage());
            return ExitCode::from(USAGE_EXIT);
        }
    };

    // Initialize logging
    let level = if args.verbose {
        tracing_subscriber::filter::LevelFilter::DEBUG
    } else {
        tracing_subscriber::filter::LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(FAILURE_EXIT)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = ConfigLoader::load_or_default(args.config).context("Invalid configuration")?;

    let words = WordList::load_or_empty(&config.censor.word_list);
    tracing::info!(
        "Loaded {} censor terms from {:?}",
        words.len(),
        config.censor.word_list
    );

    let server = ProxyServer::bind(ProxyServerConfig {
        port: args.port,
        proxy: Arc::new(config.proxy),
        words: Arc::new(words),
    })
    .await?;

    // Only returns if the accept loop is torn down
    server.run().await?;
    Ok(())
}
