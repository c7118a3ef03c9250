mod config;
mod llm;
mod markdown;
mod pipeline;
mod render;
mod search;

pub const USER_AGENT: &str = concat!("deliberate/", env!("CARGO_PKG_VERSION"));

use std::io::{self, BufRead};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tracing::info;

use config::Config;
use llm::ChatClient;
use pipeline::Pipeline;
use search::{DEFAULT_MAX_RESULTS, SearchDepth, TavilyClient};

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default per-request timeout; model calls override it.
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Answer a question with web search, a reasoning model, and a synthesis model.
///
/// Credentials come from the environment (or a `.env` file):
/// `OPENAI_API_KEY`, `DEEPSEEK_API_KEY`, `TAVILY_API_KEY`.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// The question to answer. Read from one line of stdin when omitted.
    question: Option<String>,

    /// Maximum number of search results (1-20)
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS, value_parser = clap::value_parser!(u8).range(1..=20))]
    max_results: u8,

    /// Search depth
    #[arg(long, value_enum, default_value_t = SearchDepth::Advanced)]
    depth: SearchDepth,

    /// Also print the reasoning model's own draft answer
    #[arg(long)]
    show_draft: bool,

    /// Print the full result as JSON instead of formatted text
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v: info, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("deliberate={level}")));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let raw = match cli.question {
        Some(question) => question,
        None => read_question(io::stdin().lock())?,
    };

    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()?;

    let extractor = ChatClient::new(http.clone(), &config.extraction);
    let reasoner = ChatClient::new(http.clone(), &config.reasoning);
    let synthesizer = ChatClient::new(http.clone(), &config.synthesis);
    let search = TavilyClient::new(http, &config.search, cli.max_results, cli.depth);

    info!(
        extraction = %config.extraction.model,
        reasoning = %config.reasoning.model,
        synthesis = %config.synthesis.model,
        "starting pipeline"
    );

    let pipeline = Pipeline::new(&extractor, &search, &reasoner, &synthesizer);
    let answer = pipeline.ask(&raw).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print!("{}", render::format_answer(&answer, cli.show_draft));
    }
    Ok(())
}

fn read_question(mut input: impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line)
}
