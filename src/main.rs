use anyhow::Result;
use clap::{Parser, Subcommand};
use otrscore::eval::{build_report, on_topic_rate, read_items, write_items, OtrReport};
use otrscore::judge::{OpenAIChatClient, RelevanceLabeler};
use otrscore::Config;
use std::path::PathBuf;
use std::time::Duration;

/// On-Topic Rate scoring with LLM-judged relevance labels.
#[derive(Parser, Debug)]
#[command(name = "otrscore", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Label items with relevance judgments from the completion API
    Label {
        /// Items to judge (.json array or .jsonl)
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write labeled items (.json array or .jsonl)
        #[arg(short, long)]
        output: PathBuf,

        /// Model override (default: judge.model from config)
        #[arg(long)]
        model: Option<String>,

        /// Temperature override (default: judge.temperature from config)
        #[arg(long)]
        temperature: Option<f32>,
    },

    /// Compute per-query OTR and OTR@K from labeled items
    Score {
        /// Labeled items (.json array or .jsonl)
        #[arg(short, long)]
        input: PathBuf,

        /// Cutoff K (default: otr.default_k from config)
        #[arg(short, long)]
        k: Option<usize>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Exit with status 1 if mean OTR@K is below this value
        #[arg(long)]
        min_otr_at_k: Option<f64>,
    },

    /// OTR for raw counts
    Rate {
        #[arg(long)]
        relevant: usize,

        #[arg(long)]
        total: usize,
    },
}

/// Build the labeler from config, resolving the API key once.
fn build_labeler(
    config: &Config,
    model: Option<String>,
    temperature: Option<f32>,
) -> Result<RelevanceLabeler<OpenAIChatClient>> {
    let judge = &config.judge;
    let api_key = judge.api_key()?;
    let client = OpenAIChatClient::new(
        api_key,
        &judge.base_url,
        Duration::from_secs(judge.timeout_secs),
    )?;

    let temperature = temperature.unwrap_or(judge.temperature);
    if !(0.0..=2.0).contains(&temperature) {
        anyhow::bail!("--temperature must be between 0.0 and 2.0");
    }

    Ok(RelevanceLabeler::new(
        client,
        model.unwrap_or_else(|| judge.model.clone()),
        judge.template()?,
    )
    .with_temperature(temperature)
    .with_concurrency(judge.concurrency)
    .with_lenient_json(judge.lenient_json))
}

/// Initialize env_logger; RUST_LOG wins over the configured level.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().filter_or("RUST_LOG", level);
    // A second init (tests) is harmless
    let _ = env_logger::Builder::from_env(env).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse(), Config::load).await
}

/// Dispatch a command. Config is loaded only by the commands that use it, so
/// `rate` works even when config.toml is broken.
async fn run(cli: Cli, load_config: impl Fn() -> Result<Config>) -> Result<()> {
    match cli.command {
        Command::Label { input, output, model, temperature } => {
            let config = load_config()?;
            init_logging(&config.otr.log_level);
            run_label(&config, input, output, model, temperature).await?;
        }
        Command::Score { input, k, json, min_otr_at_k } => {
            let config = load_config()?;
            init_logging(&config.otr.log_level);
            let k = k.unwrap_or(config.otr.default_k);
            run_score(input, k, json, min_otr_at_k)?;
        }
        Command::Rate { relevant, total } => {
            init_logging("info");
            println!("OTR: {:.4}", on_topic_rate(relevant, total));
        }
    }

    Ok(())
}

async fn run_label(
    config: &Config,
    input: PathBuf,
    output: PathBuf,
    model: Option<String>,
    temperature: Option<f32>,
) -> Result<()> {
    let items = read_items(&input)?;
    if items.is_empty() {
        anyhow::bail!("No items in {}", input.display());
    }
    log::info!("Loaded {} items from {}", items.len(), input.display());

    let labeler = build_labeler(config, model, temperature)?;
    let start = std::time::Instant::now();
    let labeled = labeler.label_items(&items).await?;

    write_items(&output, &labeled)?;
    log::info!(
        "Wrote {} labeled items to {} in {:?} (model {})",
        labeled.len(),
        output.display(),
        start.elapsed(),
        labeler.model()
    );
    Ok(())
}

fn run_score(input: PathBuf, k: usize, json: bool, min_otr_at_k: Option<f64>) -> Result<()> {
    let items = read_items(&input)?;
    let report = build_report(&items, k)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if let Some(threshold) = min_otr_at_k {
        if report.mean_otr_at_k < threshold {
            println!(
                "\nMean OTR@{} {:.4} is below threshold {:.4}.",
                report.k, report.mean_otr_at_k, threshold
            );
            std::process::exit(1);
        }
        println!("\nMean OTR@{} meets threshold {:.4}.", report.k, threshold);
    }
    Ok(())
}

fn print_report(report: &OtrReport) {
    println!("=== On-Topic Rate (k = {}) ===\n", report.k);
    println!("{:<12} {:>7} {:>9} {:>8} {:>8}  query", "qid", "judged", "relevant", "OTR", "OTR@K");
    for q in &report.queries {
        let qid = q.qid.as_ref().map(ToString::to_string).unwrap_or_else(|| "-".to_string());
        let marker = if q.short_of_k { "*" } else { " " };
        println!(
            "{:<12} {:>7} {:>9} {:>8.4} {:>7.4}{}  {}",
            qid, q.judged, q.relevant, q.otr, q.otr_at_k, marker, q.query
        );
    }
    if report.queries.iter().any(|q| q.short_of_k) {
        println!(
            "\n* fewer than {} judged documents; OTR@K still divides by {}",
            report.k, report.k
        );
    }
    println!("\nQueries:     {}", report.queries.len());
    println!("Mean OTR:    {:.4}", report.mean_otr);
    println!("Mean OTR@{}: {:.4}", report.k, report.mean_otr_at_k);
    println!("Micro OTR:   {:.4}", report.micro_otr);
}
