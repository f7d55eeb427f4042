use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ledgerlens_core::{schema, StatementKind, StructuredRecord};
use ledgerlens_ingest::{HostedParseBackend, HostedParseConfig, PageScrapeBackend, TextExtractor};
use ledgerlens_structure::{
    JsonDirSink, JsonFileSink, PersistenceOutcome, Pipeline, PipelineFailure, ProcessorFactory, RecordSink,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod llm;
mod state;

use auth::Credentials;
use config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "ledgerlens",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("LEDGERLENS_BUILD_SHA"), ")"),
    about = "Turn PDF card and bank statements into validated JSON records"
)]
struct Cli {
    /// More log output (-v debug, -vv trace); overrides RUST_LOG
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract, structure and validate one statement
    Process {
        pdf: PathBuf,

        /// Statement kind: credit-card or chequing
        #[arg(long)]
        kind: String,

        /// Write the JSON record to this path
        #[arg(long, conflicts_with = "out_dir")]
        out: Option<PathBuf>,

        /// Write `<stem>.json` into this directory (defaults to [output] dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Also write the transactions as CSV (with --out)
        #[arg(long, requires = "out")]
        csv: Option<PathBuf>,

        /// Re-ask the model this many times if structuring fails
        #[arg(long, default_value_t = 0)]
        retries: u32,

        /// Skip the hosted parser and use the page scrape only
        #[arg(long)]
        no_hosted: bool,
    },

    /// Process every PDF in a directory
    Batch {
        dir: PathBuf,

        #[arg(long)]
        kind: String,

        #[arg(long)]
        out_dir: PathBuf,

        /// Statements processed at once (default: 4)
        #[arg(long, default_value_t = 4)]
        concurrency: usize,

        /// Also write `<stem>.transactions.csv`
        #[arg(long)]
        csv: bool,

        #[arg(long)]
        no_hosted: bool,
    },

    /// Print the raw text extracted from a PDF
    Extract {
        pdf: PathBuf,

        #[arg(long)]
        no_hosted: bool,
    },

    /// Print the fields and example shape for a statement kind
    Schema { kind: String },

    /// Manage ~/.ledgerlens/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Store API keys in ~/.ledgerlens/auth.json
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Paste a key for a service
    Set {
        #[arg(value_enum)]
        service: auth::Service,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Process {
            pdf,
            kind,
            out,
            out_dir,
            csv,
            retries,
            no_hosted,
        } => {
            let kind = parse_kind(&kind)?;
            let cfg = config::load_config()?;
            let creds = auth::resolve_credentials()?;

            let sink: Option<Arc<dyn RecordSink>> = match (out, out_dir.or_else(|| cfg.output.dir.clone())) {
                (Some(out), _) => {
                    let mut sink = JsonFileSink::new(out);
                    if let Some(csv) = csv {
                        sink = sink.with_transactions_csv(csv);
                    }
                    Some(Arc::new(sink))
                }
                (None, Some(dir)) => {
                    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
                    Some(Arc::new(JsonDirSink::new(dir)))
                }
                (None, None) => None,
            };

            let mut pipeline = build_pipeline(&cfg, &creds, no_hosted)?;
            if let Some(sink) = sink {
                pipeline = pipeline.with_sink(sink);
            }
            process(&pipeline, pdf, kind, retries).await?;
        }

        Command::Batch {
            dir,
            kind,
            out_dir,
            concurrency,
            csv,
            no_hosted,
        } => {
            let kind = parse_kind(&kind)?;
            let cfg = config::load_config()?;
            let creds = auth::resolve_credentials()?;

            let jobs: Vec<(PathBuf, StatementKind)> =
                state::list_pdfs(&dir)?.into_iter().map(|p| (p, kind)).collect();
            if jobs.is_empty() {
                bail!("no PDFs found in {}", dir.display());
            }
            fs::create_dir_all(&out_dir).with_context(|| format!("create {}", out_dir.display()))?;

            let pipeline = build_pipeline(&cfg, &creds, no_hosted)?
                .with_sink(Arc::new(JsonDirSink::new(&out_dir).with_transactions_csv(csv)));
            batch(&pipeline, &jobs, concurrency).await?;
        }

        Command::Extract { pdf, no_hosted } => {
            let cfg = config::load_config()?;
            let creds = auth::resolve_credentials()?;
            let extractor = build_extractor(&cfg, &creds, http_client()?, no_hosted);

            let out = extractor.extract(&pdf).await?;
            info!(backend = %out.backend, used_fallback = out.used_fallback, "extracted text");
            println!("{}", out.text);
        }

        Command::Schema { kind } => {
            let kind = parse_kind(&kind)?;
            println!("# {}\n", kind.label());
            println!("{}", schema::describe(kind));
            println!("{}", serde_json::to_string_pretty(&schema::skeleton(kind))?);
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },

        Command::Auth { command } => match command {
            AuthCommand::Set { service } => auth::store_key(service)?,
        },
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ledgerlens=info")),
        1 => EnvFilter::new("ledgerlens=debug"),
        _ => EnvFilter::new("ledgerlens=trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Unknown kinds fail here, before any extraction work.
fn parse_kind(selector: &str) -> Result<StatementKind> {
    selector
        .parse::<StatementKind>()
        .map_err(PipelineFailure::from)
        .map_err(anyhow::Error::from)
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("ledgerlens/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build http client")
}

fn build_extractor(cfg: &Config, creds: &Credentials, client: reqwest::Client, no_hosted: bool) -> TextExtractor {
    let fallback = Arc::new(PageScrapeBackend::new());
    let extractor = match (&creds.llama_cloud_api_key, no_hosted) {
        (_, true) => TextExtractor::fallback_only(fallback),
        (None, false) => {
            info!("{} not set; using page scrape only", auth::LLAMA_CLOUD_ENV);
            TextExtractor::fallback_only(fallback)
        }
        (Some(key), false) => {
            let hosted = HostedParseBackend::new(
                client,
                HostedParseConfig {
                    base_url: cfg.extraction.hosted_base_url.clone(),
                    api_key: Some(key.clone()),
                    poll_interval: Duration::from_millis(cfg.extraction.poll_interval_ms),
                },
            );
            TextExtractor::new(Arc::new(hosted), fallback)
        }
    };
    extractor.with_config(cfg.extractor_config())
}

fn build_pipeline(cfg: &Config, creds: &Credentials, no_hosted: bool) -> Result<Pipeline> {
    let client = http_client()?;
    let model = llm::build_model(&cfg.llm, cfg.provider()?, creds, client.clone())?;
    let factory = ProcessorFactory::new(model, cfg.processor_config());
    Ok(Pipeline::new(build_extractor(cfg, creds, client, no_hosted), factory))
}

async fn process(pipeline: &Pipeline, pdf: PathBuf, kind: StatementKind, retries: u32) -> Result<()> {
    let (record, persistence) = match pipeline.run(&pdf, kind).await {
        Ok(out) => {
            info!(backend = %out.backend, used_fallback = out.used_fallback, "structured {}", pdf.display());
            (out.record, out.persistence)
        }
        Err(PipelineFailure::Structuring { raw_text, cause }) if retries > 0 => {
            warn!(error = %cause, "structuring failed; retrying with the same text");
            let record = retry_structuring(pipeline, &raw_text, kind, retries).await?;
            let persistence = pipeline.persist(&pdf, &record);
            (record, persistence)
        }
        Err(e) => return Err(e).with_context(|| format!("processing {}", pdf.display())),
    };

    println!("{}", summary(&record));
    match persistence {
        PersistenceOutcome::Written(path) => println!("Wrote {}", path.display()),
        PersistenceOutcome::Skipped => println!("{}", record.to_json_pretty()?),
        PersistenceOutcome::Failed(e) => {
            println!("{}", record.to_json_pretty()?);
            return Err(e).context("record is valid but was not saved");
        }
    }
    Ok(())
}

/// One-line description of a record for terminal output.
fn summary(record: &StructuredRecord) -> String {
    let period = record.statement_period();
    let head = format!(
        "{} {}, {} to {}: {} transactions",
        record.kind().label(),
        record.account_number(),
        period.start,
        period.end,
        record.transaction_count()
    );
    match record {
        StructuredRecord::CreditCard(s) => format!(
            "{head} for {}, charges {}, credits {}",
            s.customer_name(),
            s.total_charges(),
            s.total_credits()
        ),
        StructuredRecord::Chequing(s) => format!("{head}, net change {}", s.net_change()),
    }
}

async fn retry_structuring(
    pipeline: &Pipeline,
    raw_text: &str,
    kind: StatementKind,
    retries: u32,
) -> Result<StructuredRecord> {
    let mut attempt = 1;
    loop {
        match pipeline.structure(raw_text, kind).await {
            Ok(record) => {
                info!(attempt, "structuring succeeded on retry");
                return Ok(record);
            }
            Err(e) if attempt < retries => {
                warn!(attempt, error = %e, "retry failed");
                attempt += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("giving up after {retries} retries")),
        }
    }
}

async fn batch(pipeline: &Pipeline, jobs: &[(PathBuf, StatementKind)], concurrency: usize) -> Result<()> {
    let results = pipeline.run_many(jobs, concurrency).await;

    let mut failed = 0;
    for ((pdf, _), result) in jobs.iter().zip(results) {
        match result {
            Ok(out) => match out.persistence {
                PersistenceOutcome::Written(path) => {
                    println!("ok      {} -> {}", pdf.display(), path.display());
                    println!("        {}", summary(&out.record));
                }
                PersistenceOutcome::Failed(e) => {
                    failed += 1;
                    println!("unsaved {}: {e}", pdf.display());
                }
                PersistenceOutcome::Skipped => println!("ok      {}", pdf.display()),
            },
            Err(e) => {
                failed += 1;
                println!("failed  {}: {e}", pdf.display());
            }
        }
    }

    println!("\n{} of {} statements structured", jobs.len() - failed, jobs.len());
    if failed > 0 {
        bail!("{failed} statement(s) failed");
    }
    Ok(())
}
