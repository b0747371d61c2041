use clap::Parser;
use forumscope::config::PipelineConfig;
use forumscope::error::ForumError;
use forumscope::pipeline;
use forumscope::query::{QueryKind, QueryService, MESSAGES_SOURCE};
use forumscope::csv_io;
use std::path::PathBuf;
use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_parallelism() {
    static START: Once = Once::new();
    START.call_once(|| {
        let n = num_cpus::get();
        let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
    });
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("forumscope=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[derive(Parser, Debug)]
#[command(name = "forumscope", version, about = "Anonymize and summarize forum exports")]
struct Cli {
    /// JSON pipeline configuration; flags below override it
    #[arg(long = "config")]
    config: Option<PathBuf>,
    /// Directory holding the raw `<table>.csv` exports
    #[arg(long = "data-dir")]
    data_dir: Option<PathBuf>,
    /// Directory receiving checkpoints and derived metrics
    #[arg(long = "output-dir")]
    output_dir: Option<PathBuf>,
    #[arg(long = "top")] top: Option<usize>,
    /// Anonymize message text on the rayon pool
    #[arg(long = "parallel", default_value_t = false)] parallel: bool,
    #[arg(long = "no-text-anonymization", default_value_t = false)] no_text_anonymization: bool,

    /// Answer one query from persisted output instead of running the pipeline:
    /// words-per-user | words-per-topic | messages-per-topic | topics-per-user |
    /// words-per-user-per-month | word-frequency
    #[arg(long = "query")]
    query: Option<String>,
    /// Restrict a query to one anonymized poster id
    #[arg(long = "user")]
    user: Option<String>,
}

fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut cfg = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(d) = &cli.data_dir { cfg.data_dir = d.clone(); }
    if let Some(d) = &cli.output_dir { cfg.output_dir = d.clone(); }
    if let Some(n) = cli.top { cfg.top_n = n; }
    if cli.parallel { cfg.parallel = true; }
    if cli.no_text_anonymization { cfg.anonymize_text = false; }
    Ok(cfg)
}

fn run_query(cfg: &PipelineConfig, name: &str, user: Option<&str>) -> anyhow::Result<()> {
    let kind: QueryKind = name.parse()?;
    let service = QueryService::with_source(csv_io::artifact_path(&cfg.output_dir, MESSAGES_SOURCE), cfg.metrics());
    let rows = service.run(kind, user).map_err(|e| match e {
        ForumError::NotFound { .. } => anyhow::anyhow!("{e}; run the pipeline first"),
        other => other.into(),
    })?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_parallelism();
    init_tracing();
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;

    if let Some(name) = cli.query.as_deref() {
        return run_query(&cfg, name, cli.user.as_deref());
    }

    let report = pipeline::run(&cfg)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
