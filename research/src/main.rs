mod research;
mod sources;

use clap::{Args, Parser, Subcommand};
use reducer::llm::OpenAI;
use reducer::tools::Tool;
use reducer::tools::ReduceTextTool;
use reducer::{ReducerBuilder, ReducerConfig, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Condense documents under a character budget and answer questions over them.
#[derive(Parser)]
#[command(name = "research", version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML file with reducer settings
    #[arg(short, long, global = true, env = "RESEARCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reduce documents to a single text and print it
    Reduce(ReduceArgs),
    /// Reduce documents, then answer a question from the reduced context
    Ask(AskArgs),
    /// Print the reduce_text tool definition as JSON
    ToolSchema,
}

#[derive(Args, Default)]
struct Overrides {
    /// Maximum characters in the reduced text
    #[arg(long)]
    max_output_size: Option<usize>,

    /// Maximum characters per summarizer call
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Model used for summarization
    #[arg(long)]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_API_BASE")]
    api_base: Option<String>,

    /// Summarizer calls in flight at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Try a strict compression pass before the final cut
    #[arg(long)]
    no_truncate: bool,
}

impl Overrides {
    fn apply(self, config: &mut ReducerConfig) {
        if let Some(max) = self.max_output_size {
            config.max_output_size = max;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(api_base) = self.api_base {
            config.llm.api_base = Some(api_base);
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if self.no_truncate {
            config.allow_truncation = false;
        }
    }
}

#[derive(Args)]
struct ReduceArgs {
    #[command(flatten)]
    overrides: Overrides,

    /// Documents to reduce
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print the text with diagnostics as JSON
    #[arg(long)]
    json: bool,

    /// Write a Markdown trace of every round to this file
    #[arg(long)]
    trace: Option<PathBuf>,
}

#[derive(Args)]
struct AskArgs {
    #[command(flatten)]
    overrides: Overrides,

    /// Question to answer
    #[arg(short, long)]
    question: String,

    /// Documents providing context
    files: Vec<PathBuf>,

    /// Extra context passed inline, reduced along with the documents
    #[arg(long = "context")]
    extra_context: Vec<String>,

    /// Model used for the answer; defaults to the summarization model
    #[arg(long)]
    answer_model: Option<String>,

    /// Print the answer with diagnostics as JSON
    #[arg(long)]
    json: bool,

    /// Write a Markdown trace of every round to this file
    #[arg(long)]
    trace: Option<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "research=debug,reducer=debug,warn"
    } else {
        "research=info,reducer=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>, overrides: Overrides) -> Result<ReducerConfig> {
    let mut config = match path {
        Some(path) => ReducerConfig::load(path)?,
        None => ReducerConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Reduce(args) => {
            let config = load_config(cli.config.as_ref(), args.overrides)?;
            let llm = OpenAI::from_config(&config.llm);
            let orchestrator = research::Orchestrator::new(llm, config, args.trace.as_deref())?;

            let documents = sources::read_documents(&args.files)?;
            let result = orchestrator.reduce(&documents).await?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.text);
            }
            tracing::info!(
                input_chars = result.input_chars,
                output_chars = result.output_chars,
                ratio = result.compression_ratio(),
                "done"
            );
        }
        Command::Ask(args) => {
            let config = load_config(cli.config.as_ref(), args.overrides)?;
            let llm = OpenAI::from_config(&config.llm);
            let orchestrator = research::Orchestrator::new(llm, config, args.trace.as_deref())?;

            let mut documents = sources::read_documents(&args.files)?;
            documents.extend(args.extra_context.into_iter().map(sources::Document::inline));
            let answer = orchestrator
                .answer(&args.question, &documents, args.answer_model.as_deref())
                .await?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("{}", answer.final_answer);
            }
        }
        Command::ToolSchema => {
            let config = load_config(cli.config.as_ref(), Overrides::default())?;
            let reducer = ReducerBuilder::new()
                .llm(OpenAI::from_config(&config.llm))
                .config(config)
                .build()?;
            let definition = ReduceTextTool::new(Arc::new(reducer)).definition()?;
            println!("{}", serde_json::to_string_pretty(&definition)?);
        }
    }

    Ok(())
}
