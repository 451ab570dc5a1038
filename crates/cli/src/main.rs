//! tabula command-line entry point.
//!
//! `tabula export` runs a job file against a paginated listing and saves the
//! table; `tabula inspect` lists candidate columns for an item path.
//! Logs go to stderr; results and prompts are the only other output.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tabula_client::{
    Destination, ExportError, ExportOptions, FetchClient, FetchConfig, FixedDestination, OutputFormat, PageSource,
    StopSignal, canonicalize, collect_table, inspect_url, persist, suggested_name,
};
use tabula_core::{AppConfig, Error};

mod interrupt;
mod job;
mod prompt;

use job::Job;
use prompt::StdinPrompt;

/// Exit status when the operator cancels the save.
const EXIT_CANCELLED: i32 = 2;

#[derive(Parser)]
#[command(name = "tabula", version)]
#[command(about = "Extract tables from paginated HTML listings")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a job file and save the resulting table
    Export(ExportArgs),
    /// Show the candidate columns under the first item of a page
    Inspect(InspectArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Job file (TOML, or JSON with a .json extension)
    #[arg(long)]
    job: PathBuf,

    /// Listing URL, overriding the job file
    #[arg(long)]
    url: Option<String>,

    /// Page-number query parameter; an empty value reads one page
    #[arg(long)]
    page_param: Option<String>,

    /// XPath of the repeating item element
    #[arg(long)]
    item_xpath: Option<String>,

    /// Destination file; without it the destination is asked on stdin
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// csv, tsv, json or xlsx; inferred from the destination when omitted
    #[arg(long)]
    format: Option<OutputFormat>,

    #[arg(long)]
    first_page: Option<u32>,

    #[arg(long)]
    max_pages: Option<u32>,

    /// Fetch the next page while the current one is extracted
    #[arg(long)]
    prefetch: bool,
}

#[derive(Args)]
struct InspectArgs {
    /// Page to inspect
    url: String,

    /// XPath of the repeating item element
    #[arg(long)]
    item_xpath: String,

    /// Print the survey and suggested columns as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;

    match cli.command {
        Command::Export(args) => run_export(config, args).await,
        Command::Inspect(args) => run_inspect(&config, args).await,
    }
}

async fn run_export(mut config: AppConfig, args: ExportArgs) -> Result<()> {
    let mut job = Job::load(&args.job)?;
    if args.url.is_some() {
        job.url = args.url;
    }
    if args.page_param.is_some() {
        job.page_param = args.page_param;
    }
    if args.item_xpath.is_some() {
        job.item_xpath = args.item_xpath;
    }

    if let Some(first_page) = args.first_page {
        config.first_page = first_page;
    }
    if args.max_pages.is_some() {
        config.max_pages = args.max_pages;
    }
    config.prefetch |= args.prefetch;
    config.validate()?;

    let request = job.request()?;
    let format = args.format.or(job.format()?);
    let options = ExportOptions::from(&config);
    let source: Arc<dyn PageSource> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);

    let stop = StopSignal::new();
    interrupt::watch(stop.clone());

    tracing::info!("exporting {} ({} columns)", request.base_url, request.mapping.len());
    let collected = collect_table(source, &request, &options, stop.clone(), |page| {
        eprintln!("Loaded items from page {page}.");
    })
    .await?;
    // from here on an interrupt exits, including at the save prompt
    stop.trigger();

    if collected.stopped {
        eprintln!("Stopped early; saving the {} row(s) collected so far.", collected.table.len());
    }

    let output = args.output.or(job.output);
    let interactive = output.is_none();
    let destination: Box<dyn Destination> = match output {
        Some(path) => Box::new(FixedDestination(path)),
        None => Box::new(StdinPrompt),
    };

    let suggested = suggested_name(&options, format);
    let mut table = collected.table;
    let rows = table.len();

    loop {
        // the prompt blocks on stdin; keep the interrupt listener scheduled
        let saved = tokio::task::block_in_place(|| persist(table, &suggested, destination.as_ref(), format));
        match saved {
            Ok((path, format)) => {
                println!("Exported {} row(s) from {} page(s) to {} ({})", rows, collected.pages, path.display(), format);
                return Ok(());
            }
            Err(e) if e.is_cancelled() => {
                eprintln!("Operation cancelled; nothing was written.");
                std::process::exit(EXIT_CANCELLED);
            }
            Err(ExportError::Persist { table: kept, source }) if interactive => {
                eprintln!("Could not save: {source}");
                table = kept;
            }
            Err(e) => return Err(Error::from(e).into()),
        }
    }
}

async fn run_inspect(config: &AppConfig, args: InspectArgs) -> Result<()> {
    let url = canonicalize(&args.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let client = FetchClient::new(FetchConfig::from(config))?;
    let survey = inspect_url(&client, &url, &args.item_xpath).await?;

    if args.json {
        let output = serde_json::json!({
            "survey": survey,
            "columns": survey.suggest_mapping(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let Some(item_path) = survey.item_path.as_deref() else {
        bail!("no items matched {} on {}", args.item_xpath, survey.url);
    };

    println!("Found {} nodes", survey.item_count);
    println!("First item: {item_path}");
    for field in &survey.fields {
        println!("  {:<28} {:<6} {:<24} {}", field.relative_path, field.tag, field.suggested_name, field.preview);
    }
    Ok(())
}
