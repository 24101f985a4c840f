use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fabula_core::{BookRecord, Caches, Client, IdentifyRequest, SearchConfig, SearchOperator};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Look up book metadata and covers on ISFDB
#[derive(Parser, Debug)]
#[command(name = "fabula")]
#[command(version = VERSION)]
#[command(about = "Look up book metadata on ISFDB", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Emit results as JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    /// HTTP timeout in seconds
    #[arg(long, global = true, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Base URL of the ISFDB instance
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Cache file, restored on start and rewritten on exit
    #[arg(long, global = true, value_name = "FILE")]
    cache: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search for book records by title, author or identifier
    Identify {
        /// Book title; prefix with '=' for an exact-match search
        #[arg(short, long)]
        title: Option<String>,

        /// Author name, "First Last" or "Last, First"
        #[arg(short, long)]
        author: Option<String>,

        /// ISBN-10 or ISBN-13
        #[arg(long)]
        isbn: Option<String>,

        /// ISFDB publication record id
        #[arg(long, value_name = "ID")]
        publication: Option<String>,

        /// ISFDB title record id
        #[arg(long, value_name = "ID")]
        title_id: Option<String>,

        /// Maximum number of results
        #[arg(short = 'n', long, default_value = "25", value_name = "NUM")]
        max_results: usize,

        /// Force exact-match search terms
        #[arg(long)]
        exact: bool,

        /// ISO 639-2 language kept besides English in title searches
        #[arg(long, default_value = "eng", value_name = "CODE")]
        language: String,

        /// Fold sub-series names into their parent series
        #[arg(long)]
        combine_series: bool,

        /// Tag dropped from results (repeatable)
        #[arg(long, value_name = "TAG")]
        unwanted_tag: Vec<String>,
    },
    /// List cover image URLs for a book
    Covers {
        /// Book title
        #[arg(short, long)]
        title: Option<String>,

        /// Author name
        #[arg(short, long)]
        author: Option<String>,

        /// ISBN-10 or ISBN-13
        #[arg(long)]
        isbn: Option<String>,

        /// ISFDB publication record id
        #[arg(long, value_name = "ID")]
        publication: Option<String>,

        /// ISFDB title record id
        #[arg(long, value_name = "ID")]
        title_id: Option<String>,

        /// Maximum number of cover URLs
        #[arg(short = 'n', long, default_value = "10", value_name = "NUM")]
        max_covers: usize,
    },
}

fn build_request(
    title: &Option<String>,
    author: &Option<String>,
    isbn: &Option<String>,
    publication: &Option<String>,
    title_id: &Option<String>,
) -> IdentifyRequest {
    let mut request = IdentifyRequest {
        title: title.clone(),
        authors: author.iter().cloned().collect(),
        ..Default::default()
    };
    if let Some(isbn) = isbn {
        request.identifiers.insert("isbn".to_string(), isbn.replace('-', ""));
    }
    if let Some(id) = publication {
        request.identifiers.insert(fabula_core::ID_PUBLICATION.to_string(), id.clone());
    }
    if let Some(id) = title_id {
        request.identifiers.insert(fabula_core::ID_TITLE.to_string(), id.clone());
    }
    request
}

fn load_caches(path: &Option<PathBuf>) -> anyhow::Result<Arc<Caches>> {
    let Some(path) = path else { return Ok(Arc::new(Caches::new())) };
    if !path.exists() {
        return Ok(Arc::new(Caches::new()));
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read cache file: {}", path.display()))?;
    let caches = Caches::load(&json)
        .with_context(|| format!("Failed to parse cache file: {}", path.display()))?;
    Ok(Arc::new(caches))
}

fn save_caches(path: &Option<PathBuf>, client: &Client) -> anyhow::Result<()> {
    let Some(path) = path else { return Ok(()) };
    let json = client.caches().dump().context("Failed to serialize caches")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write cache file: {}", path.display()))?;
    Ok(())
}

fn print_record(record: &BookRecord) {
    println!("{}", record.title.bold().bright_blue());
    if !record.authors.is_empty() {
        println!("  {} {}", "by".dimmed(), record.authors.join(", ").bright_white());
    }
    if let Some(publisher) = &record.publisher {
        let year = record
            .pubdate
            .map(|d| d.format("%Y-%m").to_string())
            .unwrap_or_else(|| "date unknown".to_string());
        println!("  {} ({})", publisher, year.dimmed());
    }
    if let Some(series) = &record.series {
        match record.series_index {
            Some(index) => println!("  {} {series} #{index}", "series:".dimmed()),
            None => println!("  {} {series}", "series:".dimmed()),
        }
    }
    for (key, value) in &record.identifiers {
        println!("  {} {}", format!("{key}:").dimmed(), value);
    }
    if !record.tags.is_empty() {
        println!("  {} {}", "tags:".dimmed(), record.tags.join(", "));
    }
    println!();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let caches = load_caches(&args.cache)?;

    match &args.command {
        Command::Identify {
            title,
            author,
            isbn,
            publication,
            title_id,
            max_results,
            exact,
            language,
            combine_series,
            unwanted_tag,
        } => {
            let mut builder = SearchConfig::builder()
                .max_results(*max_results)
                .target_language(language.clone())
                .combine_series(*combine_series)
                .unwanted_tags(unwanted_tag.clone())
                .timeout_secs(args.timeout);
            if *exact {
                builder = builder.search_operator(SearchOperator::ExactMatch);
            }
            if let Some(base_url) = &args.base_url {
                builder = builder.base_url(base_url.clone());
            }

            let client = Client::with_caches(builder.build(), caches)
                .context("Failed to initialise HTTP client")?;
            let request = build_request(title, author, isbn, publication, title_id);
            let records = client.identify(&request).context("Lookup failed")?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                eprintln!("{}", "No matching records found".yellow());
            } else {
                for record in &records {
                    print_record(record);
                }
                eprintln!(
                    "{} {}",
                    "✓".green(),
                    format!("{} record(s) found", records.len()).bright_green()
                );
            }
            save_caches(&args.cache, &client)?;
        }
        Command::Covers { title, author, isbn, publication, title_id, max_covers } => {
            let mut builder =
                SearchConfig::builder().max_covers(*max_covers).timeout_secs(args.timeout);
            if let Some(base_url) = &args.base_url {
                builder = builder.base_url(base_url.clone());
            }

            let client = Client::with_caches(builder.build(), caches)
                .context("Failed to initialise HTTP client")?;
            let request = build_request(title, author, isbn, publication, title_id);
            let urls = client.find_covers(&request).context("Cover lookup failed")?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&urls)?);
            } else if urls.is_empty() {
                eprintln!("{}", "No covers found".yellow());
            } else {
                for url in &urls {
                    println!("{url}");
                }
            }
            save_caches(&args.cache, &client)?;
        }
    }

    Ok(())
}
