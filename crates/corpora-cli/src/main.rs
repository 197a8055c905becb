//! corpora: command-line access to a Corpora instance.
//!
//! Explores the relationship graph around seed records, spools content
//! listings and shows which tasks a scholar may run. Output goes to stdout
//! as JSON; logs go to stderr or `LOG_FILE`.

use std::collections::BTreeSet;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use corpora_client::HttpCorporaApi;
use corpora_core::defaults::{PAGE_SIZE, PER_TYPE_LIMIT};
use corpora_core::{CollapsedRelationship, CorporaApi, Scholar};
use corpora_graph::{ExplorerConfig, GraphExplorer};
use corpora_jobs::permitted_tasks;

#[derive(Parser)]
#[command(name = "corpora")]
#[command(author, version, about = "Explore and list Corpora content")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Explore the graph around seed records and print the settled snapshot
    Explore {
        /// Seed content URI, e.g. /corpus/42/Book/7 (repeatable)
        #[arg(long = "seed", required = true)]
        seeds: Vec<String>,

        /// Neighbors fetched per related type on each sprawl
        #[arg(long, default_value_t = PER_TYPE_LIMIT)]
        per_type_limit: u32,

        /// Collapse a relationship given as From.Proxy.To (repeatable)
        #[arg(long)]
        collapse: Vec<String>,

        /// Hide a content type (repeatable)
        #[arg(long)]
        hide: Vec<String>,

        /// Restrict a content type to a content view, as TYPE=VIEW_ID (repeatable)
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },

    /// Spool every record of a content type
    List {
        /// Corpus id
        corpus: String,

        /// Content type name
        content_type: String,

        /// General search query
        #[arg(long)]
        q: Option<String>,

        /// Records per page request
        #[arg(long, default_value_t = PAGE_SIZE)]
        page_size: u32,
    },

    /// List tasks a scholar may run against a content type
    Tasks {
        /// Content type name
        content_type: String,

        /// Scholar name shown in logs
        #[arg(long, env = "CORPORA_USERNAME", default_value = "anonymous")]
        username: String,

        /// Treat the scholar as an admin (may run every task)
        #[arg(long, env = "CORPORA_ADMIN")]
        admin: bool,

        /// Task id the scholar is permitted to run (repeatable)
        #[arg(long = "allow")]
        allowed: Vec<String>,
    },
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((ct, view)) if !ct.trim().is_empty() && !view.trim().is_empty() => {
            Ok((ct.trim().to_string(), view.trim().to_string()))
        }
        _ => Err(format!("expected TYPE=VIEW_ID, got: {}", raw)),
    }
}

#[derive(Serialize)]
struct RecordLine<'a> {
    id: &'a str,
    uri: &'a str,
    label: &'a str,
}

/// Initialize tracing.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables daily-rotated file logging)
///   RUST_LOG    - standard env filter (default: "corpora=info")
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "corpora=info,corpora_client=info,corpora_graph=info,corpora_jobs=info".into()
    });
    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("corpora.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(non_blocking),
                )
                .init();
        }
        Some(guard)
    } else {
        // stdout carries command output
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = init_logging();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let api = Arc::new(HttpCorporaApi::from_env().context("Failed to configure API client")?);

    match cli.command {
        Commands::Explore {
            seeds,
            per_type_limit,
            collapse,
            hide,
            filters,
        } => cmd_explore(api, seeds, per_type_limit, collapse, hide, filters).await,
        Commands::List {
            corpus,
            content_type,
            q,
            page_size,
        } => cmd_list(api, &corpus, &content_type, q, page_size).await,
        Commands::Tasks {
            content_type,
            username,
            admin,
            allowed,
        } => {
            let scholar = Scholar {
                username,
                is_admin: admin,
                permitted_task_ids: allowed.into_iter().collect::<BTreeSet<_>>(),
            };
            cmd_tasks(api, &scholar, &content_type).await
        }
    }
}

async fn cmd_explore(
    api: Arc<HttpCorporaApi>,
    seeds: Vec<String>,
    per_type_limit: u32,
    collapse: Vec<String>,
    hide: Vec<String>,
    filters: Vec<(String, String)>,
) -> anyhow::Result<()> {
    let config = ExplorerConfig::from_client(api.config()).with_per_type_limit(per_type_limit)?;
    let explorer = GraphExplorer::new(api, config);

    // Shape the graph before any seed is plotted so only one exploration runs.
    for raw in &collapse {
        let relationship: CollapsedRelationship = raw
            .parse()
            .with_context(|| format!("Invalid --collapse {}", raw))?;
        explorer.collapse(relationship).await?;
    }
    for content_type in &hide {
        explorer.hide_type(content_type).await?;
    }
    for (content_type, view_id) in &filters {
        explorer.set_filter_view(content_type, view_id).await?;
    }

    let report = explorer.explore(&seeds).await?;
    info!(nodes = report.nodes, edges = report.edges, "Exploration finished");

    let snapshot = explorer.snapshot().await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

async fn cmd_list(
    api: Arc<HttpCorporaApi>,
    corpus: &str,
    content_type: &str,
    q: Option<String>,
    page_size: u32,
) -> anyhow::Result<()> {
    let mut params = vec![("page-size".to_string(), page_size.max(1).to_string())];
    if let Some(q) = q.filter(|q| !q.trim().is_empty()) {
        params.push(("q".to_string(), q));
    }
    let records = api.spool_content(corpus, content_type, &params).await?;
    info!(corpus_id = corpus, content_type, records = records.len(), "Spooled content");

    for record in &records {
        let line = RecordLine {
            id: &record.id,
            uri: &record.uri,
            label: &record.label,
        };
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}

async fn cmd_tasks(
    api: Arc<HttpCorporaApi>,
    scholar: &Scholar,
    content_type: &str,
) -> anyhow::Result<()> {
    let jobsites = api.list_jobsites().await?;
    let tasks = api.list_tasks().await?;
    let permitted = permitted_tasks(scholar, &jobsites, &tasks, content_type);
    info!(
        username = %scholar.username,
        content_type,
        permitted = permitted.len(),
        "Listed permitted tasks"
    );
    println!("{}", serde_json::to_string_pretty(&permitted)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explore_arguments() {
        let cli = Cli::try_parse_from([
            "corpora",
            "explore",
            "--seed",
            "/corpus/42/Book/7",
            "--seed",
            "/corpus/42/Book/8",
            "--per-type-limit",
            "40",
            "--collapse",
            "Character.Scene.Character",
            "--filter",
            "Character=v1",
        ])
        .unwrap();
        match cli.command {
            Commands::Explore {
                seeds,
                per_type_limit,
                collapse,
                hide,
                filters,
            } => {
                assert_eq!(seeds.len(), 2);
                assert_eq!(per_type_limit, 40);
                assert_eq!(collapse, vec!["Character.Scene.Character"]);
                assert!(hide.is_empty());
                assert_eq!(filters, vec![("Character".to_string(), "v1".to_string())]);
            }
            _ => panic!("expected explore"),
        }
    }

    #[test]
    fn test_explore_requires_seed() {
        assert!(Cli::try_parse_from(["corpora", "explore"]).is_err());
    }

    #[test]
    fn test_parse_filter() {
        assert!(parse_filter("Character").is_err());
        assert!(parse_filter("=v1").is_err());
        assert_eq!(
            parse_filter(" Place = v2 ").unwrap(),
            ("Place".to_string(), "v2".to_string())
        );
    }

    #[test]
    fn test_list_defaults() {
        let cli = Cli::try_parse_from(["corpora", "list", "42", "Book"]).unwrap();
        match cli.command {
            Commands::List { page_size, q, .. } => {
                assert_eq!(page_size, PAGE_SIZE);
                assert!(q.is_none());
            }
            _ => panic!("expected list"),
        }
    }
}
