//! Blogdesk CLI
//!
//! Operator tool over the same data service the API uses:
//! - Read resources and see which tier answered
//! - Dashboard numbers and activity
//! - Connection status and table probing
//! - Delete by key

use anyhow::{bail, Context};
use blogdesk::api::dto::key_value;
use blogdesk::backend::{OrderBy, Row};
use blogdesk::config::{generate_default_config, Config};
use blogdesk::logging::init_logging;
use blogdesk::resolver::{AttemptResult, ProbeOutcome};
use blogdesk::service::{DataService, FetchOptions, FetchResult};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blogdesk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Data access for the blog administration console")]
#[command(long_about = "Blogdesk reads posts, comments and users from the hosted row store.\nWhen the backend is unreachable it answers from the local cache or sample data,\nand always says which source it used.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Log verbosity for this run (default: the configured level, else warn)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read a logical resource
    Fetch {
        /// Resource name (posts, comments, users, ...)
        resource: String,
        /// Columns to return (comma-separated)
        #[arg(short, long)]
        select: Option<String>,
        /// Equality filters in column=value format
        #[arg(short = 'w', long = "where")]
        filters: Vec<String>,
        /// Sort column, optionally with direction (created_at.desc)
        #[arg(short, long)]
        order: Option<String>,
        /// Maximum rows
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Count rows of a resource
    Count { resource: String },

    /// Dashboard statistics
    Stats,

    /// Recent activity feed
    Activity,

    /// Probe the backend and show connection status
    Status,

    /// Probe candidate tables for a resource and cache the winner
    Probe { resource: String },

    /// Delete rows by key using the elevated credential
    Delete {
        resource: String,
        key: String,
        /// Key column
        #[arg(long, default_value = "id")]
        column: String,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let json = match cli.format.as_str() {
        "json" => true,
        "table" => false,
        other => bail!("Unknown output format: {} (expected table or json)", other),
    };

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("Failed to write {:?}", path))?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    config.logging.resolve_level(cli.log_level.clone(), "warn");
    init_logging(&config.logging).context("Failed to initialize logging")?;

    let service = DataService::from_config(&config).context("Failed to build data service")?;

    match cli.command {
        Commands::Fetch {
            resource,
            select,
            filters,
            order,
            limit,
        } => {
            let mut options = FetchOptions::new();
            if let Some(select) = select {
                options = options.select(select);
            }
            for filter in &filters {
                let Some((column, value)) = filter.split_once('=') else {
                    bail!("Invalid filter '{}', expected column=value", filter);
                };
                options = options.eq(column.trim(), value.trim());
            }
            if let Some(order) = order {
                let order: OrderBy = order.parse().map_err(anyhow::Error::msg)?;
                options = options.order_by(order);
            }
            if let Some(limit) = limit {
                options = options.limit(limit);
            }

            let result = service.fetch(&resource, &options).await;
            if json {
                print_json(&result)?;
            } else {
                print_fetch(&resource, &result);
            }
        }

        Commands::Count { resource } => {
            let count = service.count(&resource).await;
            if json {
                print_json(&count)?;
            } else {
                println!("{}: {} ({})", resource, count.count, count.source);
            }
        }

        Commands::Stats => {
            let stats = service.stats().await;
            if json {
                print_json(&stats)?;
            } else {
                println!("{:<16} {:>8}  {}", "Metric", "Value", "Source");
                println!("{}", "-".repeat(36));
                println!("{:<16} {:>8}  {}", "Posts", stats.total_posts, stats.data_source.posts);
                println!(
                    "{:<16} {:>8}  {}",
                    "Comments", stats.total_comments, stats.data_source.comments
                );
                println!("{:<16} {:>8}  {}", "Users", stats.total_users, stats.data_source.users);
                println!("{:<16} {:>8}", "New today", stats.today_users);
            }
        }

        Commands::Activity => {
            let feed = service.recent_activity().await;
            if json {
                print_json(&feed)?;
            } else {
                for activity in feed {
                    println!(
                        "{}  {:<8} {} [{}]",
                        activity.time.format("%Y-%m-%d %H:%M"),
                        format!("{:?}", activity.kind).to_lowercase(),
                        activity.description,
                        activity.source
                    );
                }
            }
        }

        Commands::Status => {
            service.check_connection().await;
            let status = service.system_status().await;

            if json {
                print_json(&status)?;
            } else {
                println!("Blogdesk v{}", env!("CARGO_PKG_VERSION"));
                println!();
                println!(
                    "Backend:   {} ({})",
                    if status.connected { "connected" } else { "offline" },
                    if config.backend.is_configured() {
                        config.backend.url.as_str()
                    } else {
                        "not configured"
                    }
                );
                println!(
                    "Last sync: {}",
                    status
                        .last_sync
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string())
                );
                match service.cache().table_map() {
                    Ok(map) if !map.is_empty() => {
                        println!();
                        println!("Cached table mappings:");
                        let mut entries: Vec<_> = map.into_iter().collect();
                        entries.sort();
                        for (resource, table) in entries {
                            println!("  {} -> {}", resource, table);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => eprintln!("Cannot read table mappings: {}", e),
                }
            }
        }

        Commands::Probe { resource } => {
            let report = service.probe(&resource).await;
            if json {
                print_json(&report)?;
            } else {
                for attempt in &report.attempts {
                    let line = match &attempt.result {
                        AttemptResult::Found => "ok".to_string(),
                        AttemptResult::Reachable(e) => format!("reachable, unusable: {}", e),
                        AttemptResult::Unreachable(e) => format!("unreachable: {}", e),
                    };
                    println!("  {:<20} {}", attempt.candidate, line);
                }
                println!();
                match &report.outcome {
                    ProbeOutcome::Resolved { table } => {
                        println!("{} -> {} ({} ms)", resource, table, report.elapsed_ms)
                    }
                    ProbeOutcome::ReachableUnresolved { last_error } => {
                        println!("No usable table for {}: {}", resource, last_error)
                    }
                    ProbeOutcome::Offline { reason } => {
                        println!("Backend offline: {}", reason)
                    }
                }
            }
        }

        Commands::Delete {
            resource,
            key,
            column,
        } => {
            let key = key_value(&key);
            let rows = service.delete(&resource, &column, &key).await?;
            if json {
                print_json(&rows)?;
            } else {
                println!("Deleted {} row(s) from {}", rows.len(), resource);
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_fetch(resource: &str, result: &FetchResult) {
    println!("{}: {} row(s), source: {}", resource, result.len(), result.source);
    if let Some(error) = &result.error {
        println!("  {}", error);
    }
    if result.is_empty() {
        return;
    }
    println!();
    print_rows(&result.data);
}

fn print_rows(rows: &[Row]) {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let cell = |row: &Row, column: &str| -> String {
        let text = match row.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        truncate(&text, 30)
    };

    let widths: Vec<usize> = columns
        .iter()
        .map(|column| {
            rows.iter()
                .map(|row| cell(row, column).chars().count())
                .chain(std::iter::once(column.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| format!("{:<width$}", column, width = width))
        .collect();
    println!("{}", header.join("  "));
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));

    for row in rows {
        let line: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(column, width)| format!("{:<width$}", cell(row, column), width = width))
            .collect();
        println!("{}", line.join("  "));
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
