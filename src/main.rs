//! Site-Atlas main entry point
//!
//! This is the command-line interface for the Site-Atlas site cartographer.

use anyhow::Context;
use clap::Parser;
use site_atlas::config::{load_config_with_hash, validate_exclude_prefixes, Config};
use site_atlas::crawler::Coordinator;
use site_atlas::output::{print_statistics, rebuild_from_pages, write_hierarchy, PathFilter};
use site_atlas::url::{canonicalize, host_label};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Site-Atlas: a polite single-origin site cartographer
///
/// Site-Atlas crawls one web origin breadth-first while respecting robots.txt,
/// records every page, link and failure as JSON lines, and builds a
/// path-segment hierarchy of the site for visualization.
#[derive(Parser, Debug)]
#[command(name = "site-atlas")]
#[command(version)]
#[command(about = "A polite single-origin site cartographer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "hierarchy_only")]
    dry_run: bool,

    /// Rebuild the hierarchy from an existing pages stream and exit
    #[arg(long)]
    hierarchy_only: bool,

    /// Path prefix to leave out of the rebuilt hierarchy (repeatable; replaces the configured list)
    #[arg(long, value_name = "PREFIX", requires = "hierarchy_only")]
    exclude: Vec<String>,

    /// Where to write the rebuilt hierarchy (defaults to the configured hierarchy path)
    #[arg(long, value_name = "PATH", requires = "hierarchy_only")]
    hierarchy_out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load and validate configuration
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    // Setup logging based on verbosity; `debug = true` acts as one -v
    let verbose = if config.crawler.debug {
        cli.verbose.max(1)
    } else {
        cli.verbose
    };
    setup_logging(verbose, cli.quiet);

    tracing::info!(
        "Configuration loaded from {} (hash: {})",
        cli.config.display(),
        config_hash
    );

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.hierarchy_only {
        handle_hierarchy_only(&config, cli.exclude, cli.hierarchy_out)?;
    } else {
        handle_crawl(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_atlas=info,warn"),
            1 => EnvFilter::new("site_atlas=debug,info"),
            2 => EnvFilter::new("site_atlas=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    let crawler = &config.crawler;
    println!("=== Site-Atlas Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Base URL: {}", crawler.base_url);
    println!("  Max depth: {}", crawler.max_depth);
    match crawler.max_pages {
        Some(limit) => println!("  Max pages: {}", limit),
        None => println!("  Max pages: unbounded"),
    }
    println!("  Delay: {}s", crawler.delay_secs);
    println!("  Timeout: {}s", crawler.timeout_secs);
    println!("  Max redirects: {}", crawler.max_redirects);
    println!("  Max body bytes: {}", crawler.max_body_bytes);
    println!("  Verify TLS: {}", crawler.verify_tls);
    println!("  Obey robots.txt: {}", crawler.obey_robots);
    println!("  Record blocked URLs: {}", crawler.record_blocked_urls);

    println!("\nUser Agent:");
    println!("  Value: {}", config.user_agent.value);
    println!("  Accept-Language: {}", config.user_agent.accept_language);

    println!("\nSitemaps:");
    println!("  Enabled: {}", config.sitemap.enabled);
    for url in &config.sitemap.urls {
        println!("    * {}", url);
    }

    println!("\nOutput:");
    println!("  Pages: {}", config.output.pages_path);
    println!("  Edges: {}", config.output.edges_path);
    println!("  Errors: {}", config.output.errors_path);
    println!("  Hierarchy: {}", config.output.hierarchy_path);

    if !config.hierarchy.exclude_prefixes.is_empty() {
        println!(
            "\nHierarchy Exclusions ({}):",
            config.hierarchy.exclude_prefixes.len()
        );
        for prefix in &config.hierarchy.exclude_prefixes {
            println!("  - {}", prefix);
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --hierarchy-only mode: re-derives the hierarchy from the pages stream
fn handle_hierarchy_only(
    config: &Config,
    exclude: Vec<String>,
    hierarchy_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let seed = canonicalize(&config.crawler.base_url)?;
    let root_name = host_label(&seed);

    let prefixes = if exclude.is_empty() {
        config.hierarchy.exclude_prefixes.clone()
    } else {
        validate_exclude_prefixes(&exclude).context("Invalid --exclude value")?;
        exclude
    };

    let (root, stats) = rebuild_from_pages(
        &config.output.pages_path,
        &root_name,
        &PathFilter::new(prefixes),
    )
    .with_context(|| format!("Failed to read {}", config.output.pages_path))?;

    let out = hierarchy_out.unwrap_or_else(|| PathBuf::from(&config.output.hierarchy_path));
    write_hierarchy(&root, &out)?;

    println!("✓ Hierarchy written to: {}", out.display());
    println!(
        "  {} pages included, {} excluded, {} unfetched, {} malformed lines skipped",
        stats.included, stats.excluded, stats.unfetched, stats.malformed
    );

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(config)?.with_config_hash(config_hash);

    match coordinator.run().await {
        Ok(stats) => {
            tracing::info!("Crawl completed successfully");
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
