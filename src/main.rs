//! Nitter-Harvest main entry point
//!
//! This is the command-line interface for collecting posts and profiles
//! from a federation of Nitter mirrors.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use nitter_harvest::config::{load_config_with_hash, validate, Config};
use nitter_harvest::harvest::{Harvester, Query, SearchMode};
use nitter_harvest::output::{print_statistics, write_json, HarvestStatistics};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Nitter-Harvest: resilient retrieval from Nitter mirrors
///
/// Mirrors are discovered, health-checked and rotated automatically; failed
/// pages are retried on other mirrors and rate limits are waited out.
#[derive(Parser, Debug)]
#[command(name = "nitter-harvest")]
#[command(version)]
#[command(about = "Resilient retrieval from a federation of Nitter mirrors", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Write JSON results to this file instead of stdout
    #[arg(short, long, value_name = "PATH", global = true)]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect posts for one or more search terms, hashtags or users
    Posts(PostsArgs),

    /// Fetch profile cards
    Profile {
        /// Usernames, with or without a leading @
        #[arg(required = true)]
        usernames: Vec<String>,

        /// Use this mirror instead of a random one
        #[arg(long)]
        instance: Option<String>,
    },

    /// Fetch a single post
    Post {
        username: String,
        id: String,

        /// Use this mirror instead of a random one
        #[arg(long)]
        instance: Option<String>,
    },

    /// List the endpoints that passed the health check
    Instances,
}

#[derive(Args, Debug)]
struct PostsArgs {
    /// Terms to collect; each one runs as an independent operation
    #[arg(required = true)]
    terms: Vec<String>,

    /// How each term is interpreted: term, hashtag or user
    #[arg(short, long, default_value = "term")]
    mode: SearchMode,

    /// Number of posts to collect (ignored with --since)
    #[arg(short, long, default_value_t = nitter_harvest::harvest::DEFAULT_NUMBER)]
    number: usize,

    /// Earliest date, YYYY-MM-DD
    #[arg(long)]
    since: Option<String>,

    /// Latest date, YYYY-MM-DD
    #[arg(long)]
    until: Option<String>,

    /// Location to search near
    #[arg(long)]
    near: Option<String>,

    /// Language code
    #[arg(long)]
    language: Option<String>,

    /// Only posts replying to this user
    #[arg(long = "to")]
    to_user: Option<String>,

    /// Content filter to require (repeatable)
    #[arg(long = "include")]
    include_filters: Vec<String>,

    /// Content filter to exclude (repeatable)
    #[arg(long = "exclude")]
    exclude_filters: Vec<String>,

    /// Use this mirror instead of a random one
    #[arg(long)]
    instance: Option<String>,

    /// Attempts per page before giving up
    #[arg(long)]
    max_retries: Option<u32>,

    /// Drop pinned posts
    #[arg(long)]
    skip_pinned: bool,

    /// Drop reposts
    #[arg(long)]
    skip_reposts: bool,
}

impl PostsArgs {
    fn queries(&self) -> Vec<Query> {
        self.terms
            .iter()
            .map(|term| Query {
                number: self.number,
                since: self.since.clone(),
                until: self.until.clone(),
                near: self.near.clone(),
                language: self.language.clone(),
                to_user: self.to_user.clone(),
                include_filters: self.include_filters.clone(),
                exclude_filters: self.exclude_filters.clone(),
                skip_pinned: self.skip_pinned,
                skip_reposts: self.skip_reposts,
                instance: self.instance.clone(),
                max_retries: self.max_retries,
                ..Query::new(term.clone(), self.mode)
            })
            .collect()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(cli.config.as_deref())?;

    // Queries are validated before any network activity
    let queries = match &cli.command {
        Command::Posts(args) => {
            let queries = args.queries();
            for query in &queries {
                query.plan()?;
            }
            queries
        }
        _ => Vec::new(),
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; cancelling running operations");
            ctrl_c.cancel();
        }
    });

    let harvester = Harvester::connect(&config)
        .await
        .context("Failed to set up the mirror federation")?
        .with_cancellation(cancel);

    let output = cli.output.as_deref();
    match cli.command {
        Command::Posts(_) => handle_posts(&harvester, queries, output, cli.quiet).await,
        Command::Profile { usernames, instance } => {
            handle_profiles(&harvester, usernames, instance, output).await
        }
        Command::Post { username, id, instance } => {
            let post = harvester
                .post_by_id(&username, &id, instance.as_deref())
                .await?;
            if post.is_none() {
                tracing::warn!("Post {} by {} could not be retrieved", id, username);
            }
            write_json(&post, output)?;
            Ok(())
        }
        Command::Instances => {
            let pool = harvester.pool();
            tracing::info!(
                "{} of {} candidate endpoints are working",
                pool.working().len(),
                pool.candidates().len()
            );
            write_json(pool.working(), output)?;
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout carries only JSON.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("nitter_harvest=info,warn"),
            1 => EnvFilter::new("nitter_harvest=debug,info"),
            2 => EnvFilter::new("nitter_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn load_configuration(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        None => {
            let config = Config::default();
            validate(&config)?;
            tracing::debug!("No configuration file given; using defaults");
            Ok(config)
        }
    }
}

async fn handle_posts(
    harvester: &Harvester,
    queries: Vec<Query>,
    output: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let labels: Vec<String> = queries.iter().map(|query| query.term.clone()).collect();
    let results = harvester.posts_many(queries).await?;

    let stats = HarvestStatistics::from_results(labels.iter().map(String::as_str).zip(&results));

    if results.len() == 1 {
        write_json(&results[0], output)?;
    } else {
        let keyed: BTreeMap<&str, _> = labels.iter().map(String::as_str).zip(&results).collect();
        write_json(&keyed, output)?;
    }

    if !quiet {
        print_statistics(&stats);
    }
    Ok(())
}

async fn handle_profiles(
    harvester: &Harvester,
    usernames: Vec<String>,
    instance: Option<String>,
    output: Option<&Path>,
) -> Result<()> {
    let profiles = harvester.profiles(usernames.clone(), instance).await?;

    for (username, profile) in usernames.iter().zip(&profiles) {
        if profile.is_none() {
            tracing::warn!("Profile of {} could not be retrieved", username);
        }
    }

    if profiles.len() == 1 {
        write_json(&profiles[0], output)?;
    } else {
        let keyed: BTreeMap<&str, _> = usernames.iter().map(String::as_str).zip(&profiles).collect();
        write_json(&keyed, output)?;
    }
    Ok(())
}
