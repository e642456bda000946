//! Tweetforge CLI — entry point.
//!
//! # Commands
//!
//! - `tweetforge generate <topic> [...]` — generate one post
//! - `tweetforge batch <topic> -n 3` — generate variations
//! - `tweetforge status` — show provider and limiter configuration

mod status;

use std::io::Write;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use tweetforge_core::config::load_config;
use tweetforge_core::types::{AdvancedSettings, GenerationRequest, LengthTier};
use tweetforge_core::utils::share_intent_url;
use tweetforge_pipeline::Generator;
use tweetforge_providers::registry::ConfigCredentials;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Turn a topic into short-form social text
#[derive(Parser)]
#[command(name = "tweetforge", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one post
    Generate {
        /// What the post is about
        topic: String,

        /// Writing style (viral, professional, casual, ...)
        #[arg(short, long, default_value = "viral")]
        style: String,

        /// Skip hashtags
        #[arg(long, default_value_t = false)]
        no_hashtags: bool,

        /// Skip emojis
        #[arg(long, default_value_t = false)]
        no_emojis: bool,

        /// Mood of the post
        #[arg(long)]
        mood: Option<String>,

        /// Target audience
        #[arg(long)]
        audience: Option<String>,

        /// Opening hook
        #[arg(long)]
        hook: Option<String>,

        /// Write in a first-person voice
        #[arg(long, default_value_t = false)]
        personal: bool,

        /// Length tier: short, medium, or long
        #[arg(short, long)]
        length: Option<String>,

        /// Print tokens as they stream in
        #[arg(long, default_value_t = false)]
        stream: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Generate several variations of one topic
    Batch {
        /// What the posts are about
        topic: String,

        /// Writing style
        #[arg(short, long, default_value = "viral")]
        style: String,

        /// How many variations
        #[arg(short = 'n', long, default_value_t = 3)]
        count: usize,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show provider and limiter configuration
    Status,
}

// ─────────────────────────────────────────────
// Entry point
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            topic,
            style,
            no_hashtags,
            no_emojis,
            mood,
            audience,
            hook,
            personal,
            length,
            stream,
            logs,
        } => {
            init_tracing(logs);

            let mut req = GenerationRequest::new(topic, style);
            req.include_hashtags = !no_hashtags;
            req.include_emojis = !no_emojis;
            req.mood = mood;
            req.audience = audience;
            req.hook = hook;
            req.personal = personal;
            if let Some(tier) = length {
                let tier: LengthTier = tier.parse().map_err(anyhow::Error::msg)?;
                req.advanced = Some(AdvancedSettings {
                    length: Some(tier),
                    ..Default::default()
                });
            }

            run_generate(&req, stream).await
        }

        Commands::Batch {
            topic,
            style,
            count,
            logs,
        } => {
            init_tracing(logs);
            run_batch(&GenerationRequest::new(topic, style), count).await
        }

        Commands::Status => {
            init_tracing(false);
            status::print_status(&load_config(None));
            Ok(())
        }
    }
}

/// Initialize tracing/logging.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("tweetforge_core=debug,tweetforge_providers=debug,tweetforge_pipeline=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

// ─────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────

async fn run_generate(req: &GenerationRequest, stream: bool) -> Result<()> {
    let config = load_config(None);
    let credentials = ConfigCredentials::new(config.providers.clone());
    let generator = Generator::from_config(&config, &credentials)?;

    let outcome = if stream {
        let mut observer = |delta: &str| {
            print!("{delta}");
            let _ = std::io::stdout().flush();
        };
        let outcome = generator
            .generate_observed(req, Some(&mut observer), None)
            .await;
        println!();
        outcome
    } else {
        generator.generate(req).await
    };

    match outcome.error {
        None => {
            // In stream mode the deltas above are the raw provider text;
            // this is the normalized post.
            println!("{}", outcome.tweet.bold());
            println!();
            println!(
                "{} {}",
                "chars:".dimmed(),
                outcome.tweet.chars().count()
            );
            println!("{} {}", "share:".dimmed(), share_intent_url(&outcome.tweet));
            Ok(())
        }
        Some(error) => {
            eprintln!("{}", error.red());
            std::process::exit(1);
        }
    }
}

async fn run_batch(req: &GenerationRequest, count: usize) -> Result<()> {
    let config = load_config(None);
    let credentials = ConfigCredentials::new(config.providers.clone());
    let generator = Generator::from_config(&config, &credentials)?;

    let outcome = generator.generate_batch(req, count).await;

    match outcome.error {
        None => {
            for (i, tweet) in outcome.tweets.iter().enumerate() {
                println!("{} {}", format!("{}.", i + 1).dimmed(), tweet.bold());
                println!("   {}", share_intent_url(tweet).dimmed());
            }
            Ok(())
        }
        Some(error) => {
            eprintln!("{}", error.red());
            std::process::exit(1);
        }
    }
}
