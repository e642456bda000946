//! `tweetforge status` — which providers are configured, which one is
//! selected, and what the local limits look like.

use colored::Colorize;

use tweetforge_core::config::Config;
use tweetforge_providers::registry::{
    select_provider, ConfigCredentials, CredentialSource, PROVIDERS,
};

pub fn print_status(config: &Config) {
    let credentials = ConfigCredentials::new(config.providers.clone());
    let selected = select_provider(&credentials);
    let any_configured = PROVIDERS
        .iter()
        .any(|spec| credentials.credential(spec).is_some());

    println!("{}", "Providers (priority order)".bold());
    for spec in PROVIDERS {
        let configured = credentials.credential(spec).is_some();
        let marker = if configured && spec.id == selected.id {
            "→".green().to_string()
        } else {
            " ".to_string()
        };
        let state = if configured {
            "configured".green()
        } else {
            format!("set {}", spec.credential_key).dimmed()
        };
        println!("  {} {:<12} {}", marker, spec.display_name, state);
    }

    if !any_configured {
        println!();
        println!(
            "{}",
            "No provider configured — generation will fail until a key is set.".yellow()
        );
    }

    println!();
    println!("{}", "Local limits".bold());
    let limits = &config.limits;
    println!(
        "  single  {:>3} / {}s",
        limits.single.limit, limits.single.window_secs
    );
    println!(
        "  batch   {:>3} / {}s",
        limits.batch.limit, limits.batch.window_secs
    );
    println!(
        "  vision  {:>3} / {}s",
        limits.vision.limit, limits.vision.window_secs
    );

    println!();
    println!(
        "  default length tier: {:?} ({} chars)",
        config.generation.length,
        config.generation.length.max_chars()
    );
}
