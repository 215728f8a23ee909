//! keyswitch
//!
//! Probe binary for the key rotation layer:
//! 1. Loads the provider config (keys resolved from env, file or key file)
//! 2. Wraps each provider's target with its key pool
//! 3. Sends a one-message prompt and prints the reply or the final error

mod config;
mod metrics;
mod probe;

use anyhow::{Context, Result};
use clap::Parser;
use key_pool::{Diagnostics, Switcher};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::probe::Prompt;

/// Send a probe prompt through each configured provider's rotating key pool.
#[derive(Parser, Debug)]
#[command(name = "keyswitch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path (overrides CONFIG_PATH env var)
    #[arg(long)]
    config: Option<String>,

    /// Provider to probe; repeat for several (default: all, in name order)
    #[arg(long = "provider")]
    providers: Vec<String>,

    /// Prompt sent as a single user message
    #[arg(long, default_value = "Say hello in one word")]
    prompt: String,

    /// Completion token limit
    #[arg(long, default_value_t = 10)]
    max_tokens: u32,

    /// Emit one diagnostics record per attempt
    #[arg(short, long)]
    verbose: bool,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    print_metrics: bool,
}

/// Initialize tracing with LOG_LEVEL / RUST_LOG support; JSON when LOG_FORMAT=json.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus = metrics::install_recorder()?;

    let config_path = Config::resolve_path(args.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let selected = config.select(&args.providers)?;
    info!(providers = selected.len(), "configuration loaded");

    let switcher = Switcher::new(Diagnostics::from_flag(args.verbose));
    let http = reqwest::Client::new();
    let prompt = Prompt {
        text: args.prompt.clone(),
        max_tokens: args.max_tokens,
    };

    let mut failed = 0usize;
    for (name, provider) in selected {
        match probe::run(name, provider, &switcher, &http, &prompt).await {
            Ok(reply) => {
                metrics::record_provider_call(name, true);
                println!("{name}: {reply}");
            }
            Err(e) => {
                metrics::record_provider_call(name, false);
                error!(provider = name, error = %e, "provider probe failed");
                println!("{name} failed: {e:#}");
                failed += 1;
            }
        }
    }

    if args.print_metrics {
        print!("{}", prometheus.render());
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("keyswitch").chain(raw.iter().copied()))
    }

    #[test]
    fn defaults_without_flags() {
        let parsed = args(&[]).unwrap();
        assert_eq!(parsed.config, None);
        assert!(parsed.providers.is_empty());
        assert_eq!(parsed.prompt, "Say hello in one word");
        assert_eq!(parsed.max_tokens, 10);
        assert!(!parsed.verbose && !parsed.print_metrics);
    }

    #[test]
    fn all_flags_parse() {
        let parsed = args(&[
            "--config",
            "/etc/keyswitch.yaml",
            "--provider",
            "openai",
            "--provider",
            "litellm",
            "--prompt",
            "hi",
            "--max-tokens",
            "32",
            "--verbose",
            "--print-metrics",
        ])
        .unwrap();
        assert_eq!(parsed.config.as_deref(), Some("/etc/keyswitch.yaml"));
        assert_eq!(parsed.providers, vec!["openai", "litellm"]);
        assert_eq!(parsed.prompt, "hi");
        assert_eq!(parsed.max_tokens, 32);
        assert!(parsed.verbose && parsed.print_metrics);
    }

    #[test]
    fn short_verbose_flag() {
        assert!(args(&["-v"]).unwrap().verbose);
    }

    #[test]
    fn missing_value_is_error() {
        assert!(args(&["--config"]).is_err());
    }

    #[test]
    fn bad_max_tokens_is_error() {
        assert!(args(&["--max-tokens", "lots"]).is_err());
    }

    #[test]
    fn unknown_flag_is_error() {
        assert!(args(&["--listen"]).is_err());
    }
}
