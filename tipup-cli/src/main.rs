//! Requests a Tipup payment from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Charge 100 tokens
//! tipup request-payment --user 123456789012345678 --tokens 100
//!
//! # Charge a gift, with a custom config path
//! tipup --config ./staging.toml request-payment --user 123456789012345678 --gift rose
//!
//! # Configure logging level
//! RUST_LOG=debug tipup request-payment --user 123 --tokens 1
//! ```
//!
//! # Environment Variables
//!
//! - `TIPUP_CONFIG` — Path to TOML configuration file (default: `tipup.toml`)
//! - `TIPUP_API_URL`, `TIPUP_API_KEY`, `TIPUP_BOT_ID` — Override file values
//! - `RUST_LOG` — Log level filter (default: `info`)
//!
//! A `.env` file in the working directory is loaded first.

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tipup::chat::StaticIdentity;
use tipup::payment::PaymentIntent;
use tipup_http::PaymentClient;
#[cfg(feature = "telemetry")]
use tracing_subscriber::EnvFilter;

use tipup_cli::config::CliConfig;

#[derive(Debug, Parser)]
#[command(name = "tipup", version, about = "Tipup payments from the command line")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ask a user to pay, in tokens or with a gift.
    RequestPayment(RequestPaymentArgs),
}

#[derive(Debug, Args)]
struct RequestPaymentArgs {
    /// Discord id of the user being charged.
    #[arg(long)]
    user: String,

    /// Number of tokens to charge.
    #[arg(long, conflicts_with = "gift", required_unless_present = "gift")]
    tokens: Option<u64>,

    /// Slug of the gift to charge.
    #[arg(long)]
    gift: Option<String>,
}

impl RequestPaymentArgs {
    fn intent(&self) -> PaymentIntent {
        match (&self.gift, self.tokens) {
            (Some(slug), _) => PaymentIntent::gift(self.user.as_str(), slug.as_str()),
            (None, tokens) => PaymentIntent::tokens(self.user.as_str(), tokens.unwrap_or_default()),
        }
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    #[cfg(feature = "telemetry")]
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        #[cfg(feature = "telemetry")]
        tracing::error!("tipup failed: {e}");
        #[cfg(not(feature = "telemetry"))]
        let _ = e;
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let tipup_config = config.tipup_config()?;
    #[cfg(feature = "telemetry")]
    tracing::info!(
        api_url = %tipup_config.api_url(),
        api_key = tipup_config.api_key().is_some(),
        "Loaded configuration"
    );

    match cli.command {
        Command::RequestPayment(args) => {
            let identity = Arc::new(StaticIdentity(config.bot_id()?));
            let mut client = PaymentClient::try_new(identity, Arc::new(tipup_config))?;
            if let Some(timeout) = config.timeout() {
                client = client.with_timeout(timeout);
            }

            let result = client.request_payment(&args.intent()).await?;
            #[cfg(feature = "telemetry")]
            tracing::info!(request_id = result.request_id, status = %result.status, "Payment requested");
            print_json(&serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_json(json: &str) {
    println!("{json}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tipup::payment::PaymentMethod;

    fn intent(args: &[&str]) -> Result<PaymentIntent, clap::Error> {
        let cli = Cli::try_parse_from(args)?;
        let Command::RequestPayment(args) = cli.command;
        Ok(args.intent())
    }

    #[test]
    fn test_tokens_or_gift() {
        let tokens = intent(&["tipup", "request-payment", "--user", "7", "--tokens", "10"]).unwrap();
        assert_eq!(tokens.method, PaymentMethod::Tokens(10));

        let gift = intent(&["tipup", "request-payment", "--user", "7", "--gift", "rose"]).unwrap();
        assert_eq!(gift.method, PaymentMethod::Gift("rose".to_owned()));
        assert_eq!(gift.user_id.as_str(), "7");
    }

    #[test]
    fn test_amount_is_required_and_exclusive() {
        assert!(intent(&["tipup", "request-payment", "--user", "7"]).is_err());
        assert!(
            intent(&[
                "tipup",
                "request-payment",
                "--user",
                "7",
                "--tokens",
                "1",
                "--gift",
                "rose"
            ])
            .is_err()
        );
    }
}
