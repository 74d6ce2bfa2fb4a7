#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use passbind::{
    ceremony::CeremonyClient,
    fingerprint::{self, EnvironmentProvider, HostEnvironment},
    PassbindSettings,
};

#[derive(Parser)]
#[command(name = "passbind")]
#[command(author, version, about = "Device-bound credential client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print this device's fingerprint token
    Fingerprint {
        /// Also print the attribute vector the token is derived from
        #[arg(short, long)]
        verbose: bool,
    },

    /// Create a password account on the configured service
    Register {
        #[arg(long)]
        email: String,

        #[arg(long, env = "PASSBIND_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log in with a password, binding the session to this device
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "PASSBIND_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Reads Settings.toml and the environment, then initializes the logger
    let settings = PassbindSettings::load()
        .map_err(|e| anyhow::anyhow!("Failed to load settings: {e}"))?;

    match cli.command {
        Commands::Fingerprint { verbose } => {
            print_fingerprint(&settings, verbose);
            Ok(())
        }
        Commands::Register { email, password } => {
            let client = CeremonyClient::from_settings(&settings)
                .context("Failed to initialize ceremony client")?;
            let outcome = client
                .password_register(&email, &password)
                .await
                .map_err(|e| anyhow::anyhow!(e.classify().to_string()))?;
            println!("✓ Registered {email} ({})", outcome.id);
            Ok(())
        }
        Commands::Login { email, password } => {
            let client = CeremonyClient::from_settings(&settings)
                .context("Failed to initialize ceremony client")?;
            let outcome = client
                .password_login(&email, &password)
                .await
                .map_err(|e| anyhow::anyhow!(e.classify().to_string()))?;
            println!("✓ Logged in as {email}");
            if let Some(hash) = outcome.device_id_hash {
                println!("  Device: {hash}");
            }
            Ok(())
        }
    }
}

fn print_fingerprint(settings: &PassbindSettings, verbose: bool) {
    let environment = HostEnvironment::new(settings.device.clone());
    let snapshot = environment.snapshot();
    println!("{}", fingerprint::derive_fingerprint(&snapshot));

    if verbose {
        let labels = [
            "screen",
            "timezone",
            "locale",
            "language",
            "cores",
            "platform",
            "touch points",
        ];
        for (label, value) in labels.iter().zip(snapshot.attribute_vector()) {
            println!("  {label:<13} {value}");
        }
    }
}
