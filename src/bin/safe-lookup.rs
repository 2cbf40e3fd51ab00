use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{fmt::Write as _, path::PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use safe_lookup::{
    models::{OwnerSafesResult, SafeOwnersResult},
    AddressBook, Config, SafeLookup,
};

#[derive(Debug, Parser)]
#[command(name = "safe-lookup")]
#[command(about = "Find Safe multisigs and their owners across networks")]
struct Cli {
    /// Print the raw JSON result instead of a listing.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the Safes an address owns on every network.
    Owner { address: String },
    /// List the owners and threshold of a Safe on every network.
    Safe { address: String },
    /// Deduplicate an `address,name,chainId` CSV into a loadable address book.
    Addressbook {
        input: PathBuf,
        /// Output path; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "safe_lookup=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Addressbook { input, out } => generate_address_book(&input, out.as_deref()),
        Command::Owner { address } => {
            let lookup = lookup_from_env()?;
            eprintln!("Scanning Safes for owner: {}", address);
            let safes = lookup.safes_by_owner(&address).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&safes)?);
            } else {
                print!("{}", render_owner_safes(&lookup, &safes));
            }
            Ok(())
        }
        Command::Safe { address } => {
            let lookup = lookup_from_env()?;
            eprintln!("Scanning owners of Safe: {}", address);
            let safes = lookup.owners_by_safe(&address).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&safes)?);
            } else {
                print!("{}", render_safe_owners(&lookup, &safes));
            }
            Ok(())
        }
    }
}

fn lookup_from_env() -> Result<SafeLookup> {
    let config = Config::from_env()?;
    config.validate()?;
    SafeLookup::from_config(&config)
}

fn generate_address_book(input: &std::path::Path, out: Option<&std::path::Path>) -> Result<()> {
    let book = AddressBook::load(Some(input))?;
    let csv = book.to_csv()?;
    match out {
        Some(path) => {
            std::fs::write(path, csv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Generated {} ({} entries)", path.display(), book.len());
        }
        None => print!("{}", csv),
    }
    Ok(())
}

fn with_name(address: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{} ({})", address, name),
        None => address.to_string(),
    }
}

fn render_owner_safes(lookup: &SafeLookup, result: &OwnerSafesResult) -> String {
    if result.is_empty() {
        return "No Safe multisigs found.\n".to_string();
    }

    let mut out = String::new();
    for (network, safes) in result {
        let _ = writeln!(out, "{}", network.to_uppercase());
        for safe in safes {
            let _ = writeln!(
                out,
                "  - {} [{}/{}]",
                with_name(&safe.address, safe.name.as_deref()),
                safe.threshold,
                safe.total_owners
            );
            if let Some(descriptor) = lookup.network(network) {
                let _ = writeln!(out, "    {}", descriptor.safe_app_url(&safe.address));
            }
        }
        out.push('\n');
    }
    out
}

fn render_safe_owners(lookup: &SafeLookup, result: &SafeOwnersResult) -> String {
    if result.is_empty() {
        return "Safe not found on any network.\n".to_string();
    }

    let mut out = String::new();
    for (network, safe) in result {
        let _ = writeln!(
            out,
            "{} {} threshold {}/{}",
            network.to_uppercase(),
            with_name(&safe.address, safe.name.as_deref()),
            safe.threshold,
            safe.owners.len()
        );
        if let Some(descriptor) = lookup.network(network) {
            let _ = writeln!(out, "  {}", descriptor.safe_app_url(&safe.address));
        }
        for owner in &safe.owners {
            let _ = writeln!(out, "  - {}", with_name(&owner.address, owner.name.as_deref()));
        }
        out.push('\n');
    }
    out
}
