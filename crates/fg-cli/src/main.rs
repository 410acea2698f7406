use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fraudgate")]
#[command(about = "Checkout fraud-rule snapshot tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot build / verify
    Snapshot {
        #[command(subcommand)]
        cmd: SnapshotCmd,
    },

    /// Evaluate a checkout context against a snapshot; prints violations as JSON
    Evaluate {
        /// Snapshot JSON file (as written by `snapshot build`)
        #[arg(long)]
        snapshot: String,

        /// Checkout context JSON file
        #[arg(long)]
        context: String,

        /// Include the rule id behind each violation
        #[arg(long, default_value_t = false)]
        provenance: bool,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> merchant overrides...)
        #[arg(required = true)]
        paths: Vec<String>,

        /// Fail on config keys nothing reads (default: warn)
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
}

#[derive(Subcommand)]
enum SnapshotCmd {
    /// Build a snapshot from a rule-set JSON file
    Build {
        /// Rule set JSON (RuleSet shape, as the rule store hands it out)
        #[arg(long)]
        rules: String,

        /// Merchant to build for; defaults to the rule set's merchant_id
        #[arg(long)]
        merchant: Option<String>,

        /// Layered config paths in merge order (size ceilings)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Output path for the snapshot JSON
        #[arg(long)]
        out: String,
    },

    /// Verify a snapshot file's schema and integrity hash
    Verify {
        path: String,
    },
}

fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Snapshot { cmd } => match cmd {
            SnapshotCmd::Build {
                rules,
                merchant,
                config_paths,
                out,
            } => commands::snapshot::build(&rules, merchant.as_deref(), &config_paths, &out)?,
            SnapshotCmd::Verify { path } => commands::snapshot::verify(&path)?,
        },

        Commands::Evaluate {
            snapshot,
            context,
            provenance,
        } => commands::evaluate::evaluate(&snapshot, &context, provenance)?,

        Commands::ConfigHash { paths, strict } => {
            let loaded = commands::load_config(&paths, strict)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries command output only.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
