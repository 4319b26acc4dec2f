//! Sigframe backup tool.
//!
//! # Usage
//!
//! ```bash
//! # List every frame with its offset and MAC result
//! sigframe --passphrase 123451234512345123451234512345 inspect backup.bin
//!
//! # Extract attachment, sticker and avatar bodies
//! sigframe dump-attachments backup.bin ./bodies
//!
//! # Write a copy under a new passphrase
//! sigframe reencrypt backup.bin copy.bin --new-passphrase 543215432154321543215432154321
//! ```
//!
//! Passphrases may also come from `SIGFRAME_PASSPHRASE` and
//! `SIGFRAME_NEW_PASSPHRASE`.

mod commands;

use std::{io, path::PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use sigframe_backup::{DecryptorConfig, EncryptorConfig};
use sigframe_crypto::MacEra;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Backup stream tool
#[derive(Parser, Debug)]
#[command(name = "sigframe")]
#[command(about = "Inspect, extract and re-encrypt encrypted backup streams")]
#[command(version)]
struct Args {
    /// 30-digit backup passphrase (spaces and dashes ignored)
    #[arg(short, long, env = "SIGFRAME_PASSPHRASE", hide_env_values = true)]
    passphrase: String,

    /// Frame MAC scheme of the input backup
    #[arg(long, value_enum, default_value_t = Era::Truncated)]
    mac_era: Era,

    /// Read and authenticate attachment bodies while walking the stream
    #[arg(long)]
    eager: bool,

    /// Log per-attachment detail
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one line per frame and a session summary
    Inspect {
        /// Backup file
        backup: PathBuf,
    },

    /// Write every attachment body to a directory
    DumpAttachments {
        /// Backup file
        backup: PathBuf,
        /// Output directory, created if missing
        out_dir: PathBuf,
    },

    /// Decrypt and re-encrypt under a new passphrase
    Reencrypt {
        /// Backup file
        backup: PathBuf,
        /// Destination file
        output: PathBuf,
        /// Passphrase for the new backup
        #[arg(long, env = "SIGFRAME_NEW_PASSPHRASE", hide_env_values = true)]
        new_passphrase: String,
        /// Frame MAC scheme to write
        #[arg(long, value_enum, default_value_t = Era::Truncated)]
        new_mac_era: Era,
    },
}

/// Frame MAC scheme as a command-line value
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Era {
    /// 10-byte tag over the ciphertext
    Truncated,
    /// 32-byte tag over IV and ciphertext
    Full,
}

impl From<Era> for MacEra {
    fn from(era: Era) -> Self {
        match era {
            Era::Truncated => MacEra::Truncated,
            Era::Full => MacEra::Full,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let config = DecryptorConfig {
        mac_era: args.mac_era.into(),
        verbose: args.verbose,
        lazy_attachments: !args.eager,
    };

    match &args.command {
        Command::Inspect { backup } => {
            commands::inspect(backup, &args.passphrase, config, &mut io::stdout().lock())?;
        },
        Command::DumpAttachments { backup, out_dir } => {
            let (written, stats) =
                commands::dump_attachments(backup, &args.passphrase, config, out_dir)?;
            tracing::info!(written, out_dir = %out_dir.display(), %stats, "dumped attachments");
        },
        Command::Reencrypt { backup, output, new_passphrase, new_mac_era } => {
            let new_config = EncryptorConfig { mac_era: (*new_mac_era).into() };
            let stats = commands::reencrypt(
                backup,
                &args.passphrase,
                config,
                output,
                new_passphrase,
                new_config,
            )?;
            tracing::info!(%stats, "source backup");
        },
    }

    Ok(())
}
