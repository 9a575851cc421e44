//! mbrkit - Master Boot Record inspection and repair tool
//!
//! Dumps, validates and rewrites the partition table in sector 0 of a disk
//! image or block device.

mod commands;
mod device;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::EntryEdit;
use device::DeviceConfig;
use mbrkit_core::ProtectiveType;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mbrkit")]
#[command(about = "Inspect, validate and rewrite MBR partition tables", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Logical sector size in bytes
    #[arg(long, default_value_t = 512, global = true)]
    sector_size: u32,

    /// Validate and report, but don't write anything
    #[arg(long, global = true)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Print the raw bytes of sector 0
    Dump {
        image: PathBuf,

        /// Write the 512 bytes to stdout instead of a hex listing
        #[arg(long)]
        raw: bool,
    },

    /// Show partitions and validation problems
    Info {
        image: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the MBR (exit code 1 if invalid)
    Check { image: PathBuf },

    /// Rewrite the 0x55 0xAA signature
    FixSignature { image: PathBuf },

    /// Turn the MBR into a GPT protective MBR
    Protect {
        image: PathBuf,

        /// Disk size in bytes (default: size of the image or device)
        #[arg(long)]
        disk_size: Option<u64>,

        /// How to size the protective partition (default, max-size, disk-size)
        #[arg(long, default_value_t = ProtectiveType::Default)]
        mode: ProtectiveType,
    },

    /// Change fields of one partition entry
    Set {
        image: PathBuf,

        /// Partition number: 1, 2, 3 or 4
        num: usize,

        /// Partition type byte in hex (e.g. 83, 0x8E)
        #[arg(long = "type", value_parser = commands::parse_type_byte)]
        partition_type: Option<u8>,

        /// First sector
        #[arg(long)]
        start: Option<u32>,

        /// Length in sectors
        #[arg(long)]
        len: Option<u32>,

        /// Boot flag
        #[arg(long)]
        bootable: Option<bool>,
    },

    /// Grow a partition entry into the free space after it
    ///
    /// Prints OK (exit 0), ALREADY_MAX (exit 1) or ERR and a message (exit 2).
    Extend {
        /// Device or image, for example /dev/sda
        device: PathBuf,

        /// Partition number: 1, 2, 3 or 4
        num: usize,

        /// Grow by this many GB (+SIZE). Default: grow to max size.
        #[arg(allow_hyphen_values = true)]
        size: Option<String>,
    },
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = DeviceConfig {
        sector_size: cli.sector_size,
        ..DeviceConfig::default()
    };
    let dry_run = cli.dry_run;

    match cli.command {
        Command::Dump { image, raw } => commands::cmd_dump(&image, config, raw),
        Command::Info { image, json } => commands::cmd_info(&image, config, json),
        Command::Check { image } => commands::cmd_check(&image, config),
        Command::FixSignature { image } => commands::cmd_fix_signature(&image, config, dry_run),
        Command::Protect {
            image,
            disk_size,
            mode,
        } => commands::cmd_protect(&image, config, disk_size, mode, dry_run),
        Command::Set {
            image,
            num,
            partition_type,
            start,
            len,
            bootable,
        } => {
            let edit = EntryEdit {
                partition_type,
                start,
                len,
                bootable,
            };
            commands::cmd_set(&image, config, num, edit, dry_run)
        }
        Command::Extend { device, num, size } => Ok(commands::cmd_extend(
            &device,
            config,
            num,
            size.as_deref(),
            dry_run,
        )),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries dumps and the extend protocol
    tracing_subscriber::fmt()
        .with_env_filter(cli.log_level.as_str())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
