use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::util::parse_num;

/// CLI для разбора дампов NVS
#[derive(Parser, Debug)]
#[command(name = "nvsdump", version, about = "NVS partition decoder")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

/// Где в файле лежит раздел NVS (смещение/размер даёт читатель таблицы разделов).
#[derive(clap::Args, Debug, Clone)]
pub struct Region {
    /// Path to a raw partition dump or a full flash image
    #[arg(long)]
    pub path: PathBuf,
    /// Partition offset inside the file (decimal or 0x-hex)
    #[arg(long, value_parser = parse_num, default_value = "0")]
    pub offset: u64,
    /// Partition size in bytes (decimal or 0x-hex); defaults to the rest of the file
    #[arg(long, value_parser = parse_num)]
    pub size: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Detect the NVS format version (1 = legacy 0xFF, 2 = current 0xFE)
    Detect {
        #[command(flatten)]
        region: Region,
    },
    /// Decode all namespaces and entries
    ///
    /// Пример:
    ///   nvsdump dump --path nvs.bin
    ///   nvsdump dump --path flash.bin --offset 0x9000 --size 0x6000 --json
    Dump {
        #[command(flatten)]
        region: Region,
        /// Only entries of this namespace
        #[arg(long)]
        namespace: Option<String>,
        /// JSON output (single pretty object)
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Print per-page summary in text mode
        #[arg(long, default_value_t = false)]
        pages: bool,
        /// Keep every write of a key (no last-write-wins)
        #[arg(long, default_value_t = false)]
        keep_duplicates: bool,
        /// Also decode erased slots
        #[arg(long, default_value_t = false)]
        include_erased: bool,
        /// Item header CRC must match bytes 0..4 + 8..24 only
        #[arg(long, default_value_t = false)]
        strict_item_crc: bool,
        /// A suspect later write does not replace an intact earlier one
        #[arg(long, default_value_t = false)]
        prefer_crc_valid: bool,
    },
    /// Print one value
    Get {
        #[command(flatten)]
        region: Region,
        #[arg(long)]
        namespace: String,
        #[arg(long)]
        key: String,
        /// Optional file to write raw string/blob bytes into
        #[arg(long)]
        out: Option<PathBuf>,
    },
}
