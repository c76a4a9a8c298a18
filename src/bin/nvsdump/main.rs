use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::error;

mod cli;
mod util;
mod cmd_detect;
mod cmd_dump;
mod cmd_get;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт — warn (предупреждения о порче видны сразу).
    // Пример: RUST_LOG=debug nvsdump dump --path nvs.bin
    Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        // Логируем ошибку и выходим с кодом 1.
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Detect { region } => cmd_detect::exec(region),

        cli::Cmd::Dump {
            region,
            namespace,
            json,
            pages,
            keep_duplicates,
            include_erased,
            strict_item_crc,
            prefer_crc_valid,
        } => cmd_dump::exec(
            region,
            cmd_dump::DumpOpts {
                namespace,
                json,
                pages,
                keep_duplicates,
                include_erased,
                strict_item_crc,
                prefer_crc_valid,
            },
        ),

        cli::Cmd::Get {
            region,
            namespace,
            key,
            out,
        } => cmd_get::exec(region, namespace, key, out),
    }
}
