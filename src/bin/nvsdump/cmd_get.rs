use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use nvsdump::{parse_partition_with, EntryValue, NvsConfig};

use super::cli::Region;
use super::util::{display_text, display_value, read_region, to_hex};

pub fn exec(region: Region, namespace: String, key: String, out: Option<PathBuf>) -> Result<()> {
    let image = read_region(&region)?;
    let parsed = parse_partition_with(&image, &NvsConfig::from_env())?;

    let Some(e) = parsed.find(&namespace, &key) else {
        println!("NOT FOUND '{}/{}'", namespace, key);
        return Ok(());
    };

    let raw: Option<&[u8]> = match &e.value {
        EntryValue::Text(s) => Some(s.as_bytes()),
        EntryValue::Bytes(b) => Some(b.as_slice()),
        _ => None,
    };

    match (out, raw) {
        (Some(out_path), Some(bytes)) => {
            if let Some(parent) = out_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let mut f = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&out_path)
                .with_context(|| format!("open {}", out_path.display()))?;
            f.write_all(bytes)?;
            f.sync_all()?;
            println!(
                "FOUND '{}/{}' ({}): {} B -> wrote to {}",
                namespace,
                key,
                e.entry_type.as_str(),
                bytes.len(),
                out_path.display()
            );
        }
        (_, Some(bytes)) => {
            println!("FOUND '{}/{}' ({}): {} B", namespace, key, e.entry_type.as_str(), bytes.len());
            println!("text: {}", display_text(bytes));
            println!("hex:  {}", to_hex(&bytes[..bytes.len().min(64)]));
        }
        (_, None) => {
            println!(
                "FOUND '{}/{}' ({}): {}",
                namespace,
                key,
                e.entry_type.as_str(),
                display_value(e)
            );
        }
    }

    if !e.crc_ok {
        println!("CORRUPT: {}", e.warnings.join("; "));
    }
    Ok(())
}
