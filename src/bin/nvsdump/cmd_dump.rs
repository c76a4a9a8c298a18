use anyhow::{Context, Result};
use log::debug;

use nvsdump::{NvsConfig, ParsedEntry, PartitionParser};

use super::cli::Region;
use super::util::{display_value, read_region};

pub struct DumpOpts {
    pub namespace: Option<String>,
    pub json: bool,
    pub pages: bool,
    pub keep_duplicates: bool,
    pub include_erased: bool,
    pub strict_item_crc: bool,
    pub prefer_crc_valid: bool,
}

impl DumpOpts {
    /// Флаги CLI поверх ENV (флаг может только включить режим).
    fn config(&self) -> NvsConfig {
        let env = NvsConfig::from_env();
        NvsConfig::builder()
            .keep_duplicates(env.keep_duplicates || self.keep_duplicates)
            .include_erased(env.include_erased || self.include_erased)
            .strict_item_crc(env.strict_item_crc || self.strict_item_crc)
            .prefer_crc_valid(env.prefer_crc_valid || self.prefer_crc_valid)
            .build()
    }
}

pub fn exec(region: Region, opts: DumpOpts) -> Result<()> {
    let image = read_region(&region)?;
    let cfg = opts.config();
    debug!("dump {}: {} B, {}", region.path.display(), image.len(), cfg);

    let mut parsed = PartitionParser::new(cfg).parse(&image)?;
    if let Some(ns) = &opts.namespace {
        parsed.entries.retain(|e| &e.namespace == ns);
    }

    if opts.json {
        let s = serde_json::to_string_pretty(&parsed).context("serialize parse result")?;
        println!("{}", s);
        return Ok(());
    }

    println!(
        "NVS v{}: {} page(s), {} namespace(s), {} entr(ies)",
        parsed.version,
        parsed.pages.len(),
        parsed.namespaces.len(),
        parsed.entries.len()
    );

    println!("namespaces:");
    if parsed.namespaces.is_empty() {
        println!("  (none)");
    }
    for ns in &parsed.namespaces {
        println!("  {:>3}  {}", ns.id, ns.name);
    }

    if opts.pages {
        println!("pages:");
        for p in &parsed.pages {
            println!(
                "  #{:<3} off=0x{:06x} seq={:<6} state={:<13} ver=0x{:02x} hdr_crc={} written={} erased={}{}",
                p.index,
                p.offset,
                p.seq,
                p.state.to_string(),
                p.version_byte,
                if p.header_crc_ok { "ok" } else { "BAD" },
                p.written,
                p.erased,
                if p.skipped { " SKIPPED" } else { "" }
            );
            for w in &p.warnings {
                println!("        ! {}", w);
            }
        }
    }

    println!("entries:");
    if parsed.entries.is_empty() {
        println!("  (no entries)");
    }
    for e in &parsed.entries {
        print_entry(e);
    }

    let bad = parsed.corrupt_entries().count();
    if bad > 0 {
        println!("{} suspect entr(ies)", bad);
    }
    Ok(())
}

fn print_entry(e: &ParsedEntry) {
    println!(
        "  {}/{} [{}] = {}{}{}",
        e.namespace,
        e.key,
        e.entry_type.as_str(),
        display_value(e),
        if e.crc_ok { "" } else { "  CORRUPT" },
        if e.erased { "  (erased)" } else { "" }
    );
    for w in &e.warnings {
        println!("      ! {}", w);
    }
}
