use anyhow::Result;

use nvsdump::detect_version;

use super::cli::Region;
use super::util::read_region;

pub fn exec(region: Region) -> Result<()> {
    let image = read_region(&region)?;
    let version = detect_version(&image)?;
    println!(
        "NVS format v{} (version byte 0x{:02x}), {} page(s)",
        version,
        version.marker(),
        (image.len() + nvsdump::page::PAGE_SIZE - 1) / nvsdump::page::PAGE_SIZE
    );
    Ok(())
}
