use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use nvsdump::{EntryValue, ParsedEntry};

use super::cli::Region;

/// Число: десятичное или 0x-hex.
pub fn parse_num(s: &str) -> Result<u64> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hx) => u64::from_str_radix(hx, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| anyhow!("invalid number '{}': {}", s, e))
}

/// Прочитать регион [offset .. offset+size) файла (size=None — до конца).
pub fn read_region(region: &Region) -> Result<Vec<u8>> {
    let p = &region.path;
    let mut f = File::open(p).with_context(|| format!("open {}", p.display()))?;
    let len = f.metadata()?.len();
    if region.offset > len {
        return Err(anyhow!(
            "offset 0x{:x} is past the end of {} ({} B)",
            region.offset,
            p.display(),
            len
        ));
    }
    let avail = len - region.offset;
    let want = region.size.unwrap_or(avail);
    if want > avail {
        return Err(anyhow!(
            "region 0x{:x}+0x{:x} exceeds {} ({} B)",
            region.offset,
            want,
            p.display(),
            len
        ));
    }
    f.seek(SeekFrom::Start(region.offset))?;
    let mut buf = Vec::with_capacity(want as usize);
    f.take(want).read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn display_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => format!("(binary {} B)", bytes.len()),
    }
}

pub fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

/// Короткое представление значения для табличного вывода.
pub fn display_value(e: &ParsedEntry) -> String {
    match &e.value {
        EntryValue::U8(v) => v.to_string(),
        EntryValue::U32(v) => v.to_string(),
        EntryValue::Text(s) => format!("{:?}", s),
        EntryValue::Bytes(b) => {
            let head = &b[..b.len().min(32)];
            let more = if b.len() > head.len() { "..." } else { "" };
            format!("{} B hex:{}{}", b.len(), to_hex(head), more)
        }
        EntryValue::Unknown { type_tag, raw } => {
            format!("type=0x{:02x} raw:{}", type_tag, to_hex(raw))
        }
    }
}
