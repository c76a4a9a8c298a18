//! blob — сборка blob из чанков BLOB_DATA по индексу BLOB_IDX.
//!
//! Ключ группы — (nsIndex, key). Чанки — по chunkIndex (последняя запись побеждает),
//! индекс — один на ключ (последний). finalize():
//! - индекс + чанки: склейка чанков [chunk_start .. chunk_start+chunk_count) до data_size;
//!   пропуски → crc_ok=false и "missing chunk", отдаём что собрали;
//! - индекс без чанков: пустой blob, crc_ok=false;
//! - чанки без индекса: legacy (v1, chunkIndex=0xFF) — самостоятельный blob,
//!   иначе — склейка по порядку с предупреждением "blob chunk without index".
//! Чанки, не попавшие в окно индекса, — старые версии значения; отбрасываются.

use log::{debug, warn};
use std::collections::BTreeMap;

use crate::item::{ItemBody, RawItem};
use crate::model::{EntryType, EntryValue, ParsedEntry};
use crate::page::common::CHUNK_ANY;
use crate::page::NvsVersion;

type BlobKey = (u8, String);

#[derive(Debug, Clone)]
struct BlobIndex {
    data_size: u32,
    chunk_count: u8,
    chunk_start: u8,
    crc_ok: bool,
    warnings: Vec<String>,
    page: usize,
    slot: usize,
}

#[derive(Debug, Clone)]
struct BlobChunk {
    data: Vec<u8>,
    crc_ok: bool,
    warnings: Vec<String>,
    page: usize,
    slot: usize,
}

#[derive(Debug, Default)]
pub struct BlobReassembler {
    indexes: BTreeMap<BlobKey, BlobIndex>,
    chunks: BTreeMap<BlobKey, BTreeMap<u8, BlobChunk>>,
}

impl BlobReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Зарегистрировать чанк (BLOB_DATA). На legacy-странице chunkIndex не используется.
    /// На v2-странице 0xFF — маркер индекса, чанк с ним считается битым.
    pub fn register_chunk(&mut self, mut item: RawItem) {
        let chunk_index = match item.version {
            NvsVersion::V1 => CHUNK_ANY,
            NvsVersion::V2 => item.chunk_index,
        };
        if item.version == NvsVersion::V2 && chunk_index == CHUNK_ANY {
            warn!(
                "blob chunk '{}' at page {} slot {} carries chunk index 0xff on a v2 page",
                item.key, item.page, item.slot
            );
            item.flag("blob chunk with chunk index 0xff on a v2 page");
        }
        let ItemBody::BlobData { data, .. } = item.body else {
            return;
        };
        debug!(
            "blob chunk ns={} key='{}' chunk=0x{:02x} len={}",
            item.ns_index,
            item.key,
            chunk_index,
            data.len()
        );
        let chunk = BlobChunk {
            data,
            crc_ok: item.crc_ok,
            warnings: item.warnings,
            page: item.page,
            slot: item.slot,
        };
        self.chunks
            .entry((item.ns_index, item.key))
            .or_default()
            .insert(chunk_index, chunk);
    }

    /// Зарегистрировать индекс (BLOB_IDX) для (namespace, key).
    pub fn register_index(&mut self, item: RawItem) {
        let ItemBody::BlobIndex {
            data_size,
            chunk_count,
            chunk_start,
        } = item.body
        else {
            return;
        };
        debug!(
            "blob index ns={} key='{}' size={} chunks={} start={}",
            item.ns_index, item.key, data_size, chunk_count, chunk_start
        );
        let idx = BlobIndex {
            data_size,
            chunk_count,
            chunk_start,
            crc_ok: item.crc_ok,
            warnings: item.warnings,
            page: item.page,
            slot: item.slot,
        };
        self.indexes.insert((item.ns_index, item.key), idx);
    }

    /// Собрать все blob. namespace в записях не заполнен (разрешается вызывающим).
    pub fn finalize(self) -> Vec<ParsedEntry> {
        let BlobReassembler {
            indexes,
            mut chunks,
        } = self;
        let mut out = Vec::new();

        for ((ns_index, key), idx) in indexes {
            let mut group = chunks.remove(&(ns_index, key.clone())).unwrap_or_default();
            out.push(assemble_indexed(ns_index, key, idx, &mut group));
            if !group.is_empty() {
                debug!("dropping {} stale blob chunk(s)", group.len());
            }
        }

        for ((ns_index, key), group) in chunks {
            out.extend(assemble_orphans(ns_index, key, group));
        }

        out
    }
}

fn blob_entry(
    ns_index: u8,
    key: String,
    data: Vec<u8>,
    crc_ok: bool,
    warnings: Vec<String>,
    (page, slot): (usize, usize),
) -> ParsedEntry {
    ParsedEntry {
        namespace: String::new(),
        ns_index,
        key,
        entry_type: EntryType::Blob,
        length: Some(data.len()),
        value: EntryValue::Bytes(data),
        crc_ok,
        warnings,
        page,
        slot,
        erased: false,
    }
}

fn assemble_indexed(
    ns_index: u8,
    key: String,
    idx: BlobIndex,
    group: &mut BTreeMap<u8, BlobChunk>,
) -> ParsedEntry {
    let mut crc_ok = idx.crc_ok;
    let mut warnings = idx.warnings;
    let mut data = Vec::with_capacity(idx.data_size as usize);
    let mut missing = Vec::new();

    for i in 0..idx.chunk_count as u16 {
        let ci = idx.chunk_start as u16 + i;
        // 0xFF — не номер чанка
        let chunk = if ci < CHUNK_ANY as u16 {
            group.remove(&(ci as u8))
        } else {
            None
        };
        match chunk {
            Some(c) => {
                if !c.crc_ok {
                    crc_ok = false;
                    warnings.extend(c.warnings.into_iter().map(|w| format!("chunk {}: {}", ci, w)));
                }
                data.extend_from_slice(&c.data);
            }
            None => missing.push(ci),
        }
    }

    if !missing.is_empty() {
        warn!("blob '{}': missing chunk(s) {:?}", key, missing);
        crc_ok = false;
        let list = missing
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        warnings.push(format!("missing chunk(s): {}", list));
    }

    let declared = idx.data_size as usize;
    if data.len() > declared {
        crc_ok = false;
        warnings.push(format!(
            "reassembled {} byte(s), declared size {}; truncated",
            data.len(),
            declared
        ));
        data.truncate(declared);
    } else if data.len() < declared {
        crc_ok = false;
        warnings.push(format!(
            "size mismatch: declared {} byte(s), reassembled {}",
            declared,
            data.len()
        ));
    }

    blob_entry(ns_index, key, data, crc_ok, warnings, (idx.page, idx.slot))
}

fn assemble_orphans(ns_index: u8, key: String, group: BTreeMap<u8, BlobChunk>) -> Vec<ParsedEntry> {
    let mut out = Vec::new();
    let mut numbered = Vec::new();
    for (ci, c) in group {
        if ci == CHUNK_ANY {
            // legacy: один item — весь blob
            out.push(blob_entry(
                ns_index,
                key.clone(),
                c.data,
                c.crc_ok,
                c.warnings,
                (c.page, c.slot),
            ));
        } else {
            numbered.push((ci, c));
        }
    }

    if let Some((_, first)) = numbered.first() {
        warn!("blob '{}': {} chunk(s) without index", key, numbered.len());
        let loc = (first.page, first.slot);
        let mut data = Vec::new();
        let mut warnings = vec!["blob chunk without index".to_string()];
        for (ci, c) in numbered {
            warnings.extend(c.warnings.into_iter().map(|w| format!("chunk {}: {}", ci, w)));
            data.extend_from_slice(&c.data);
        }
        out.push(blob_entry(ns_index, key, data, false, warnings, loc));
    }
    out
}
