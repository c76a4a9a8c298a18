//! parser — разбор образа раздела NVS целиком.
//!
//! Алгоритм:
//! 1) detect_version по первой странице; фатальна только нераспознанная версия.
//! 2) Страницы по 4096 байт по возрастанию offset'а: заголовок (плохой CRC — только флаг),
//!    таблица состояний, для каждого Written-слота — decode_item; шаг по span.
//!    nsIndex==0 → NamespaceResolver, BLOB_DATA/BLOB_IDX → BlobReassembler,
//!    остальное → список записей. span item с битым CRC заголовка не перешагивает
//!    следующий корректный заголовок.
//! 3) BlobReassembler::finalize().
//! 4) «Последняя запись побеждает» по (nsIndex, key) в порядке (страница, слот).
//! 5) Разрешение имён namespace — в самом конце (определения могут идти после использования).
//!
//! Парсер не хранит состояния между вызовами: результат — чистая функция входных байт.

use log::{debug, info, warn};
use std::collections::HashMap;

use crate::blob::BlobReassembler;
use crate::config::NvsConfig;
use crate::error::Result;
use crate::item::{decode_item, ItemType, RawItem};
use crate::model::{ParsedEntry, PartitionParseResult, PageSummary};
use crate::namespace::NamespaceResolver;
use crate::page::common::{ENTRY_COUNT, ENTRY_DATA_OFFSET, ENTRY_SIZE, PAGE_SIZE};
use crate::page::{
    detect_version, item_header_crc_ok, read_page_header, EntryState, EntryStateTable, PageState,
};

/// Разобрать образ с настройками по умолчанию.
pub fn parse_partition(image: &[u8]) -> Result<PartitionParseResult> {
    PartitionParser::new(NvsConfig::default()).parse(image)
}

/// Разобрать образ с заданными настройками.
pub fn parse_partition_with(image: &[u8], cfg: &NvsConfig) -> Result<PartitionParseResult> {
    PartitionParser::new(cfg.clone()).parse(image)
}

#[derive(Debug, Clone, Default)]
pub struct PartitionParser {
    cfg: NvsConfig,
}

/// Состояние одного прохода (живёт только внутри parse()).
struct ScanState {
    namespaces: NamespaceResolver,
    blobs: BlobReassembler,
    entries: Vec<ParsedEntry>,
    erased: Vec<ParsedEntry>,
    pages: Vec<PageSummary>,
}

impl PartitionParser {
    pub fn new(cfg: NvsConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &NvsConfig {
        &self.cfg
    }

    pub fn parse(&self, image: &[u8]) -> Result<PartitionParseResult> {
        let version = detect_version(image)?;
        debug!(
            "parse: {} byte(s), format v{}, {}",
            image.len(),
            version,
            self.cfg
        );

        let mut st = ScanState {
            namespaces: NamespaceResolver::new(),
            blobs: BlobReassembler::new(),
            entries: Vec::new(),
            erased: Vec::new(),
            pages: Vec::new(),
        };

        for (index, page) in image.chunks(PAGE_SIZE).enumerate() {
            let summary = self.scan_page(index, page, &mut st);
            st.pages.push(summary);
        }

        let ScanState {
            namespaces,
            blobs,
            mut entries,
            erased,
            pages,
        } = st;

        entries.extend(blobs.finalize());
        // порядок хранения: (страница, слот); blob — по слоту индекса
        entries.sort_by_key(|e| e.location());

        let mut entries = if self.cfg.keep_duplicates {
            entries
        } else {
            last_write_wins(entries, self.cfg.prefer_crc_valid)
        };
        entries.extend(erased);

        for e in &mut entries {
            e.namespace = namespaces.resolve(e.ns_index);
        }

        let corrupt = entries.iter().filter(|e| !e.crc_ok).count();
        info!(
            "parsed {} page(s): {} namespace(s), {} entr(ies), {} suspect",
            pages.len(),
            namespaces.namespaces().len(),
            entries.len(),
            corrupt
        );

        Ok(PartitionParseResult {
            version,
            namespaces: namespaces.into_namespaces(),
            entries,
            pages,
        })
    }

    fn scan_page(&self, index: usize, page: &[u8], st: &mut ScanState) -> PageSummary {
        let offset = index * PAGE_SIZE;
        let mut summary = PageSummary {
            index,
            offset,
            seq: 0,
            state: PageState::Uninitialized,
            version_byte: 0xFF,
            header_crc_ok: false,
            written: 0,
            erased: 0,
            skipped: false,
            warnings: Vec::new(),
        };

        if page.len() < PAGE_SIZE {
            warn!("page {}: partial page, {} of {} byte(s)", index, page.len(), PAGE_SIZE);
            summary
                .warnings
                .push(format!("partial page: {} of {} byte(s)", page.len(), PAGE_SIZE));
        }

        let Some(hdr) = read_page_header(page) else {
            summary.skipped = true;
            summary.warnings.push("page too short for a header".to_string());
            return summary;
        };
        summary.seq = hdr.seq;
        summary.state = hdr.state;
        summary.version_byte = hdr.version_byte;
        summary.header_crc_ok = hdr.header_crc_ok;

        let Some(page_version) = hdr.version() else {
            warn!(
                "page {}: unrecognized format version byte 0x{:02x}, page skipped",
                index, hdr.version_byte
            );
            summary.skipped = true;
            summary.warnings.push(format!(
                "unrecognized format version byte 0x{:02x}; page skipped",
                hdr.version_byte
            ));
            return summary;
        };

        let table = EntryStateTable::read(page);
        let (written, erased) = table.counts();
        summary.written = written;
        summary.erased = erased;

        if hdr.state == PageState::Uninitialized {
            if written > 0 {
                summary
                    .warnings
                    .push("page marked uninitialized but holds written entries".to_string());
            } else {
                debug!("page {}: uninitialized", index);
                return summary;
            }
        }

        if !hdr.header_crc_ok {
            warn!(
                "page {}: header CRC mismatch (stored=0x{:08x}, computed=0x{:08x})",
                index, hdr.stored_crc, hdr.computed_crc
            );
            summary.warnings.push(format!(
                "page header CRC mismatch (stored 0x{:08x}, computed 0x{:08x})",
                hdr.stored_crc, hdr.computed_crc
            ));
        }

        debug!(
            "page {}: seq={} state={} v{} written={} erased={}",
            index, hdr.seq, hdr.state, page_version, written, erased
        );

        let mut slot = 0;
        while slot < ENTRY_COUNT {
            if ENTRY_DATA_OFFSET + slot * ENTRY_SIZE >= page.len() {
                break;
            }
            let state = table.state(slot);
            let is_erased = match state {
                EntryState::Written => false,
                EntryState::Erased if self.cfg.include_erased => true,
                EntryState::Illegal => {
                    debug!("page {}: slot {} has illegal state bits 0b01", index, slot);
                    slot += 1;
                    continue;
                }
                _ => {
                    slot += 1;
                    continue;
                }
            };

            let mut item = decode_item(page, slot, page_version, self.cfg.strict_item_crc);
            item.page = index;
            if !item.header_crc_ok && item.slots_used > 1 {
                // span из битого заголовка не доверяем: не перешагиваем живой item
                let end = slot + item.slots_used;
                if let Some(next) = next_valid_header(page, &table, slot + 1, end, self.cfg.strict_item_crc) {
                    warn!(
                        "page {}: slot {} span {} overlaps a valid item at slot {}; resuming there",
                        index, slot, item.span, next
                    );
                    item.warnings.push(format!(
                        "span {} not trusted after header CRC mismatch; scan resumed at slot {}",
                        item.span, next
                    ));
                    item.slots_used = next - slot;
                }
            }
            slot += item.slots_used;

            if is_erased {
                route_erased(item, st);
            } else {
                route_item(item, st);
            }
        }

        summary
    }
}

/// Первый слот в [from..end), где лежит записанный item с корректным CRC заголовка.
fn next_valid_header(
    page: &[u8],
    table: &EntryStateTable,
    from: usize,
    end: usize,
    strict_crc: bool,
) -> Option<usize> {
    (from..end.min(ENTRY_COUNT)).find(|&s| {
        let off = ENTRY_DATA_OFFSET + s * ENTRY_SIZE;
        matches!(table.state(s), EntryState::Written | EntryState::Erased)
            && off + ENTRY_SIZE <= page.len()
            && item_header_crc_ok(&page[off..off + ENTRY_SIZE], strict_crc).ok
    })
}

fn route_item(item: RawItem, st: &mut ScanState) {
    if NamespaceResolver::is_definition(&item) {
        st.namespaces.register(&item);
        return;
    }
    match item.item_type {
        ItemType::BlobData => st.blobs.register_chunk(item),
        ItemType::BlobIdx => st.blobs.register_index(item),
        _ => st.entries.push(ParsedEntry::from_item(item)),
    }
}

fn route_erased(item: RawItem, st: &mut ScanState) {
    if NamespaceResolver::is_definition(&item)
        || matches!(item.item_type, ItemType::BlobData | ItemType::BlobIdx)
    {
        debug!(
            "page {}: erased slot {} ('{}') not surfaced",
            item.page, item.slot, item.key
        );
        return;
    }
    let mut entry = ParsedEntry::from_item(item);
    entry.erased = true;
    entry.warnings.push("erased entry".to_string());
    st.erased.push(entry);
}

/// Оставить по одной записи на (nsIndex, key): более поздняя по (страница, слот)
/// заменяет более раннюю на её месте. Вход отсортирован по location().
/// prefer_valid: битая запись не вытесняет целую.
fn last_write_wins(entries: Vec<ParsedEntry>, prefer_valid: bool) -> Vec<ParsedEntry> {
    let mut out: Vec<ParsedEntry> = Vec::with_capacity(entries.len());
    let mut pos: HashMap<(u8, String), usize> = HashMap::new();
    for e in entries {
        let k = (e.ns_index, e.key.clone());
        match pos.get(&k) {
            Some(&i) if prefer_valid && out[i].crc_ok && !e.crc_ok => {
                warn!(
                    "key '{}' (ns {}): suspect write at page {} slot {} ignored, keeping page {} slot {}",
                    e.key, e.ns_index, e.page, e.slot, out[i].page, out[i].slot
                );
            }
            Some(&i) => {
                debug!(
                    "key '{}' (ns {}) overwritten at page {} slot {}",
                    e.key, e.ns_index, e.page, e.slot
                );
                out[i] = e;
            }
            None => {
                pos.insert(k, out.len());
                out.push(e);
            }
        }
    }
    out
}
