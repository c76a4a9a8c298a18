//! item/decode — разбор одного item (32-байтовый заголовок + span-1 слотов payload).
//!
//! Разбор тотальный: любая порча (CRC, span за границей страницы, несогласованные длины)
//! оставляет crc_ok=false и предупреждение, значение извлекается как получится.

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};

use super::raw::{ItemBody, ItemType, RawItem};
use crate::page::checksum::{item_header_crc_ok, nvs_crc32};
use crate::page::common::{
    BLOB_IDX_OFF_CHUNK_COUNT, BLOB_IDX_OFF_CHUNK_START, BLOB_IDX_OFF_SIZE, ENTRY_COUNT,
    ENTRY_DATA_OFFSET, ENTRY_SIZE, ITEM_DATA_SIZE, ITEM_KEY_SIZE, ITEM_OFF_CHUNK_INDEX,
    ITEM_OFF_DATA, ITEM_OFF_KEY, ITEM_OFF_NS_INDEX, ITEM_OFF_SPAN, ITEM_OFF_TYPE, PAGE_SIZE,
    VAR_OFF_DATA_CRC32, VAR_OFF_SIZE,
};
use crate::page::NvsVersion;

/// Ключ: до первого NUL в 16-байтовом поле.
fn decode_key(item: &[u8]) -> String {
    let field = &item[ITEM_OFF_KEY..ITEM_OFF_KEY + ITEM_KEY_SIZE];
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Разобрать item, заголовок которого лежит в слоте `slot` страницы `page`.
///
/// `page` может быть короче 4096 байт (хвост образа): недостающие байты заголовка
/// читаются как 0xFF, запись помечается обрезанной. Поле `page` результата заполняет
/// вызывающий.
pub fn decode_item(page: &[u8], slot: usize, version: NvsVersion, strict_crc: bool) -> RawItem {
    let off = ENTRY_DATA_OFFSET + slot * ENTRY_SIZE;
    let page_end = page.len().min(PAGE_SIZE);

    let mut hdr = [0xFFu8; ENTRY_SIZE];
    let hdr_avail = page_end.saturating_sub(off).min(ENTRY_SIZE);
    if hdr_avail > 0 {
        hdr[..hdr_avail].copy_from_slice(&page[off..off + hdr_avail]);
    }

    let ns_index = hdr[ITEM_OFF_NS_INDEX];
    let type_tag = hdr[ITEM_OFF_TYPE];
    let span = hdr[ITEM_OFF_SPAN];
    let chunk_index = hdr[ITEM_OFF_CHUNK_INDEX];
    let item_type = ItemType::from_tag(type_tag);

    let crc = item_header_crc_ok(&hdr, strict_crc);

    let mut item = RawItem {
        page: 0,
        slot,
        version,
        ns_index,
        item_type,
        span,
        slots_used: (span as usize).max(1),
        chunk_index,
        key: decode_key(&hdr),
        header_crc_ok: crc.ok,
        crc_ok: crc.ok,
        warnings: Vec::new(),
        body: ItemBody::Unknown {
            type_tag,
            raw: [0xFF; ITEM_DATA_SIZE],
        },
    };

    if !crc.ok {
        warn!(
            "slot {}: header CRC mismatch for key '{}' (stored=0x{:08x}, computed=0x{:08x})",
            slot, item.key, crc.stored, crc.computed
        );
        item.warnings.push(format!(
            "header CRC mismatch (stored 0x{:08x}, computed 0x{:08x})",
            crc.stored, crc.computed
        ));
    }

    if hdr_avail < ENTRY_SIZE {
        item.flag(format!(
            "truncated record: header slot has only {} of {} byte(s)",
            hdr_avail, ENTRY_SIZE
        ));
    }

    if span == 0 {
        item.flag("invalid span 0 (treated as 1)");
    }

    // Граница payload: конец страницы и конец области слотов.
    let claimed_slots = item.slots_used;
    let slot_limit = ENTRY_COUNT.saturating_sub(slot);
    let payload_start = off + ENTRY_SIZE;
    let claimed_end = off + claimed_slots * ENTRY_SIZE;
    let avail_end = claimed_end.min(page_end).min(ENTRY_DATA_OFFSET + ENTRY_COUNT * ENTRY_SIZE);
    if claimed_slots > slot_limit || claimed_end > page_end {
        let avail = avail_end.saturating_sub(off);
        warn!(
            "slot {}: truncated record '{}': span {} needs {} byte(s), {} available",
            slot,
            item.key,
            span,
            claimed_slots * ENTRY_SIZE,
            avail
        );
        item.flag(format!(
            "truncated record: span {} needs {} byte(s), only {} available",
            span,
            claimed_slots * ENTRY_SIZE,
            avail
        ));
        // Не шагаем за конец страницы.
        item.slots_used = claimed_slots.min(slot_limit).max(1);
    }
    let payload_area: &[u8] = if avail_end > payload_start {
        &page[payload_start..avail_end]
    } else {
        &[]
    };

    let data = &hdr[ITEM_OFF_DATA..ITEM_OFF_DATA + ITEM_DATA_SIZE];
    item.body = match item_type {
        ItemType::U8 => ItemBody::U8(data[0]),
        ItemType::U32 => ItemBody::U32(LittleEndian::read_u32(&data[0..4])),
        ItemType::Sz | ItemType::BlobData => {
            let (payload, size) = read_payload(&hdr, payload_area, claimed_slots, &mut item);
            if item_type == ItemType::Sz {
                let mut text_bytes: &[u8] = &payload;
                if let Some((&0, head)) = text_bytes.split_last() {
                    text_bytes = head;
                }
                let text = match std::str::from_utf8(text_bytes) {
                    Ok(s) => s.to_string(),
                    Err(_) => {
                        item.warnings.push("string payload is not valid UTF-8".to_string());
                        String::from_utf8_lossy(text_bytes).into_owned()
                    }
                };
                ItemBody::Str { text, size }
            } else {
                ItemBody::BlobData {
                    data: payload,
                    size,
                }
            }
        }
        ItemType::BlobIdx => ItemBody::BlobIndex {
            data_size: LittleEndian::read_u32(&hdr[BLOB_IDX_OFF_SIZE..BLOB_IDX_OFF_SIZE + 4]),
            chunk_count: hdr[BLOB_IDX_OFF_CHUNK_COUNT],
            chunk_start: hdr[BLOB_IDX_OFF_CHUNK_START],
        },
        ItemType::Unknown(tag) => {
            let mut raw = [0u8; ITEM_DATA_SIZE];
            raw.copy_from_slice(data);
            item.warnings.push(format!("unknown item type 0x{:02x}", tag));
            ItemBody::Unknown { type_tag: tag, raw }
        }
    };

    debug!(
        "slot {}: ns={} type=0x{:02x} span={} chunk=0x{:02x} key='{}' crc_ok={}",
        slot, ns_index, type_tag, span, chunk_index, item.key, item.crc_ok
    );
    item
}

/// Собрать payload SZ / BLOB_DATA и проверить его CRC. Возвращает (payload, заявленная длина).
fn read_payload(
    hdr: &[u8],
    payload_area: &[u8],
    claimed_slots: usize,
    item: &mut RawItem,
) -> (Vec<u8>, usize) {
    let declared = LittleEndian::read_u16(&hdr[VAR_OFF_SIZE..VAR_OFF_SIZE + 2]) as usize;
    let stored_crc = LittleEndian::read_u32(&hdr[VAR_OFF_DATA_CRC32..VAR_OFF_DATA_CRC32 + 4]);

    let capacity = claimed_slots.saturating_sub(1) * ENTRY_SIZE;
    if declared > capacity {
        item.flag(format!(
            "declared length {} exceeds span capacity {}",
            declared, capacity
        ));
    }

    let take = declared.min(payload_area.len());
    let payload = payload_area[..take].to_vec();

    let computed = nvs_crc32(&payload);
    if computed != stored_crc {
        warn!(
            "slot {}: payload CRC mismatch for key '{}' (stored=0x{:08x}, computed=0x{:08x})",
            item.slot, item.key, stored_crc, computed
        );
        item.flag(format!(
            "payload CRC mismatch (stored 0x{:08x}, computed 0x{:08x})",
            stored_crc, computed
        ));
    }
    (payload, declared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::checksum::item_record_crc32;
    use crate::page::common::{ITEM_TYPE_BLOB_IDX, ITEM_TYPE_SZ, ITEM_TYPE_U32};

    fn blank_page() -> Vec<u8> {
        vec![0xFFu8; PAGE_SIZE]
    }

    fn put_header(page: &mut [u8], slot: usize, ns: u8, ty: u8, span: u8, key: &str, data: [u8; 8]) {
        let off = ENTRY_DATA_OFFSET + slot * ENTRY_SIZE;
        let item = &mut page[off..off + ENTRY_SIZE];
        item.fill(0xFF);
        item[0] = ns;
        item[1] = ty;
        item[2] = span;
        item[3] = 0xFF;
        item[8..8 + key.len()].copy_from_slice(key.as_bytes());
        item[8 + key.len()] = 0;
        item[24..32].copy_from_slice(&data);
        let crc = item_record_crc32(item);
        LittleEndian::write_u32(&mut item[4..8], crc);
    }

    fn put_string(page: &mut [u8], slot: usize, key: &str, text: &str) -> usize {
        let mut payload = text.as_bytes().to_vec();
        payload.push(0);
        let span = 1 + (payload.len() + ENTRY_SIZE - 1) / ENTRY_SIZE;
        let mut data = [0xFFu8; 8];
        LittleEndian::write_u16(&mut data[0..2], payload.len() as u16);
        LittleEndian::write_u32(&mut data[4..8], nvs_crc32(&payload));
        put_header(page, slot, 1, ITEM_TYPE_SZ, span as u8, key, data);
        let start = ENTRY_DATA_OFFSET + (slot + 1) * ENTRY_SIZE;
        page[start..start + payload.len()].copy_from_slice(&payload);
        span
    }

    #[test]
    fn decode_u32() {
        let mut page = blank_page();
        let mut data = [0xFFu8; 8];
        LittleEndian::write_u32(&mut data[0..4], 42);
        put_header(&mut page, 0, 1, ITEM_TYPE_U32, 1, "count", data);

        let item = decode_item(&page, 0, NvsVersion::V1, false);
        assert_eq!(item.key, "count");
        assert_eq!(item.item_type, ItemType::U32);
        assert_eq!(item.body, ItemBody::U32(42));
        assert!(item.crc_ok);
        assert!(item.warnings.is_empty());
        assert_eq!(item.slots_used, 1);
    }

    #[test]
    fn decode_string_spanning_slots() {
        let mut page = blank_page();
        let text = "a string that is longer than one thirty-two byte slot";
        let span = put_string(&mut page, 3, "long", text);
        assert_eq!(span, 3);

        let item = decode_item(&page, 3, NvsVersion::V2, false);
        assert_eq!(item.slots_used, 3);
        assert!(item.crc_ok, "warnings: {:?}", item.warnings);
        match item.body {
            ItemBody::Str { text: t, size } => {
                assert_eq!(t, text);
                assert_eq!(size, text.len() + 1);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn payload_flip_keeps_structure() {
        let mut page = blank_page();
        put_string(&mut page, 0, "greeting", "hello");
        page[ENTRY_DATA_OFFSET + ENTRY_SIZE + 1] ^= 0x20;

        let item = decode_item(&page, 0, NvsVersion::V1, false);
        assert!(item.header_crc_ok);
        assert!(!item.crc_ok);
        assert_eq!(item.key, "greeting");
        assert!(item.warnings.iter().any(|w| w.contains("payload CRC")));
        assert!(matches!(item.body, ItemBody::Str { .. }));
    }

    #[test]
    fn span_past_page_end_is_truncated() {
        let mut page = blank_page();
        let mut data = [0xFFu8; 8];
        LittleEndian::write_u16(&mut data[0..2], 64);
        LittleEndian::write_u32(&mut data[4..8], 0);
        // последний слот страницы, span=3
        put_header(&mut page, ENTRY_COUNT - 1, 1, ITEM_TYPE_SZ, 3, "tail", data);

        let item = decode_item(&page, ENTRY_COUNT - 1, NvsVersion::V2, false);
        assert!(!item.crc_ok);
        assert_eq!(item.slots_used, 1);
        assert!(item.warnings.iter().any(|w| w.contains("truncated record")));
    }

    #[test]
    fn blob_index_fields() {
        let mut page = blank_page();
        let mut data = [0xFFu8; 8];
        LittleEndian::write_u32(&mut data[0..4], 5000);
        data[4] = 3;
        data[5] = 128;
        put_header(&mut page, 0, 2, ITEM_TYPE_BLOB_IDX, 1, "fw", data);

        let item = decode_item(&page, 0, NvsVersion::V2, true);
        // strict: запись подписана полным окном — узкое не совпадает
        assert!(!item.header_crc_ok);
        let item = decode_item(&page, 0, NvsVersion::V2, false);
        assert!(item.crc_ok);
        assert_eq!(
            item.body,
            ItemBody::BlobIndex {
                data_size: 5000,
                chunk_count: 3,
                chunk_start: 128
            }
        );
    }

    #[test]
    fn unknown_type_is_preserved() {
        let mut page = blank_page();
        put_header(&mut page, 0, 1, 0x14, 1, "i32", [1, 2, 3, 4, 0xFF, 0xFF, 0xFF, 0xFF]);
        let item = decode_item(&page, 0, NvsVersion::V2, false);
        assert_eq!(item.item_type, ItemType::Unknown(0x14));
        assert!(item.crc_ok);
        match item.body {
            ItemBody::Unknown { type_tag, raw } => {
                assert_eq!(type_tag, 0x14);
                assert_eq!(&raw[..4], &[1, 2, 3, 4]);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn partial_page_header() {
        let mut page = blank_page();
        put_string(&mut page, 0, "s", "hello world");
        let cut = &page[..ENTRY_DATA_OFFSET + ENTRY_SIZE + 4];
        let item = decode_item(cut, 0, NvsVersion::V1, false);
        assert!(!item.crc_ok);
        assert!(item.warnings.iter().any(|w| w.contains("truncated record")));
        assert_eq!(item.key, "s");
    }
}
