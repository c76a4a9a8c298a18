//! page/checksum — CRC32 формата NVS.
//!
//! Вариант CRC: отражённый полином 0xEDB88320, рабочее значение стартует с 0x00000000,
//! на выходе XOR 0xFFFFFFFF. Это НЕ классический IEEE CRC32 (там старт 0xFFFFFFFF).
//! В терминах crc32fast это Hasher::new_with_initial(0xFFFF_FFFF): hasher хранит
//! уже инвертированное состояние.
//!
//! Два независимых домена проверки:
//! - заголовок item (поля nsIndex..chunkIndex + ключ, опционально data) — item_header_crc_ok;
//! - payload переменной длины (SZ / BLOB_DATA) — payload_crc_ok.
//! Заголовок страницы — отдельная функция page_header_crc32 (байты [4..28)).

use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher as Crc32;

use super::common::{
    ITEM_DATA_SIZE, ITEM_KEY_SIZE, ITEM_OFF_CRC32, ITEM_OFF_DATA, ITEM_OFF_KEY, ITEM_OFF_NS_INDEX,
    PAGE_OFF_CRC32, PAGE_OFF_SEQ,
};

/// Начальное состояние hasher'а, дающее рабочий CRC = 0.
const NVS_CRC_INIT: u32 = 0xFFFF_FFFF;

#[inline]
fn nvs_hasher() -> Crc32 {
    Crc32::new_with_initial(NVS_CRC_INIT)
}

/// CRC32 NVS по всему срезу.
#[inline]
pub fn nvs_crc32(data: &[u8]) -> u32 {
    let mut h = nvs_hasher();
    h.update(data);
    h.finalize()
}

/// CRC32 NVS по окну [start .. start+len), обрезанному по длине буфера.
/// Никогда не паникует: окно за пределами буфера даёт CRC пустого/укороченного среза.
pub fn nvs_crc32_range(data: &[u8], start: usize, len: usize) -> u32 {
    let from = start.min(data.len());
    let to = start.saturating_add(len).min(data.len());
    nvs_crc32(&data[from..to])
}

/// CRC заголовка страницы: seq + version + 19 reserved, т.е. байты [4..28).
#[inline]
pub fn page_header_crc32(header: &[u8]) -> u32 {
    nvs_crc32_range(header, PAGE_OFF_SEQ, PAGE_OFF_CRC32 - PAGE_OFF_SEQ)
}

/// CRC item по узкому окну: байты [0..4) и [8..24) (поля + ключ).
pub fn item_header_crc32(item: &[u8]) -> u32 {
    let mut h = nvs_hasher();
    h.update(&item[ITEM_OFF_NS_INDEX..ITEM_OFF_CRC32]);
    h.update(&item[ITEM_OFF_KEY..ITEM_OFF_KEY + ITEM_KEY_SIZE]);
    h.finalize()
}

/// CRC item по полному окну: всё, кроме поля crc32 — [0..4) и [8..32).
/// Так считают устройства при записи (поле data тоже покрыто).
pub fn item_record_crc32(item: &[u8]) -> u32 {
    let mut h = nvs_hasher();
    h.update(&item[ITEM_OFF_NS_INDEX..ITEM_OFF_CRC32]);
    h.update(&item[ITEM_OFF_KEY..ITEM_OFF_KEY + ITEM_KEY_SIZE]);
    h.update(&item[ITEM_OFF_DATA..ITEM_OFF_DATA + ITEM_DATA_SIZE]);
    h.finalize()
}

/// Сохранённый CRC item (LE u32 по offset 4).
#[inline]
pub fn item_stored_crc32(item: &[u8]) -> u32 {
    LittleEndian::read_u32(&item[ITEM_OFF_CRC32..ITEM_OFF_CRC32 + 4])
}

/// Результат проверки CRC заголовка item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemCrcCheck {
    pub ok: bool,
    pub stored: u32,
    /// Значение по узкому окну (для диагностики).
    pub computed: u32,
}

/// Проверить CRC заголовка item.
/// strict=false: принимается совпадение по узкому ИЛИ полному окну.
/// strict=true: только узкое окно [0..4)+[8..24).
pub fn item_header_crc_ok(item: &[u8], strict: bool) -> ItemCrcCheck {
    let stored = item_stored_crc32(item);
    let narrow = item_header_crc32(item);
    let ok = if stored == narrow {
        true
    } else if strict {
        false
    } else {
        stored == item_record_crc32(item)
    };
    ItemCrcCheck {
        ok,
        stored,
        computed: narrow,
    }
}

/// Проверить CRC payload (SZ / BLOB_DATA).
#[inline]
pub fn payload_crc_ok(payload: &[u8], stored: u32) -> bool {
    nvs_crc32(payload) == stored
}
