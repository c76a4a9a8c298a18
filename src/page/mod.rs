//! page — постраничный уровень формата NVS.
//!
//! Раскладка страницы (4096 байт):
//! - [0..32)    заголовок: state u32, seq u32, version u8, 19 reserved, crc32 u32;
//! - [32..64)   таблица состояний слотов (2 бита на слот);
//! - [64..4096) 126 слотов по 32 байта.
//!
//! Подмодули:
//! - common.rs      — константы/offset'ы, типы item.
//! - checksum.rs    — CRC32 NVS: заголовок страницы, заголовок item, payload.
//! - header.rs      — заголовок страницы, определение версии формата.
//! - entry_state.rs — таблица состояний слотов.

pub mod common;
pub mod checksum;
pub mod header;
pub mod entry_state;

// ---------------- re-exports ----------------

pub use common::{ENTRY_COUNT, ENTRY_DATA_OFFSET, ENTRY_SIZE, PAGE_SIZE};

pub use checksum::{
    item_header_crc32, item_header_crc_ok, item_record_crc32, nvs_crc32, nvs_crc32_range,
    page_header_crc32, payload_crc_ok, ItemCrcCheck,
};

pub use header::{detect_version, read_page_header, NvsVersion, PageHeader, PageState};

pub use entry_state::{state_of, EntryState, EntryStateTable};
