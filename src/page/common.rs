//! page/common — константы и offset'ы формата NVS (страница 4096 байт, слоты по 32 байта).

// ---------- Страница ----------

/// Размер страницы NVS (один сектор flash).
pub const PAGE_SIZE: usize = 4096;

/// Размер заголовка страницы.
pub const PAGE_HDR_SIZE: usize = 32;

/// Размер слота данных (и одного item).
pub const ENTRY_SIZE: usize = 32;

/// Начало таблицы состояний слотов (bitmap).
pub const ENTRY_TABLE_OFFSET: usize = 32;

/// Размер таблицы состояний: 8 слов u32 LE.
pub const ENTRY_TABLE_SIZE: usize = 32;

/// Число u32-слов в таблице состояний.
pub const ENTRY_TABLE_WORDS: usize = ENTRY_TABLE_SIZE / 4;

/// Начало области данных.
pub const ENTRY_DATA_OFFSET: usize = ENTRY_TABLE_OFFSET + ENTRY_TABLE_SIZE;

/// Максимальное число слотов на странице: (4096 - 64) / 32.
pub const ENTRY_COUNT: usize = (PAGE_SIZE - ENTRY_DATA_OFFSET) / ENTRY_SIZE;

// ---------- Offsets заголовка страницы ----------
/// state (u32): маркер состояния страницы.
pub const PAGE_OFF_STATE: usize = 0;
/// seq (u32): монотонный номер страницы.
pub const PAGE_OFF_SEQ: usize = 4;
/// version (u8): 0xFF — legacy, 0xFE — current.
pub const PAGE_OFF_VERSION: usize = 8;
/// crc32 (u32) по байтам [4..28).
pub const PAGE_OFF_CRC32: usize = 28;

// ---------- Маркеры версии формата ----------
pub const VERSION_MARKER_V1: u8 = 0xFF;
pub const VERSION_MARKER_V2: u8 = 0xFE;

// ---------- Состояния страницы ----------
pub const PAGE_STATE_UNINITIALIZED: u32 = 0xFFFF_FFFF;
pub const PAGE_STATE_ACTIVE: u32 = 0xFFFF_FFFE;
pub const PAGE_STATE_FULL: u32 = 0xFFFF_FFFC;
pub const PAGE_STATE_FREEING: u32 = 0xFFFF_FFF8;
pub const PAGE_STATE_CORRUPT: u32 = 0xFFFF_FFF0;
pub const PAGE_STATE_INVALID: u32 = 0;

// ---------- Item (32 байта) ----------
pub const ITEM_OFF_NS_INDEX: usize = 0;
pub const ITEM_OFF_TYPE: usize = 1;
pub const ITEM_OFF_SPAN: usize = 2;
pub const ITEM_OFF_CHUNK_INDEX: usize = 3;
pub const ITEM_OFF_CRC32: usize = 4;
pub const ITEM_OFF_KEY: usize = 8;
pub const ITEM_OFF_DATA: usize = 24;

/// Длина поля ключа (с завершающим NUL, до 15 полезных символов).
pub const ITEM_KEY_SIZE: usize = 16;
/// Длина поля данных.
pub const ITEM_DATA_SIZE: usize = 8;

// Поля data для SZ / BLOB_DATA: [size u16][reserved u16][data_crc32 u32]
pub const VAR_OFF_SIZE: usize = ITEM_OFF_DATA;
pub const VAR_OFF_DATA_CRC32: usize = ITEM_OFF_DATA + 4;

// Поля data для BLOB_IDX: [data_size u32][chunk_count u8][chunk_start u8][reserved u16]
pub const BLOB_IDX_OFF_SIZE: usize = ITEM_OFF_DATA;
pub const BLOB_IDX_OFF_CHUNK_COUNT: usize = ITEM_OFF_DATA + 4;
pub const BLOB_IDX_OFF_CHUNK_START: usize = ITEM_OFF_DATA + 5;

/// chunkIndex == 0xFF: «не чанк» (legacy) или индексный item (current).
pub const CHUNK_ANY: u8 = 0xFF;

/// nsIndex == 0 зарезервирован под определения namespace.
pub const NS_INDEX_DEFINITIONS: u8 = 0;

// ---------- Типы item ----------
pub const ITEM_TYPE_U8: u8 = 0x01;
pub const ITEM_TYPE_U32: u8 = 0x04;
pub const ITEM_TYPE_SZ: u8 = 0x21;
pub const ITEM_TYPE_BLOB_DATA: u8 = 0x42;
pub const ITEM_TYPE_BLOB_IDX: u8 = 0x48;
