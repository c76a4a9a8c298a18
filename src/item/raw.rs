use crate::page::common::{
    ITEM_TYPE_BLOB_DATA, ITEM_TYPE_BLOB_IDX, ITEM_TYPE_SZ, ITEM_TYPE_U32, ITEM_TYPE_U8,
};
use crate::page::NvsVersion;

/// Распознанные типы item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    U8,
    U32,
    Sz,
    BlobData,
    BlobIdx,
    Unknown(u8),
}

impl ItemType {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            ITEM_TYPE_U8 => ItemType::U8,
            ITEM_TYPE_U32 => ItemType::U32,
            ITEM_TYPE_SZ => ItemType::Sz,
            ITEM_TYPE_BLOB_DATA => ItemType::BlobData,
            ITEM_TYPE_BLOB_IDX => ItemType::BlobIdx,
            other => ItemType::Unknown(other),
        }
    }
}

/// Тело item после разбора поля data (+ payload из следующих слотов).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemBody {
    U8(u8),
    U32(u32),
    /// Текст без завершающего NUL; size — заявленная длина payload.
    Str { text: String, size: usize },
    /// Один чанк blob (или весь blob в legacy-формате).
    BlobData { data: Vec<u8>, size: usize },
    BlobIndex { data_size: u32, chunk_count: u8, chunk_start: u8 },
    Unknown { type_tag: u8, raw: [u8; 8] },
}

/// Один разобранный item (слот-заголовок + payload).
#[derive(Debug, Clone)]
pub struct RawItem {
    pub page: usize,
    pub slot: usize,
    /// Версия формата страницы, на которой лежит item.
    pub version: NvsVersion,
    pub ns_index: u8,
    pub item_type: ItemType,
    /// span как на диске.
    pub span: u8,
    /// Сколько слотов пропустить сканеру (>= 1).
    pub slots_used: usize,
    pub chunk_index: u8,
    pub key: String,
    pub header_crc_ok: bool,
    /// Итог: заголовок, payload, границы — всё в порядке.
    pub crc_ok: bool,
    pub warnings: Vec<String>,
    pub body: ItemBody,
}

impl RawItem {
    /// Отметить item как подозрительный.
    pub fn flag(&mut self, warning: impl Into<String>) {
        self.crc_ok = false;
        self.warnings.push(warning.into());
    }

    /// Позиция для порядка «последняя запись побеждает».
    #[inline]
    pub fn location(&self) -> (usize, usize) {
        (self.page, self.slot)
    }
}
