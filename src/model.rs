//! model — результат разбора раздела: namespaces, записи, сводка по страницам.
//!
//! Все типы сериализуются через serde (CLI печатает их как JSON).

use serde::Serialize;

use crate::item::{ItemBody, RawItem};
use crate::page::{NvsVersion, PageState};

/// Пространство имён: id (из nsIndex) → имя.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Namespace {
    pub id: u8,
    pub name: String,
}

/// Тип значения записи.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    U8,
    U32,
    String,
    Blob,
    Unknown,
}

impl EntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::U8 => "u8",
            EntryType::U32 => "u32",
            EntryType::String => "string",
            EntryType::Blob => "blob",
            EntryType::Unknown => "unknown",
        }
    }
}

/// Значение записи.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EntryValue {
    U8(u8),
    U32(u32),
    Text(String),
    Bytes(Vec<u8>),
    Unknown { type_tag: u8, raw: Vec<u8> },
}

/// Одна запись раздела.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedEntry {
    pub namespace: String,
    pub ns_index: u8,
    pub key: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub value: EntryValue,
    /// Для string — заявленная длина payload (с NUL), для blob — число байт значения.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    pub crc_ok: bool,
    pub warnings: Vec<String>,
    /// Страница и слот заголовка (для blob — слот BLOB_IDX).
    pub page: usize,
    pub slot: usize,
    /// Запись из слота в состоянии Erased (только при include_erased).
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub erased: bool,
}

impl ParsedEntry {
    /// Запись из «обычного» item (U8/U32/SZ/unknown). namespace заполняется позже.
    pub fn from_item(item: RawItem) -> Self {
        let (entry_type, value, length) = match item.body {
            ItemBody::U8(v) => (EntryType::U8, EntryValue::U8(v), None),
            ItemBody::U32(v) => (EntryType::U32, EntryValue::U32(v), None),
            ItemBody::Str { text, size } => (EntryType::String, EntryValue::Text(text), Some(size)),
            ItemBody::BlobData { data, .. } => {
                let n = data.len();
                (EntryType::Blob, EntryValue::Bytes(data), Some(n))
            }
            ItemBody::BlobIndex {
                data_size,
                chunk_count,
                chunk_start,
            } => {
                // Индекс сам по себе значением не является; сюда попадает только стёртый.
                let mut raw = data_size.to_le_bytes().to_vec();
                raw.push(chunk_count);
                raw.push(chunk_start);
                (
                    EntryType::Unknown,
                    EntryValue::Unknown {
                        type_tag: crate::page::common::ITEM_TYPE_BLOB_IDX,
                        raw,
                    },
                    None,
                )
            }
            ItemBody::Unknown { type_tag, raw } => (
                EntryType::Unknown,
                EntryValue::Unknown {
                    type_tag,
                    raw: raw.to_vec(),
                },
                None,
            ),
        };
        ParsedEntry {
            namespace: String::new(),
            ns_index: item.ns_index,
            key: item.key,
            entry_type,
            value,
            length,
            crc_ok: item.crc_ok,
            warnings: item.warnings,
            page: item.page,
            slot: item.slot,
            erased: false,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self.value {
            EntryValue::U8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self.value {
            EntryValue::U32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            EntryValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.value {
            EntryValue::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    #[inline]
    pub fn location(&self) -> (usize, usize) {
        (self.page, self.slot)
    }
}

/// Сводка по одной странице образа.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    pub index: usize,
    pub offset: usize,
    pub seq: u32,
    pub state: PageState,
    pub version_byte: u8,
    pub header_crc_ok: bool,
    pub written: usize,
    pub erased: usize,
    /// Страница не сканировалась (нераспознанная версия, нет заголовка).
    pub skipped: bool,
    pub warnings: Vec<String>,
}

/// Результат разбора раздела. Создаётся заново на каждый вызов, после возврата не меняется.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionParseResult {
    pub version: NvsVersion,
    pub namespaces: Vec<Namespace>,
    pub entries: Vec<ParsedEntry>,
    pub pages: Vec<PageSummary>,
}

impl PartitionParseResult {
    /// Найти запись по (namespace, key).
    pub fn find(&self, namespace: &str, key: &str) -> Option<&ParsedEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| !e.erased && e.namespace == namespace && e.key == key)
    }

    pub fn entries_in<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a ParsedEntry> + 'a {
        self.entries.iter().filter(move |e| e.namespace == namespace)
    }

    pub fn corrupt_entries(&self) -> impl Iterator<Item = &ParsedEntry> {
        self.entries.iter().filter(|e| !e.crc_ok)
    }
}
