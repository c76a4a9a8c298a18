//! nvsdump — декодер образов разделов NVS (append-only key/value хранилище во flash).
//!
//! Вход — байты раздела (дамп с устройства или файл), выход — namespaces, ключи,
//! типизированные значения и статус целостности каждой записи. Порча данных не
//! прерывает разбор: записи помечаются crc_ok=false с предупреждениями.

// Формат: страницы, CRC, таблица состояний
pub mod page;   // src/page/{mod,common,checksum,header,entry_state}.rs
pub mod item;   // src/item/{mod,raw,decode}.rs

// Агрегация
pub mod namespace;
pub mod blob;
pub mod parser;

pub mod model;
pub mod config;
pub mod error;

// Удобные реэкспорты
pub use config::{NvsConfig, NvsConfigBuilder};
pub use error::{NvsError, Result};
pub use model::{EntryType, EntryValue, Namespace, PageSummary, ParsedEntry, PartitionParseResult};
pub use page::{detect_version, NvsVersion};
pub use parser::{parse_partition, parse_partition_with, PartitionParser};
