//! item — разбор записей (item) NVS:
//! - raw.rs    — RawItem / ItemType / ItemBody;
//! - decode.rs — разбор одного слота-заголовка и его payload.

pub mod raw;
pub mod decode;

pub use decode::decode_item;
pub use raw::{ItemBody, ItemType, RawItem};
