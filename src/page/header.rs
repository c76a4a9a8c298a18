use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;
use std::fmt;

use super::checksum::page_header_crc32;
use super::common::{
    PAGE_HDR_SIZE, PAGE_OFF_CRC32, PAGE_OFF_SEQ, PAGE_OFF_STATE, PAGE_OFF_VERSION,
    PAGE_STATE_ACTIVE, PAGE_STATE_CORRUPT, PAGE_STATE_FREEING, PAGE_STATE_FULL,
    PAGE_STATE_INVALID, PAGE_STATE_UNINITIALIZED, VERSION_MARKER_V1, VERSION_MARKER_V2,
};
use crate::error::{NvsError, Result};

/// Поколение формата NVS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NvsVersion {
    /// 0xFF: chunkIndex не используется, строки/blob — одним куском.
    V1,
    /// 0xFE: chunkIndex значим, blob разбит на BLOB_IDX + BLOB_DATA.
    V2,
}

impl NvsVersion {
    /// Классифицировать байт версии. None — байт не распознан.
    pub fn from_marker(b: u8) -> Option<Self> {
        match b {
            VERSION_MARKER_V1 => Some(NvsVersion::V1),
            VERSION_MARKER_V2 => Some(NvsVersion::V2),
            _ => None,
        }
    }

    pub fn marker(self) -> u8 {
        match self {
            NvsVersion::V1 => VERSION_MARKER_V1,
            NvsVersion::V2 => VERSION_MARKER_V2,
        }
    }

    /// Числовой номер (1 | 2), как в отчётах.
    pub fn number(self) -> u8 {
        match self {
            NvsVersion::V1 => 1,
            NvsVersion::V2 => 2,
        }
    }
}

impl Serialize for NvsVersion {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_u8(self.number())
    }
}

impl fmt::Display for NvsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Определить версию формата по байту 8 заголовка первой страницы.
/// Единственная ситуация, когда разбор целиком отказывается работать.
pub fn detect_version(image: &[u8]) -> Result<NvsVersion> {
    if image.len() <= PAGE_OFF_VERSION {
        return Err(NvsError::ImageTooSmall { len: image.len() });
    }
    let b = image[PAGE_OFF_VERSION];
    NvsVersion::from_marker(b).ok_or(NvsError::UnrecognizedFormat { version_byte: b })
}

/// Маркер состояния страницы (байты 0..4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    Uninitialized,
    Active,
    Full,
    Freeing,
    Corrupt,
    Invalid,
    Other(u32),
}

impl PageState {
    pub fn from_raw(v: u32) -> Self {
        match v {
            PAGE_STATE_UNINITIALIZED => PageState::Uninitialized,
            PAGE_STATE_ACTIVE => PageState::Active,
            PAGE_STATE_FULL => PageState::Full,
            PAGE_STATE_FREEING => PageState::Freeing,
            PAGE_STATE_CORRUPT => PageState::Corrupt,
            PAGE_STATE_INVALID => PageState::Invalid,
            other => PageState::Other(other),
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageState::Uninitialized => write!(f, "uninitialized"),
            PageState::Active => write!(f, "active"),
            PageState::Full => write!(f, "full"),
            PageState::Freeing => write!(f, "freeing"),
            PageState::Corrupt => write!(f, "corrupt"),
            PageState::Invalid => write!(f, "invalid"),
            PageState::Other(v) => write!(f, "0x{:08x}", v),
        }
    }
}

/// Заголовок страницы NVS (32 байта).
#[derive(Debug, Clone)]
pub struct PageHeader {
    pub state: PageState,
    pub seq: u32,
    pub version_byte: u8,
    pub stored_crc: u32,
    pub computed_crc: u32,
    /// Несовпадение CRC — только флаг, записи страницы всё равно читаются.
    pub header_crc_ok: bool,
}

impl PageHeader {
    /// Поколение формата этой страницы (None — байт не распознан).
    pub fn version(&self) -> Option<NvsVersion> {
        NvsVersion::from_marker(self.version_byte)
    }
}

/// Прочитать заголовок страницы. None — буфер короче 32 байт.
pub fn read_page_header(page: &[u8]) -> Option<PageHeader> {
    if page.len() < PAGE_HDR_SIZE {
        return None;
    }
    let state = PageState::from_raw(LittleEndian::read_u32(
        &page[PAGE_OFF_STATE..PAGE_OFF_STATE + 4],
    ));
    let seq = LittleEndian::read_u32(&page[PAGE_OFF_SEQ..PAGE_OFF_SEQ + 4]);
    let version_byte = page[PAGE_OFF_VERSION];
    let stored_crc = LittleEndian::read_u32(&page[PAGE_OFF_CRC32..PAGE_OFF_CRC32 + 4]);
    let computed_crc = page_header_crc32(page);

    Some(PageHeader {
        state,
        seq,
        version_byte,
        stored_crc,
        computed_crc,
        header_crc_ok: stored_crc == computed_crc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(seq: u32, version: u8) -> Vec<u8> {
        let mut p = vec![0xFFu8; 64];
        LittleEndian::write_u32(&mut p[0..4], PAGE_STATE_ACTIVE);
        LittleEndian::write_u32(&mut p[4..8], seq);
        p[8] = version;
        let crc = page_header_crc32(&p);
        LittleEndian::write_u32(&mut p[28..32], crc);
        p
    }

    #[test]
    fn detect_versions() {
        assert_eq!(detect_version(&header(1, 0xFF)).unwrap(), NvsVersion::V1);
        assert_eq!(detect_version(&header(1, 0xFE)).unwrap(), NvsVersion::V2);
        assert_eq!(
            detect_version(&header(1, 0x01)),
            Err(NvsError::UnrecognizedFormat { version_byte: 0x01 })
        );
        assert_eq!(
            detect_version(&[0xFF; 4]),
            Err(NvsError::ImageTooSmall { len: 4 })
        );
    }

    #[test]
    fn read_header_fields_and_crc() {
        let mut p = header(7, 0xFE);
        let h = read_page_header(&p).unwrap();
        assert_eq!(h.state, PageState::Active);
        assert_eq!(h.seq, 7);
        assert_eq!(h.version(), Some(NvsVersion::V2));
        assert!(h.header_crc_ok);

        // reserved покрыт CRC
        p[20] ^= 0x10;
        let h = read_page_header(&p).unwrap();
        assert!(!h.header_crc_ok);

        // state не покрыт
        let mut p = header(7, 0xFE);
        LittleEndian::write_u32(&mut p[0..4], PAGE_STATE_FULL);
        let h = read_page_header(&p).unwrap();
        assert_eq!(h.state, PageState::Full);
        assert!(h.header_crc_ok);
    }

    #[test]
    fn short_buffer_has_no_header() {
        assert!(read_page_header(&[0u8; 31]).is_none());
    }
}
