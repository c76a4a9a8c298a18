use thiserror::Error;

/// Фатальные ошибки разбора. Всё остальное (CRC, обрезанные записи, пропущенные
/// страницы) деградирует до предупреждений в результате.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NvsError {
    #[error("unrecognized NVS format version byte 0x{version_byte:02X} (expected 0xFF or 0xFE)")]
    UnrecognizedFormat { version_byte: u8 },

    #[error("image too small to hold a page header: {len} byte(s)")]
    ImageTooSmall { len: usize },
}

pub type Result<T> = std::result::Result<T, NvsError>;
