//! Centralized configuration for the NVS decoder.
//!
//! Goals:
//! - Single place for decoder tunables instead of ad-hoc flags.
//! - NvsConfig::default() keeps the decoder a pure function of its input bytes;
//!   NvsConfig::from_env() is for binaries (reads NVS_* env vars).
//! - NvsConfigBuilder for fluent construction.
//!
//! Tunables:
//! - keep_duplicates (ENV NVS_KEEP_DUPLICATES) — disable last-write-wins, keep every write of a key.
//! - include_erased (ENV NVS_INCLUDE_ERASED) — also decode slots marked Erased (forensics).
//! - strict_item_crc (ENV NVS_STRICT_ITEM_CRC) — item header CRC must match the narrow
//!   window (bytes 0..4 + 8..24) only.
//! - prefer_crc_valid (ENV NVS_PREFER_CRC_VALID) — a later write that fails its checks does not
//!   replace an earlier intact write of the same key.

use std::fmt;

#[inline]
fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        let s = v.trim().to_ascii_lowercase();
        s == "1" || s == "true" || s == "yes" || s == "on"
    })
}

/// Decoder configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NvsConfig {
    /// Keep every write of a (namespace, key) instead of the last one.
    /// Env: NVS_KEEP_DUPLICATES (default false)
    pub keep_duplicates: bool,

    /// Decode Erased slots too; such entries carry an "erased entry" warning.
    /// Env: NVS_INCLUDE_ERASED (default false)
    pub include_erased: bool,

    /// Accept only the narrow item header CRC window.
    /// Env: NVS_STRICT_ITEM_CRC (default false)
    pub strict_item_crc: bool,

    /// Last-write-wins skips later writes with crc_ok=false when an intact one exists.
    /// Env: NVS_PREFER_CRC_VALID (default false)
    pub prefer_crc_valid: bool,
}

impl NvsConfig {
    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(on) = env_flag("NVS_KEEP_DUPLICATES") {
            cfg.keep_duplicates = on;
        }
        if let Some(on) = env_flag("NVS_INCLUDE_ERASED") {
            cfg.include_erased = on;
        }
        if let Some(on) = env_flag("NVS_STRICT_ITEM_CRC") {
            cfg.strict_item_crc = on;
        }
        if let Some(on) = env_flag("NVS_PREFER_CRC_VALID") {
            cfg.prefer_crc_valid = on;
        }

        cfg
    }

    pub fn builder() -> NvsConfigBuilder {
        NvsConfigBuilder::new()
    }

    pub fn with_keep_duplicates(mut self, on: bool) -> Self {
        self.keep_duplicates = on;
        self
    }

    pub fn with_include_erased(mut self, on: bool) -> Self {
        self.include_erased = on;
        self
    }

    pub fn with_strict_item_crc(mut self, on: bool) -> Self {
        self.strict_item_crc = on;
        self
    }

    pub fn with_prefer_crc_valid(mut self, on: bool) -> Self {
        self.prefer_crc_valid = on;
        self
    }
}

impl fmt::Display for NvsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NvsConfig {{ keep_duplicates: {}, include_erased: {}, strict_item_crc: {}, prefer_crc_valid: {} }}",
            self.keep_duplicates, self.include_erased, self.strict_item_crc, self.prefer_crc_valid
        )
    }
}

/// Lightweight builder that produces an NvsConfig.
#[derive(Clone, Debug, Default)]
pub struct NvsConfigBuilder {
    cfg: NvsConfig,
}

impl NvsConfigBuilder {
    /// Start from a clean default (without reading env).
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from env, then allow overrides.
    pub fn from_env() -> Self {
        Self {
            cfg: NvsConfig::from_env(),
        }
    }

    pub fn keep_duplicates(mut self, on: bool) -> Self {
        self.cfg.keep_duplicates = on;
        self
    }

    pub fn include_erased(mut self, on: bool) -> Self {
        self.cfg.include_erased = on;
        self
    }

    pub fn strict_item_crc(mut self, on: bool) -> Self {
        self.cfg.strict_item_crc = on;
        self
    }

    pub fn prefer_crc_valid(mut self, on: bool) -> Self {
        self.cfg.prefer_crc_valid = on;
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> NvsConfig {
        self.cfg
    }
}
