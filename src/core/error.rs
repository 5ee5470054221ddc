use thiserror::Error;

/// Load-time and programmer errors.
///
/// Expected business conditions never travel through this type; they are
/// reported through the per-operation outcome enums.
#[derive(Error, Debug)]
pub enum FrontierError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Snapshot version {found} is newer than supported version {supported}")]
    UnsupportedSnapshot { found: u32, supported: u32 },

    #[error("Store is not empty; snapshots load into an empty store only")]
    StoreNotEmpty,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Errors raised while reading or validating configuration files
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Upgrade tier {level} of track {track} is out of order")]
    TierOrder { track: String, level: u32 },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrontierError>;
