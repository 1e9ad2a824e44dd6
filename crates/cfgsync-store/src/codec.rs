//! Record serialization formats
//!
//! The codec is the only place where a [`Record`] becomes bytes. Stores pick
//! one codec and use it both for their files and for `encode`/`decode`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Record, Result};

/// Serialization format of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// YAML, stored with the `.yml` extension
    #[default]
    #[serde(alias = "yaml")]
    Yml,
    Json,
    Toml,
}

impl Codec {
    /// File extension used for records in this format, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Yml => "yml",
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }

    /// Detect the codec from a file extension.
    pub fn from_extension(extension: &str) -> Result<Self> {
        match extension.to_lowercase().as_str() {
            "yml" | "yaml" => Ok(Self::Yml),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            _ => Err(Error::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Yml => "YAML",
            Self::Json => "JSON",
            Self::Toml => "TOML",
        }
    }

    /// Serialize a record.
    ///
    /// Values the format cannot represent (TOML has no null) produce
    /// [`Error::UnsupportedDataType`].
    pub fn encode(&self, data: &Record) -> Result<Vec<u8>> {
        let unsupported = |message: String| Error::UnsupportedDataType {
            format: self.label().into(),
            message,
        };

        let text = match self {
            Self::Yml => serde_yaml::to_string(data).map_err(|e| unsupported(e.to_string()))?,
            Self::Json => {
                let mut out =
                    serde_json::to_string_pretty(data).map_err(|e| unsupported(e.to_string()))?;
                out.push('\n');
                out
            }
            Self::Toml => toml::to_string_pretty(data).map_err(|e| unsupported(e.to_string()))?,
        };

        Ok(text.into_bytes())
    }

    /// Deserialize a record. Blank input decodes to an empty record.
    pub fn decode(&self, raw: &[u8]) -> Result<Record> {
        let decode_err = |message: String| Error::Decode {
            format: self.label().into(),
            message,
        };

        let text = std::str::from_utf8(raw).map_err(|e| decode_err(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Record::new());
        }

        match self {
            Self::Yml => serde_yaml::from_str(text).map_err(|e| decode_err(e.to_string())),
            Self::Json => serde_json::from_str(text).map_err(|e| decode_err(e.to_string())),
            Self::Toml => toml::from_str(text).map_err(|e| decode_err(e.to_string())),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Codec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s)
    }
}
