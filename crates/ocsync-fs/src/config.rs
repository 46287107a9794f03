//! JSON and JSONC configuration loading and saving

use std::path::Path;

use json_comments::StripComments;
use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result, io};

/// Formats recognised from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    /// JSON with `//` and `/* */` comments
    Jsonc,
}

impl ConfigFormat {
    /// Detect the format from a path's extension.
    pub fn detect(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match extension.as_str() {
            "json" => Ok(Self::Json),
            "jsonc" => Ok(Self::Jsonc),
            _ => Err(Error::UnsupportedFormat { extension }),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Jsonc => "JSONC",
        }
    }
}

/// Configuration store for JSON documents.
///
/// Detects format from the file extension. JSON files are read with comment
/// stripping as well, since hand-edited `.json` configs often carry them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a file.
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let format = ConfigFormat::detect(path)?;
        let content = io::read_text(path)?;
        Self::parse(path, format, &content)
    }

    /// Load configuration, returning `None` when the file does not exist.
    pub fn load_optional<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        if !path.is_file() {
            return Ok(None);
        }
        self.load(path).map(Some)
    }

    /// Save configuration atomically, pretty-printed in the detected format.
    pub fn save<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let format = ConfigFormat::detect(path)?;
        let serialize_err = |message: String| Error::ConfigSerialize {
            path: path.to_path_buf(),
            format: format.label().into(),
            message,
        };

        let mut content =
            serde_json::to_string_pretty(value).map_err(|e| serialize_err(e.to_string()))?;
        if !content.ends_with('\n') {
            content.push('\n');
        }

        io::write_text(path, &content)
    }

    fn parse<T: DeserializeOwned>(path: &Path, format: ConfigFormat, content: &str) -> Result<T> {
        let parse_err = |message: String| Error::ConfigParse {
            path: path.to_path_buf(),
            format: format.label().into(),
            message,
        };

        serde_json::from_reader(StripComments::new(content.as_bytes()))
            .map_err(|e| parse_err(e.to_string()))
    }
}
