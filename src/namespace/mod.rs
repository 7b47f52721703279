//! Namespace identity and document format.
//!
//! A namespace is an independently versioned configuration set. Its format
//! is fixed for its lifetime and derived from the name's suffix:
//! `redis.json` is a JSON document, `application` is a properties set.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::CONTENT_KEY;


/// Document format of a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    /// Flat key/value pairs
    #[default]
    Properties,
    Json,
    Xml,
    Yaml,
    Yml,
}

impl ConfigFormat {
    /// Whether keys address individual settings. Every other format stores
    /// the whole document under [`CONTENT_KEY`].
    pub fn is_key_value(self) -> bool {
        self == ConfigFormat::Properties
    }

    fn from_extension(ext: &str) -> Self {
        match ext {
            "json" => ConfigFormat::Json,
            "xml" => ConfigFormat::Xml,
            "yaml" => ConfigFormat::Yaml,
            "yml" => ConfigFormat::Yml,
            _ => ConfigFormat::Properties,
        }
    }
}

/// Registered namespace name with its derived format
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    name: String,
    format: ConfigFormat,
}

impl Namespace {
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref().trim().to_string();
        let format = Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(ConfigFormat::from_extension)
            .unwrap_or_default();
        Self { name, format }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }

    /// Key to read for `key` in this namespace.
    pub fn lookup_key<'a>(
        &self,
        key: &'a str,
    ) -> &'a str {
        if self.format.is_key_value() {
            key
        } else {
            CONTENT_KEY
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.name
    }
}
