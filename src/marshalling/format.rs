//! Wire formats and deserialization policies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Serialization format of a request or response body.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Xml,
}

impl Format {
    /// Value for `Content-Type` and `Accept` headers.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }

    /// Detects the format from a `Content-Type` header value.
    ///
    /// Parameters such as `charset` are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use cloudcafe::marshalling::Format;
    ///
    /// assert_eq!(Format::from_content_type("application/json; charset=UTF-8"), Some(Format::Json));
    /// assert_eq!(Format::from_content_type("text/xml"), Some(Format::Xml));
    /// assert_eq!(Format::from_content_type("text/plain"), None);
    /// ```
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "application/json" => Some(Self::Json),
            "application/xml" | "text/xml" => Some(Self::Xml),
            _ if mime.ends_with("+json") => Some(Self::Json),
            _ if mime.ends_with("+xml") => Some(Self::Xml),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Xml => write!(f, "xml"),
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            other => Err(format!("Unknown format '{}' (expected json or xml)", other)),
        }
    }
}

/// How strictly a body must match its model when deserializing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeserializePolicy {
    /// Unexpected or missing required fields yield no object
    #[default]
    Strict,
    /// Unknown fields are ignored
    Relaxed,
}

impl FromStr for DeserializePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "relaxed" => Ok(Self::Relaxed),
            other => Err(format!(
                "Unknown deserialize policy '{}' (expected strict or relaxed)",
                other
            )),
        }
    }
}
