//! Base64 `data:` URLs, the self-contained image references used for previews and downloads.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a data URL")]
    MissingScheme,

    #[error("only base64 data URLs are supported")]
    NotBase64,

    #[error("invalid base64 payload: {0}")]
    Payload(String),
}

/// A decoded `data:<mime>;base64,<payload>` URL.
#[derive(Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime: String,
    bytes: Vec<u8>,
}

impl DataUrl {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

// Payloads are large; keep debug output readable.
impl fmt::Debug for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUrl")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

impl FromStr for DataUrl {
    type Err = DataUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("data:").ok_or(DataUrlError::MissingScheme)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingScheme)?;
        let mime = header.strip_suffix(";base64").ok_or(DataUrlError::NotBase64)?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| DataUrlError::Payload(e.to_string()))?;
        Ok(Self::new(mime, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let url = DataUrl::new("image/png", vec![0x89, b'P', b'N', b'G']);
        let text = url.to_string();
        assert_eq!(text, "data:image/png;base64,iVBORw==");
        assert_eq!(text.parse::<DataUrl>().unwrap(), url);
    }

    #[test]
    fn test_rejects_non_base64() {
        assert_eq!(
            "data:text/plain,hello".parse::<DataUrl>(),
            Err(DataUrlError::NotBase64)
        );
        assert_eq!(
            "https://example.com".parse::<DataUrl>(),
            Err(DataUrlError::MissingScheme)
        );
        assert!(matches!(
            "data:image/png;base64,@@@".parse::<DataUrl>(),
            Err(DataUrlError::Payload(_))
        ));
    }
}
