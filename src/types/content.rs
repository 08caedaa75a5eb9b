//! Message content types

use std::path::Path;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Message content: plain text or a list of multimodal parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// All text carried by this content, parts concatenated in order.
    pub fn all_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// The text if this content is a single text block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Parts(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Parts(parts) => parts.is_empty(),
        }
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// One block inside a multimodal message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ContentPart {
    Text {
        text: String,
    },
    Image {
        source: MediaSource,
        /// MIME type for base64 sources, e.g. `image/jpeg`
        mime_type: Option<String>,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// An image fetched by the provider from a public URL.
    pub fn image_url(url: impl Into<String>) -> Self {
        Self::Image {
            source: MediaSource::Url { url: url.into() },
            mime_type: None,
        }
    }

    /// An image embedded as base64 data.
    pub fn image_base64(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::Image {
            source: MediaSource::Base64 { data: data.into() },
            mime_type: Some(mime_type.into()),
        }
    }

    /// Read an image file and embed it as base64, guessing the MIME type
    /// from the extension.
    pub async fn from_image_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ProviderError::InvalidRequest(format!("cannot read image {}: {e}", path.display()))
        })?;
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "image/jpeg".to_string());
        let data = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(Self::Image {
            source: MediaSource::Base64 { data },
            mime_type: Some(mime_type),
        })
    }
}

/// Where image bytes come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MediaSource {
    Url { url: String },
    Base64 { data: String },
}
