//! Core data types flowing through the bridge.
//!
//! Provider rows come out of the configuration store as [`ProviderRecord`]s
//! and leave as [`ProviderDescriptor`]s. Attachments arrive as loosely typed
//! JSON, are read into [`AttachmentDescriptor`]s, and leave as
//! [`ContentBlock`]s.

use serde::Serialize;
use serde_json::{Map, Value};

/// Value of [`ProviderDescriptor::source`] for every descriptor we emit.
pub const PROVIDER_SOURCE: &str = "external-store";

/// Raw row from the configuration store: column name to scalar value.
pub type ProviderRecord = Map<String, Value>;

/// Rows returned by a store query together with the column names.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub rows: Vec<ProviderRecord>,
}

/// Canonical provider description handed to the host.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    pub id: String,
    pub name: String,
    pub source: &'static str,
    pub settings: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Value>,
}

/// A user-submitted attachment. Every field may be missing on the wire.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl AttachmentDescriptor {
    /// Read an attachment from arbitrary JSON.
    ///
    /// Fields that are not strings count as missing; a non-object value
    /// yields a descriptor with every field missing.
    pub fn from_value(value: &Value) -> Self {
        let field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Self {
            file_name: field("fileName"),
            media_type: field("mediaType"),
            data: field("data"),
        }
    }
}

/// Base64 image payload of an image block.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ImageSource {
    Base64 { media_type: String, data: String },
}

/// One unit of a structured user message sent to the backend.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Image { source: ImageSource },
    Text { text: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn image(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        ContentBlock::Image {
            source: ImageSource::Base64 {
                media_type: media_type.into(),
                data: data.into(),
            },
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentBlock::Image { .. })
    }
}

/// `{ success: true, providers, count }`
#[derive(Debug, Serialize)]
pub struct ProvidersEnvelope {
    pub success: bool,
    pub providers: Vec<ProviderDescriptor>,
    pub count: usize,
}

impl ProvidersEnvelope {
    pub fn new(providers: Vec<ProviderDescriptor>) -> Self {
        Self {
            success: true,
            count: providers.len(),
            providers,
        }
    }
}

/// `{ success: true, blocks, count }`
#[derive(Debug, Serialize)]
pub struct BlocksEnvelope {
    pub success: bool,
    pub blocks: Vec<ContentBlock>,
    pub count: usize,
}

impl BlocksEnvelope {
    pub fn new(blocks: Vec<ContentBlock>) -> Self {
        Self {
            success: true,
            count: blocks.len(),
            blocks,
        }
    }
}

/// `{ success: false, error, stack? }`
#[derive(Debug, Serialize)]
pub struct FailureEnvelope {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl From<&crate::error::BridgeError> for FailureEnvelope {
    fn from(err: &crate::error::BridgeError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            stack: err.stack(),
        }
    }
}
