//! Content block construction for the user turn.
//!
//! Images become base64 image blocks, anything else becomes a short text
//! marker naming the file, and the user's message always comes last.

use crate::attachments::{payload_message, resolve_attachments};
use crate::channel;
use crate::config::ChannelConfig;
use crate::models::{AttachmentDescriptor, BlocksEnvelope, ContentBlock};

const IMAGE_PREFIX: &str = "image/";
pub const DEFAULT_IMAGE_MEDIA_TYPE: &str = "image/png";
pub const DEFAULT_ATTACHMENT_NAME: &str = "Attachment";

/// Build `attachments.len() + 1` blocks: one per attachment, in order,
/// followed by the message text (synthesized when blank).
pub fn build_content_blocks(attachments: &[AttachmentDescriptor], message: &str) -> Vec<ContentBlock> {
    let mut blocks: Vec<ContentBlock> = attachments.iter().map(attachment_block).collect();

    let text = if message.trim().is_empty() {
        fallback_message(&blocks)
    } else {
        message.to_string()
    };
    blocks.push(ContentBlock::text(text));
    blocks
}

fn attachment_block(attachment: &AttachmentDescriptor) -> ContentBlock {
    let media_type = attachment.media_type.as_deref().unwrap_or("");
    if let Some(subtype) = media_type.strip_prefix(IMAGE_PREFIX) {
        let media_type = if subtype.is_empty() {
            DEFAULT_IMAGE_MEDIA_TYPE
        } else {
            media_type
        };
        return ContentBlock::image(media_type, attachment.data.clone().unwrap_or_default());
    }

    let name = attachment
        .file_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_ATTACHMENT_NAME);
    ContentBlock::text(format!("[Attachment: {}]", name))
}

fn fallback_message(blocks: &[ContentBlock]) -> String {
    let images = blocks.iter().filter(|b| b.is_image()).count();
    if images > 0 {
        format!("[Uploaded {} image(s)]", images)
    } else if !blocks.is_empty() {
        "[Uploaded attachment(s)]".to_string()
    } else {
        "[Empty message]".to_string()
    }
}

/// The `attachments` command: read the channel, resolve attachments, and
/// build the content blocks.
///
/// A non-blank `message` wins over the payload's `message` field.
pub async fn run_attachments(config: &ChannelConfig, message: Option<&str>) -> BlocksEnvelope {
    let payload = channel::read_stdin(config).await.into_payload();
    collect_blocks(payload.as_ref(), config, message)
}

/// Everything after the channel read, split out so it can run without stdin.
pub fn collect_blocks(
    payload: Option<&serde_json::Value>,
    config: &ChannelConfig,
    message: Option<&str>,
) -> BlocksEnvelope {
    let attachments = resolve_attachments(payload, config.fallback_file.as_deref());
    let message = message
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
        .or_else(|| payload_message(payload))
        .unwrap_or_default();
    tracing::debug!(attachments = attachments.len(), "building content blocks");
    BlocksEnvelope::new(build_content_blocks(&attachments, &message))
}
