//! Attachment encoding into the transport's inline binary form.

use crate::error::ReportError;
use crate::types::Attachment;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

/// Base64 payload plus its declared media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedAttachment {
    pub media_type: String,
    pub data: String,
}

pub trait AttachmentEncoder: Send + Sync {
    fn encode(&self, attachment: &Attachment) -> Result<EncodedAttachment, ReportError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Base64AttachmentEncoder;

impl AttachmentEncoder for Base64AttachmentEncoder {
    fn encode(&self, attachment: &Attachment) -> Result<EncodedAttachment, ReportError> {
        if attachment.bytes.is_empty() {
            return Err(ReportError::AttachmentEncoding {
                file_name: attachment.file_name.clone(),
                reason: "attachment is empty".to_string(),
            });
        }
        let media_type = attachment
            .media_type
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&attachment.file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });
        Ok(EncodedAttachment {
            media_type,
            data: BASE64.encode(&attachment.bytes),
        })
    }
}
