use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Where a payload came from, which decides how it travels on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadOrigin {
    /// A file chosen by the user; sent as a multipart file part.
    Upload,
    /// A camera frame; sent as a data URI form field.
    Capture,
}

/// Encoded, size-bounded image bytes ready to be submitted once.
#[derive(Clone, Debug)]
pub struct PreparedPayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub origin: PayloadOrigin,
    pub file_name: String,
    /// False when the source bytes were passed through untouched.
    pub reencoded: bool,
}

impl PreparedPayload {
    /// The same content as a displayable `data:` URI.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
