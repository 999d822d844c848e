//! Files uploaded with `metaWeblog.newMediaObject`.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::xmlrpc::encoding::{Struct, Value};

/// Sent when the extension is not recognised.
pub const UNKNOWN_MIME_TYPE: &str = "unknown/unknown";

static MIME_TYPES: &[(&str, &str)] = &[
    ("bmp", "image/bmp"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("doc", "application/msword"),
    ("gif", "image/gif"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("ico", "image/vnd.microsoft.icon"),
    ("jpe", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("m4a", "audio/mp4"),
    ("mov", "video/quicktime"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("mpeg", "video/mpeg"),
    ("mpg", "video/mpeg"),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("ogg", "audio/ogg"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("ppt", "application/vnd.ms-powerpoint"),
    ("svg", "image/svg+xml"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("txt", "text/plain"),
    ("wav", "audio/x-wav"),
    ("webm", "video/webm"),
    ("webp", "image/webp"),
    ("xls", "application/vnd.ms-excel"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
];

/// Guesses a MIME type from the file extension, ignoring case.
pub fn mime_type_for(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .and_then(|ext| MIME_TYPES.iter().find(|&&(known, _)| known == ext))
        .map_or(UNKNOWN_MIME_TYPE, |&(_, mime)| mime)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaObject {
    /// Base name of the file, as stored on the server.
    pub name: String,
    pub mime_type: String,
    pub bits: Vec<u8>,
}

impl MediaObject {
    pub fn from_path(path: &Path) -> Result<MediaObject> {
        let bits = fs::read(path)?;
        let name = path.file_name().map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        Ok(MediaObject { name, mime_type: mime_type_for(path).to_string(), bits })
    }

    /// The `{name, type, bits}` struct; `bits` travels as base64.
    pub fn to_value(&self) -> Value {
        let mut members = Struct::new();
        members.insert("name".to_string(), Value::from(&self.name));
        members.insert("type".to_string(), Value::from(&self.mime_type));
        members.insert("bits".to_string(), Value::Base64(self.bits.clone()));
        Value::Struct(members)
    }
}
