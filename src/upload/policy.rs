use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::UploadConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPolicy {
    /// Multipart field carrying the file
    #[serde(rename = "fieldName")]
    pub field_name: String,
    /// Allowed MIME types; `type/*` matches any subtype
    #[serde(rename = "acceptedTypes")]
    pub accepted_types: Vec<String>,
    /// Size cap in bytes
    #[serde(rename = "maxSize")]
    pub max_size: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("file type {mime} is not allowed (accepted: {accepted})")]
    UnsupportedType { mime: String, accepted: String },

    #[error("file is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("file is empty")]
    Empty,
}

impl From<&UploadConfig> for UploadPolicy {
    fn from(config: &UploadConfig) -> Self {
        Self {
            field_name: config.field_name.clone(),
            accepted_types: config.accepted_types.clone(),
            max_size: config.max_file_size,
        }
    }
}

/// Lowercase and strip parameters: `Text/Plain; charset=utf-8` → `text/plain`
pub fn normalize_mime(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

impl UploadPolicy {
    pub fn accepts_type(&self, mime: &str) -> bool {
        let mime = normalize_mime(mime);
        self.accepted_types.iter().any(|accepted| {
            let accepted = normalize_mime(accepted);
            match accepted.strip_suffix("/*") {
                Some(major) => mime
                    .split_once('/')
                    .map(|(m, _)| m == major)
                    .unwrap_or(false),
                None => accepted == mime,
            }
        })
    }

    pub fn check_size(&self, size: u64) -> Result<(), UploadRejection> {
        if size > self.max_size {
            return Err(UploadRejection::TooLarge {
                size,
                max: self.max_size,
            });
        }
        Ok(())
    }

    /// Reject a file by declared type and size before any data moves
    pub fn validate(&self, mime: &str, size: u64) -> Result<(), UploadRejection> {
        if !self.accepts_type(mime) {
            return Err(UploadRejection::UnsupportedType {
                mime: normalize_mime(mime),
                accepted: self.accepted_types.join(", "),
            });
        }
        if size == 0 {
            return Err(UploadRejection::Empty);
        }
        self.check_size(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> UploadPolicy {
        UploadPolicy {
            field_name: "file".to_string(),
            accepted_types: vec!["application/pdf".to_string(), "image/*".to_string()],
            max_size: 1024,
        }
    }

    #[test]
    fn type_allow_list_with_wildcards() {
        let p = policy();
        assert!(p.accepts_type("application/pdf"));
        assert!(p.accepts_type("Application/PDF; name=cv.pdf"));
        assert!(p.accepts_type("image/png"));
        assert!(!p.accepts_type("application/msword"));
        assert!(!p.accepts_type("imagex/png"));
        assert!(!p.accepts_type(""));
    }

    #[test]
    fn validate_checks_type_then_size() {
        let p = policy();
        assert!(p.validate("image/jpeg", 10).is_ok());
        assert_eq!(
            p.validate("text/plain", 10),
            Err(UploadRejection::UnsupportedType {
                mime: "text/plain".to_string(),
                accepted: "application/pdf, image/*".to_string()
            })
        );
        assert_eq!(p.validate("image/jpeg", 0), Err(UploadRejection::Empty));
        assert_eq!(
            p.validate("image/jpeg", 2048),
            Err(UploadRejection::TooLarge { size: 2048, max: 1024 })
        );
    }
}
