//! Pre-flight checks run before planning. Nothing here touches the network.

use std::path::Path;

use crate::config::AllowedType;
use crate::error::ValidationError;

/// Lowercased extension of `file_name`, if it has one.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_lowercase())
}

/// MIME type registered for the file's extension in `allowed`, if any.
pub fn infer_mime<'a>(file_name: &str, allowed: &'a [AllowedType]) -> Option<&'a str> {
    let ext = extension_of(file_name)?;
    allowed
        .iter()
        .find(|t| t.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
        .map(|t| t.mime.as_str())
}

/// Resolve the declared MIME type (inferring it from the extension when
/// absent) and check type, extension and size. Returns the MIME type used.
pub fn validate_file(
    file_name: &str,
    declared_mime: Option<&str>,
    size: u64,
    max_size: u64,
    allowed: &[AllowedType],
) -> Result<String, ValidationError> {
    let mime = match declared_mime {
        Some(m) => m.trim().to_ascii_lowercase(),
        None => infer_mime(file_name, allowed)
            .map(str::to_string)
            .ok_or_else(|| ValidationError::UnknownType {
                file_name: file_name.to_string(),
            })?,
    };

    let entry = allowed
        .iter()
        .find(|t| t.mime.eq_ignore_ascii_case(&mime))
        .ok_or_else(|| ValidationError::UnsupportedType { mime: mime.clone() })?;

    let extension = extension_of(file_name).unwrap_or_default();
    if !entry.extensions.iter().any(|e| e.eq_ignore_ascii_case(&extension)) {
        return Err(ValidationError::ExtensionMismatch { mime, extension });
    }

    if size == 0 {
        return Err(ValidationError::Empty);
    }
    if size > max_size {
        return Err(ValidationError::TooLarge {
            size,
            limit: max_size,
        });
    }
    Ok(mime)
}
