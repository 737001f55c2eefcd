use crate::UploadError;

/// Accepted document extensions (spec.md §6). Not exhaustive of the
/// universe of "document" extensions — treated as policy, not taxonomy.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "rtf", "md", "odt", "ods", "odp",
    "html", "htm", "xml", "json", "csv", "epub", "pages", "numbers", "keynote",
];

/// A representative deny-list of binary/media extensions that get a
/// specific, friendlier "unsupported" message rather than the generic
/// guidance error given to unrecognized extensions.
pub const DENY_LISTED_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "bat", "sh", "apk", "msi", "iso", "mp3", "mp4", "avi",
    "mov", "mkv", "zip", "rar", "7z", "jpg", "jpeg", "png", "gif", "bmp",
];

fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Validate the first chunk's filename against the supported-type gate.
/// Only ever called for chunk index 0 (spec.md §6).
pub fn validate_extension(filename: &str) -> Result<(), UploadError> {
    let Some(extension) = extension_of(filename) else {
        return Err(UploadError::UnsupportedType {
            extension: String::new(),
            deny_listed: false,
        });
    };

    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Ok(());
    }

    let deny_listed = DENY_LISTED_EXTENSIONS.contains(&extension.as_str());
    Err(UploadError::UnsupportedType {
        extension,
        deny_listed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_documented_types() {
        assert!(validate_extension("report.pdf").is_ok());
        assert!(validate_extension("notes.MD").is_ok());
    }

    #[test]
    fn rejects_deny_listed_binary() {
        let err = validate_extension("malware.exe").unwrap_err();
        match err {
            UploadError::UnsupportedType { deny_listed, .. } => assert!(deny_listed),
            _ => panic!("expected UnsupportedType"),
        }
    }

    #[test]
    fn rejects_unknown_extension_with_generic_guidance() {
        let err = validate_extension("weird.xyzabc").unwrap_err();
        match err {
            UploadError::UnsupportedType { deny_listed, .. } => assert!(!deny_listed),
            _ => panic!("expected UnsupportedType"),
        }
    }
}
