//! Upload validation rules shared by the registry and its clients.
//!
//! The registry enforces these on every request; clients run the same
//! checks up front so a bad input fails before any network round trip.

use crate::error::TypesError;

/// Owner recorded when none is supplied.
pub const DEFAULT_OWNER: &str = "anonymous";

/// Maximum owner name length, in characters.
pub const MAX_OWNER_LEN: usize = 50;

/// Maximum accepted upload size (16 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// File extensions the registry accepts, lower-case.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "txt", "doc", "docx", "zip"];

/// Validate an owner name, defaulting an empty one to [`DEFAULT_OWNER`].
///
/// Allowed: ASCII letters, digits, whitespace, `-` and `_`, 1 to 50
/// characters. The result is trimmed.
pub fn validate_owner(owner: Option<&str>) -> Result<String, TypesError> {
    let raw = match owner {
        Some(o) if !o.is_empty() => o,
        _ => return Ok(DEFAULT_OWNER.to_string()),
    };
    let ok = raw.chars().count() <= MAX_OWNER_LEN
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || c == '-' || c == '_');
    if !ok {
        return Err(TypesError::InvalidOwner { max: MAX_OWNER_LEN });
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_OWNER.to_string());
    }
    Ok(trimmed.to_string())
}

/// Check that a file name carries one of [`ALLOWED_EXTENSIONS`].
pub fn check_extension(file_name: &str) -> Result<(), TypesError> {
    if file_name.is_empty() {
        return Err(TypesError::EmptyFileName);
    }
    let allowed = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if allowed {
        Ok(())
    } else {
        Err(TypesError::DisallowedExtension(format!(
            "{file_name} (allowed: {})",
            ALLOWED_EXTENSIONS.join(", ")
        )))
    }
}

/// Reject payloads over [`MAX_UPLOAD_BYTES`].
pub fn check_size(size: u64) -> Result<(), TypesError> {
    if size > MAX_UPLOAD_BYTES {
        return Err(TypesError::FileTooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Keeps the final component, maps anything outside `[A-Za-z0-9._-]` to
/// `_`, and strips leading dots.
pub fn sanitize_file_name(file_name: &str) -> String {
    let last = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name);
    let mapped: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    mapped.trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_defaults_to_anonymous() {
        assert_eq!(validate_owner(None).unwrap(), "anonymous");
        assert_eq!(validate_owner(Some("")).unwrap(), "anonymous");
        assert_eq!(validate_owner(Some("   ")).unwrap(), "anonymous");
    }

    #[test]
    fn owner_is_trimmed() {
        assert_eq!(validate_owner(Some(" Jane Doe-2_x ")).unwrap(), "Jane Doe-2_x");
    }

    #[test]
    fn owner_rejects_markup_and_long_names() {
        assert!(validate_owner(Some("<script>")).is_err());
        assert!(validate_owner(Some(&"a".repeat(51))).is_err());
        assert!(validate_owner(Some(&"a".repeat(50))).is_ok());
    }

    #[test]
    fn extension_check() {
        assert!(check_extension("report.PDF").is_ok());
        assert!(check_extension("archive.tar.zip").is_ok());
        assert!(check_extension("script.sh").is_err());
        assert!(check_extension("noext").is_err());
        assert_eq!(check_extension(""), Err(TypesError::EmptyFileName));
    }

    #[test]
    fn size_check() {
        assert!(check_size(MAX_UPLOAD_BYTES).is_ok());
        assert!(check_size(MAX_UPLOAD_BYTES + 1).is_err());
    }

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd.txt"), "passwd.txt");
        assert_eq!(sanitize_file_name("C:\\docs\\my file.pdf"), "my_file.pdf");
        assert_eq!(sanitize_file_name(".hidden.txt"), "hidden.txt");
    }
}
