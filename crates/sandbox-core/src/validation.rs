//! Input validation. All validators return `Result<(), SandboxError>` and
//! run before any engine call, so a rejected request never reaches the
//! container driver.

use crate::error::SandboxError;
use regex_lite::Regex;
use std::sync::OnceLock;

fn session_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap())
}

fn filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]{1,255}$").unwrap())
}

/// Validate a caller-supplied session id. `None` means auto-generate, which
/// is always valid.
pub fn validate_session_id(session_id: Option<&str>) -> Result<(), SandboxError> {
    match session_id {
        None => Ok(()),
        Some(sid) if session_id_re().is_match(sid) => Ok(()),
        Some(sid) => Err(SandboxError::InvalidSessionId(sid.to_string())),
    }
}

/// Validate a filename against the allowlist and reject path traversal.
///
/// The allowlist runs first: a name with disallowed characters is always
/// `invalid_filename`, even when it also contains `..` (e.g.
/// `"../etc/passwd"` fails the regex on the slashes and is reported as
/// `invalid_filename`). Only a name that passes the allowlist but still
/// contains `..` (e.g. `"a..b"`) is `invalid_path`.
pub fn validate_filename(filename: &str) -> Result<(), SandboxError> {
    if !filename_re().is_match(filename) {
        return Err(SandboxError::InvalidFilename(filename.to_string()));
    }
    if filename.contains("..") {
        return Err(SandboxError::InvalidPath(filename.to_string()));
    }
    Ok(())
}

/// Reject code exceeding `max_code_bytes`, counted as UTF-8 bytes, not
/// characters — a string of multi-byte characters must not get a free pass.
pub fn validate_code_size(code: &str, max_code_bytes: usize) -> Result<(), SandboxError> {
    let actual = code.len();
    if actual > max_code_bytes {
        return Err(SandboxError::CodeTooLarge {
            actual,
            limit: max_code_bytes,
        });
    }
    Ok(())
}

/// Reject an upload whose *base64* length implies a decoded size over
/// `max_upload_bytes`, checked before decoding.
pub fn validate_upload_size(content_base64: &str, max_upload_bytes: u64) -> Result<(), SandboxError> {
    let max_b64_len = (max_upload_bytes * 4 / 3) + 4;
    if content_base64.len() as u64 > max_b64_len {
        return Err(SandboxError::UploadTooLarge {
            limit: max_upload_bytes,
        });
    }
    Ok(())
}

/// Resolve a caller-supplied artifact path to a canonical location under
/// `/mnt/data/`, using only the basename — any directory components the
/// caller supplied are discarded rather than interpreted, which is what
/// makes path traversal unrepresentable.
pub fn resolve_data_path(path: &str) -> Result<(String, String), SandboxError> {
    let basename = path
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SandboxError::InvalidPath(path.to_string()))?;

    if basename.contains("..") || !filename_re().is_match(basename) {
        return Err(SandboxError::InvalidPath(path.to_string()));
    }

    Ok((format!("/mnt/data/{basename}"), basename.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_generated_session_id_placeholder() {
        assert!(validate_session_id(None).is_ok());
        assert!(validate_session_id(Some("sess_abc123")).is_ok());
    }

    #[test]
    fn rejects_bad_session_id() {
        let err = validate_session_id(Some("has a space")).unwrap_err();
        assert_eq!(err.kind(), "invalid_session_id");
    }

    #[test]
    fn rejects_traversal_in_filename() {
        // Fails the allowlist on the slashes before the ".." check ever
        // runs, so this is invalid_filename, not invalid_path.
        let err = validate_filename("../etc/passwd").unwrap_err();
        assert_eq!(err.kind(), "invalid_filename");
    }

    #[test]
    fn rejects_dotdot_that_otherwise_passes_the_allowlist() {
        let err = validate_filename("a..b").unwrap_err();
        assert_eq!(err.kind(), "invalid_path");
    }

    #[test]
    fn rejects_bad_filename_chars() {
        let err = validate_filename("weird name?.csv").unwrap_err();
        assert_eq!(err.kind(), "invalid_filename");
    }

    #[test]
    fn code_size_counts_utf8_bytes_not_chars() {
        // Each "é" is 2 bytes but 1 char — limit must be byte-based.
        let code = "é".repeat(10);
        assert_eq!(code.chars().count(), 10);
        assert_eq!(code.len(), 20);
        assert!(validate_code_size(&code, 19).is_err());
        assert!(validate_code_size(&code, 20).is_ok());
    }

    #[test]
    fn upload_size_boundary_is_exact() {
        let max_bytes: u64 = 9; // 3 base64 groups of 3 bytes
        let max_len = (max_bytes * 4 / 3) + 4;
        let exact = "A".repeat(max_len as usize);
        assert!(validate_upload_size(&exact, max_bytes).is_ok());
        let over = "A".repeat(max_len as usize + 1);
        assert!(validate_upload_size(&over, max_bytes).is_err());
    }

    #[test]
    fn resolve_data_path_strips_directories() {
        let (path, name) = resolve_data_path("/mnt/data/out.csv").unwrap();
        assert_eq!(path, "/mnt/data/out.csv");
        assert_eq!(name, "out.csv");

        // basename-only resolution neutralizes traversal: only "passwd"
        // survives, always anchored under /mnt/data/.
        let (path, name) = resolve_data_path("../../etc/passwd").unwrap();
        assert_eq!(path, "/mnt/data/passwd");
        assert_eq!(name, "passwd");

        let err = resolve_data_path("/mnt/data/weird?.csv").unwrap_err();
        assert_eq!(err.kind(), "invalid_path");
    }
}
