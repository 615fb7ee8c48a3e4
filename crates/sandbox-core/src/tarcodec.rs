//! Tar Codec: builds an in-memory TAR containing one
//! named file, and extracts the first regular member from a TAR stream.

use crate::error::SandboxError;
use std::io::Read;

/// Build a single-entry TAR archive for `upload`.
pub fn build_single_file(name: &str, content: &[u8]) -> Result<Vec<u8>, SandboxError> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, name, content)
        .map_err(|e| SandboxError::InvalidContent(e.to_string()))?;
    builder
        .into_inner()
        .map_err(|e| SandboxError::InvalidContent(e.to_string()))
}

/// Extract the first regular file member from a TAR stream, returning its
/// raw bytes.
pub fn extract_first_file(tar_bytes: &[u8]) -> Result<Vec<u8>, SandboxError> {
    let mut archive = tar::Archive::new(tar_bytes);
    let mut entries = archive
        .entries()
        .map_err(|_| SandboxError::NotFound)?;

    let entry = entries.next().ok_or(SandboxError::NotFound)?;
    let mut entry = entry.map_err(|_| SandboxError::NotFound)?;

    let mut contents = Vec::new();
    entry
        .read_to_end(&mut contents)
        .map_err(|_| SandboxError::NotFound)?;
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_single_file() {
        let tar = build_single_file("hello.txt", b"hello").unwrap();
        let extracted = extract_first_file(&tar).unwrap();
        assert_eq!(extracted, b"hello");
    }

    #[test]
    fn extracting_empty_archive_is_not_found() {
        let empty = tar::Builder::new(Vec::new()).into_inner().unwrap();
        assert!(matches!(
            extract_first_file(&empty).unwrap_err(),
            SandboxError::NotFound
        ));
    }
}
