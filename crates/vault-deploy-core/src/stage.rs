//! Local scratch files shared between jobs
//!
//! Files are overwritten on every run and never cleaned up.

use crate::error::DeployError;
use std::path::Path;

/// Replace the first occurrence of `needle` in `haystack`
///
/// Works on bytes so content that is not UTF-8 passes through untouched.
pub fn replace_first(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
    if needle.is_empty() {
        return haystack.to_vec();
    }

    match haystack.windows(needle.len()).position(|w| w == needle) {
        Some(start) => {
            let mut out =
                Vec::with_capacity(haystack.len() - needle.len() + replacement.len());
            out.extend_from_slice(&haystack[..start]);
            out.extend_from_slice(replacement);
            out.extend_from_slice(&haystack[start + needle.len()..]);
            out
        }
        None => haystack.to_vec(),
    }
}

/// Create or truncate `path` and write `contents`
pub fn write_file(path: &Path, contents: &[u8]) -> Result<(), DeployError> {
    std::fs::write(path, contents).map_err(|e| DeployError::io(path, e))?;
    tracing::debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Read the raw bytes of `path`
pub fn read_file(path: &Path) -> Result<Vec<u8>, DeployError> {
    std::fs::read(path).map_err(|e| DeployError::io(path, e))
}
