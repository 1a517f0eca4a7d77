//! Byte-exact image comparison.

use std::fs;
use std::path::Path;

use super::types::CompareError;

/// Compare two files byte for byte.
///
/// Any read failure is returned to the caller; a missing reference image is
/// an error, not a mismatch.
pub fn compare(a: impl AsRef<Path>, b: impl AsRef<Path>) -> Result<bool, CompareError> {
    let a = a.as_ref();
    let b = b.as_ref();
    let left = read(a)?;
    let right = read(b)?;
    Ok(left == right)
}

fn read(path: &Path) -> Result<Vec<u8>, CompareError> {
    fs::read(path).map_err(|source| CompareError {
        path: path.to_path_buf(),
        source,
    })
}
