//! Input validation helpers.

use crate::{LabScanError, Result};
use std::path::Path;

/// Validate that a path exists and is a regular file.
pub(crate) fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(LabScanError::validation(format!(
            "File does not exist: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(LabScanError::validation(format!(
            "Path is not a file: {}",
            path.display()
        )));
    }
    Ok(())
}
