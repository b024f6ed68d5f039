//! Interactive questions to the user

use dialoguer::Confirm;
use std::path::Path;

/// Ask the user if an existing output file may be overwritten
///
/// Returns truth that the run should proceed. Nothing is asked if there is no
/// file at the output location yet.
pub fn confirm_overwrite(output: &Path) -> dialoguer::Result<bool> {
    if !output.exists() {
        return Ok(true);
    }
    Confirm::new()
        .with_prompt(format!("{} already exists, overwrite it?", output.display()))
        .default(false)
        .interact()
}
