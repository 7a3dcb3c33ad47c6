use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::error::SessionError;

/// Leaves `directory` existing and empty.
///
/// Whatever is at the path (a directory tree or a stray file) is removed first.
pub fn reset(directory: &Path) -> Result<(), SessionError> {
    match fs::symlink_metadata(directory) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(directory)
            .map_err(|source| SessionError::workspace("removing workspace", directory, source))?,
        Ok(_) => fs::remove_file(directory)
            .map_err(|source| SessionError::workspace("removing file at workspace", directory, source))?,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(SessionError::workspace(
                "inspecting workspace",
                directory,
                source,
            ))
        }
    }

    fs::create_dir_all(directory)
        .map_err(|source| SessionError::workspace("creating workspace", directory, source))?;
    debug!(workspace = %directory.display(), "workspace reset");
    Ok(())
}
