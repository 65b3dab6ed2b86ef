use std::fs;
use std::io;
use std::path::Path;

use tracing::{info, instrument};

/// Create the stream directories under `root`, optionally deleting files left
/// by a previous run. Returns the number of files removed.
#[instrument(skip(root), fields(root = %root.display()))]
pub fn prepare_output_dirs(root: &Path, dirs: &[&str], clear: bool) -> io::Result<usize> {
    let mut removed = 0;

    for dir in dirs {
        let path = root.join(dir);
        fs::create_dir_all(&path)?;

        if !clear {
            continue;
        }

        for entry in fs::read_dir(&path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
    }

    if removed > 0 {
        info!("Removed {} files from previous recording", removed);
    }
    Ok(removed)
}
