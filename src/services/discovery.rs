use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const EXTENSIONS: &[&str] = &["xlsx", "xls"];
// Office writes `~$name.xlsx` lock files next to open workbooks.
const LOCK_FILE_PREFIX: &str = "~$";

fn is_workbook(path: &Path) -> bool {
    let ext_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)));
    let lock_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(LOCK_FILE_PREFIX));
    ext_ok && !lock_file
}

/// Every `.xlsx`/`.xls` file under `root`, sorted.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>, String> {
    if !root.is_dir() {
        return Err(format!("data root is not a directory: {}", root.display()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Batch: skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if is_workbook(entry.path()) {
            files.push(entry.into_path());
        } else {
            debug!("Batch: ignoring {}", entry.path().display());
        }
    }
    files.sort();
    info!("Batch: discovered {} workbook(s) under {}", files.len(), root.display());
    Ok(files)
}
