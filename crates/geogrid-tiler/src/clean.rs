//! Removal of converter sidecar files.

use crate::Result;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Extensions of the auxiliary files the converter leaves next to each tile
/// (`.hdr` headers and `.aux.xml` statistics).
pub const SIDECAR_EXTENSIONS: [&str; 2] = ["hdr", "xml"];

/// Whether a path names a sidecar file.
pub fn is_sidecar(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SIDECAR_EXTENSIONS.contains(&ext))
}

/// Delete every sidecar file directly inside `dir`.
///
/// Tile files and subdirectories are left alone. Returns the number of files
/// removed.
pub fn clean_sidecars<P: AsRef<Path>>(dir: P) -> Result<usize> {
    let mut removed = 0;

    for entry in fs::read_dir(dir.as_ref())? {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type()?.is_file() && is_sidecar(&path) {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }

    debug!("Removed {} sidecar files from {}", removed, dir.as_ref().display());
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_sidecar() {
        assert!(is_sidecar(Path::new("out/00001-01200.00001-01200.hdr")));
        assert!(is_sidecar(Path::new("out/00001-01200.00001-01200.aux.xml")));
        assert!(!is_sidecar(Path::new("out/00001-01200.00001-01200")));
        assert!(!is_sidecar(Path::new("out/index")));
    }

    #[test]
    fn test_clean_leaves_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let names = [
            "00001-00200.00001-00200",
            "00001-00200.00001-00200.hdr",
            "00001-00200.00001-00200.aux.xml",
            "00201-00400.00001-00200",
            "00201-00400.00001-00200.hdr",
            "index",
        ];
        for name in names {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("east.hdr")).unwrap();

        let removed = clean_sidecars(dir.path()).unwrap();
        assert_eq!(removed, 3);

        let mut left: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(
            left,
            vec![
                "00001-00200.00001-00200",
                "00201-00400.00001-00200",
                "east.hdr",
                "index"
            ]
        );
    }

    #[test]
    fn test_clean_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(clean_sidecars(dir.path()).unwrap(), 0);
    }
}
