//! Writing decrypted images back to the filesystem.

use anyhow::{Context, Result};
use getrandom::fill;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes `data` to `target` so that readers see either the old file or the
/// complete new one, never a partial write.
///
/// The bytes go to a sibling temp file which is synced and then renamed over
/// `target`; the parent directory is synced afterwards. Missing parent
/// directories are created.
pub fn write_atomic(target: &Path, data: &[u8]) -> Result<()> {
    let parent = target.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = sibling_tmp_path(target)?;

    let mut tmp_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .context("failed to create temporary file")?;

    tmp_file.write_all(data)?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    if let Err(e) = replace(&tmp_path, target) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    if let Some(parent) = parent {
        File::open(parent)?.sync_all()?;
    }

    Ok(())
}

/// `name.tmp.<16 hex chars>` next to `target`.
fn sibling_tmp_path(target: &Path) -> Result<PathBuf> {
    let mut buf = [0u8; 8];
    fill(&mut buf)?;

    let suffix = buf.iter().map(|b| format!("{:02x}", b)).collect::<String>();
    let file_name = target
        .file_name()
        .context("export target has no file name")?
        .to_string_lossy();

    Ok(target.with_file_name(format!("{file_name}.tmp.{suffix}")))
}

#[cfg(target_os = "windows")]
fn replace(tmp_path: &Path, target: &Path) -> Result<()> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::{
        MOVEFILE_REPLACE_EXISTING, MOVEFILE_WRITE_THROUGH, MoveFileExW,
    };

    fn to_wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    let tmp_w = to_wide(tmp_path.as_os_str());
    let target_w = to_wide(target.as_os_str());

    // SAFETY: both buffers are NUL-terminated UTF-16 and outlive the call.
    let result = unsafe {
        MoveFileExW(
            tmp_w.as_ptr(),
            target_w.as_ptr(),
            MOVEFILE_REPLACE_EXISTING | MOVEFILE_WRITE_THROUGH,
        )
    };

    if result == 0 {
        let err = std::io::Error::last_os_error();
        return Err(err).context("atomic replace failed");
    }

    Ok(())
}

/// `rename()` is atomic on the same filesystem, and the temp file is always
/// a sibling of the target.
#[cfg(not(target_os = "windows"))]
fn replace(tmp_path: &Path, target: &Path) -> Result<()> {
    fs::rename(tmp_path, target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");

        write_atomic(&path, b"image").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"image");
    }

    #[test]
    fn replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn tmp_file_is_removed_after_success() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");
        write_atomic(&path, &vec![42u8; 10_000]).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();

        assert_eq!(entries, vec![std::ffi::OsString::from("out.png")]);
    }

    #[test]
    fn parent_directory_is_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("out.png");

        write_atomic(&nested, b"data").unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn tmp_names_are_unique_siblings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");

        let a = sibling_tmp_path(&path).unwrap();
        let b = sibling_tmp_path(&path).unwrap();

        assert_ne!(a, b);
        assert_ne!(a, path);
        assert_eq!(a.parent(), path.parent());
    }
}
