//! BoxLayout file writer (Step 5 in the pipeline).
//! Backs up the existing file to a `.bak` sibling, truncates the original in
//! place, and writes the five calibration lines. Truncating instead of
//! recreating keeps the file's ownership and permissions, which usually
//! belong to the renderer's install and not to whoever runs the calibrator.
//! In dry-run mode the lines go to stdout and nothing on disk is touched.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes the five calibration lines to `path`, or prints them to stdout when
/// `dry_run` is set. The previous contents survive in `<path>.bak`.
pub fn apply(path: &Path, lines: &[String; 5], dry_run: bool) -> Result<()> {
    if dry_run {
        for line in lines {
            println!("{line}");
        }
        return Ok(());
    }

    let backup = backup_path(path);
    fs::copy(path, &backup).with_context(|| {
        format!(
            "failed to back up {} to {}",
            path.display(),
            backup.display()
        )
    })?;
    info!("backed up previous layout to {}", backup.display());

    let file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("failed to open {} for writing", path.display()))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{line}")
            .with_context(|| format!("failed to write to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write to {}", path.display()))?;
    info!("wrote box layout to {}", path.display());
    Ok(())
}

/// `BoxLayout.txt` becomes `BoxLayout.txt.bak`.
fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_lines() -> [String; 5] {
        [
            "(0.0032, -0.0061, 0.9999), -106.6051".to_string(),
            "(-53.2, -38.7, -99.1)".to_string(),
            "(51.8, -39.0, -98.6)".to_string(),
            "(-52.9, 38.2, -97.4)".to_string(),
            "(52.4, 38.5, -96.9)".to_string(),
        ]
    }

    #[test]
    fn test_backup_path_appends_bak() {
        assert_eq!(
            backup_path(Path::new("/etc/SARndbox-2.8/BoxLayout.txt")),
            Path::new("/etc/SARndbox-2.8/BoxLayout.txt.bak")
        );
    }

    #[test]
    fn test_write_replaces_contents_and_backs_up() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("BoxLayout.txt");
        fs::write(&path, "(0.0, 0.0, 1.0), -100.0\nstale corners\n").unwrap();

        apply(&path, &sample_lines(), false).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, sample_lines().join("\n") + "\n");

        let backup = fs::read_to_string(path.with_extension("txt.bak")).unwrap();
        assert_eq!(backup, "(0.0, 0.0, 1.0), -100.0\nstale corners\n");
    }

    #[test]
    fn test_rerun_refreshes_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("BoxLayout.txt");
        fs::write(&path, "first\n").unwrap();

        apply(&path, &sample_lines(), false).unwrap();
        apply(&path, &sample_lines(), false).unwrap();

        // Second run backs up the first run's output, not the original
        let backup = fs::read_to_string(path.with_extension("txt.bak")).unwrap();
        assert_eq!(backup, sample_lines().join("\n") + "\n");
    }

    #[test]
    fn test_missing_file_fails_at_the_backup_step() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("BoxLayout.txt");

        let err = apply(&path, &sample_lines(), false).unwrap_err();
        assert!(err.to_string().contains("failed to back up"));
        assert!(!path.exists());
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("BoxLayout.txt");
        fs::write(&path, "keep me\n").unwrap();

        apply(&path, &sample_lines(), true).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me\n");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_dry_run_needs_no_file_at_all() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("BoxLayout.txt");

        apply(&path, &sample_lines(), true).unwrap();
        assert!(!path.exists());
    }
}
