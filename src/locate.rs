//! Dependency resolver (Step 1 in the pipeline).
//! Finds the two externals the calibrator needs: the renderer's BoxLayout
//! file and the RawKinectViewer binary. Resolution order for each is the CLI
//! option, then the environment override, then filesystem discovery. The two
//! are resolved independently so a failure message always names the one that
//! is actually missing.

use anyhow::{Context, Result, bail};
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};

pub const BOXLAYOUT_ENV: &str = "SANDCAL_BOXLAYOUT";
pub const VIEWER_ENV: &str = "SANDCAL_VIEWER";

/// Versioned renderer installs, relative to the home directory.
const BOXLAYOUT_PATTERN: &str = "src/SARndbox-*/etc/SARndbox-*/BoxLayout.txt";
/// Viewer binary searched on PATH when no override is given.
const VIEWER_BIN: &str = "RawKinectViewer";

/// Resolves the BoxLayout file to update. Overrides are taken as given, with
/// no existence check; a bad path surfaces later as a backup error.
pub fn boxlayout(cli_override: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = cli_override {
        return Ok(PathBuf::from(path));
    }
    if let Some(path) = env::var_os(BOXLAYOUT_ENV) {
        return Ok(PathBuf::from(path));
    }

    let home = dirs::home_dir()
        .with_context(|| format!("could not determine the home directory; set {BOXLAYOUT_ENV}"))?;
    let pattern = home.join(BOXLAYOUT_PATTERN);
    let pattern = pattern
        .to_str()
        .with_context(|| format!("home directory {} is not valid UTF-8", home.display()))?;
    let candidates: Vec<PathBuf> = glob::glob(pattern)
        .context("invalid BoxLayout search pattern")?
        .filter_map(Result::ok)
        .collect();
    debug!("BoxLayout candidates: {:?}", candidates);

    match latest_install(candidates) {
        Some(path) => {
            info!("using BoxLayout file {}", path.display());
            Ok(path)
        }
        None => bail!(
            "no BoxLayout.txt found under {}; set {} to the file used by your sandbox renderer",
            home.join("src").display(),
            BOXLAYOUT_ENV
        ),
    }
}

/// Resolves the viewer binary to run.
pub fn viewer(cli_override: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = cli_override {
        return Ok(PathBuf::from(path));
    }
    if let Some(path) = env::var_os(VIEWER_ENV) {
        return Ok(PathBuf::from(path));
    }

    let path = which::which(VIEWER_BIN).with_context(|| {
        format!("{VIEWER_BIN} not found on PATH; set {VIEWER_ENV} to the viewer binary")
    })?;
    info!("using viewer binary {}", path.display());
    Ok(path)
}

/// Picks the lexicographically-last candidate, so the highest versioned
/// install wins when several are present.
fn latest_install(mut candidates: Vec<PathBuf>) -> Option<PathBuf> {
    candidates.sort();
    candidates.pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_latest_install_picks_lexicographically_last() {
        let candidates = vec![
            PathBuf::from("/home/sandbox/src/SARndbox-2.6/etc/SARndbox-2.6/BoxLayout.txt"),
            PathBuf::from("/home/sandbox/src/SARndbox-2.8/etc/SARndbox-2.8/BoxLayout.txt"),
            PathBuf::from("/home/sandbox/src/SARndbox-2.7/etc/SARndbox-2.7/BoxLayout.txt"),
        ];
        assert_eq!(
            latest_install(candidates).unwrap(),
            Path::new("/home/sandbox/src/SARndbox-2.8/etc/SARndbox-2.8/BoxLayout.txt")
        );
    }

    #[test]
    fn test_latest_install_ordering_is_textual_not_numeric() {
        // "2.10" sorts before "2.8"; the selection rule is plain string order
        let candidates = vec![
            PathBuf::from("/opt/SARndbox-2.10/etc/SARndbox-2.10/BoxLayout.txt"),
            PathBuf::from("/opt/SARndbox-2.8/etc/SARndbox-2.8/BoxLayout.txt"),
        ];
        assert_eq!(
            latest_install(candidates).unwrap(),
            Path::new("/opt/SARndbox-2.8/etc/SARndbox-2.8/BoxLayout.txt")
        );
    }

    #[test]
    fn test_latest_install_empty_is_none() {
        assert_eq!(latest_install(Vec::new()), None);
    }

    #[test]
    fn test_cli_override_wins_without_existence_check() {
        let path = boxlayout(Some("/nonexistent/BoxLayout.txt")).unwrap();
        assert_eq!(path, Path::new("/nonexistent/BoxLayout.txt"));

        let path = viewer(Some("/nonexistent/RawKinectViewer")).unwrap();
        assert_eq!(path, Path::new("/nonexistent/RawKinectViewer"));
    }
}
