use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Language code to sidecar path, as found beside one media file.
pub type SidecarMap = BTreeMap<String, PathBuf>;

/// List `<basename>.<code>.srt` files in `dir` whose code is in `recognized`.
///
/// Directory entries are visited in file-name order, so when two files resolve
/// to the same code (`Show.en.srt` and `Show.EN.srt`) the lexicographically
/// first one wins. Zero-byte files are ignored. An unreadable directory yields
/// an empty map.
pub async fn scan(dir: &Path, basename: &str, recognized: &HashSet<String>) -> SidecarMap {
    let mut sidecars = SidecarMap::new();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list {}: {}", dir.display(), e);
            return sidecars;
        }
    };

    let mut names = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Stopped listing {}: {}", dir.display(), e);
                break;
            }
        };
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if sidecar_code(&name, basename).is_none() {
            continue;
        }
        match entry.metadata().await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => names.push(name),
            Ok(_) => debug!("Ignoring empty or non-file sidecar {}", name),
            Err(e) => debug!("Cannot stat {}: {}", name, e),
        }
    }
    names.sort();

    for name in names {
        let Some(code) = sidecar_code(&name, basename) else {
            continue;
        };
        if !recognized.contains(&code) {
            continue;
        }
        if let Some(existing) = sidecars.get(&code) {
            debug!("Ignoring {} for '{}', already using {}", name, code, existing.display());
            continue;
        }
        sidecars.insert(code, dir.join(&name));
    }

    sidecars
}

/// Language code of `file_name` if it follows `<basename>.<code>.srt`.
fn sidecar_code(file_name: &str, basename: &str) -> Option<String> {
    let rest = file_name.strip_prefix(basename)?.strip_prefix('.')?;
    let (code, ext) = rest.rsplit_once('.')?;
    if !ext.eq_ignore_ascii_case("srt") {
        return None;
    }
    if !(2..=3).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(code.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    const CUE: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello\n";

    fn recognized() -> HashSet<String> {
        ["no", "nor", "nob", "nb", "en", "eng"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sidecar_code() {
        assert_eq!(sidecar_code("Show.en.srt", "Show"), Some("en".to_string()));
        assert_eq!(sidecar_code("Show.NOB.SRT", "Show"), Some("nob".to_string()));
        assert_eq!(sidecar_code("Show.srt", "Show"), None);
        assert_eq!(sidecar_code("Show.en.ass", "Show"), None);
        assert_eq!(sidecar_code("Show.forced.en.srt", "Show"), None);
        assert_eq!(sidecar_code("Show 2.en.srt", "Show"), None);
    }

    #[tokio::test]
    async fn test_scan_maps_recognized_codes() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("Show - S01E03.mkv").touch().unwrap();
        temp.child("Show - S01E03.eng.srt").write_str(CUE).unwrap();
        temp.child("Show - S01E03.nb.SRT").write_str(CUE).unwrap();
        temp.child("Show - S01E03.de.srt").write_str(CUE).unwrap();
        temp.child("Show - S01E04.en.srt").write_str(CUE).unwrap();

        let found = scan(temp.path(), "Show - S01E03", &recognized()).await;
        assert_eq!(found.len(), 2);
        assert_eq!(found["eng"], temp.path().join("Show - S01E03.eng.srt"));
        assert_eq!(found["nb"], temp.path().join("Show - S01E03.nb.SRT"));
        assert!(!found.contains_key("de"));
    }

    #[tokio::test]
    async fn test_scan_collision_keeps_first_name() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("Movie.en.srt").write_str(CUE).unwrap();
        temp.child("Movie.EN.srt").write_str(CUE).unwrap();

        let found = scan(temp.path(), "Movie", &recognized()).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found["en"], temp.path().join("Movie.EN.srt"));
    }

    #[tokio::test]
    async fn test_scan_ignores_empty_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("Movie.nb.srt").touch().unwrap();
        temp.child("Movie.en.srt").write_str(CUE).unwrap();

        let found = scan(temp.path(), "Movie", &recognized()).await;
        assert_eq!(found.keys().collect::<Vec<_>>(), vec!["en"]);
    }

    #[tokio::test]
    async fn test_scan_missing_dir_is_empty() {
        let found = scan(Path::new("/definitely/not/here"), "Movie", &recognized()).await;
        assert!(found.is_empty());
    }
}
