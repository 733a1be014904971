use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Extensions offered by both the import and export dialogs.
pub const AUDIO_EXTENSIONS: [&str; 5] = ["wav", "mp3", "ogg", "m4a", "flac"];

const DEFAULT_EXTENSION: &str = ".wav";
const WORK_DIR_NAME: &str = "dissonance";

/// Basic facts about an imported file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileStats {
    pub name: String,
    pub size: u64,
    pub mtime_ms: u64,
}

/// Stat a file. Returns `None` (and logs) when it can't be read.
pub fn file_stats(path: &Path) -> Option<FileStats> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            log::error!("Failed to get file stats for {}: {e}", path.display());
            return None;
        }
    };
    let mtime_ms = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    Some(FileStats {
        name: base_name(path),
        size: metadata.len(),
        mtime_ms,
    })
}

/// Final path component as a display string.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<basename>-processed<ext>`; the extension falls back to `.wav`.
pub fn derived_file_name(source: &Path) -> OsString {
    let stem = source.file_stem().unwrap_or_default();
    let mut name = OsString::from(stem);
    name.push("-processed");
    match source.extension() {
        Some(ext) if !ext.is_empty() => {
            name.push(".");
            name.push(ext);
        }
        _ => name.push(DEFAULT_EXTENSION),
    }
    name
}

/// Process-wide scratch directory for processed files: `<tmp>/dissonance`.
pub fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join(WORK_DIR_NAME)
}

/// Whether the path carries one of the [`AUDIO_EXTENSIONS`].
pub fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_name_keeps_extension() {
        assert_eq!(derived_file_name(Path::new("/tmp/a.wav")), "a-processed.wav");
        assert_eq!(
            derived_file_name(Path::new("/music/take 2.flac")),
            "take 2-processed.flac"
        );
        assert_eq!(
            derived_file_name(Path::new("mix.final.mp3")),
            "mix.final-processed.mp3"
        );
    }

    #[test]
    fn derived_name_defaults_to_wav() {
        assert_eq!(derived_file_name(Path::new("/tmp/a")), "a-processed.wav");
        assert_eq!(derived_file_name(Path::new("/tmp/.hidden")), ".hidden-processed.wav");
    }

    #[test]
    fn work_dir_lives_under_tmp() {
        let dir = default_work_dir();
        assert!(dir.starts_with(std::env::temp_dir()));
        assert_eq!(dir.file_name().unwrap(), "dissonance");
    }

    #[test]
    fn stats_of_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        std::fs::write(&path, [0u8; 44]).unwrap();

        let stats = file_stats(&path).unwrap();
        assert_eq!(stats.name, "tone.wav");
        assert_eq!(stats.size, 44);
        assert!(stats.mtime_ms > 0);
    }

    #[test]
    fn stats_of_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(file_stats(&dir.path().join("nope.wav")).is_none());
    }

    #[test]
    fn audio_extension_check() {
        assert!(has_audio_extension(Path::new("a.WAV")));
        assert!(has_audio_extension(Path::new("a.m4a")));
        assert!(!has_audio_extension(Path::new("a.txt")));
        assert!(!has_audio_extension(Path::new("a")));
    }
}
