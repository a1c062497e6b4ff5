//! Export module - write recovered archives without clobbering anything.
//!
//! A recovered score is saved as `<title>.mscz`. When that name is taken,
//! a `_(N)` counter is appended to the stem, or an existing counter is
//! bumped, until a free name turns up.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::carve::{ArchiveSink, RecoveredArchive};

fn counter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"_\((\d+)\)").expect("counter pattern is valid"))
}

/// Stem with every `_(N)` counter incremented, or `_(1)` appended if none.
fn next_stem(stem: &str) -> String {
    let bumped = counter_pattern().replace_all(stem, |caps: &Captures| match caps[1].parse::<u64>() {
        Ok(n) => format!("_({})", n.saturating_add(1)),
        Err(_) => caps[0].to_string(),
    });

    if bumped == stem {
        format!("{stem}_(1)")
    } else {
        bumped.into_owned()
    }
}

/// First path at or after `path` in the counter sequence that is not an existing file.
pub fn safe_output_path(path: &Path) -> PathBuf {
    let mut candidate = path.to_path_buf();
    while candidate.is_file() {
        let stem = candidate
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut name = next_stem(&stem);
        if let Some(ext) = candidate.extension() {
            name.push('.');
            name.push_str(&ext.to_string_lossy());
        }
        candidate.set_file_name(name);
    }
    candidate
}

/// Sink that writes each archive into an output directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    output_dir: PathBuf,
}

impl DirectorySink {
    /// Use `output_dir`, creating it if needed.
    pub fn create(output_dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ArchiveSink for DirectorySink {
    fn persist(&mut self, archive: &RecoveredArchive) -> io::Result<Option<PathBuf>> {
        let path = safe_output_path(&self.output_dir.join(&archive.file_name));
        tracing::debug!(
            name = %archive.file_name.display(),
            path = %path.display(),
            size = archive.len(),
            "Writing recovered archive"
        );
        fs::write(&path, &archive.bytes)?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::EntryName;
    use tempfile::TempDir;

    fn archive(title: &str, bytes: &[u8]) -> RecoveredArchive {
        RecoveredArchive {
            offset: 0,
            bytes: bytes.to_vec(),
            entry_name: EntryName::Utf8(format!("{title}.mscx")),
            file_name: PathBuf::from(format!("{title}.mscz")),
            hash: String::new(),
        }
    }

    #[test]
    fn free_name_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("title.mscz");
        assert_eq!(safe_output_path(&path), path);
    }

    #[test]
    fn first_collision_appends_counter() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("title.mscz"), b"x").unwrap();
        assert_eq!(
            safe_output_path(&dir.path().join("title.mscz")),
            dir.path().join("title_(1).mscz")
        );
    }

    #[test]
    fn later_collisions_increment_counter() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("title.mscz"), b"x").unwrap();
        fs::write(dir.path().join("title_(1).mscz"), b"x").unwrap();
        assert_eq!(
            safe_output_path(&dir.path().join("title.mscz")),
            dir.path().join("title_(2).mscz")
        );
        assert_eq!(
            safe_output_path(&dir.path().join("title_(1).mscz")),
            dir.path().join("title_(2).mscz")
        );
    }

    #[test]
    fn next_stem_bumps_instead_of_stacking() {
        assert_eq!(next_stem("title"), "title_(1)");
        assert_eq!(next_stem("title_(1)"), "title_(2)");
        assert_eq!(next_stem("title_(9)"), "title_(10)");
        assert_eq!(next_stem("take_(3)_final"), "take_(4)_final");
        assert_eq!(next_stem("title_(x)"), "title_(x)_(1)");
    }

    #[test]
    fn directory_sink_creates_dir_and_avoids_overwrite() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested").join("out");
        let mut sink = DirectorySink::create(&out).unwrap();
        assert!(out.is_dir());

        let first = sink.persist(&archive("Prelude", b"one")).unwrap().unwrap();
        let second = sink.persist(&archive("Prelude", b"two")).unwrap().unwrap();
        let third = sink.persist(&archive("Prelude", b"three")).unwrap().unwrap();

        assert_eq!(first, out.join("Prelude.mscz"));
        assert_eq!(second, out.join("Prelude_(1).mscz"));
        assert_eq!(third, out.join("Prelude_(2).mscz"));
        assert_eq!(fs::read(&first).unwrap(), b"one");
        assert_eq!(fs::read(&third).unwrap(), b"three");
    }
}
