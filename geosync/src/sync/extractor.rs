//! Archive extraction for downloaded libraries.
//!
//! The publisher ships the database as a `.tar.gz` archive containing a single
//! dated directory. Extraction keeps that directory layout intact.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;

/// Trait for unpacking a downloaded archive.
pub trait ArchiveExtractor: Send + Sync {
    /// Extract `archive` into `dest_dir`, preserving the archive's layout.
    ///
    /// Returns the number of regular files found under `dest_dir` afterwards.
    fn extract(&self, archive: &Path, dest_dir: &Path) -> io::Result<usize>;
}

/// In-process gzip + tar extractor.
///
/// Symbolic and hard links are refused so nothing extracted can point
/// outside the destination.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarGzExtractor;

impl TarGzExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveExtractor for TarGzExtractor {
    fn extract(&self, archive: &Path, dest_dir: &Path) -> io::Result<usize> {
        fs::create_dir_all(dest_dir)?;

        let file = File::open(archive)?;
        let decoder = GzDecoder::new(BufReader::new(file));
        let mut tar = Archive::new(decoder);
        tar.set_preserve_permissions(false);

        for entry in tar.entries()? {
            let mut entry = entry?;
            let kind = entry.header().entry_type();
            if kind.is_symlink() || kind.is_hard_link() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("archive entry {} is a link", entry.path()?.display()),
                ));
            }
            // Entries escaping dest_dir are skipped.
            entry.unpack_in(dest_dir)?;
        }

        count_files_recursive(dest_dir)
    }
}

/// Count regular files recursively in a directory.
fn count_files_recursive(dir: &Path) -> io::Result<usize> {
    let mut count = 0;

    if !dir.exists() {
        return Ok(0);
    }

    for entry in fs::read_dir(dir)?.flatten() {
        let file_type = entry.file_type()?;
        if file_type.is_file() {
            count += 1;
        } else if file_type.is_dir() {
            count += count_files_recursive(&entry.path())?;
        }
    }

    Ok(count)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    /// Build an in-memory `.tar.gz` from `(path, contents)` pairs.
    pub(crate) fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    /// Build an in-memory `.tar.gz` holding a single link entry.
    pub(crate) fn tar_gz_link(path: &str, target: &Path, kind: tar::EntryType) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(kind);
        header.set_size(0);
        header.set_mode(0o777);
        header.set_link_name(target).unwrap();
        header.set_cksum();
        builder.append_data(&mut header, path, std::io::empty()).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_extract_preserves_layout() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("tmp.tar.gz");
        fs::write(
            &archive,
            tar_gz(&[
                ("GeoLite2-City_20230101/GeoLite2-City.mmdb", b"db"),
                ("GeoLite2-City_20230101/LICENSE.txt", b"license"),
            ]),
        )
        .unwrap();

        let count = TarGzExtractor::new().extract(&archive, temp.path()).unwrap();

        // The archive itself is also counted.
        assert_eq!(count, 3);
        let db = temp.path().join("GeoLite2-City_20230101/GeoLite2-City.mmdb");
        assert_eq!(fs::read(db).unwrap(), b"db");
    }

    #[test]
    fn test_extract_rejects_symlinked_directory() {
        let temp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let dest = temp.path().join("work");
        let archive = temp.path().join("tmp.tar.gz");
        fs::write(
            &archive,
            tar_gz_link("evil", outside.path(), tar::EntryType::Symlink),
        )
        .unwrap();

        let err = TarGzExtractor::new().extract(&archive, &dest).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(!dest.join("evil").exists());
    }

    #[test]
    fn test_extract_rejects_symlinked_file() {
        let temp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let secret = outside.path().join("secret");
        fs::write(&secret, b"secret").unwrap();
        let dest = temp.path().join("work");
        let archive = temp.path().join("tmp.tar.gz");
        fs::write(
            &archive,
            tar_gz_link("d/x.mmdb", &secret, tar::EntryType::Symlink),
        )
        .unwrap();

        let err = TarGzExtractor::new().extract(&archive, &dest).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(fs::symlink_metadata(dest.join("d/x.mmdb")).is_err());
    }

    #[test]
    fn test_extract_rejects_hard_link() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("tmp.tar.gz");
        fs::write(
            &archive,
            tar_gz_link("d/x.mmdb", Path::new("/etc/hostname"), tar::EntryType::Link),
        )
        .unwrap();

        let result = TarGzExtractor::new().extract(&archive, &temp.path().join("work"));
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_corrupt_archive() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("tmp.tar.gz");
        fs::write(&archive, b"this is not gzip").unwrap();

        let result = TarGzExtractor::new().extract(&archive, temp.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_missing_archive() {
        let temp = TempDir::new().unwrap();
        let result = TarGzExtractor::new().extract(&temp.path().join("none.tar.gz"), temp.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_count_files_recursive() {
        let temp = TempDir::new().unwrap();

        fs::write(temp.path().join("file1.txt"), "a").unwrap();
        fs::write(temp.path().join("file2.txt"), "b").unwrap();

        let subdir = temp.path().join("subdir");
        fs::create_dir(&subdir).unwrap();
        fs::write(subdir.join("file3.txt"), "c").unwrap();

        assert_eq!(count_files_recursive(temp.path()).unwrap(), 3);
    }

    #[test]
    fn test_count_files_nonexistent_dir() {
        let count = count_files_recursive(Path::new("/nonexistent/path")).unwrap();
        assert_eq!(count, 0);
    }
}
