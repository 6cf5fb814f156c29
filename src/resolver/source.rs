use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where source images come from.
pub trait ImageSource: Send + Sync {
    /// Current image set, in a stable order.
    fn list_images(&self) -> io::Result<Vec<String>>;

    fn read_image(&self, filename: &str) -> io::Result<Vec<u8>>;
}

/// Lists a directory on every call, keeping files with the configured extension.
pub struct DirectoryImageSource {
    dir: PathBuf,
    extension: String,
}

impl DirectoryImageSource {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: normalize_extension(&extension.into()),
        }
    }
}

impl ImageSource for DirectoryImageSource {
    fn list_images(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            if !has_extension(&path, &self.extension) {
                continue;
            }

            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }

        // read_dir order is platform dependent
        names.sort();
        Ok(names)
    }

    fn read_image(&self, filename: &str) -> io::Result<Vec<u8>> {
        // Names come from list_images, but never leave the directory.
        if Path::new(filename).file_name().and_then(|n| n.to_str()) != Some(filename) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid image name '{}'", filename),
            ));
        }
        fs::read(self.dir.join(filename))
    }
}

/// `".jpeg"` and `"jpeg"` name the same extension.
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_string()
}

pub(crate) fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_matching_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.jpeg", "a.jpeg", "b.png", "notes.txt", "d.jpg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.jpeg")).unwrap();

        let source = DirectoryImageSource::new(dir.path(), "jpeg");
        assert_eq!(source.list_images().unwrap(), vec!["a.jpeg", "c.jpeg"]);
    }

    #[test]
    fn extension_may_carry_a_leading_dot() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"x").unwrap();

        let source = DirectoryImageSource::new(dir.path(), ".png");
        assert_eq!(source.list_images().unwrap(), vec!["a.png"]);
    }

    #[test]
    fn normalized_extension_matches_path_extension() {
        for raw in ["jpeg", ".jpeg", " .jpeg "] {
            assert!(has_extension(Path::new("a.jpeg"), &normalize_extension(raw)));
        }
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectoryImageSource::new(dir.path().join("missing"), "jpeg");
        assert!(source.list_images().is_err());
    }

    #[test]
    fn rescans_on_every_call() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectoryImageSource::new(dir.path(), "jpeg");
        assert!(source.list_images().unwrap().is_empty());

        fs::write(dir.path().join("new.jpeg"), b"x").unwrap();
        assert_eq!(source.list_images().unwrap(), vec!["new.jpeg"]);
    }

    #[test]
    fn reads_only_inside_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jpeg"), b"bytes").unwrap();

        let source = DirectoryImageSource::new(dir.path(), "jpeg");
        assert_eq!(source.read_image("a.jpeg").unwrap(), b"bytes");
        assert_eq!(
            source.read_image("../a.jpeg").unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );
    }
}
