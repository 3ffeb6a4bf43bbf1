use std::path::{Path, PathBuf};

pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
}

#[derive(Clone)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(storage_dir)?;
        Ok(BackendLocal {
            base_dir: storage_dir.to_path_buf(),
        })
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        std::fs::metadata(self.base_dir.join(ident)).is_ok()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.base_dir.join(ident))
    }

    // Atomic replace: readers never observe a partially written file.
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        let path = self.base_dir.join(ident);
        let temp_path = self.base_dir.join(format!("{ident}.tmp"));

        if let Err(err) = std::fs::write(&temp_path, data) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(err);
        }

        std::fs::rename(&temp_path, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = BackendLocal::new(tmp.path()).unwrap();

        backend.write("hello.json", b"[1,2,3]").unwrap();
        assert!(backend.exists("hello.json"));
        assert_eq!(backend.read("hello.json").unwrap(), b"[1,2,3]");

        // no temp file left behind
        assert!(!backend.exists("hello.json.tmp"));
    }

    #[test]
    fn test_write_replaces_previous_content() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = BackendLocal::new(tmp.path()).unwrap();

        backend.write("a.json", b"old").unwrap();
        backend.write("a.json", b"new").unwrap();
        assert_eq!(backend.read("a.json").unwrap(), b"new");
    }
}
