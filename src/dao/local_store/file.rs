use std::{
    fmt::Write as _,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::dao::{
    local_store::LocalStore,
    storage::{StorageError, StorageResult},
};

/// Directory-backed store: one file per key, replaced atomically on write.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| {
            StorageError::unavailable(format!("cannot create `{}`", dir.display()), source)
        })?;
        Ok(Self { dir })
    }

    /// Directory holding the entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(encode_key(key))
    }
}

/// Map a key onto a file name; `_` is the escape byte so distinct keys never collide.
fn encode_key(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            name.push(byte as char);
        } else {
            let _ = write!(name, "_{byte:02x}");
        }
    }
    name
}

impl LocalStore for FileStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::unavailable(
                format!("cannot read `{}`", path.display()),
                err,
            )),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value).map_err(|source| {
            StorageError::unavailable(format!("cannot write `{}`", tmp.display()), source)
        })?;
        fs::rename(&tmp, &path).map_err(|source| {
            StorageError::unavailable(format!("cannot replace `{}`", path.display()), source)
        })
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::unavailable(
                format!("cannot remove `{}`", path.display()),
                err,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_keys_do_not_collide() {
        assert_eq!(encode_key("play-run:abc"), "play-run_3aabc");
        assert_ne!(encode_key("a:b"), encode_key("a_b"));
    }

    #[test]
    fn round_trips_values_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested")).unwrap();

        assert_eq!(store.get_item("play-run:1").unwrap(), None);
        store.set_item("play-run:1", r#"{"stepIndex":2}"#).unwrap();
        assert_eq!(
            store.get_item("play-run:1").unwrap().as_deref(),
            Some(r#"{"stepIndex":2}"#)
        );

        let reopened = FileStore::open(store.dir()).unwrap();
        assert!(reopened.get_item("play-run:1").unwrap().is_some());

        store.remove_item("play-run:1").unwrap();
        store.remove_item("play-run:1").unwrap();
        assert_eq!(store.get_item("play-run:1").unwrap(), None);
    }
}
