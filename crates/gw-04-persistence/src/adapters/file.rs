//! Directory-of-files backend.
//!
//! Each key is one `<key>.bin` file. A `/` in a key is stored as `%2F` so
//! every key maps to a single file in the directory. Writes go through a
//! temporary file and a rename.

use crate::domain::PersistError;
use crate::ports::StorageBackend;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const EXTENSION: &str = "bin";

#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Opens `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// `Io` when the directory cannot be created.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, PersistError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| PersistError::io(&dir.display().to_string(), &e))?;
        info!(dir = %dir.display(), "Persistence directory ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file = key.replace('/', "%2F");
        self.dir.join(format!("{file}.{EXTENSION}"))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistError::io(key, &e)),
        }
    }

    fn write(&mut self, key: &str, value: &[u8]) -> Result<(), PersistError> {
        let path = self.path_for(key);
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| PersistError::io(key, &e))?;
        file.write_all(value).map_err(|e| PersistError::io(key, &e))?;
        file.sync_all().map_err(|e| PersistError::io(key, &e))?;
        fs::rename(&temp_path, &path).map_err(|e| PersistError::io(key, &e))?;
        debug!(key, bytes = value.len(), "Wrote blob");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistError::io(key, &e)),
        }
    }

    fn contains(&self, key: &str) -> Result<bool, PersistError> {
        Ok(self.path_for(key).is_file())
    }

    fn clear(&mut self) -> Result<(), PersistError> {
        let dir = self.dir.display().to_string();
        for entry in fs::read_dir(&self.dir).map_err(|e| PersistError::io(&dir, &e))? {
            let path = entry.map_err(|e| PersistError::io(&dir, &e))?.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                fs::remove_file(&path).map_err(|e| PersistError::io(&dir, &e))?;
            }
        }
        Ok(())
    }
}
