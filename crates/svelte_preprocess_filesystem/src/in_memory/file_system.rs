use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use parking_lot::RwLock;

use crate::normalize_path;
use crate::FileSystem;

#[cfg(not(target_os = "windows"))]
fn root_dir() -> PathBuf {
  PathBuf::from("/")
}

#[cfg(target_os = "windows")]
fn root_dir() -> PathBuf {
  PathBuf::from("C:/")
}

/// In memory implementation of the `FileSystem` trait, for testing purposes.
#[derive(Debug)]
pub struct InMemoryFileSystem {
  files: RwLock<HashMap<PathBuf, String>>,
  current_working_directory: RwLock<PathBuf>,
}

impl Default for InMemoryFileSystem {
  fn default() -> Self {
    Self {
      files: Default::default(),
      current_working_directory: RwLock::new(root_dir()),
    }
  }
}

impl InMemoryFileSystem {
  /// Change the current working directory. Used for resolving relative paths.
  pub fn set_current_working_directory(&self, cwd: &Path) {
    let cwd = self.resolve(cwd);
    *self.current_working_directory.write() = cwd;
  }

  pub fn write_file(&self, path: &Path, contents: impl Into<String>) {
    let path = self.resolve(path);
    self.files.write().insert(path, contents.into());
  }

  fn resolve(&self, path: &Path) -> PathBuf {
    normalize_path(&self.current_working_directory.read().join(path))
  }
}

impl FileSystem for InMemoryFileSystem {
  fn cwd(&self) -> io::Result<PathBuf> {
    Ok(self.current_working_directory.read().clone())
  }

  fn read_to_string(&self, path: &Path) -> io::Result<String> {
    let path = self.resolve(path);
    self.files.read().get(&path).cloned().ok_or_else(|| {
      io::Error::new(
        io::ErrorKind::NotFound,
        format!("File not found: {}", path.display()),
      )
    })
  }
}
