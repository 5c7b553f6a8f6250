use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

/// In-memory file-system for testing
pub mod in_memory;

/// File-system implementation using std::fs
pub mod os_file_system;

mod normalize_path;

pub use in_memory::InMemoryFileSystem;
pub use normalize_path::normalize_path;
pub use os_file_system::OsFileSystem;

/// Shared handle to the file system external block sources are read from
pub type FileSystemRef = Arc<dyn FileSystem + Send + Sync>;

/// Trait abstracting the file-system reads the preprocessor performs
#[mockall::automock]
pub trait FileSystem: std::fmt::Debug {
  /// Directory that relative component filenames are resolved against
  fn cwd(&self) -> std::io::Result<PathBuf> {
    Err(std::io::Error::new(
      std::io::ErrorKind::Other,
      "Not implemented: FileSystem::cwd",
    ))
  }

  fn read_to_string(&self, path: &Path) -> std::io::Result<String>;
}
