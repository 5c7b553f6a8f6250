use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// Removes `.` and `..` components without touching the disk
pub fn normalize_path(path: &Path) -> PathBuf {
  let mut result: Vec<Component<'_>> = Vec::new();

  for component in path.components() {
    match component {
      Component::Prefix(prefix) => result = vec![Component::Prefix(prefix)],
      Component::RootDir => result.push(Component::RootDir),
      Component::CurDir => {}
      Component::ParentDir => match result.last() {
        Some(Component::Normal(_)) => {
          result.pop();
        }
        Some(Component::RootDir | Component::Prefix(_)) => {}
        _ => result.push(Component::ParentDir),
      },
      Component::Normal(name) => result.push(Component::Normal(name)),
    }
  }

  PathBuf::from_iter(result)
}
