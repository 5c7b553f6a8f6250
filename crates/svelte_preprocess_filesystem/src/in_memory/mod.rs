mod file_system;

pub use self::file_system::*;
