pub use self::block::*;
pub use self::json::*;
pub use parcel_sourcemap::{Mapping, OriginalLocation, SourceMap, SourceMapError};

mod block;
mod json;
