pub mod builder;
pub mod io;

pub use builder::{CatalogBuilder, CatalogKeys};
pub use io::{AnnotationReader, AnnotationRecord, Dialect, ParseError};
