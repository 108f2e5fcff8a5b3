pub mod adapters;
pub mod contracts;
pub mod error;
pub mod extractor;

pub use adapters::*;
pub use contracts::*;
pub use error::*;
pub use extractor::*;
