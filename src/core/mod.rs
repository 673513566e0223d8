pub mod extractor;
pub mod pipeline;
pub mod refresh;
pub mod store;

pub use crate::domain::model::{Record, Snapshot};
pub use crate::domain::ports::{Assembler, HtmlFetcher};
pub use crate::utils::error::Result;
