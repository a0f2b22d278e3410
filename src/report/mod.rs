pub mod document;
pub mod generator;

pub use document::PagedDocument;
pub use generator::{ReportGenerator, ReportSnapshot};
