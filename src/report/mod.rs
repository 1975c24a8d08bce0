pub mod writer;
pub mod summary;

pub use writer::{CountsWriter, RowOrder};
pub use summary::RunSummary;
