pub mod memory;
pub mod tantivy;
