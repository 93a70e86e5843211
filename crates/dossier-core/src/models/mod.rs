pub mod category;
pub mod file;

pub use category::FileCategory;
pub use file::{FileMetadata, NewFileMetadata};
