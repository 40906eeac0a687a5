pub mod file_read;
pub mod file_save;
pub mod file_search;
pub mod web_search;

pub use file_read::FileReadTool;
pub use file_save::FileSaveTool;
pub use file_search::FileSearchTool;
pub use web_search::WebSearchTool;
