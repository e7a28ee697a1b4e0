pub mod catalog;
pub mod handler;
pub mod server;

pub use catalog::ToolCatalog;
pub use handler::{ToolEntry, ToolHandler};
pub use server::{FilteredToolServer, ToolServer};
