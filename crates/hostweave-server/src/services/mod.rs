//! Built-in modules.

mod error_page;
mod file_sender;
mod home;

pub use error_page::ErrorPage;
pub use file_sender::{content_type, FileSender};
pub use home::HomeModule;
