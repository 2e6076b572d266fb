pub mod browser;
pub mod editor;
pub mod nodes;
pub mod paths;
pub mod tree;
pub mod types;

// Re-export handlers for route registration
pub use browser::list_files;
pub use editor::{create_file, create_folder, get_file_content, save_file_content};
pub use nodes::{delete_node, move_node, rename_node};
