pub mod dropbox;
pub mod filesystem;
