// Library surface for the binary, headless integration tests and reuse.
pub mod app;
pub mod app_dirs;
pub mod catalog;
pub mod celebration;
pub mod config;
pub mod image_cache;
pub mod image_loader;
pub mod picture;
pub mod round;
pub mod runtime;
pub mod session;
pub mod ui;
