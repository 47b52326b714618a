//! Image Renamer - review a folder of images one by one, pick a square crop,
//! and file each crop as `{COLOR}-{GRAIN}[_flip].jpg` under a folder named
//! after the color code.

pub mod app;
pub mod canvas;
pub mod codec;
pub mod config;
pub mod error;
pub mod files;
pub mod rename;
pub mod session;

pub use error::SessionError;
