//! Local theme directory
//!
//! Directory walk, reads, atomic writes, and deletes relative to the
//! theme root.

pub mod error;
mod theme_dir;

pub use error::{LocalError, LocalResult};
pub use theme_dir::{DeleteOutcome, LocalTheme, WriteOutcome, THEME_DIRECTORIES};
