//! dustoff - find and clean up files nobody has touched in a long time.
//!
//! The engine walks a directory tree up to a fixed entry cap, records
//! per-entry metadata, and performs permanent deletes, trash moves and
//! relocations on whatever paths a shell hands back. Filtering and sorting
//! are pure functions the shell can re-run without rescanning.

pub mod action;
pub mod cleaner;
pub mod commands;
pub mod entry;
pub mod error;
pub mod filter;
pub mod scanner;
pub mod selector;
pub mod session;
pub mod size;

pub use action::{ActionDescriptor, ActionKind, execute, propose};
pub use cleaner::{BatchOutcome, Cleaner, NoTrash, SystemTrash, TrashStore};
pub use commands::{delete_file, move_file, move_to_trash, scan_folder};
pub use entry::{FileEntry, extension_of};
pub use error::{CleanupError, FailureKind, Result};
pub use filter::{ExtensionFilter, Filters, SortKey};
pub use scanner::{MAX_ENTRIES, ScanResult, walk};
pub use session::Session;
