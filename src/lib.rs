//! Command-line parameter handling and log scraping for optical media
//! dumping tools.
//!
//! The [`params`] module models the grammars of DiscImageCreator and
//! redumper: building a command line from discrete fields, reloading a
//! hand-edited one, and rendering it back out. The [`extract`] and
//! [`assemble`] modules turn the log files a finished dump leaves
//! behind into a [`submission::SubmissionInfo`] record.

pub mod assemble;
pub mod config;
pub mod extract;
pub mod media;
pub mod params;
pub mod submission;

pub use config::Config;
pub use media::{MediaType, Platform};
pub use params::{AnyParams, DumpTool, ToolParams};
pub use submission::SubmissionInfo;
