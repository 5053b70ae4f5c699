//! # patchnote
//!
//! Turns the commits of a game repository into a draft release announcement
//! with a screenshot banner, ready for human approval.
//!
//! The pipeline runs per release:
//!
//! - [`classify`] separates player-facing commits from internal ones.
//! - [`resolve`] picks at most one screenshot for those commits.
//! - [`banner`] crops, enhances and overlays it into a fixed-size banner.
//! - [`announce`] writes the text and [`notify`] stores the draft.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod ai;
pub mod announce;
pub mod banner;
pub mod classify;
pub mod cli;
pub mod config;
pub mod data;
pub mod git;
pub mod notify;
pub mod pipeline;
pub mod resolve;
pub mod utils;

pub use crate::cli::Cli;
pub use crate::pipeline::{ReleaseOutcome, ReleasePipeline};

/// The current version of patchnote.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
