//! Utility functions and helpers.

pub mod general;
pub mod preflight;
pub mod settings;

pub use general::*;
pub use preflight::{check_ai_credentials, check_git_repository};
pub use settings::{get_env_var, get_env_vars, Settings};
