pub mod git;
pub mod github;

// Re-exports
pub use git::*;
pub use github::*;
