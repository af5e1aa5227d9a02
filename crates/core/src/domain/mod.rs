pub mod branch;
pub mod repo;
pub mod results;
pub mod status;
pub mod url;

// Re-exports for convenience
pub use branch::*;
pub use repo::*;
pub use results::*;
pub use status::*;
pub use url::*;
