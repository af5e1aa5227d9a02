pub mod commands;
pub mod policy;
pub mod queries;

pub use commands::*;
pub use policy::*;
pub use queries::*;
