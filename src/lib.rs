pub mod app;
pub mod cli;
pub mod config;
pub mod exec;
pub mod git;
pub mod github;
pub mod orchestrator;
pub mod render;
pub mod scan;
pub mod testing;
