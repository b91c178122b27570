pub mod command;
pub mod dumping;
pub mod path;
pub mod run_until;
pub mod template;
pub mod tracing_utils;
