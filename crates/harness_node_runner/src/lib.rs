pub mod args;
pub mod errors;
pub mod runner;
pub mod secrets;
