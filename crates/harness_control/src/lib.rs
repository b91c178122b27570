pub mod cli;
pub mod control;
pub mod docker;
pub mod images;
pub mod prompt;
pub mod runtime;
