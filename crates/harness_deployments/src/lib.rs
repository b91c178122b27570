pub mod compose;
pub mod deployment;
