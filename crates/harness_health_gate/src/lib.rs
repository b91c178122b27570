pub mod cli;
pub mod gate;
pub mod probe;
