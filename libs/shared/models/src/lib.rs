pub mod error;
pub mod tool;
