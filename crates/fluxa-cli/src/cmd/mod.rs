pub mod actions;
pub mod generate;
pub mod validate;
