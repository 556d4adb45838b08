pub mod inspector;
pub mod sink;
pub mod source;
pub mod transformer;
pub mod types;
