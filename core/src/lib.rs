pub mod cookie;
pub mod types;
