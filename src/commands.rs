pub mod help;
pub mod quotes;
