pub mod fixtures;
pub mod patents;
