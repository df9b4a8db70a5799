mod common;
mod suitability;
