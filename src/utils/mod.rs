//! Shared helpers

pub mod validation;

pub use validation::NumericValidator;
