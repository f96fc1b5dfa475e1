//! Command implementations.

pub mod check;
pub mod corpus;
pub mod fields;
