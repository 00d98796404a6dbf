//! Derived features

mod temporal;

pub use temporal::{Season, TemporalFeatureDeriver};
