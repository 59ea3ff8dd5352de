//! Core types shared across the scanning engine.

pub mod domain;
pub mod scanerror;

pub use scanerror::ScanError;
