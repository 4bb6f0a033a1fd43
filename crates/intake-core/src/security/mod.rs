//! Format-aware security risk assessment for single files.

mod deep;
mod validator;

pub use validator::{RiskLevel, SecurityResult, SecurityValidator};
