pub mod client;
pub mod types;

pub use client::{RiskAssessor, VerdictClient, build_service_client};
pub use types::{Draft, Verdict, VerdictLevel};
