//! Proof-of-Authority validator onboarding for an L1.
//!
//! - `genesis`: builds the L1 genesis with the validator manager, its
//!   library and an EIP-1967 proxy pre-deployed.
//! - `registration`: registers a new validator through the manager and
//!   collects a signed `RegisterL1Validator` warp message.
//!
//! Every step persists its results under the data directory, so an
//! interrupted run can be repeated safely.

pub mod codec;
pub mod config;
pub mod evm;
pub mod genesis;
pub mod identity;
pub mod ids;
pub mod registration;
pub mod storage;
pub mod warp;

pub use config::OnboardConfig;
pub use registration::{RegistrationError, RegistrationOutcome, RegistrationPipeline};
