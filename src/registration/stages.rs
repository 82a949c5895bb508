//! Registration Stages.
//!
//! The ordered stages of one validator registration.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegistrationStage {
    /// 0. Not started.
    Idle,
    /// 1. Looking for a completed signed message.
    CheckArtifacts,
    /// 2. Loading chain, subnet, node and owner identities.
    LoadIdentity,
    /// 3. Loading or creating the persisted expiry.
    ResolveExpiry,
    /// 4. Encoding the payload and deriving the validation id.
    BuildMessage,
    /// 5. Calling the validator manager on-chain.
    Initiate,
    /// 6. Collecting the quorum signature.
    Aggregate,
    /// 7. Writing the signed message.
    Persist,
    /// 8. Done.
    Complete,
}

impl RegistrationStage {
    /// Returns the next logical stage.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::CheckArtifacts),
            Self::CheckArtifacts => Some(Self::LoadIdentity),
            Self::LoadIdentity => Some(Self::ResolveExpiry),
            Self::ResolveExpiry => Some(Self::BuildMessage),
            Self::BuildMessage => Some(Self::Initiate),
            Self::Initiate => Some(Self::Aggregate),
            Self::Aggregate => Some(Self::Persist),
            Self::Persist => Some(Self::Complete),
            Self::Complete => None,
        }
    }

    /// Whether the stage talks to the chain or the aggregator.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Initiate | Self::Aggregate)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CheckArtifacts => "check-artifacts",
            Self::LoadIdentity => "load-identity",
            Self::ResolveExpiry => "resolve-expiry",
            Self::BuildMessage => "build-message",
            Self::Initiate => "initiate",
            Self::Aggregate => "aggregate",
            Self::Persist => "persist",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for RegistrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
