//! Dataset discovery.
//!
//! - **Challenge** (`challenge`): weekly dataset access, the `ChallengeSource` seam
//! - **Naming** (`naming`): the candidate filename convention
//! - **Navigator** (`navigator`): target filtering, candidate enumeration, and
//!   materialization into the working directory

pub mod challenge;
pub mod naming;
pub mod navigator;

pub use challenge::{ChallengeData, ChallengeSource};
pub use naming::CandidateName;
pub use navigator::{
    DiscoveredCandidate, MaterializedTarget, Navigator, RejectedCandidate, Target, TargetId,
    TargetScan,
};
