//! Variant resolution.
//!
//! [`VariantSelector`] picks one variant of a component for one request,
//! [`CapabilityConflictResolver`] arbitrates between everything selected,
//! and [`ResolutionSession`] drives both over a whole graph. Selection is
//! pure and deterministic: all I/O happens before a session is resolved.

pub mod capabilities;
pub mod errors;
pub mod selector;
pub mod session;
pub mod version;

pub use capabilities::{
    CapabilityConflict, CapabilityConflictResolver, CapabilityOutcome, CapabilityResolution,
    CapabilityRules, ConflictCandidate,
};
pub use errors::{
    AmbiguousCandidate, AttributeTable, CapabilityConflictDetail, CapabilityRejection,
    ConflictingVariant, FailureDetail, FailureKind, RejectedCandidate, SelectionFailure,
    DEFAULT_RESOLUTION_PREFIX,
};
pub use selector::VariantSelector;
pub use session::{
    Edge, EdgeSource, ReportedFailure, ResolutionReport, ResolutionSession, ResolvedGraph,
    ResolvedVariant, SessionError, SessionFailure,
};
pub use version::CapabilityVersion;
