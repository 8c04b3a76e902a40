//! Domain models shared by the services, ports and store adapters.

pub mod feature;
pub mod review;
pub mod schema;
pub mod security;

pub use feature::{FeatureNodeInput, InsertedFeature, NewSubmissionFeature, SubmissionFeature};
pub use review::{DatasetReviewRow, ReviewEntry};
pub use schema::{SchemaProperty, SemanticType};
pub use security::{
    NodeSecurity, PatchOutcome, PersecutionHarmException, PersecutionHarmRule, SecurityAssignment,
    SecurityCategory, SecurityRule, SecuritySnapshot, SecurityStatus, SecurityTarget,
};
