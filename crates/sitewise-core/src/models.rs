pub mod capability;
pub mod duplicate;
pub mod intent;
pub mod project;
pub mod response;
pub mod session;
pub mod validation;

pub use capability::{CapabilityRequest, CapabilityResponse};
pub use duplicate::{DuplicateGroup, DuplicateMatch};
pub use intent::{Capability, Intent, IntentAlternative, IntentType};
pub use project::{
    Coordinates, ProjectMetadata, ProjectRecord, ProjectStatus, ProjectSummary, ProjectUpdate,
    Stage,
};
pub use response::{
    Artifact, ArtifactAction, OrchestratorRequest, OrchestratorResponse, RequestContext,
    ResponseMetadata, TraceStatus, TraceStep,
};
pub use session::{PendingDuplicateCheck, SessionContext, MAX_PROJECT_HISTORY};
pub use validation::{InvalidValue, ValidationResult};
