mod request;
mod response;

pub use request::{
    BulkDeleteRequest, ConfirmParams, DuplicatesParams, ListParams, MergeRequest, RenameRequest,
    SearchParams,
};
pub use response::{CapabilityStatus, DeleteResponse, HealthResponse, ReadinessResponse};
