//! Account service models

pub mod account;
pub mod collaboration;

// Re-export for convenience
pub use account::{
    Account, AccountProfile, Credentials, ProfileFields, RegisterRequest, UpdateProfileRequest,
};
pub use collaboration::{
    Collaboration, CreateCollaborationRequest, CreateDocumentRequest, Document,
    InviteMemberRequest,
};
