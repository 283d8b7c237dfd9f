mod types;

pub use types::{
    CreateReply, CreateRequest, CredentialDescriptor, CredentialId, CredentialRequest,
    CredentialResponse, CredentialSummary, GetCredentialReply, GetReply, GetRequest, Mediation,
    PasswordReply, PaymentContext, RemoteDesktopOverride, RequestCommon, ResidentKey, Transport,
    UserEntity,
};
