use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dispatch::BackendKind;
use crate::status::OperationKind;

/// Raw credential identifier bytes.
///
/// Displayed as base64url (no padding) so identifiers can be logged without
/// leaking arbitrary binary into log lines.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct CredentialId(Vec<u8>);

impl CredentialId {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for CredentialId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for CredentialId {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(&self.0))
    }
}

impl fmt::Debug for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialId({self})")
    }
}

/// Authenticator transports a credential can be reached over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Usb,
    Nfc,
    Ble,
    Hybrid,
    Internal,
}

/// An entry of an allow list or exclude list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    pub id: CredentialId,
    #[serde(default)]
    pub transports: Vec<Transport>,
}

impl CredentialDescriptor {
    pub fn new(id: impl Into<CredentialId>) -> Self {
        Self {
            id: id.into(),
            transports: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidentKey {
    Required,
    #[default]
    Preferred,
    Discouraged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mediation {
    #[default]
    None,
    Conditional,
    Immediate,
}

/// Payment context attached to a payment-bound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentContext {
    pub payee_origin: Option<String>,
    pub total: String,
    pub currency: String,
}

/// Origin override supplied by an enterprise-allowlisted remote desktop client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDesktopOverride {
    pub origin: String,
    pub same_origin_with_ancestors: bool,
}

/// Fields shared by create and get requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCommon {
    pub rp_id: String,
    pub challenge: Vec<u8>,
    pub origin: String,
    pub top_origin: Option<String>,
    /// Filled in from the security check result before any backend sees the request.
    #[serde(default)]
    pub is_cross_origin: bool,
    /// Absent when the caller computes its own client data.
    pub client_data_hash: Option<Vec<u8>>,
    pub payment: Option<PaymentContext>,
    pub remote_desktop_override: Option<RemoteDesktopOverride>,
}

impl RequestCommon {
    pub fn new(rp_id: impl Into<String>, origin: impl Into<String>, challenge: Vec<u8>) -> Self {
        Self {
            rp_id: rp_id.into(),
            challenge,
            origin: origin.into(),
            top_origin: None,
            is_cross_origin: false,
            client_data_hash: None,
            payment: None,
            remote_desktop_override: None,
        }
    }

    pub fn is_payment(&self) -> bool {
        self.payment.is_some()
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct UserEntity {
    pub id: Vec<u8>,
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// A credential creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub common: RequestCommon,
    pub user: UserEntity,
    #[serde(default)]
    pub exclude_credentials: Vec<CredentialDescriptor>,
    /// COSE algorithm identifiers, in preference order.
    pub algorithms: Vec<i32>,
    #[serde(default)]
    pub resident_key: ResidentKey,
    #[serde(default)]
    pub echo_cred_props: bool,
    /// Conditional create, serviced by the identity broker.
    #[serde(default)]
    pub is_conditional: bool,
}

/// A credential assertion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    pub common: RequestCommon,
    /// Empty means any discoverable credential.
    #[serde(default)]
    pub allow_credentials: Vec<CredentialDescriptor>,
    #[serde(default)]
    pub mediation: Mediation,
    pub app_id: Option<String>,
}

impl GetRequest {
    pub fn has_allow_credentials(&self) -> bool {
        !self.allow_credentials.is_empty()
    }

    pub fn is_allowed(&self, id: &CredentialId) -> bool {
        self.allow_credentials.iter().any(|d| &d.id == id)
    }

    /// Narrow the request to the single credential the user picked.
    pub(crate) fn restrict_to(&mut self, id: CredentialId) {
        self.allow_credentials = vec![CredentialDescriptor {
            id,
            transports: vec![Transport::Internal],
        }];
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialRequest {
    Create(CreateRequest),
    Get(GetRequest),
}

impl CredentialRequest {
    pub fn common(&self) -> &RequestCommon {
        match self {
            Self::Create(req) => &req.common,
            Self::Get(req) => &req.common,
        }
    }

    pub(crate) fn common_mut(&mut self) -> &mut RequestCommon {
        match self {
            Self::Create(req) => &mut req.common,
            Self::Get(req) => &mut req.common,
        }
    }

    pub fn operation(&self) -> OperationKind {
        match self {
            Self::Create(_) => OperationKind::Create,
            Self::Get(_) => OperationKind::Get,
        }
    }
}

/// A credential known to one of the backends, as shown in the picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSummary {
    pub credential_id: CredentialId,
    pub user_id: Vec<u8>,
    pub user_name: String,
    pub user_display_name: String,
    pub is_discoverable: bool,
    #[serde(default)]
    pub is_payment: bool,
    /// Backend that listed this credential.
    pub source: BackendKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReply {
    pub credential_id: CredentialId,
    pub attestation_object: Vec<u8>,
    pub client_data_json: Option<Vec<u8>>,
    #[serde(default)]
    pub transports: Vec<Transport>,
    /// Set by the backend if it reported credProps.
    pub has_resident_key: Option<bool>,
    #[serde(default)]
    pub echo_cred_props: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetReply {
    pub credential_id: CredentialId,
    pub authenticator_data: Vec<u8>,
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
    pub client_data_json: Option<Vec<u8>>,
    #[serde(default)]
    pub echo_app_id: bool,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordReply {
    pub id: String,
    pub password: String,
}

impl fmt::Debug for PasswordReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordReply")
            .field("id", &self.id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What the unified broker may return for a get request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GetCredentialReply {
    Assertion(GetReply),
    Password(PasswordReply),
}

/// Successful terminal result of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialResponse {
    Created(CreateReply),
    Asserted(GetReply),
    Password(PasswordReply),
}

impl From<GetCredentialReply> for CredentialResponse {
    fn from(reply: GetCredentialReply) -> Self {
        match reply {
            GetCredentialReply::Assertion(r) => Self::Asserted(r),
            GetCredentialReply::Password(p) => Self::Password(p),
        }
    }
}
