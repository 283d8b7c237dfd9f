mod policy;
mod types;

pub use policy::{decide, resolve_matching_check};
pub use types::{
    BackendKind, DispatchInput, DispatchMode, ParseSupportLevelError, SupportLevel,
};
