mod translate;
mod types;

pub use translate::{codes, translate, translate_failure};
pub use types::{AuthStatus, BackendFailure, OperationKind, Outcome};
