mod session;
mod types;

pub use session::ConditionalSession;
pub use types::{
    CancelStep, EnumerationStep, ReplyStep, SelectionRejected, SessionState, ValidationStep,
};
