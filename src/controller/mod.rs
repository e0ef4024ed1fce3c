pub mod fsm;
mod registry;

pub use fsm::{
    ControllerEvent, ControllerState, DIAGNOSIS_FAILED_MESSAGE, DiagnosisController, FormState,
    MISSING_DESCRIPTION_MESSAGE, Outcome, SessionView, SharedController, Submission,
};
pub use registry::{DEFAULT_IDLE_TTL_SECS, DEFAULT_MAX_SESSIONS, SessionRegistry};
