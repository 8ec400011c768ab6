//! Certificate renewal for CDN endpoints.

mod decision;
mod interrupt;
mod orchestrator;

pub use decision::{RENEWAL_THRESHOLD_SECS, RenewalDecision, evaluate};
pub use interrupt::Interrupt;
pub use orchestrator::{
    BatchEntry, BatchPolicy, BatchReport, Leftover, RenewalError, RenewalOutcome, RenewalStep,
    Renewer, StepError,
};
