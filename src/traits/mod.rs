pub mod step_body;

pub use step_body::{StepBody, StepError};
