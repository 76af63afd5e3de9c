pub mod executor;
pub mod priority_work_queue;
pub(crate) mod run_state;
mod result;
mod step_state;

pub use executor::ChainExecutor;
pub use result::BuildResult;
pub use run_state::InitialItems;
pub use step_state::StepState;
