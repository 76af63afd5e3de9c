use crate::step::StepContext;

/// Error type returned by step bodies.
///
/// Boxed so that a body can use `?` on any error type it touches.
pub type StepError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The invocable part of a step.
///
/// A body is synchronous and should be short. It reads its inputs from and
/// publishes its outputs to the [`StepContext`]; nothing it publishes becomes
/// visible to other steps until it returns `Ok`.
///
/// Closures of the right shape implement this trait, so most callers never
/// name it:
///
/// ```rust
/// use the_buildchain::step::{StepContext, StepDeclaration, StepError};
///
/// let step = StepDeclaration::new("noop", |_ctx: &mut StepContext| -> Result<(), StepError> {
///     Ok(())
/// });
/// assert_eq!(step.id(), "noop");
/// ```
pub trait StepBody: Send + Sync + 'static {
    fn execute(&self, ctx: &mut StepContext) -> Result<(), StepError>;
}

impl<F> StepBody for F
where
    F: Fn(&mut StepContext) -> Result<(), StepError> + Send + Sync + 'static,
{
    fn execute(&self, ctx: &mut StepContext) -> Result<(), StepError> {
        self(ctx)
    }
}
