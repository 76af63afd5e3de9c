// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Chain executor: dependency counting over a bounded worker pool.
//!
//! # Execution Flow
//!
//! 1. **Setup**: check the initial items against the chain and allocate run
//!    state; every step starts `Pending` with a count of unfinished upstream
//!    producers
//! 2. **Seeding**: steps with no upstream go straight to the ready queue
//! 3. **Dispatch loop**: while fewer than `max_concurrency` steps run, pop the
//!    next ready step (lowest wave, then declaration order) and hand it to the
//!    blocking pool; then wait for one completion on the channel
//! 4. **Completion**: on success commit the step's outputs and decrement its
//!    downstream counts, queueing any that reach zero; on failure record it
//!    and cancel the run
//! 5. **Result**: once nothing is queued or running, either aggregate the
//!    failures or snapshot the final items
//!
//! After a failure no new step is dispatched. Steps already running are
//! allowed to finish and their failures are collected too. Nothing a failed
//! run produced is returned.
//!
//! # Concurrency
//!
//! Step bodies are synchronous and run under `spawn_blocking`. The dispatch
//! loop owns the dependency counts, the ready queue and the state table, so
//! none of those need locks; workers report back over an `mpsc` channel.
//! The only state shared with workers is the run-scoped item storage.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::chain::{Chain, ChainStep, StepIndex};
use crate::config::consts::default_concurrency;
use crate::engine::priority_work_queue::{PrioritizedTask, PriorityWorkQueue};
use crate::engine::result::BuildResult;
use crate::engine::run_state::{InitialItems, RunState};
use crate::engine::step_state::{StepState, StepStates};
use crate::errors::{ContextError, ExecutionError, FailureCause, StepFailure};
use crate::observability::messages::engine::{
    DispatchStopped, RunCompleted, RunFailed, RunStarted, StepCompleted, StepDispatched,
    StepFailed,
};
use crate::observability::messages::StructuredLog;
use crate::step::{StagedOutputs, StepContext, StepError};

/// Runs assembled chains.
///
/// An executor holds only its options, so one executor can run many chains,
/// including concurrently.
///
/// ```rust
/// use the_buildchain::chain::ChainBuilder;
/// use the_buildchain::engine::{ChainExecutor, InitialItems};
/// use the_buildchain::item::{Item, ItemFlags, ItemRegistry, SimpleItem};
/// use the_buildchain::step::{StepContext, StepDeclaration, StepError};
///
/// struct Name(String);
/// impl Item for Name {}
/// impl SimpleItem for Name {}
///
/// struct Greeting(String);
/// impl Item for Greeting {}
/// impl SimpleItem for Greeting {}
///
/// let mut registry = ItemRegistry::new();
/// registry.register::<Greeting>(ItemFlags::FINAL);
/// let mut builder = ChainBuilder::new(registry);
/// builder.add_initial::<Name>().add_step(
///     StepDeclaration::new("greet", |ctx: &mut StepContext| -> Result<(), StepError> {
///         let name = ctx.get::<Name>()?;
///         ctx.publish(Greeting(format!("hello, {}", name.0)))?;
///         Ok(())
///     })
///     .consumes::<Name>()
///     .produces::<Greeting>(),
/// );
/// let chain = builder.build().unwrap();
///
/// let result = ChainExecutor::new(2)
///     .run_blocking(&chain, InitialItems::new().with(Name("world".into())))
///     .unwrap();
/// assert_eq!(result.get::<Greeting>().unwrap().0, "hello, world");
/// ```
#[derive(Debug, Clone)]
pub struct ChainExecutor {
    max_concurrency: usize,
    step_timeout: Option<Duration>,
}

impl Default for ChainExecutor {
    /// One worker per available core, no step timeout.
    fn default() -> Self {
        Self::new(default_concurrency())
    }
}

/// What a worker reports back to the dispatch loop.
struct Completion {
    step: StepIndex,
    outcome: Result<StagedOutputs, FailureCause>,
    duration: Duration,
}

impl ChainExecutor {
    /// Executor with at most `max_concurrency` steps running at once. Zero is
    /// treated as one.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            step_timeout: None,
        }
    }

    /// Fail any step whose body runs longer than `timeout`.
    ///
    /// The body cannot be interrupted; it keeps its worker thread until it
    /// returns, and whatever it publishes is discarded.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout
    }

    /// Run `chain` once.
    pub async fn run(&self, chain: &Chain, initial: InitialItems) -> Result<BuildResult, ExecutionError> {
        self.run_with_cancellation(chain, initial, CancellationToken::new())
            .await
    }

    /// Run `chain` once, stopping dispatch when `cancellation` fires.
    ///
    /// The executor also cancels the token itself on the first step failure,
    /// so a caller sharing it sees that too.
    pub async fn run_with_cancellation(
        &self,
        chain: &Chain,
        initial: InitialItems,
        cancellation: CancellationToken,
    ) -> Result<BuildResult, ExecutionError> {
        let outcome = self.drive(chain, initial, cancellation).await;
        match &outcome {
            Ok(result) => RunCompleted {
                executed_steps: chain.len(),
                final_items: result.len(),
                duration: result.duration(),
            }
            .log(),
            Err(error) => RunFailed { error }.log(),
        }
        outcome
    }

    /// Run `chain` on a fresh multi-threaded runtime, blocking the caller.
    ///
    /// Must not be called from inside a tokio runtime; async callers use
    /// [`run`](Self::run). Bodies that outlived their step timeout are left
    /// running in the background instead of being waited for.
    pub fn run_blocking(&self, chain: &Chain, initial: InitialItems) -> Result<BuildResult, ExecutionError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ExecutionError::Internal {
                message: "run_blocking called from within a tokio runtime; use run instead".into(),
            });
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| ExecutionError::Internal {
                message: format!("failed to start runtime: {}", e),
            })?;
        let outcome = runtime.block_on(self.run(chain, initial));
        runtime.shutdown_background();
        outcome
    }

    async fn drive(
        &self,
        chain: &Chain,
        initial: InitialItems,
        cancellation: CancellationToken,
    ) -> Result<BuildResult, ExecutionError> {
        let state = Arc::new(RunState::new(chain, initial)?);
        let started = Instant::now();

        RunStarted {
            step_count: chain.len(),
            wave_count: chain.waves().len(),
            max_concurrency: self.max_concurrency,
        }
        .log();

        let mut remaining: Vec<usize> = chain.steps().iter().map(|s| s.upstream().len()).collect();
        let mut states = StepStates::new(chain.len());
        let mut queue = PriorityWorkQueue::new();
        for step in chain.steps() {
            if remaining[step.index().index()] == 0 {
                states.advance(step.index().index(), StepState::Ready)?;
                queue.push(PrioritizedTask::new(step.index(), step.wave()));
            }
        }

        let (completions_tx, mut completions) = mpsc::unbounded_channel::<Completion>();
        let mut in_flight = 0usize;
        let mut stopped = false;
        let mut failures: Vec<(usize, StepIndex, StepFailure)> = Vec::new();

        loop {
            if !stopped && cancellation.is_cancelled() {
                stopped = true;
                DispatchStopped {
                    in_flight,
                    abandoned: queue.clear(),
                }
                .log();
            }

            while !stopped && in_flight < self.max_concurrency {
                let Some(task) = queue.pop() else {
                    break;
                };
                let step = lookup(chain, task.step)?;
                states.advance(task.step.index(), StepState::Running)?;
                in_flight += 1;
                StepDispatched {
                    step_id: step.id(),
                    wave: step.wave(),
                    in_flight,
                }
                .log();
                self.spawn_step(step, state.clone(), cancellation.clone(), completions_tx.clone());
            }

            if in_flight == 0 {
                break;
            }

            let Some(completion) = completions.recv().await else {
                return Err(ExecutionError::Internal {
                    message: "completion channel closed with steps still running".into(),
                });
            };
            in_flight -= 1;

            let step = lookup(chain, completion.step)?;
            let index = completion.step.index();
            match completion.outcome {
                Ok(outputs) => {
                    state.commit(step.outputs(), outputs)?;
                    states.advance(index, StepState::Done)?;

                    let mut newly_ready = 0;
                    for &next in step.downstream() {
                        let count = &mut remaining[next.index()];
                        *count -= 1;
                        if *count == 0 && !stopped {
                            let next_step = lookup(chain, next)?;
                            states.advance(next.index(), StepState::Ready)?;
                            queue.push(PrioritizedTask::new(next, next_step.wave()));
                            newly_ready += 1;
                        }
                    }
                    StepCompleted {
                        step_id: step.id(),
                        duration: completion.duration,
                        newly_ready,
                    }
                    .log();
                }
                Err(cause) => {
                    states.advance(index, StepState::Failed)?;
                    StepFailed {
                        step_id: step.id(),
                        location: &step.provenance().location(),
                        error: &cause,
                    }
                    .log();
                    failures.push((
                        step.wave(),
                        completion.step,
                        StepFailure {
                            provenance: step.provenance().clone(),
                            wave: step.wave(),
                            cause,
                        },
                    ));
                    cancellation.cancel();
                }
            }
        }

        if !failures.is_empty() {
            failures.sort_by_key(|(wave, index, _)| (*wave, *index));
            return Err(ExecutionError::StepsFailed {
                failures: failures.into_iter().map(|(_, _, failure)| failure).collect(),
            });
        }
        if stopped {
            return Err(ExecutionError::Cancelled);
        }
        let unfinished = chain.len() - states.count(StepState::Done);
        if unfinished > 0 {
            return Err(ExecutionError::Internal {
                message: format!("{} step(s) never became ready", unfinished),
            });
        }

        Ok(BuildResult::collect(&state, chain.final_items(), started.elapsed()))
    }

    fn spawn_step(
        &self,
        step: &ChainStep,
        state: Arc<RunState>,
        cancellation: CancellationToken,
        completions: mpsc::UnboundedSender<Completion>,
    ) {
        let index = step.index();
        let declaration = step.declaration().clone();
        let timeout = self.step_timeout;

        tokio::spawn(async move {
            let started = Instant::now();
            let work = tokio::task::spawn_blocking(move || {
                let mut ctx = StepContext::new(declaration.clone(), state, cancellation);
                declaration
                    .body()
                    .execute(&mut ctx)
                    .map(|()| ctx.into_outputs())
            });

            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, work).await {
                    Ok(joined) => settle(joined),
                    Err(_) => Err(FailureCause::TimedOut { after: limit }),
                },
                None => settle(work.await),
            };

            // The loop only stops listening once every dispatched step reported.
            let _ = completions.send(Completion {
                step: index,
                outcome,
                duration: started.elapsed(),
            });
        });
    }
}

fn lookup(chain: &Chain, index: StepIndex) -> Result<&ChainStep, ExecutionError> {
    chain.step(index).ok_or_else(|| ExecutionError::Internal {
        message: format!("unknown step {}", index),
    })
}

fn settle(joined: Result<Result<StagedOutputs, StepError>, JoinError>) -> Result<StagedOutputs, FailureCause> {
    match joined {
        Ok(Ok(outputs)) => Ok(outputs),
        Ok(Err(error)) => Err(classify(error)),
        Err(join_error) => Err(FailureCause::Panicked {
            message: panic_message(join_error),
        }),
    }
}

/// Context misuse keeps its own variant even after passing through `?`.
fn classify(error: StepError) -> FailureCause {
    match error.downcast::<ContextError>() {
        Ok(context) => FailureCause::Context(*context),
        Err(error) => FailureCause::Body(error),
    }
}

fn panic_message(error: JoinError) -> String {
    match error.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string()),
        Err(error) => error.to_string(),
    }
}
