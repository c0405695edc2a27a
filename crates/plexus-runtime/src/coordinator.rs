//! The run loop / state machine
//!
//! A [`Coordinator`] drives one run: it consults the router, executes the
//! returned units one at a time (sequentially, in list order, even when the
//! router returned several for one routing step), appends each outcome to
//! the store's ordered record history, and terminates on an empty decision
//! or the iteration cap. Persistence hooks fire only at the run boundaries.
//!
//! There is no cooperative cancellation of an in-flight unit; the timeout on
//! a blocking store read is the only cancellation mechanism in the core.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use plexus_core::{RunError, RunResult, UnitName, UnitRecord};
use plexus_memory::ReactiveStore;
use tracing::{debug, warn};

use crate::config::RunConfig;
use crate::persist::RunStore;
use crate::router::{Router, RouterArgs, resolve_decision};
use crate::unit::{Unit, UnitRegistry};

/// Lifecycle of a run.
///
/// `Pending` is the sole initial state; `Completed` and `Failed` are the
/// sole terminal states. `Failed` is reachable from any non-terminal state
/// when a unit raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Initializing,
    Routing,
    ExecutingUnit,
    UnitComplete,
    Completed,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Pending => "pending",
            RunState::Initializing => "initializing",
            RunState::Routing => "routing",
            RunState::ExecutingUnit => "executing_unit",
            RunState::UnitComplete => "unit_complete",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Drives units through the shared store under a pluggable router.
pub struct Coordinator {
    registry: UnitRegistry,
    router: Box<dyn Router>,
    store: ReactiveStore,
    config: RunConfig,
    run_store: Option<Arc<dyn RunStore>>,
    state: RunState,
    thread_id: Option<String>,
}

impl Coordinator {
    /// Create a coordinator for one run.
    pub fn new(
        registry: UnitRegistry,
        router: impl Router + 'static,
        store: ReactiveStore,
        config: RunConfig,
    ) -> Self {
        Self {
            registry,
            router: Box::new(router),
            store,
            config,
            run_store: None,
            state: RunState::Pending,
            thread_id: None,
        }
    }

    /// Attach persistence hooks, called only at the run boundaries.
    pub fn with_run_store(mut self, run_store: Arc<dyn RunStore>) -> Self {
        self.run_store = Some(run_store);
        self
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// The persistence thread this run resumed or created, if any.
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// The shared store handle this run executes against.
    pub fn store(&self) -> &ReactiveStore {
        &self.store
    }

    /// Execute the run to a terminal state.
    ///
    /// Returns the records appended during this run, in completion order.
    /// An empty first routing decision is a normal outcome: the run
    /// completes with zero executed units. A unit error aborts the run,
    /// attempts a best-effort append of the records already collected,
    /// leaves the coordinator in [`RunState::Failed`], and propagates the
    /// error.
    pub fn run(&mut self) -> RunResult<Vec<UnitRecord>> {
        if self.state != RunState::Pending {
            return Err(RunError::InvalidState {
                state: self.state.to_string(),
            });
        }

        match self.drive() {
            Ok(records) => Ok(records),
            Err(err) => {
                self.transition(RunState::Failed);
                Err(err)
            }
        }
    }

    fn drive(&mut self) -> RunResult<Vec<UnitRecord>> {
        self.transition(RunState::Initializing);
        if let Some(run_store) = &self.run_store {
            let session = self.store.session_id().map_err(RunError::Store)?;
            let thread_id = run_store.create_or_resume_thread(session.as_deref())?;
            let history = run_store.load_history(&thread_id)?;
            self.store.set_history(history).map_err(RunError::Store)?;
            self.store
                .set_session_id(&thread_id)
                .map_err(RunError::Store)?;
            self.thread_id = Some(thread_id);
        }

        // Baseline for "new records only" queries at the end of the run.
        let baseline = self.store.records_len().map_err(RunError::Store)?;

        let mut queue: VecDeque<Arc<dyn Unit>> = VecDeque::new();
        let mut call_count = 0usize;

        self.transition(RunState::Routing);
        let context = self.store.context().map_err(RunError::Store)?;
        let decision = self.router.route(RouterArgs {
            call_count,
            stack: &[],
            last_record: None,
            context: &context,
        });
        Self::enqueue(resolve_decision(decision, &self.registry), &mut queue);

        while call_count < self.config.max_iterations {
            let Some(unit) = queue.pop_front() else { break };

            self.transition(RunState::ExecutingUnit);
            let context = self.store.context().map_err(RunError::Store)?;
            let record = match unit.run(&context, &self.store) {
                Ok(record) => record,
                Err(source) => {
                    self.append_collected(baseline);
                    return Err(RunError::Unit {
                        unit: unit.name().clone(),
                        source,
                    });
                }
            };
            self.store
                .push_record(record.clone())
                .map_err(RunError::Store)?;
            call_count += 1;
            self.transition(RunState::UnitComplete);

            let stack: Vec<UnitName> = queue.iter().map(|u| u.name().clone()).collect();
            self.transition(RunState::Routing);
            let context = self.store.context().map_err(RunError::Store)?;
            let decision = self.router.route(RouterArgs {
                call_count,
                stack: &stack,
                last_record: Some(&record),
                context: &context,
            });
            Self::enqueue(resolve_decision(decision, &self.registry), &mut queue);
        }

        let appended = self.store.records_from(baseline).map_err(RunError::Store)?;
        if let (Some(run_store), Some(thread_id)) = (&self.run_store, &self.thread_id) {
            run_store.append_records(thread_id, &appended)?;
        }
        self.transition(RunState::Completed);
        Ok(appended)
    }

    /// Enqueue resolved units, skipping any whose name is already queued in
    /// the current window.
    fn enqueue(units: Vec<Arc<dyn Unit>>, queue: &mut VecDeque<Arc<dyn Unit>>) {
        for unit in units {
            if queue.iter().any(|queued| queued.name() == unit.name()) {
                debug!(unit = %unit.name(), "already queued; skipping duplicate");
                continue;
            }
            queue.push_back(unit);
        }
    }

    /// Best-effort append of already-collected records on the failure path.
    fn append_collected(&self, baseline: usize) {
        let (Some(run_store), Some(thread_id)) = (&self.run_store, &self.thread_id) else {
            return;
        };
        match self.store.records_from(baseline) {
            Ok(records) => {
                if let Err(err) = run_store.append_records(thread_id, &records) {
                    warn!(error = %err, "failed to append records while aborting run");
                }
            }
            Err(err) => warn!(error = %err, "could not read collected records while aborting run"),
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "run state transition");
        self.state = next;
    }
}
