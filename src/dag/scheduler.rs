// src/dag/scheduler.rs

//! Scheduling state machine.
//!
//! Synchronous and deterministic: the async runtime feeds completion events
//! in and sends the returned actions to the executor. All shared mutable
//! state (task states, budget counters) lives here and is only touched from
//! the single-threaded event loop, so there is nothing to lock.

use tracing::{debug, info, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::task::{ScheduledAction, SkipReason, TaskState};
use crate::engine::{RunReport, TaskOutcome};
use crate::ledger::MarkerLedger;

/// Global resource budgets for a run.
#[derive(Debug, Clone, Copy)]
pub struct Budgets {
    /// Maximum number of simultaneously running tasks.
    pub jobs: usize,
    /// Maximum sum of in-flight tasks' effective thread requirements.
    pub threads: usize,
}

impl Default for Budgets {
    fn default() -> Self {
        Self { jobs: 1, threads: 1 }
    }
}

#[derive(Debug)]
pub struct Scheduler {
    graph: TaskGraph,
    states: Vec<TaskState>,
    /// Inclusion mask for target-restricted runs.
    included: Vec<bool>,
    /// Thread requirement after clamping to the global budget.
    effective_threads: Vec<usize>,
    budgets: Budgets,
    keep_going: bool,
    running_jobs: usize,
    running_threads: usize,
    /// Once set, no new tasks are dispatched; in-flight tasks still finish.
    halted: bool,
}

impl Scheduler {
    pub fn new(graph: TaskGraph, budgets: Budgets, keep_going: bool) -> Self {
        let included = vec![true; graph.len()];
        Self::with_included(graph, budgets, keep_going, included)
    }

    /// Construct with an inclusion mask from
    /// [`TaskGraph::restrict_to_targets`].
    pub fn with_included(
        graph: TaskGraph,
        budgets: Budgets,
        keep_going: bool,
        included: Vec<bool>,
    ) -> Self {
        assert_eq!(included.len(), graph.len());

        let effective_threads: Vec<usize> = graph
            .tasks()
            .map(|task| {
                if task.threads > budgets.threads {
                    warn!(
                        task = %task.id,
                        declared = task.threads,
                        budget = budgets.threads,
                        "thread requirement exceeds global budget; clamping"
                    );
                    budgets.threads
                } else {
                    task.threads
                }
            })
            .collect();

        let states = vec![TaskState::Pending; graph.len()];
        Self {
            graph,
            states,
            included,
            effective_threads,
            budgets,
            keep_going,
            running_jobs: 0,
            running_threads: 0,
            halted: false,
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn state(&self, node: usize) -> TaskState {
        self.states[node]
    }

    pub fn running_jobs(&self) -> usize {
        self.running_jobs
    }

    /// Stop dispatching new tasks. In-flight tasks run to completion.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    /// Promote tasks through `Pending → Ready` and collect dispatches.
    ///
    /// Up-to-date tasks convert `Ready → Skipped` without consuming budget
    /// or invoking their action; that can unblock further tasks, so the
    /// promotion loop runs until a fixed point.
    pub fn dispatch(&mut self, ledger: &MarkerLedger) -> Vec<ScheduledAction> {
        let mut actions = Vec::new();

        loop {
            let mut changed = false;

            for &node in self.graph.topo_order() {
                if !self.included[node] {
                    continue;
                }

                if self.states[node] == TaskState::Pending && self.deps_satisfied(node) {
                    self.states[node] = TaskState::Ready;
                    changed = true;
                }

                if self.states[node] != TaskState::Ready {
                    continue;
                }

                let task = self.graph.task(node);
                if ledger.is_up_to_date(task) {
                    info!(task = %task.id, "outputs current; skipping");
                    self.states[node] = TaskState::Skipped(SkipReason::UpToDate);
                    changed = true;
                    continue;
                }

                if self.halted {
                    continue;
                }

                let threads = self.effective_threads[node];
                if self.running_jobs >= self.budgets.jobs
                    || self.running_threads + threads > self.budgets.threads
                {
                    continue;
                }

                debug!(
                    task = %task.id,
                    threads,
                    running_jobs = self.running_jobs + 1,
                    running_threads = self.running_threads + threads,
                    "dispatching task"
                );
                self.states[node] = TaskState::Running;
                self.running_jobs += 1;
                self.running_threads += threads;
                actions.push(ScheduledAction {
                    node,
                    id: task.id.clone(),
                    command: task.command.clone(),
                    threads,
                    outputs: task.outputs.clone(),
                    log: task.log.clone(),
                });
                changed = true;
            }

            if !changed {
                break;
            }
        }

        actions
    }

    /// Apply a completion event. The caller is responsible for having
    /// recorded the task in the ledger first when the outcome is a success.
    pub fn on_completion(&mut self, node: usize, outcome: TaskOutcome) {
        debug_assert_eq!(self.states[node], TaskState::Running);
        self.running_jobs -= 1;
        self.running_threads -= self.effective_threads[node];

        match outcome {
            TaskOutcome::Success => {
                info!(task = %self.graph.task(node).id, "task succeeded");
                self.states[node] = TaskState::Succeeded;
            }
            TaskOutcome::Failed(code) => {
                warn!(
                    task = %self.graph.task(node).id,
                    exit_code = code,
                    "task failed; blocking dependents"
                );
                self.states[node] = TaskState::Failed;
                self.block_dependents(node);
                if !self.keep_going {
                    info!("fail-fast: halting dispatch of new tasks");
                    self.halted = true;
                }
            }
        }
    }

    /// True once nothing is running and nothing more will be dispatched.
    pub fn is_settled(&self) -> bool {
        if self.running_jobs > 0 {
            return false;
        }
        if self.halted {
            return true;
        }
        self.states
            .iter()
            .zip(&self.included)
            .all(|(state, &included)| !included || state.is_terminal())
    }

    pub fn report(&self) -> RunReport {
        let mut report = RunReport::default();
        for &node in self.graph.topo_order() {
            if self.included[node] {
                report.push(self.graph.task(node).id.clone(), self.states[node]);
            }
        }
        report
    }

    fn deps_satisfied(&self, node: usize) -> bool {
        self.graph
            .deps_of(node)
            .iter()
            .all(|&dep| self.states[dep].satisfies_dependents())
    }

    /// Mark every transitive dependent of a failed task as skipped-blocked.
    fn block_dependents(&mut self, failed: usize) {
        let mut stack: Vec<usize> = self.graph.dependents_of(failed).to_vec();

        while let Some(node) = stack.pop() {
            match self.states[node] {
                TaskState::Pending | TaskState::Ready => {
                    self.states[node] = TaskState::Skipped(SkipReason::UpstreamFailed);
                    debug!(
                        task = %self.graph.task(node).id,
                        "blocked by upstream failure"
                    );
                    stack.extend(self.graph.dependents_of(node));
                }
                // Running dependents cannot exist: they would have required
                // this task to be satisfied first. Terminal states stay put.
                _ => {}
            }
        }
    }
}
