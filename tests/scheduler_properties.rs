// tests/scheduler_properties.rs
//
// Property tests over randomly generated DAGs: whatever the shape, the
// budgets and the failure pattern, a run must terminate with every task in
// a terminal state and never exceed the configured budgets.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use pipedag::dag::{Budgets, Scheduler, Task, TaskGraph};
use pipedag::engine::TaskOutcome;
use pipedag::fs::mock::MockFileSystem;
use pipedag::ledger::MarkerLedger;
use pipedag::pattern::Binding;

/// Acyclic by construction: task N may only depend on tasks 0..N.
#[derive(Debug, Clone)]
struct RandomDag {
    deps: Vec<Vec<usize>>,
    threads: Vec<usize>,
}

fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = RandomDag> {
    (1..=max_tasks).prop_flat_map(|n| {
        let deps = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..n),
            n,
        );
        let threads = proptest::collection::vec(1..4usize, n);
        (deps, threads).prop_map(|(raw_deps, threads)| {
            let deps = raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let mut valid: Vec<usize> = potential
                        .into_iter()
                        .filter(|_| i > 0)
                        .map(|d| d % i.max(1))
                        .collect();
                    valid.sort();
                    valid.dedup();
                    valid
                })
                .collect();
            RandomDag { deps, threads }
        })
    })
}

fn build_tasks(dag: &RandomDag) -> Vec<Task> {
    dag.deps
        .iter()
        .enumerate()
        .map(|(i, deps)| Task {
            id: format!("task_{i}"),
            template: format!("task_{i}"),
            binding: Binding::new(),
            inputs: deps.iter().map(|d| format!("t{d}.out").into()).collect(),
            outputs: vec![format!("t{i}.out").into()],
            markers: vec![],
            threads: dag.threads[i],
            command: format!("echo {i}"),
            log: None,
        })
        .collect()
}

proptest! {
    #[test]
    fn every_run_settles_with_all_tasks_terminal(
        dag in dag_strategy(8),
        jobs in 1..4usize,
        thread_budget in 1..4usize,
        keep_going in any::<bool>(),
        failing in proptest::collection::hash_set(0..8usize, 0..4),
    ) {
        let n = dag.deps.len();
        let fs = Arc::new(MockFileSystem::new());
        let graph = TaskGraph::resolve(build_tasks(&dag), fs.as_ref()).unwrap();
        let ledger = MarkerLedger::new(fs.clone(), false);
        let budgets = Budgets { jobs, threads: thread_budget };
        let mut scheduler = Scheduler::new(graph, budgets, keep_going);

        let failing: HashSet<String> = failing
            .into_iter()
            .filter(|&i| i < n)
            .map(|i| format!("task_{i}"))
            .collect();

        let mut executing: Vec<(usize, String, usize)> = Vec::new();
        let mut steps = 0;
        let max_steps = 10 * n + 10;

        loop {
            for action in scheduler.dispatch(&ledger) {
                executing.push((action.node, action.id.clone(), action.threads));
            }

            // Budget invariants hold at every point in the run.
            prop_assert!(executing.len() <= jobs);
            let in_flight: usize = executing.iter().map(|(_, _, t)| t).sum();
            prop_assert!(in_flight <= thread_budget);

            if executing.is_empty() {
                prop_assert!(scheduler.is_settled(), "idle but not settled");
                break;
            }

            let (node, id, _) = executing.remove(0);
            let outcome = if failing.contains(&id) {
                TaskOutcome::Failed(1)
            } else {
                TaskOutcome::Success
            };
            scheduler.on_completion(node, outcome);

            steps += 1;
            prop_assert!(steps < max_steps, "run did not terminate");
        }

        // Every task landed in exactly one report bucket.
        let report = scheduler.report();
        let total = report.succeeded.len()
            + report.up_to_date.len()
            + report.failed.len()
            + report.blocked.len()
            + report.not_run.len();
        prop_assert_eq!(total, n);

        // Nothing that failed or was blocked counts as a success.
        if failing.is_empty() {
            prop_assert!(report.is_success());
        }
    }
}
