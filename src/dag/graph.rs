// src/dag/graph.rs

//! Dependency resolution: derive edges from output/input path matching,
//! reject duplicate outputs and unsatisfiable inputs, and order the graph.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::task::Task;
use crate::errors::{EngineError, Result};
use crate::fs::FileSystem;

/// The resolved task graph.
///
/// Edges are derived, never stored as entities: task A precedes task B when
/// some produced path of A appears among B's inputs. Adjacency and a stable
/// topological order are precomputed for the scheduler.
#[derive(Debug)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    producers: HashMap<PathBuf, usize>,
    deps: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
    topo_order: Vec<usize>,
}

impl TaskGraph {
    /// Build the graph from instantiated tasks.
    ///
    /// Checks, in order:
    /// - no two tasks produce the same path ([`EngineError::DuplicateOutput`])
    /// - every input is produced by some task or already present on disk
    ///   ([`EngineError::UnsatisfiedInput`])
    /// - the graph is acyclic ([`EngineError::CyclicDependency`])
    pub fn resolve(tasks: Vec<Task>, fs: &dyn FileSystem) -> Result<Self> {
        let mut producers: HashMap<PathBuf, usize> = HashMap::new();
        for (idx, task) in tasks.iter().enumerate() {
            for path in task.produced_paths() {
                if let Some(&first) = producers.get(path) {
                    return Err(EngineError::DuplicateOutput {
                        path: path.clone(),
                        first: tasks[first].id.clone(),
                        second: task.id.clone(),
                    });
                }
                producers.insert(path.clone(), idx);
            }
        }

        let mut deps: Vec<Vec<usize>> = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let mut task_deps: BTreeSet<usize> = BTreeSet::new();
            for input in &task.inputs {
                match producers.get(input) {
                    Some(&producer) => {
                        // A self-edge is a cycle; let toposort report it.
                        task_deps.insert(producer);
                        debug!(
                            consumer = %task.id,
                            producer = %tasks[producer].id,
                            path = ?input,
                            "derived dependency edge"
                        );
                    }
                    None => {
                        if !fs.exists(input) {
                            return Err(EngineError::UnsatisfiedInput {
                                task: task.id.clone(),
                                path: input.clone(),
                            });
                        }
                        // Pre-existing file (e.g. raw sample reads); no edge.
                    }
                }
            }
            deps.push(task_deps.into_iter().collect());
        }

        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for idx in 0..tasks.len() {
            graph.add_node(idx);
        }
        for (idx, task_deps) in deps.iter().enumerate() {
            for &dep in task_deps {
                graph.add_edge(dep, idx, ());
            }
        }

        let topo_order = match toposort(&graph, None) {
            Ok(order) => order,
            Err(cycle) => {
                let node = cycle.node_id();
                return Err(EngineError::CyclicDependency {
                    task: tasks[node].id.clone(),
                    path: closing_input(&tasks, &deps, &producers, node),
                });
            }
        };

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
        for (idx, task_deps) in deps.iter().enumerate() {
            for &dep in task_deps {
                dependents[dep].push(idx);
            }
        }

        Ok(Self {
            tasks,
            producers,
            deps,
            dependents,
            topo_order,
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task(&self, node: usize) -> &Task {
        &self.tasks[node]
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Direct dependencies (producers this task consumes from).
    pub fn deps_of(&self, node: usize) -> &[usize] {
        &self.deps[node]
    }

    /// Direct dependents (consumers of this task's outputs).
    pub fn dependents_of(&self, node: usize) -> &[usize] {
        &self.dependents[node]
    }

    /// A stable topological order over all nodes.
    pub fn topo_order(&self) -> &[usize] {
        &self.topo_order
    }

    /// Producing task of an output path, if any.
    pub fn producer_of(&self, path: &Path) -> Option<usize> {
        self.producers.get(path).copied()
    }

    /// Inclusion mask for a target-restricted run: the producers of the
    /// given paths plus all their transitive dependencies.
    pub fn restrict_to_targets(&self, targets: &[PathBuf]) -> Result<Vec<bool>> {
        let mut keep = vec![false; self.tasks.len()];
        let mut stack: Vec<usize> = Vec::new();

        for target in targets {
            let node = self
                .producer_of(target)
                .ok_or_else(|| EngineError::UnknownTarget(target.clone()))?;
            stack.push(node);
        }

        while let Some(node) = stack.pop() {
            if keep[node] {
                continue;
            }
            keep[node] = true;
            stack.extend(self.deps_of(node));
        }

        Ok(keep)
    }
}

/// Input path of `node` whose producer transitively depends on `node`
/// again, i.e. the edge that closes the reported cycle.
fn closing_input(
    tasks: &[Task],
    deps: &[Vec<usize>],
    producers: &HashMap<PathBuf, usize>,
    node: usize,
) -> PathBuf {
    let reaches_node = |from: usize| -> bool {
        let mut stack = vec![from];
        let mut seen = vec![false; deps.len()];
        while let Some(n) = stack.pop() {
            if n == node {
                return true;
            }
            if seen[n] {
                continue;
            }
            seen[n] = true;
            stack.extend(&deps[n]);
        }
        false
    };

    tasks[node]
        .inputs
        .iter()
        .find(|input| producers.get(*input).is_some_and(|&p| reaches_node(p)))
        .or_else(|| tasks[node].inputs.first())
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::pattern::Binding;

    fn task(id: &str, inputs: &[&str], outputs: &[&str]) -> Task {
        Task {
            id: id.to_string(),
            template: id.to_string(),
            binding: Binding::new(),
            inputs: inputs.iter().map(PathBuf::from).collect(),
            outputs: outputs.iter().map(PathBuf::from).collect(),
            markers: vec![],
            threads: 1,
            command: format!("echo {id}"),
            log: None,
        }
    }

    #[test]
    fn edges_follow_path_matching() {
        let fs = MockFileSystem::new();
        fs.add_file("raw.fq", "");

        let graph = TaskGraph::resolve(
            vec![
                task("a", &["raw.fq"], &["a.out"]),
                task("b", &["a.out"], &["b.out"]),
            ],
            &fs,
        )
        .unwrap();

        assert_eq!(graph.deps_of(0), &[] as &[usize]);
        assert_eq!(graph.deps_of(1), &[0]);
        assert_eq!(graph.dependents_of(0), &[1]);
    }

    #[test]
    fn independent_tasks_share_no_edges() {
        let fs = MockFileSystem::new();
        fs.add_file("in/S1.fastq", "");
        fs.add_file("in/S2.fastq", "");

        let graph = TaskGraph::resolve(
            vec![
                task("qc(sample=S1)", &["in/S1.fastq"], &["out/S1.txt"]),
                task("qc(sample=S2)", &["in/S2.fastq"], &["out/S2.txt"]),
            ],
            &fs,
        )
        .unwrap();

        assert!(graph.deps_of(0).is_empty());
        assert!(graph.deps_of(1).is_empty());
    }

    #[test]
    fn duplicate_output_fails_fast() {
        let fs = MockFileSystem::new();
        let err = TaskGraph::resolve(
            vec![task("a", &[], &["same.out"]), task("b", &[], &["same.out"])],
            &fs,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            EngineError::DuplicateOutput { first, second, .. }
                if first == "a" && second == "b"
        ));
    }

    #[test]
    fn missing_input_with_no_producer_is_unsatisfied() {
        let fs = MockFileSystem::new();
        let err =
            TaskGraph::resolve(vec![task("a", &["nowhere.fq"], &["a.out"])], &fs).unwrap_err();

        assert!(matches!(
            err,
            EngineError::UnsatisfiedInput { task, .. } if task == "a"
        ));
    }

    #[test]
    fn input_present_on_disk_is_not_an_error() {
        let fs = MockFileSystem::new();
        fs.add_file("present.fq", "");
        TaskGraph::resolve(vec![task("a", &["present.fq"], &["a.out"])], &fs).unwrap();
    }

    #[test]
    fn cycle_error_names_task_and_closing_path() {
        let fs = MockFileSystem::new();
        let err = TaskGraph::resolve(
            vec![
                task("a", &["b.out"], &["a.out"]),
                task("b", &["a.out"], &["b.out"]),
            ],
            &fs,
        )
        .unwrap_err();

        match err {
            EngineError::CyclicDependency { task, path } => {
                assert!(task == "a" || task == "b");
                assert!(path == Path::new("a.out") || path == Path::new("b.out"));
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn self_consuming_task_is_a_cycle_on_its_own_path() {
        let fs = MockFileSystem::new();
        let err = TaskGraph::resolve(
            vec![task("loop", &["loop.out"], &["loop.out"])],
            &fs,
        )
        .unwrap_err();

        match err {
            EngineError::CyclicDependency { task, path } => {
                assert_eq!(task, "loop");
                assert_eq!(path, Path::new("loop.out"));
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn gather_task_depends_on_every_producer() {
        let fs = MockFileSystem::new();
        fs.add_file("in/S1.fastq", "");
        fs.add_file("in/S2.fastq", "");

        let graph = TaskGraph::resolve(
            vec![
                task("qc(sample=S1)", &["in/S1.fastq"], &["out/S1.txt"]),
                task("qc(sample=S2)", &["in/S2.fastq"], &["out/S2.txt"]),
                task("combine", &["out/S1.txt", "out/S2.txt"], &["combined.txt"]),
            ],
            &fs,
        )
        .unwrap();

        assert_eq!(graph.deps_of(2), &[0, 1]);
    }

    #[test]
    fn target_restriction_keeps_transitive_deps_only() {
        let fs = MockFileSystem::new();
        fs.add_file("raw.fq", "");

        let graph = TaskGraph::resolve(
            vec![
                task("a", &["raw.fq"], &["a.out"]),
                task("b", &["a.out"], &["b.out"]),
                task("c", &["raw.fq"], &["c.out"]),
            ],
            &fs,
        )
        .unwrap();

        let keep = graph
            .restrict_to_targets(&[PathBuf::from("b.out")])
            .unwrap();
        assert_eq!(keep, vec![true, true, false]);
    }

    #[test]
    fn unknown_target_is_an_error() {
        let fs = MockFileSystem::new();
        let graph = TaskGraph::resolve(vec![task("a", &[], &["a.out"])], &fs).unwrap();
        assert!(matches!(
            graph.restrict_to_targets(&[PathBuf::from("other.out")]),
            Err(EngineError::UnknownTarget(_))
        ));
    }
}
