// src/expand.rs

//! Instantiator / wildcard expander.
//!
//! Turns a template plus concrete wildcard bindings into [`Task`]s with
//! fully-resolved paths. Expansion is pure and deterministic: the same
//! (template, binding) pair always yields path-identical tasks, which is
//! what makes re-runs idempotent.
//!
//! Gather inputs: an input pattern referencing a dimension the template does
//! not declare expands over every value of that dimension in the binding
//! universe, concatenating many producers' outputs into one task's inputs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::dag::task::Task;
use crate::errors::{EngineError, Result};
use crate::pattern::Binding;
use crate::registry::{InputSpec, TaskTemplate};
use crate::samples::SampleTable;

/// Ordered value sets for every wildcard dimension in a run
/// (e.g. `sample -> [S1, S2]`, `read -> [1, 2]`).
#[derive(Debug, Clone, Default)]
pub struct BindingUniverse {
    dims: BTreeMap<String, Vec<String>>,
}

impl BindingUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_dimension(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.dims.insert(name.into(), values);
    }

    pub fn values(&self, dim: &str) -> Option<&[String]> {
        self.dims.get(dim).map(Vec::as_slice)
    }

    pub fn dimension_names(&self) -> impl Iterator<Item = &str> {
        self.dims.keys().map(String::as_str)
    }
}

/// Expands templates into concrete tasks.
#[derive(Debug)]
pub struct Instantiator<'a> {
    universe: &'a BindingUniverse,
    samples: &'a SampleTable,
}

impl<'a> Instantiator<'a> {
    pub fn new(universe: &'a BindingUniverse, samples: &'a SampleTable) -> Self {
        Self { universe, samples }
    }

    /// The full set of bindings for a template: the cross product of its
    /// declared dimensions' universe values, in declaration order.
    pub fn bindings_for(&self, template: &TaskTemplate) -> Result<Vec<Binding>> {
        let mut dims = Vec::with_capacity(template.wildcards.len());
        for dim in &template.wildcards {
            let values = self.universe.values(dim).ok_or_else(|| {
                EngineError::Config(format!(
                    "template '{}' expands over dimension '{}' which has no values",
                    template.name, dim
                ))
            })?;
            dims.push((dim.clone(), values.to_vec()));
        }
        Ok(cross_product(&dims))
    }

    /// Instantiate `template` once per binding, in binding order.
    pub fn expand(&self, template: &TaskTemplate, bindings: &[Binding]) -> Result<Vec<Task>> {
        bindings
            .iter()
            .map(|binding| self.instantiate(template, binding))
            .collect()
    }

    fn instantiate(&self, template: &TaskTemplate, binding: &Binding) -> Result<Task> {
        let unresolved = |wildcard: String| EngineError::UnresolvedWildcard {
            template: template.name.clone(),
            wildcard,
        };

        let mut outputs = Vec::with_capacity(template.outputs.len());
        for pattern in &template.outputs {
            outputs.push(pattern.substitute(binding).map_err(&unresolved)?);
        }
        let mut markers = Vec::with_capacity(template.markers.len());
        for pattern in &template.markers {
            markers.push(pattern.substitute(binding).map_err(&unresolved)?);
        }
        let log = match &template.log {
            Some(pattern) => Some(pattern.substitute(binding).map_err(&unresolved)?),
            None => None,
        };

        let mut inputs = Vec::new();
        for spec in &template.inputs {
            match spec {
                InputSpec::Path(pattern) => {
                    self.resolve_path_input(template, pattern, binding, &mut inputs)?;
                }
                InputSpec::SampleColumn(column_pattern) => {
                    let column = column_pattern
                        .substitute_str(binding)
                        .map_err(&unresolved)?;
                    let sample = binding
                        .get("sample")
                        .ok_or_else(|| unresolved("sample".to_string()))?;
                    let path = self.samples.input_path(sample, &column).ok_or_else(|| {
                        EngineError::SampleTable(format!(
                            "no column '{column}' for sample '{sample}' \
                             (required by template '{}')",
                            template.name
                        ))
                    })?;
                    inputs.push(path.to_path_buf());
                }
            }
        }

        let command = self.resolve_command(template, binding, &inputs, &outputs, &log);

        Ok(Task {
            id: Task::make_id(&template.name, binding),
            template: template.name.clone(),
            binding: binding.clone(),
            inputs,
            outputs,
            markers,
            threads: template.threads,
            command,
            log,
        })
    }

    /// Resolve one path-pattern input, expanding gather dimensions.
    fn resolve_path_input(
        &self,
        template: &TaskTemplate,
        pattern: &crate::pattern::PathPattern,
        binding: &Binding,
        out: &mut Vec<PathBuf>,
    ) -> Result<()> {
        // Dimensions the pattern uses but the binding does not provide.
        let mut gather_dims: Vec<String> = pattern
            .wildcards()
            .filter(|name| !binding.contains_key(*name))
            .map(str::to_string)
            .collect();
        gather_dims.sort();
        gather_dims.dedup();

        if gather_dims.is_empty() {
            out.push(pattern.substitute(binding).map_err(|w| {
                EngineError::UnresolvedWildcard {
                    template: template.name.clone(),
                    wildcard: w,
                }
            })?);
            return Ok(());
        }

        let mut dims = Vec::with_capacity(gather_dims.len());
        for dim in &gather_dims {
            let values = self.universe.values(dim).ok_or_else(|| {
                EngineError::UnresolvedWildcard {
                    template: template.name.clone(),
                    wildcard: dim.clone(),
                }
            })?;
            dims.push((dim.clone(), values.to_vec()));
        }

        for gather_binding in cross_product(&dims) {
            let mut merged = binding.clone();
            merged.extend(gather_binding);
            out.push(pattern.substitute(&merged).map_err(|w| {
                EngineError::UnresolvedWildcard {
                    template: template.name.clone(),
                    wildcard: w,
                }
            })?);
        }
        Ok(())
    }

    fn resolve_command(
        &self,
        template: &TaskTemplate,
        binding: &Binding,
        inputs: &[PathBuf],
        outputs: &[PathBuf],
        log: &Option<PathBuf>,
    ) -> String {
        let join = |paths: &[PathBuf]| {
            paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(" ")
        };

        let mut map = binding.clone();
        map.insert("input".to_string(), join(inputs));
        map.insert("inputs".to_string(), join(inputs));
        map.insert("output".to_string(), join(outputs));
        map.insert("outputs".to_string(), join(outputs));
        map.insert("threads".to_string(), template.threads.to_string());
        if let Some(log) = log {
            map.insert("log".to_string(), log.to_string_lossy().into_owned());
        }

        // `{scratch}` stays in place; the runner substitutes it once the
        // scratch directory exists.
        template.command.substitute_partial(&map)
    }
}

/// Cross product of dimension value lists, first dimension outermost.
fn cross_product(dims: &[(String, Vec<String>)]) -> Vec<Binding> {
    let mut result = vec![Binding::new()];
    for (dim, values) in dims {
        let mut next = Vec::with_capacity(result.len() * values.len());
        for partial in &result {
            for value in values {
                let mut binding = partial.clone();
                binding.insert(dim.clone(), value.clone());
                next.push(binding);
            }
        }
        result = next;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PathPattern;
    use crate::registry::InputSpec;

    fn samples() -> SampleTable {
        SampleTable::parse(
            "sample\tfq1\tfq2\nS1\tdata/S1_R1.fq\tdata/S1_R2.fq\nS2\tdata/S2_R1.fq\tdata/S2_R2.fq\n",
        )
        .unwrap()
    }

    fn universe(table: &SampleTable) -> BindingUniverse {
        let mut u = BindingUniverse::new();
        u.insert_dimension("sample", table.ids().map(str::to_string).collect());
        u.insert_dimension("read", vec!["1".to_string(), "2".to_string()]);
        u
    }

    fn per_sample_template() -> TaskTemplate {
        TaskTemplate {
            name: "qc".to_string(),
            wildcards: vec!["sample".to_string()],
            inputs: vec![InputSpec::parse("input/{sample}.fastq").unwrap()],
            outputs: vec![PathPattern::parse("output/{sample}.txt").unwrap()],
            markers: vec![],
            threads: 1,
            command: PathPattern::parse("qc {input} > {output}").unwrap(),
            log: None,
        }
    }

    #[test]
    fn two_samples_yield_two_tasks_with_distinct_paths() {
        let table = samples();
        let universe = universe(&table);
        let inst = Instantiator::new(&universe, &table);
        let template = per_sample_template();

        let bindings = inst.bindings_for(&template).unwrap();
        let tasks = inst.expand(&template, &bindings).unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].outputs, vec![PathBuf::from("output/S1.txt")]);
        assert_eq!(tasks[1].outputs, vec![PathBuf::from("output/S2.txt")]);
        assert_eq!(tasks[0].command, "qc input/S1.fastq > output/S1.txt");
    }

    #[test]
    fn expansion_is_deterministic() {
        let table = samples();
        let universe = universe(&table);
        let inst = Instantiator::new(&universe, &table);
        let template = per_sample_template();
        let bindings = inst.bindings_for(&template).unwrap();

        let first = inst.expand(&template, &bindings).unwrap();
        let second = inst.expand(&template, &bindings).unwrap();

        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.inputs, b.inputs);
            assert_eq!(a.outputs, b.outputs);
            assert_eq!(a.command, b.command);
        }
    }

    #[test]
    fn two_dimensional_expansion_covers_the_cross_product() {
        let table = samples();
        let universe = universe(&table);
        let inst = Instantiator::new(&universe, &table);

        let template = TaskTemplate {
            name: "trim".to_string(),
            wildcards: vec!["sample".to_string(), "read".to_string()],
            inputs: vec![InputSpec::parse("sample:fq{read}").unwrap()],
            outputs: vec![PathPattern::parse("trimmed/{sample}_{read}.fq").unwrap()],
            markers: vec![],
            threads: 2,
            command: PathPattern::parse("trim -j {threads} {input} -o {output}").unwrap(),
            log: None,
        };

        let bindings = inst.bindings_for(&template).unwrap();
        let tasks = inst.expand(&template, &bindings).unwrap();

        assert_eq!(tasks.len(), 4);
        // Sample sheet column fq{read} resolves through the table.
        assert_eq!(tasks[0].inputs, vec![PathBuf::from("data/S1_R1.fq")]);
        assert_eq!(tasks[1].inputs, vec![PathBuf::from("data/S1_R2.fq")]);
        assert_eq!(tasks[3].outputs, vec![PathBuf::from("trimmed/S2_2.fq")]);
    }

    #[test]
    fn gather_input_concatenates_all_sample_outputs() {
        let table = samples();
        let universe = universe(&table);
        let inst = Instantiator::new(&universe, &table);

        let template = TaskTemplate {
            name: "combine".to_string(),
            wildcards: vec![],
            inputs: vec![InputSpec::parse("output/{sample}.txt").unwrap()],
            outputs: vec![PathPattern::parse("combined.txt").unwrap()],
            markers: vec![],
            threads: 1,
            command: PathPattern::parse("cat {inputs} > {output}").unwrap(),
            log: None,
        };

        let bindings = inst.bindings_for(&template).unwrap();
        assert_eq!(bindings.len(), 1);
        let tasks = inst.expand(&template, &bindings).unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(
            tasks[0].inputs,
            vec![PathBuf::from("output/S1.txt"), PathBuf::from("output/S2.txt")]
        );
        assert_eq!(tasks[0].command, "cat output/S1.txt output/S2.txt > combined.txt");
    }

    #[test]
    fn unresolved_wildcard_is_an_error() {
        let table = samples();
        let universe = universe(&table);
        let inst = Instantiator::new(&universe, &table);
        let template = per_sample_template();

        // Binding lacks the `sample` dimension entirely.
        let err = inst.expand(&template, &[Binding::new()]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnresolvedWildcard { wildcard, .. } if wildcard == "sample"
        ));
    }

    #[test]
    fn scratch_placeholder_survives_command_resolution() {
        let table = samples();
        let universe = universe(&table);
        let inst = Instantiator::new(&universe, &table);

        let mut template = per_sample_template();
        template.command =
            PathPattern::parse("qc --tmpdir {scratch} {input} > {output}").unwrap();

        let bindings = inst.bindings_for(&template).unwrap();
        let tasks = inst.expand(&template, &bindings).unwrap();
        assert!(tasks[0].command.contains("{scratch}"));
    }
}
