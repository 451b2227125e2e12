// src/config/validate.rs

use crate::config::model::PipelineFile;
use crate::errors::{EngineError, Result};

/// Run basic semantic validation against a loaded pipeline file.
///
/// This checks the engine-wide settings and that templates are present at
/// all; per-template pattern validation happens on registration, and graph
/// properties (cycles, unsatisfied inputs) during resolution.
pub fn validate_pipeline(pipeline: &PipelineFile) -> Result<()> {
    if pipeline.template.is_empty() {
        return Err(EngineError::Config(
            "pipeline must contain at least one [template.<name>] section".to_string(),
        ));
    }

    if pipeline.engine.jobs == 0 {
        return Err(EngineError::Config(
            "[engine].jobs must be >= 1 (got 0)".to_string(),
        ));
    }
    if pipeline.engine.threads == 0 {
        return Err(EngineError::Config(
            "[engine].threads must be >= 1 (got 0)".to_string(),
        ));
    }
    if pipeline.engine.reads.is_empty() {
        return Err(EngineError::Config(
            "[engine].reads must not be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::PipelineFile;

    fn parse(toml: &str) -> PipelineFile {
        toml::from_str(toml).unwrap()
    }

    const MINIMAL: &str = r#"
        samples = "samples.tsv"

        [template.trim]
        wildcards = ["sample"]
        inputs = ["sample:fq1"]
        outputs = ["trimmed/{sample}.fastq"]
        cmd = "trim {input} > {output}"
    "#;

    #[test]
    fn minimal_pipeline_validates_with_defaults() {
        let pipeline = parse(MINIMAL);
        validate_pipeline(&pipeline).unwrap();
        assert_eq!(pipeline.engine.jobs, 1);
        assert_eq!(pipeline.engine.threads, 1);
        assert_eq!(pipeline.engine.reads, vec!["1", "2"]);
        assert!(pipeline.engine.check_mtime);
    }

    #[test]
    fn empty_template_table_is_rejected() {
        let pipeline = parse(r#"samples = "samples.tsv""#);
        assert!(matches!(
            validate_pipeline(&pipeline),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn zero_jobs_is_rejected() {
        let mut pipeline = parse(MINIMAL);
        pipeline.engine.jobs = 0;
        assert!(matches!(
            validate_pipeline(&pipeline),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn zero_thread_budget_is_rejected() {
        let mut pipeline = parse(MINIMAL);
        pipeline.engine.threads = 0;
        assert!(matches!(
            validate_pipeline(&pipeline),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn template_sections_convert_to_templates() {
        let pipeline = parse(MINIMAL);
        let template = pipeline.template["trim"].into_template("trim").unwrap();
        assert_eq!(template.name, "trim");
        assert_eq!(template.wildcards, vec!["sample"]);
        assert_eq!(template.threads, 1);
    }

    #[test]
    fn malformed_pattern_carries_template_name() {
        let pipeline = parse(
            r#"
            samples = "samples.tsv"

            [template.broken]
            outputs = ["out/{unclosed"]
            cmd = "true"
            "#,
        );
        let err = pipeline.template["broken"].into_template("broken").unwrap_err();
        assert!(
            matches!(err, EngineError::MalformedPattern { template, .. } if template == "broken")
        );
    }
}
