//! Parser for vector indexer documents (`indexer.yml`).

use super::traits::NativeParser;
use super::utils::{insert_unique, parse_yaml};
use crate::common::{ActionSpec, CanonicalConfig, JobStep, SelectionRules, SettingsMap};
use crate::Result;
use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct IndexerDocument {
    #[serde(default)]
    inputs: Vec<Input>,
    #[serde(default)]
    indexes: Vec<Index>,
    #[serde(default)]
    pipelines: Vec<Pipeline>,
}

#[derive(Debug, Deserialize)]
struct Input {
    name: String,
    #[serde(default)]
    fields: Vec<String>,
    #[serde(flatten)]
    settings: SettingsMap,
}

#[derive(Debug, Deserialize)]
struct Index {
    name: String,
    #[serde(flatten)]
    settings: SettingsMap,
}

#[derive(Debug, Deserialize)]
struct Pipeline {
    name: String,
    input: String,
    index: String,
}

/// Parser for the vector indexer's inputs, indexes and pipelines.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexerParser;

impl IndexerParser {
    pub fn new() -> Self {
        Self
    }
}

impl NativeParser for IndexerParser {
    fn tool(&self) -> &str {
        "indexer"
    }

    fn parse(&self, document: &str) -> Result<CanonicalConfig> {
        let doc: IndexerDocument = parse_yaml(document)?;
        if doc.inputs.is_empty() && doc.indexes.is_empty() {
            bail!("document declares neither `inputs` nor `indexes`");
        }

        let mut config = CanonicalConfig::default();
        for input in doc.inputs {
            let spec = ActionSpec {
                name: input.name,
                settings: input.settings,
                selection: SelectionRules::from_patterns(&input.fields),
            };
            insert_unique(&mut config.sources, spec, "input")?;
        }
        for index in doc.indexes {
            let spec = ActionSpec {
                name: index.name,
                settings: index.settings,
                selection: SelectionRules::default(),
            };
            insert_unique(&mut config.sinks, spec, "index")?;
        }

        for pipeline in doc.pipelines {
            config
                .source(&pipeline.input)
                .with_context(|| {
                    format!(
                        "pipeline '{}' references unknown input '{}'",
                        pipeline.name, pipeline.input
                    )
                })?;
            config
                .sink(&pipeline.index)
                .with_context(|| {
                    format!(
                        "pipeline '{}' references unknown index '{}'",
                        pipeline.name, pipeline.index
                    )
                })?;
            config
                .jobs
                .entry(pipeline.name)
                .or_default()
                .push(JobStep::new(pipeline.input, pipeline.index));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DOC: &str = r#"
inputs:
  - name: canonical-email
    path: canonical/email_gmail
    fields: [subject, body, "!attachments"]
indexes:
  - name: email-index
    model: nomic-embed-text
    dimensions: 768
    text_field: body
pipelines:
  - name: email
    input: canonical-email
    index: email-index
"#;

    #[test]
    fn maps_inputs_indexes_and_pipelines() {
        let config = IndexerParser.parse(DOC).unwrap();

        let input = config.source("canonical-email").unwrap();
        assert_eq!(input.setting("path"), Some(&json!("canonical/email_gmail")));
        assert!(input.setting("fields").is_none());
        assert!(input.selection.selects("body"));
        assert!(!input.selection.selects("attachments"));

        let index = config.sink("email-index").unwrap();
        assert_eq!(index.setting("dimensions"), Some(&json!(768)));
        assert_eq!(index.setting("text_field"), Some(&json!("body")));

        assert_eq!(
            config.job("email").unwrap(),
            &[JobStep::new("canonical-email", "email-index")]
        );
    }

    #[test]
    fn unknown_pipeline_reference_is_rejected() {
        let doc = r#"
inputs:
  - name: a
pipelines:
  - name: p
    input: a
    index: missing
"#;
        let err = IndexerParser.parse(doc).unwrap_err();
        assert!(err.to_string().contains("unknown index 'missing'"));
    }

    #[test]
    fn empty_document_shape_is_rejected() {
        assert!(IndexerParser.parse("pipelines: []\n").is_err());
    }
}
