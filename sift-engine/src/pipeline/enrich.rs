//! Source enrichment: attach provenance and ancillary metadata to hits.
//!
//! At most three batched lookups per pipeline run, one per source kind.
//! Enrichment is best-effort: a failed lookup leaves the affected hits
//! unenriched and the run continues.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sift_corpus::{CorpusHit, ProvenanceSource, SourceKind};
use tracing::warn;

use crate::EngineContext;

/// Enriched metadata for one evidence hit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceDetail {
    pub source_id: String,
    pub title: String,
    // Article enrichment: provenance links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineage_case: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineage_conversation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineage_script: Option<String>,
    // Script enrichment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_inputs: Option<Vec<String>>,
    // Case-resolution enrichment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_root_cause: Option<String>,
}

impl SourceDetail {
    fn bare(hit: &CorpusHit) -> Self {
        Self {
            source_id: hit.source_id.clone(),
            title: hit.title.clone(),
            ..Default::default()
        }
    }

    /// Whether any enrichment data was attached.
    pub fn is_enriched(&self) -> bool {
        self.lineage_case.is_some()
            || self.lineage_conversation.is_some()
            || self.lineage_script.is_some()
            || self.script_purpose.is_some()
            || self.case_subject.is_some()
    }

    /// Render the enrichment as prompt context lines. Empty when bare.
    pub fn prompt_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(purpose) = &self.script_purpose {
            lines.push(format!("Purpose: {purpose}"));
        }
        if let Some(inputs) = &self.script_inputs {
            if !inputs.is_empty() {
                lines.push(format!("Required inputs: {}", inputs.join(", ")));
            }
        }
        if let Some(subject) = &self.case_subject {
            lines.push(format!("Subject: {subject}"));
        }
        if let Some(root_cause) = &self.case_root_cause {
            lines.push(format!("Root cause: {root_cause}"));
        }
        if let Some(case) = &self.lineage_case {
            lines.push(format!("Linked case: {case}"));
        }
        if let Some(script) = &self.lineage_script {
            lines.push(format!("Linked script: {script}"));
        }
        lines
    }
}

/// Resolve enrichment for a hit list with three batched lookups.
pub async fn resolve(ctx: &EngineContext, evidence: &[CorpusHit]) -> Vec<SourceDetail> {
    let mut article_ids = Vec::new();
    let mut script_ids = Vec::new();
    let mut case_ids = Vec::new();
    for hit in evidence {
        match hit.kind {
            SourceKind::Article => article_ids.push(hit.source_id.clone()),
            SourceKind::Script => script_ids.push(hit.source_id.clone()),
            SourceKind::CaseResolution => case_ids.push(hit.source_id.clone()),
        }
    }

    // Batch 1: article provenance
    let mut lineage: HashMap<String, (Option<String>, Option<String>, Option<String>)> =
        HashMap::new();
    if !article_ids.is_empty() {
        match ctx.articles.provenance_for(&article_ids).await {
            Ok(records) => {
                for record in records {
                    let slot = lineage.entry(record.article_id.clone()).or_default();
                    match record.source {
                        ProvenanceSource::Case => slot.0 = Some(record.source_id),
                        ProvenanceSource::Conversation => slot.1 = Some(record.source_id),
                        ProvenanceSource::Script => {
                            if !record.source_id.is_empty() {
                                slot.2 = Some(record.source_id);
                            }
                        }
                    }
                }
            }
            Err(e) => warn!("provenance enrichment failed, continuing unenriched: {e}"),
        }
    }

    // Batch 2: script catalog
    let mut scripts = HashMap::new();
    if !script_ids.is_empty() {
        match ctx.scripts.scripts_for(&script_ids).await {
            Ok(rows) => {
                for row in rows {
                    scripts.insert(row.script_id.clone(), row);
                }
            }
            Err(e) => warn!("script enrichment failed, continuing unenriched: {e}"),
        }
    }

    // Batch 3: resolved cases
    let mut cases = HashMap::new();
    if !case_ids.is_empty() {
        match ctx.cases.cases_for(&case_ids).await {
            Ok(rows) => {
                for row in rows {
                    cases.insert(row.case_id.clone(), row);
                }
            }
            Err(e) => warn!("case enrichment failed, continuing unenriched: {e}"),
        }
    }

    evidence
        .iter()
        .map(|hit| {
            let mut detail = SourceDetail::bare(hit);
            match hit.kind {
                SourceKind::Article => {
                    if let Some((case, conversation, script)) = lineage.get(&hit.source_id) {
                        detail.lineage_case = case.clone();
                        detail.lineage_conversation = conversation.clone();
                        detail.lineage_script = script.clone();
                    }
                }
                SourceKind::Script => {
                    if let Some(meta) = scripts.get(&hit.source_id) {
                        detail.script_purpose = Some(meta.purpose.clone());
                        detail.script_inputs = Some(meta.required_inputs.clone());
                    }
                }
                SourceKind::CaseResolution => {
                    if let Some(case) = cases.get(&hit.source_id) {
                        detail.case_subject = Some(case.subject.clone());
                        detail.case_resolution = Some(case.resolution.clone());
                        detail.case_root_cause = Some(case.root_cause.clone());
                    }
                }
            }
            detail
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_detail_is_unenriched() {
        let detail = SourceDetail {
            source_id: "SCR-1".into(),
            title: "t".into(),
            ..Default::default()
        };
        assert!(!detail.is_enriched());
        assert!(detail.prompt_lines().is_empty());
    }

    #[test]
    fn test_prompt_lines_cover_attached_fields() {
        let detail = SourceDetail {
            source_id: "SCR-1".into(),
            title: "t".into(),
            script_purpose: Some("fix stuck date advance".into()),
            script_inputs: Some(vec!["property_id".into(), "target_date".into()]),
            ..Default::default()
        };
        assert!(detail.is_enriched());
        let lines = detail.prompt_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("property_id"));
    }
}
