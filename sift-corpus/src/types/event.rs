//! Learning events: the auditable records of self-learning decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ids;

/// What kind of knowledge decision the event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// New knowledge was drafted and awaits review.
    Gap,
    /// Existing knowledge was contradicted; a replacement awaits review.
    Contradiction,
    /// Existing knowledge was confirmed; auto-finalized.
    Confirmed,
}

/// Final review decision on an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Approved,
    Rejected,
}

/// Who finalized the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewerRole {
    #[serde(rename = "TIER_3")]
    Tier3,
    Ops,
    System,
}

/// An auditable self-learning decision.
///
/// `Confirmed` events are born finalized (approved by `System`); `Gap` and
/// `Contradiction` events start pending and are finalized exactly once by
/// the review gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningEvent {
    pub event_id: String,
    pub triggering_case_id: String,
    pub event_kind: EventKind,
    pub detected_gap_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed_article_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flagged_article_id: Option<String>,
    pub draft_summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_status: Option<ReviewStatus>,
    pub reviewer_role: ReviewerRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LearningEvent {
    /// A pending event awaiting review.
    pub fn pending(
        kind: EventKind,
        triggering_case_id: impl Into<String>,
        detected_gap_text: impl Into<String>,
        draft_summary: impl Into<String>,
    ) -> Self {
        Self {
            event_id: ids::event_id(),
            triggering_case_id: triggering_case_id.into(),
            event_kind: kind,
            detected_gap_text: detected_gap_text.into(),
            proposed_article_id: None,
            flagged_article_id: None,
            draft_summary: draft_summary.into(),
            final_status: None,
            reviewer_role: ReviewerRole::Tier3,
            review_reason: None,
            timestamp: Utc::now(),
        }
    }

    /// A `Confirmed` event, finalized on creation by the system.
    pub fn confirmed(
        triggering_case_id: impl Into<String>,
        detected_gap_text: impl Into<String>,
        draft_summary: impl Into<String>,
    ) -> Self {
        Self {
            event_id: ids::event_id(),
            triggering_case_id: triggering_case_id.into(),
            event_kind: EventKind::Confirmed,
            detected_gap_text: detected_gap_text.into(),
            proposed_article_id: None,
            flagged_article_id: None,
            draft_summary: draft_summary.into(),
            final_status: Some(ReviewStatus::Approved),
            reviewer_role: ReviewerRole::System,
            review_reason: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_proposed_article(mut self, article_id: impl Into<String>) -> Self {
        self.proposed_article_id = Some(article_id.into());
        self
    }

    pub fn with_flagged_article(mut self, article_id: impl Into<String>) -> Self {
        self.flagged_article_id = Some(article_id.into());
        self
    }

    /// Whether the event still awaits review.
    pub fn is_pending(&self) -> bool {
        self.final_status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmed_events_are_born_finalized() {
        let event = LearningEvent::confirmed("CASE-1", "covered", "validated");
        assert!(!event.is_pending());
        assert_eq!(event.final_status, Some(ReviewStatus::Approved));
        assert_eq!(event.reviewer_role, ReviewerRole::System);
    }

    #[test]
    fn test_pending_events_await_review() {
        let event = LearningEvent::pending(EventKind::Gap, "CASE-1", "gap", "draft title")
            .with_proposed_article("ART-SYN-AB12CD34");
        assert!(event.is_pending());
        assert!(event.proposed_article_id.is_some());
        assert!(event.event_id.starts_with("LE-"));
    }
}
