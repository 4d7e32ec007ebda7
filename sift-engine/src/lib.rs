//! sift-engine - Retrieval, gap detection, and self-learning
//!
//! The orchestration layer of the knowledge loop. Two pipeline graphs (QA
//! and gap detection) share a retrieval prefix over one state record; the
//! learning coordinator closes the loop at case closure by stamping
//! retrieval outcomes, adjusting corpus confidence, classifying the
//! knowledge, and drafting reviewable articles. The review gateway is the
//! only mutator of article lifecycle after drafting.

pub mod config;
mod context;
pub mod draft;
pub mod error;
pub mod learning;
pub mod pipeline;
pub mod prompts;
pub mod review;
mod service;
mod text;

pub use config::{EngineConfig, ScoreWeights};
pub use context::EngineContext;
pub use error::{EngineError, Result};
pub use learning::LearningOutcome;
pub use pipeline::{Citation, PipelineRequest, PipelineState, SourceDetail};
pub use service::{CaseClosed, CaseClosure, SuggestOptions, Suggestion, SupportEngine};
