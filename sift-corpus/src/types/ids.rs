//! Identifier constructors.
//!
//! Every record family keeps the human-readable prefix style of the
//! upstream support system (`ART-`, `LE-`, `RET-`, ...), backed by random
//! UUID hex.

use uuid::Uuid;

fn hex(len: usize) -> String {
    let simple = Uuid::new_v4().simple().to_string();
    simple[..len].to_string()
}

/// Seed article id: `ART-<hex8>` (uppercase).
pub fn article_id() -> String {
    format!("ART-{}", hex(8).to_uppercase())
}

/// Synthesized article id: `ART-SYN-<hex8>` (uppercase).
pub fn synthesized_article_id() -> String {
    format!("ART-SYN-{}", hex(8).to_uppercase())
}

/// Learning event id: `LE-<hex12>`.
pub fn event_id() -> String {
    format!("LE-{}", hex(12))
}

/// Retrieval log row id: `RET-<hex12>`.
pub fn retrieval_id() -> String {
    format!("RET-{}", hex(12))
}

/// Execution run id: `EXEC-<hex12>`. Attempt records append `-aN`.
pub fn execution_id() -> String {
    format!("EXEC-{}", hex(12))
}

/// Case id: `CASE-<hex8>` (uppercase).
pub fn case_id() -> String {
    format!("CASE-{}", hex(8).to_uppercase())
}
