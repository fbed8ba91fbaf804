// src/context/mod.rs

//! Context assembly for generation.
//!
//! Structures two bounded sets of turns into the prompt context:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ Relevant history (long-term)                               │
//! │   similarity matches across all the user's conversations,  │
//! │   descending score, each annotated with its timestamp      │
//! ├────────────────────────────────────────────────────────────┤
//! │ Recent conversation (short-term)                           │
//! │   last N turns of this conversation, chronological         │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Assembly is pure structuring: bounds were already applied upstream by
//! the store's threshold/top-k and recent-limit, and nothing here consults
//! the clock, so identical inputs always produce identical output.

use crate::memory::types::{SimilarityMatch, Turn};

/// The structured context handed to the generation client.
#[derive(Debug, Clone, Default)]
pub struct AssembledContext {
    /// Long-term matches, descending similarity. Deduplicated against
    /// `recent`: a turn present in both sets stays only in `recent`, since
    /// immediacy beats redundancy.
    pub relevant: Vec<SimilarityMatch>,
    /// Short-term window, oldest-first.
    pub recent: Vec<Turn>,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.relevant.is_empty() && self.recent.is_empty()
    }
}

/// Combine similarity matches and the recent-turns window. Empty inputs are
/// valid; a new conversation legitimately has no history.
pub fn assemble(matches: Vec<SimilarityMatch>, recent: Vec<Turn>) -> AssembledContext {
    let relevant = matches
        .into_iter()
        .filter(|m| !recent.iter().any(|t| t.id == m.turn.id))
        .collect();

    AssembledContext { relevant, recent }
}

/// Render the context as the two labeled blocks sent to the model.
/// Deterministic: timestamps come from the turns themselves, never from
/// assembly time.
pub fn render(context: &AssembledContext) -> String {
    if context.is_empty() {
        return String::new();
    }

    let mut out = String::new();

    if !context.relevant.is_empty() {
        out.push_str("## Relevant history\n");
        for m in &context.relevant {
            out.push_str(&format!(
                "[{}] {}: {}\n",
                m.turn.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                m.turn.role,
                m.turn.content
            ));
        }
    }

    if !context.recent.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("## Recent conversation\n");
        for turn in &context.recent {
            out.push_str(&format!("{}: {}\n", turn.role, turn.content));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::Role;
    use chrono::{TimeZone, Utc};

    fn turn(id: &str, role: Role, content: &str, minute: u32) -> Turn {
        Turn {
            id: id.to_string(),
            conversation_id: "conv-1".to_string(),
            role,
            content: content.to_string(),
            image_ref: None,
            embedding: Some(vec![0.0; 4]),
            created_at: Utc.with_ymd_and_hms(2026, 8, 1, 12, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_empty_inputs_are_valid() {
        let context = assemble(Vec::new(), Vec::new());
        assert!(context.is_empty());
        assert_eq!(render(&context), "");
    }

    #[test]
    fn test_dedup_prefers_recent_block() {
        let shared = turn("t1", Role::User, "how do I shade a sphere", 5);
        let matches = vec![
            SimilarityMatch {
                turn: shared.clone(),
                score: 0.95,
            },
            SimilarityMatch {
                turn: turn("t2", Role::Assistant, "start with a light source", 1),
                score: 0.80,
            },
        ];
        let recent = vec![shared.clone()];

        let context = assemble(matches, recent);

        assert_eq!(context.relevant.len(), 1);
        assert_eq!(context.relevant[0].turn.id, "t2");
        assert_eq!(context.recent.len(), 1);
        assert_eq!(context.recent[0].id, "t1");

        let rendered = render(&context);
        assert_eq!(rendered.matches("how do I shade a sphere").count(), 1);
    }

    #[test]
    fn test_render_is_idempotent() {
        let matches = vec![SimilarityMatch {
            turn: turn("t1", Role::User, "hand proportions", 3),
            score: 0.9,
        }];
        let recent = vec![turn("t2", Role::Assistant, "measure with the palm", 7)];

        let context = assemble(matches, recent);
        let first = render(&context);
        let second = render(&context);

        assert_eq!(first, second);
        assert!(first.contains("## Relevant history"));
        assert!(first.contains("## Recent conversation"));
        assert!(first.contains("[2026-08-01 12:03:00 UTC] user: hand proportions"));
    }
}
