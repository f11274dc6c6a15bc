//! Merges the backend's streaming result events into a stable transcript.
//!
//! Every event carries a result id grouping the revisions of one utterance
//! span. The first event for an id appends a segment; later ones overwrite
//! that segment's content in place. Partials are included immediately and
//! corrected when the final revision arrives, so the transcript stays
//! low-latency and eventually consistent. Segment order is first-appearance
//! order, never arrival order of revisions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::transport::ResultEvent;

/// One utterance span's current transcript content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptSegment {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Default)]
pub struct TranscriptReconciler {
    segments: Vec<TranscriptSegment>,
    index: HashMap<String, usize>,
}

impl TranscriptReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one result event: pick the most complete alternative and insert
    /// or replace the segment for its result id.
    pub fn apply(&mut self, event: ResultEvent) {
        let Some(content) = choose_alternative(&event.alternatives) else {
            return;
        };

        match self.index.get(&event.result_id) {
            Some(&pos) => {
                self.segments[pos].content = content;
            }
            None => {
                self.index.insert(event.result_id.clone(), self.segments.len());
                self.segments.push(TranscriptSegment {
                    id: event.result_id,
                    content,
                });
            }
        }
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    /// Current segment contents joined with single spaces.
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Paragraph view of the current transcript. Recomputed from scratch on
    /// every call since revisions can change already-assembled text.
    pub fn paragraphs(&self) -> Vec<String> {
        let contents: Vec<&str> = self.segments.iter().map(|s| s.content.as_str()).collect();
        super::paragraphs::assemble_paragraphs(&contents)
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.index.clear();
    }
}

/// Longest alternative wins; a longer candidate is assumed more complete for
/// the same revision. Ties break to the first listed.
fn choose_alternative(alternatives: &[String]) -> Option<String> {
    // Not max_by_key: that keeps the last maximum, ties must keep the first.
    let mut best: Option<&String> = None;
    for alt in alternatives {
        if best.map_or(true, |b| alt.len() > b.len()) {
            best = Some(alt);
        }
    }
    best.cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_alternative_wins_ties_to_first() {
        let alts = vec!["go".to_string(), "going".to_string(), "go to".to_string()];
        assert_eq!(choose_alternative(&alts), Some("going".to_string()));

        let tied = vec!["abc".to_string(), "xyz".to_string()];
        assert_eq!(choose_alternative(&tied), Some("abc".to_string()));
    }

    #[test]
    fn no_alternatives_is_a_no_op() {
        let mut rec = TranscriptReconciler::new();
        rec.apply(ResultEvent {
            result_id: "a".into(),
            alternatives: vec![],
            is_partial: true,
        });
        assert!(rec.is_empty());
    }
}
