//! Feedback classification and revision planning.
//!
//! Revision requests arrive as free text plus a list of "revision area"
//! labels. The classifier maps those labels onto the producing actor's
//! earlier workflow stages so the orchestrator knows what to re-enter. The
//! keyword matching is deliberately isolated behind the [`Classifier`]
//! trait so it can later be swapped for a rule-table or model-backed
//! implementation without touching the state machine.

use crate::workflow::{is_packaging_area, revision_stages_for_area, Stage};

/// Maps revision requests to the stages that must be revisited.
pub trait Classifier: Send + Sync {
    /// Stages implicated by the feedback, using the fixed keyword tables.
    ///
    /// When multiple areas map to different stages, all of them are
    /// returned and the orchestrator revisits each one.
    fn classify(&self, feedback_text: &str, revision_areas: &[String]) -> Vec<Stage>;

    /// Whether the deliverables should be repackaged.
    ///
    /// True only if an area carries packaging vocabulary, or if revision
    /// areas exist but matched no specific stage table; a revision is
    /// never silently dropped.
    fn should_repackage(&self, revision_areas: &[String], other_matches: &[Stage]) -> bool;
}

/// Keyword-containment classifier over the fixed stage vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, feedback_text: &str, revision_areas: &[String]) -> Vec<Stage> {
        let mut stages: Vec<Stage> = revision_areas
            .iter()
            .flat_map(|area| revision_stages_for_area(area))
            .collect();

        // Without explicit areas, the feedback text itself is the label.
        if revision_areas.is_empty() {
            stages.extend(revision_stages_for_area(feedback_text));
        }

        stages.sort();
        stages.dedup();
        stages
    }

    fn should_repackage(&self, revision_areas: &[String], other_matches: &[Stage]) -> bool {
        if revision_areas.iter().any(|area| is_packaging_area(area)) {
            return true;
        }
        !revision_areas.is_empty() && other_matches.is_empty()
    }
}
