//! Maps a query to a subject label: keyword scoring first, the text-completion service second

use tracing::{debug, warn};
use tutor_core::LLMClientRef;

/// Label returned when nothing better is known
pub const GENERAL_LABEL: &str = "general";

/// Subjects in priority order; on equal scores the earlier subject wins
pub const SUBJECT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "math",
        &[
            "math", "algebra", "calculus", "geometry", "equation", "solve", "calculate",
            "derivative", "integral",
        ],
    ),
    (
        "physics",
        &[
            "physics", "force", "velocity", "acceleration", "energy", "momentum", "newton",
            "electromagnetic", "convert",
        ],
    ),
    (
        "chemistry",
        &[
            "chemistry", "molecule", "atom", "reaction", "compound", "element", "periodic", "bond",
        ],
    ),
    (
        "biology",
        &[
            "biology", "cell", "dna", "organism", "evolution", "genetics", "anatomy", "ecosystem",
        ],
    ),
    (
        "computer_science",
        &[
            "programming", "algorithm", "code", "python", "javascript", "data structure",
            "software",
        ],
    ),
    (
        "language_arts",
        &[
            "grammar", "literature", "writing", "essay", "poetry", "shakespeare", "analysis",
        ],
    ),
    (
        "history",
        &[
            "history", "war", "civilization", "empire", "revolution", "century", "ancient",
            "medieval",
        ],
    ),
    (
        "geography",
        &[
            "geography", "continent", "country", "climate", "mountain", "river", "population",
        ],
    ),
];

pub struct Classifier {
    subjects: Vec<(String, Vec<String>)>,
    llm: LLMClientRef,
}

impl Classifier {
    /// Classifier over the built-in subject table
    pub fn new(llm: LLMClientRef) -> Self {
        Self::with_subjects(SUBJECT_KEYWORDS, llm)
    }

    pub fn with_subjects(subjects: &[(&str, &[&str])], llm: LLMClientRef) -> Self {
        Self {
            subjects: subjects
                .iter()
                .map(|(label, keywords)| {
                    (
                        label.to_string(),
                        keywords.iter().map(|k| k.to_lowercase()).collect(),
                    )
                })
                .collect(),
            llm,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.subjects.iter().map(|(label, _)| label.as_str())
    }

    /// Best keyword match: the most distinct keywords present, earliest subject on ties
    pub fn keyword_match(&self, query: &str) -> Option<&str> {
        let lower = query.to_lowercase();
        let mut best: Option<(&str, usize)> = None;
        for (label, keywords) in &self.subjects {
            let score = keywords.iter().filter(|k| lower.contains(k.as_str())).count();
            if score > 0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((label, score));
            }
        }
        best.map(|(label, _)| label)
    }

    /// Always yields a label; never fails
    pub async fn classify(&self, query: &str) -> String {
        if let Some(label) = self.keyword_match(query) {
            debug!(label, path = "keyword", "Classified query");
            return label.to_string();
        }

        let label = self.semantic(query).await;
        debug!(label = %label, path = "semantic", "Classified query");
        label
    }

    async fn semantic(&self, query: &str) -> String {
        let prompt = format!(
            "Classify this educational query into one of these subjects: {}.\n\n\
             Query: \"{}\"\n\n\
             Respond with only the subject name.",
            self.labels().collect::<Vec<_>>().join(", "),
            query
        );

        let answer = match self.llm.generate(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Semantic classification failed");
                return GENERAL_LABEL.to_string();
            }
        };

        let label = answer
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
            .to_lowercase();
        if self.labels().any(|known| known == label) {
            label
        } else {
            debug!(answer = %answer.trim(), "Unrecognized classification");
            GENERAL_LABEL.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;
    use std::sync::Arc;

    fn classifier(llm: Arc<ScriptedLlm>) -> Classifier {
        Classifier::new(llm)
    }

    #[tokio::test]
    async fn test_single_subject_keywords() {
        let llm = Arc::new(ScriptedLlm::failing());
        let classifier = classifier(llm.clone());
        assert_eq!(classifier.classify("solve 2x + 5 = 11").await, "math");
        assert_eq!(classifier.classify("convert 5 meters to feet").await, "physics");
        assert_eq!(classifier.classify("Balance this chemical REACTION").await, "chemistry");
        assert_eq!(classifier.classify("Explain DNA replication").await, "biology");
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_higher_score_wins() {
        let classifier = classifier(Arc::new(ScriptedLlm::failing()));
        // physics: force, acceleration; math: calculate
        assert_eq!(
            classifier
                .classify("calculate the force from mass and acceleration")
                .await,
            "physics"
        );
    }

    #[tokio::test]
    async fn test_ties_go_to_earliest_subject() {
        let classifier = classifier(Arc::new(ScriptedLlm::failing()));
        // one keyword each for math and physics
        assert_eq!(classifier.classify("calculate the energy").await, "math");

        let reordered = Classifier::with_subjects(
            &[("physics", &["energy"]), ("math", &["calculate"])],
            Arc::new(ScriptedLlm::failing()),
        );
        assert_eq!(reordered.classify("calculate the energy").await, "physics");
    }

    #[tokio::test]
    async fn test_semantic_fallback() {
        let llm = Arc::new(ScriptedLlm::replying("  Biology.\n"));
        let classifier = classifier(llm.clone());
        assert_eq!(classifier.classify("Why do leaves change color?").await, "biology");
        assert_eq!(llm.calls(), 1);
        let prompt = llm.last_prompt().unwrap();
        assert!(prompt.contains("math, physics, chemistry, biology, computer_science"));
    }

    #[tokio::test]
    async fn test_semantic_failure_or_unknown_is_general() {
        let failing = classifier(Arc::new(ScriptedLlm::failing()));
        assert_eq!(failing.classify("Tell me a joke").await, GENERAL_LABEL);

        let rambling = classifier(Arc::new(ScriptedLlm::replying("It is probably music theory")));
        assert_eq!(rambling.classify("Tell me a joke").await, GENERAL_LABEL);
    }
}
