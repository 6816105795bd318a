//! Pedagogical prompt modes and system-prompt resolution.
//!
//! Each mode carries a base system prompt; optional context fields from
//! the session-creation request are appended as labeled clauses.

use serde::{Deserialize, Serialize};

/// Available prompt modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    TpAssistant,
    DebugHelper,
    ConceptExplainer,
    CodeReviewer,
}

impl PromptMode {
    pub const ALL: &'static [PromptMode] = &[
        PromptMode::TpAssistant,
        PromptMode::DebugHelper,
        PromptMode::ConceptExplainer,
        PromptMode::CodeReviewer,
    ];

    /// Parse a wire identifier. Unknown identifiers fall back to the
    /// default tutoring mode.
    pub fn parse(id: &str) -> Self {
        match id {
            "TP_ASSISTANT" => PromptMode::TpAssistant,
            "DEBUG_HELPER" => PromptMode::DebugHelper,
            "CONCEPT_EXPLAINER" => PromptMode::ConceptExplainer,
            "CODE_REVIEWER" => PromptMode::CodeReviewer,
            _ => PromptMode::TpAssistant,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptMode::TpAssistant => "TP_ASSISTANT",
            PromptMode::DebugHelper => "DEBUG_HELPER",
            PromptMode::ConceptExplainer => "CONCEPT_EXPLAINER",
            PromptMode::CodeReviewer => "CODE_REVIEWER",
        }
    }

    /// Short human-readable description, surfaced by the modes endpoint.
    pub fn description(&self) -> &'static str {
        match self {
            PromptMode::TpAssistant => {
                "Accompagnement pendant les travaux pratiques, par indices successifs"
            }
            PromptMode::DebugHelper => "Aide au diagnostic d'erreurs et au débogage",
            PromptMode::ConceptExplainer => "Explication progressive de concepts de programmation",
            PromptMode::CodeReviewer => "Relecture de code avec retours constructifs",
        }
    }

    fn base_prompt(&self) -> &'static str {
        match self {
            PromptMode::TpAssistant => {
                "Tu es un assistant pédagogique qui accompagne des étudiants pendant \
                 leurs travaux pratiques de programmation. Guide l'étudiant vers la \
                 solution par des questions et des indices, sans jamais donner la \
                 réponse complète directement."
            }
            PromptMode::DebugHelper => {
                "Tu es un assistant de débogage. Aide l'étudiant à comprendre les \
                 erreurs de son code : demande le message d'erreur exact, explique sa \
                 cause probable et propose une démarche de diagnostic pas à pas."
            }
            PromptMode::ConceptExplainer => {
                "Tu es un enseignant qui explique des concepts de programmation. \
                 Donne des explications progressives appuyées sur des exemples \
                 simples, et vérifie la compréhension de l'étudiant avant d'aller \
                 plus loin."
            }
            PromptMode::CodeReviewer => {
                "Tu es un relecteur de code bienveillant. Commente le code de \
                 l'étudiant en soulignant d'abord les points forts, puis les \
                 améliorations possibles en matière de lisibilité et de robustesse."
            }
        }
    }
}

impl Default for PromptMode {
    fn default() -> Self {
        PromptMode::TpAssistant
    }
}

/// Optional context attached to a session at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objectives: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,
}

/// Build the system prompt for a mode and context.
///
/// Present fields are appended in fixed order as labeled clauses; absent
/// fields contribute nothing.
pub fn resolve(mode: PromptMode, context: &PromptContext) -> String {
    let mut prompt = mode.base_prompt().to_string();

    let clauses = [
        ("Matière", context.subject.as_deref()),
        ("Objectifs pédagogiques", context.objectives.as_deref()),
        ("Niveau de l'étudiant", context.student_level.as_deref()),
        ("Contraintes", context.constraints.as_deref()),
    ];

    for (label, value) in clauses {
        if let Some(value) = value {
            prompt.push('\n');
            prompt.push_str(label);
            prompt.push_str(" : ");
            prompt.push_str(value);
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_modes() {
        assert_eq!(PromptMode::parse("DEBUG_HELPER"), PromptMode::DebugHelper);
        assert_eq!(PromptMode::parse("CODE_REVIEWER"), PromptMode::CodeReviewer);
    }

    #[test]
    fn test_parse_unknown_mode_falls_back() {
        assert_eq!(PromptMode::parse("NO_SUCH_MODE"), PromptMode::TpAssistant);
        assert_eq!(PromptMode::parse(""), PromptMode::TpAssistant);
    }

    #[test]
    fn test_resolve_without_context() {
        let prompt = resolve(PromptMode::TpAssistant, &PromptContext::default());
        assert!(prompt.contains("travaux pratiques"));
        assert!(!prompt.contains("Matière"));
        assert!(!prompt.contains("Niveau"));
    }

    #[test]
    fn test_resolve_appends_present_fields_in_order() {
        let context = PromptContext {
            subject: Some("Rust".to_string()),
            student_level: Some("débutant".to_string()),
            ..Default::default()
        };
        let prompt = resolve(PromptMode::DebugHelper, &context);

        assert!(prompt.contains("assistant de débogage"));
        assert!(prompt.contains("Matière : Rust"));
        assert!(prompt.contains("Niveau de l'étudiant : débutant"));
        assert!(
            prompt.find("Matière").unwrap() < prompt.find("Niveau").unwrap(),
            "clauses must keep their fixed order"
        );
        // Absent fields leave no placeholder behind.
        assert!(!prompt.contains("Objectifs"));
        assert!(!prompt.contains("Contraintes"));
    }

    #[test]
    fn test_mode_catalog_is_consistent() {
        for mode in PromptMode::ALL {
            assert_eq!(PromptMode::parse(mode.as_str()), *mode);
            assert!(!mode.description().is_empty());
        }
    }
}
