//! Routing of free-text requests to backend capabilities.

use serde::{Deserialize, Serialize};

/// Keywords that route a message to the change-chain flow. Checked first.
const CHANGE_CHAIN_KEYWORDS: &[&str] = &["цепочку", "связанных тикетов", "связанных", "цепочка"];

const CHECKLIST_KEYWORDS: &[&str] = &["чек-лист", "бдк"];

/// The backend automation flow a message targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    ChangeChain,
    Checklist,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ChangeChain => "change-chain",
            Capability::Checklist => "checklist",
        }
    }

    /// Endpoint path relative to the API base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Capability::ChangeChain => "change-chain-chat",
            Capability::Checklist => "checklist-chat",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Capability::ChangeChain => "Цепочка изменений",
            Capability::Checklist => "Чек-лист БДК",
        }
    }
}

/// Classify a message by keyword containment.
///
/// Change-chain keywords win over checklist keywords, and anything without a
/// recognized keyword falls back to the change-chain flow (which also handles
/// user story creation and the "Да"/"Нет" confirmation replies).
pub fn classify(text: &str) -> Capability {
    let lower = text.to_lowercase();

    if CHANGE_CHAIN_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        Capability::ChangeChain
    } else if CHECKLIST_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        Capability::Checklist
    } else {
        Capability::ChangeChain
    }
}

/// Canned example prompts offered as input prefills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    ChangeChain,
    Checklist,
    UserStory,
}

impl QuickAction {
    pub fn all() -> Vec<QuickAction> {
        vec![QuickAction::ChangeChain, QuickAction::Checklist, QuickAction::UserStory]
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            QuickAction::ChangeChain => "Создай цепочку связанных тикетов для ЗЗЛ #",
            QuickAction::Checklist => "Создай чек-лист БДК для ЗЗЛ #",
            QuickAction::UserStory => "Создай UserStory в TFS по статье TDD",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuickAction::ChangeChain => "chain",
            QuickAction::Checklist => "checklist",
            QuickAction::UserStory => "user story",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_chain_keywords_route_to_change_chain() {
        assert_eq!(classify("Создай цепочку для ЗЗЛ #123"), Capability::ChangeChain);
        assert_eq!(classify("нужна ЦЕПОЧКА изменений"), Capability::ChangeChain);
        assert_eq!(classify("пачка связанных тикетов"), Capability::ChangeChain);
    }

    #[test]
    fn checklist_keywords_route_to_checklist() {
        assert_eq!(classify("Создай чек-лист БДК ЗЗЛ #42"), Capability::Checklist);
        assert_eq!(classify("бдк для #7"), Capability::Checklist);
        assert_eq!(classify("ЧЕК-ЛИСТ пожалуйста"), Capability::Checklist);
    }

    #[test]
    fn change_chain_wins_when_both_keyword_sets_match() {
        assert_eq!(
            classify("чек-лист БДК и цепочку связанных тикетов"),
            Capability::ChangeChain
        );
        assert_eq!(classify("бдк цепочка"), Capability::ChangeChain);
    }

    #[test]
    fn unrecognized_text_falls_back_to_change_chain() {
        assert_eq!(classify(""), Capability::ChangeChain);
        assert_eq!(classify("Да"), Capability::ChangeChain);
        assert_eq!(classify("Создай UserStory в TFS по статье TDD"), Capability::ChangeChain);
    }

    #[test]
    fn classification_is_stable_across_calls() {
        let text = "Создай чек-лист БДК ЗЗЛ #42";
        assert_eq!(classify(text), classify(text));
    }

    #[test]
    fn quick_action_prompts_classify_as_intended() {
        assert_eq!(classify(QuickAction::ChangeChain.prompt()), Capability::ChangeChain);
        assert_eq!(classify(QuickAction::Checklist.prompt()), Capability::Checklist);
    }

    #[test]
    fn capability_serializes_as_kebab_case() {
        let json = serde_json::to_string(&Capability::ChangeChain).unwrap();
        assert_eq!(json, "\"change-chain\"");
        let back: Capability = serde_json::from_str("\"checklist\"").unwrap();
        assert_eq!(back, Capability::Checklist);
    }
}
