//! Formatting of draft user stories: the description text and its acceptance criteria.

use regex::Regex;
use std::sync::OnceLock;

use crate::response::{Criterion, UserStoryDraft};

/// Column headers of the synthesized acceptance-criteria table, with their width share in percent.
pub const CRITERIA_COLUMNS: [(&str, u16); 3] = [("Дано", 20), ("Когда", 20), ("Тогда", 60)];

pub const NO_CRITERIA_PLACEHOLDER: &str = "Критерии приемки не указаны";

/// A run of text inside a [`TextBlock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    /// Plain text. May contain `\n` line breaks.
    Plain(String),
    Emphasis(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBlock {
    pub spans: Vec<Inline>,
}

impl TextBlock {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            spans: vec![Inline::Plain(text.into())],
        }
    }

    /// Words of the block joined with single spaces, emphasis dropped.
    pub fn to_plain_text(&self) -> String {
        self.spans
            .iter()
            .map(|span| match span {
                Inline::Plain(s) | Inline::Emphasis(s) => s.as_str(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a draft's acceptance criteria should be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaView {
    /// Ready-made markup from the backend, shown as-is.
    Markup(String),
    Table {
        given: String,
        when: String,
        then: String,
    },
    Bullets(Vec<String>),
    Unspecified,
}

fn markup_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (r"(?i)<br\s*/?>", "\n"),
            (r"(?i)</p>", "\n"),
            (r"(?i)<p[^>]*>", ""),
            (r"<[^>]*>", ""),
        ]
        .into_iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("markup pattern is valid"),
                replacement,
            )
        })
        .collect()
    })
}

fn story_keywords() -> &'static Regex {
    static KEYWORDS: OnceLock<Regex> = OnceLock::new();
    KEYWORDS.get_or_init(|| Regex::new(r"(?i)я,?\s*как|хочу|чтобы").expect("keyword pattern is valid"))
}

fn role_keyword() -> &'static Regex {
    static ROLE: OnceLock<Regex> = OnceLock::new();
    ROLE.get_or_init(|| Regex::new(r"(?i)^я,?\s*как").expect("role pattern is valid"))
}

/// Reduce the small markup subset the backend emits to plain text with `\n` breaks.
pub fn strip_markup(text: &str) -> String {
    let mut out = text.to_string();
    for (re, replacement) in markup_rules() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    out.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

/// Split keeping the separators: `text, keyword, text, keyword, ..., text`.
fn split_keeping_keywords<'a>(text: &'a str, re: &Regex) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut last = 0;
    for m in re.find_iter(text) {
        parts.push(&text[last..m.start()]);
        parts.push(m.as_str());
        last = m.end();
    }
    parts.push(&text[last..]);
    parts
}

struct BlockBuilder {
    blocks: Vec<TextBlock>,
    /// Whether the last block is an open "Я, как ... чтобы ..." block.
    in_story: bool,
    /// Whether the last block holds loose text outside any story sentence.
    in_loose: bool,
}

impl BlockBuilder {
    fn new() -> Self {
        Self {
            blocks: Vec::new(),
            in_story: false,
            in_loose: false,
        }
    }

    fn open_story(&mut self) {
        self.blocks.push(TextBlock::default());
        self.in_story = true;
        self.in_loose = false;
    }

    fn close_story(&mut self) {
        self.in_story = false;
    }

    fn push(&mut self, span: Inline) {
        if !self.in_story && !self.in_loose {
            self.blocks.push(TextBlock::default());
            self.in_loose = true;
        }
        if let Some(block) = self.blocks.last_mut() {
            block.spans.push(span);
        }
    }
}

/// Format a user story sentence ("Я, как ... хочу ... чтобы ...").
///
/// Each keyword is emphasized; the role keyword opens a block and the clause
/// after "чтобы" is joined into the same block, which then closes.
pub fn format_story_text(text: &str) -> Vec<TextBlock> {
    if text.is_empty() {
        return Vec::new();
    }

    let processed = strip_markup(text);
    let parts = split_keeping_keywords(&processed, story_keywords());
    let mut builder = BlockBuilder::new();

    let mut i = 0;
    while i < parts.len() {
        let part = parts[i].trim();
        let lower = part.to_lowercase();

        if role_keyword().is_match(part) {
            builder.open_story();
            builder.push(Inline::Emphasis(part.to_string()));
        } else if lower == "хочу" {
            builder.push(Inline::Emphasis(part.to_string()));
        } else if lower == "чтобы" {
            builder.push(Inline::Emphasis(part.to_string()));
            if let Some(clause) = parts.get(i + 1) {
                let clause = clause.trim();
                if !clause.is_empty() {
                    builder.push(Inline::Plain(clause.to_string()));
                }
                i += 1;
            }
            builder.close_story();
        } else if !part.is_empty() {
            builder.push(Inline::Plain(part.to_string()));
        }
        i += 1;
    }

    if builder.blocks.is_empty() {
        vec![TextBlock::plain(processed)]
    } else {
        builder.blocks
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Pick the presentation of a draft's acceptance criteria. Exactly one branch applies.
pub fn format_acceptance_criteria(story: &UserStoryDraft) -> CriteriaView {
    if let Some(first) = story.acceptance_criteria.first() {
        return match first {
            Criterion::Markup { html } => CriteriaView::Markup(html.clone()),
            Criterion::Text(s) if s.starts_with("<table") => CriteriaView::Markup(s.clone()),
            _ => CriteriaView::Bullets(
                story
                    .acceptance_criteria
                    .iter()
                    .map(Criterion::as_text)
                    .collect(),
            ),
        };
    }

    let given = non_empty(story.given_conditions.as_deref());
    let when = non_empty(story.when_actions.as_deref());
    let then = non_empty(story.then_results.as_deref());
    if given.is_some() || when.is_some() || then.is_some() {
        return CriteriaView::Table {
            given: given.unwrap_or_default().to_string(),
            when: when.unwrap_or_default().to_string(),
            then: then.unwrap_or_default().to_string(),
        };
    }

    CriteriaView::Unspecified
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_sentence_emphasizes_keywords_and_inlines_final_clause() {
        let blocks = format_story_text("Я, как пользователь хочу видеть отчёт чтобы принять решение");
        assert_eq!(
            blocks,
            vec![TextBlock {
                spans: vec![
                    Inline::Emphasis("Я, как".into()),
                    Inline::Plain("пользователь".into()),
                    Inline::Emphasis("хочу".into()),
                    Inline::Plain("видеть отчёт".into()),
                    Inline::Emphasis("чтобы".into()),
                    Inline::Plain("принять решение".into()),
                ],
            }]
        );
    }

    #[test]
    fn markup_is_normalized_before_splitting() {
        let blocks = format_story_text(
            "<p>Контекст&nbsp;задачи</p><p><b>Я как</b> аналитик хочу <i>выгрузку</i> чтобы&#39;сверить&#39;</p>",
        );
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], TextBlock::plain("Контекст задачи"));
        assert_eq!(blocks[1].spans[0], Inline::Emphasis("Я как".into()));
        assert_eq!(blocks[1].spans.last(), Some(&Inline::Plain("'сверить'".into())));
    }

    #[test]
    fn clause_after_final_keyword_keeps_line_breaks() {
        let blocks = format_story_text("Я, как админ хочу X чтобы Y\nДоп. требования");
        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0].spans.last(),
            Some(&Inline::Plain("Y\nДоп. требования".into()))
        );
    }

    #[test]
    fn second_sentence_opens_its_own_block() {
        let blocks = format_story_text("Я как A хочу B чтобы C. Я как D хочу E чтобы F");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].spans[0], Inline::Emphasis("Я как".into()));
    }

    #[test]
    fn text_without_keywords_is_kept_whole() {
        assert_eq!(
            format_story_text("Описание отсутствует"),
            vec![TextBlock::plain("Описание отсутствует")]
        );
        assert!(format_story_text("").is_empty());
    }

    #[test]
    fn markup_only_text_falls_back_to_normalized_text() {
        assert_eq!(format_story_text("<br/>"), vec![TextBlock::plain("\n")]);
    }

    #[test]
    fn formatting_is_deterministic() {
        let input = "Я, как тестировщик хочу отчёт чтобы видеть дефекты";
        assert_eq!(format_story_text(input), format_story_text(input));
    }

    #[test]
    fn strip_markup_decodes_entities_after_removing_tags() {
        assert_eq!(strip_markup("a<br>b&lt;c&gt;&amp;&quot;"), "a\nb<c>&\"");
    }

    #[test]
    fn given_when_then_fields_synthesize_a_table() {
        let story = UserStoryDraft {
            given_conditions: Some("A".into()),
            when_actions: Some("B".into()),
            then_results: Some("C".into()),
            ..Default::default()
        };
        assert_eq!(
            format_acceptance_criteria(&story),
            CriteriaView::Table {
                given: "A".into(),
                when: "B".into(),
                then: "C".into(),
            }
        );
    }

    #[test]
    fn markup_object_is_used_verbatim() {
        let story = UserStoryDraft {
            acceptance_criteria: vec![
                Criterion::Markup { html: "<table><tr><td>x</td></tr></table>".into() },
                Criterion::Text("ignored".into()),
            ],
            given_conditions: Some("A".into()),
            ..Default::default()
        };
        assert_eq!(
            format_acceptance_criteria(&story),
            CriteriaView::Markup("<table><tr><td>x</td></tr></table>".into())
        );
    }

    #[test]
    fn table_string_is_used_verbatim() {
        let story = UserStoryDraft {
            acceptance_criteria: vec![Criterion::Text("<table>t</table>".into())],
            ..Default::default()
        };
        assert_eq!(
            format_acceptance_criteria(&story),
            CriteriaView::Markup("<table>t</table>".into())
        );
    }

    #[test]
    fn plain_list_becomes_bullets() {
        let story = UserStoryDraft {
            acceptance_criteria: vec![Criterion::Text("один".into()), Criterion::Text("два".into())],
            ..Default::default()
        };
        assert_eq!(
            format_acceptance_criteria(&story),
            CriteriaView::Bullets(vec!["один".into(), "два".into()])
        );
    }

    #[test]
    fn missing_criteria_yield_placeholder() {
        let story = UserStoryDraft {
            given_conditions: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(format_acceptance_criteria(&story), CriteriaView::Unspecified);
    }
}
