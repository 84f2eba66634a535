//! Content selection for assistant turns.
//!
//! [`render`] maps a [`ServiceResponse`] to a [`DisplayContent`]: which headings,
//! fields, links and story blocks to show, with their defaults. Turning that into
//! styled output is left to the frontend.

pub mod story;

pub use story::{
    format_acceptance_criteria, format_story_text, strip_markup, CriteriaView, Inline, TextBlock,
    CRITERIA_COLUMNS, NO_CRITERIA_PLACEHOLDER,
};

use crate::response::{ChangeChain, ItemId, Preview, ServiceResponse, WorkItemRef};

const DEFAULT_TEAM: &str = "Foxtrot";
const DEFAULT_AREA_PATH: &str = "Houston\\Foxtrot";
const DEFAULT_ITERATION_PATH: &str = "Houston\\Foxtrot";
const DEFAULT_PARENT_TICKET: &str = "Не указан";
const DEFAULT_WIKI_LINK: &str = "#";

const CONFIRMATION_FALLBACK: &str = "Требуется подтверждение";
const SUCCESS_FALLBACK: &str = "Операция выполнена успешно";

/// Instructions appended to every preview: the reply words the backend understands.
pub const CONFIRM_HINT: &str = "Для подтверждения создания отправьте: 'Да' или 'Создать'";
pub const CANCEL_HINT: &str = "Для отмены отправьте: 'Нет' или 'Отмена'";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkItemRole {
    Epic,
    Feature,
    BacklogItem,
    UserStory,
}

impl WorkItemRole {
    pub fn label(&self) -> &'static str {
        match self {
            WorkItemRole::Epic => "Epic",
            WorkItemRole::Feature => "Feature",
            WorkItemRole::BacklogItem => "Product Backlog Item",
            WorkItemRole::UserStory => "User Story",
        }
    }
}

/// A draft story as shown in a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryView {
    pub title: String,
    pub description: Vec<TextBlock>,
    pub criteria: CriteriaView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    Text(String),
    Field {
        label: String,
        value: String,
    },
    Link {
        label: String,
        url: String,
    },
    WorkItem {
        role: WorkItemRole,
        id: String,
        url: String,
        title: String,
        parent: Option<String>,
    },
    Story(StoryView),
    /// Whitespace-preserving text.
    Preformatted(String),
    Note(String),
}

/// Structured content of one transcript turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayContent {
    pub tone: Tone,
    pub blocks: Vec<Block>,
}

impl DisplayContent {
    pub fn text(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            tone,
            blocks: vec![Block::Text(text.into())],
        }
    }

    pub fn is_error(&self) -> bool {
        self.tone == Tone::Error
    }

    /// Flatten to plain text, one line per block element.
    pub fn to_plain_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Heading(s) | Block::Text(s) | Block::Preformatted(s) | Block::Note(s) => {
                    lines.push(s.clone())
                }
                Block::Field { label, value } => lines.push(format!("{}: {}", label, value)),
                Block::Link { label, url } => lines.push(format!("{} <{}>", label, url)),
                Block::WorkItem {
                    role,
                    id,
                    url,
                    title,
                    parent,
                } => {
                    lines.push(format!("{}: #{} <{}>", role.label(), id, url));
                    lines.push(title.clone());
                    if let Some(parent) = parent {
                        lines.push(parent_note(parent));
                    }
                }
                Block::Story(story) => {
                    lines.push(story.title.clone());
                    lines.extend(story.description.iter().map(TextBlock::to_plain_text));
                    lines.push("Критерии приёмки:".to_string());
                    match &story.criteria {
                        CriteriaView::Markup(markup) => lines.push(strip_markup(markup)),
                        CriteriaView::Table { given, when, then } => {
                            let headers: Vec<&str> =
                                CRITERIA_COLUMNS.iter().map(|(name, _)| *name).collect();
                            lines.push(headers.join(" | "));
                            lines.push(format!("{} | {} | {}", given, when, then));
                        }
                        CriteriaView::Bullets(items) => {
                            lines.extend(items.iter().map(|item| format!("• {}", item)))
                        }
                        CriteriaView::Unspecified => {
                            lines.push(NO_CRITERIA_PLACEHOLDER.to_string())
                        }
                    }
                }
            }
        }
        lines.join("\n")
    }
}

pub fn parent_note(parent: &str) -> String {
    format!("Связан с родительским элементом #{}", parent)
}

/// Select the content for a backend response.
pub fn render(response: &ServiceResponse) -> DisplayContent {
    let blocks = match response {
        ServiceResponse::Failure { message } => {
            return DisplayContent::text(Tone::Error, message.clone());
        }
        ServiceResponse::NeedsConfirmation { message, preview } => match preview {
            Some(preview) => render_preview(preview),
            None => vec![Block::Text(
                message.clone().unwrap_or_else(|| CONFIRMATION_FALLBACK.to_string()),
            )],
        },
        ServiceResponse::StoriesCreated {
            stories,
            parent_ticket,
            confluence_url,
        } => render_created_stories(stories, parent_ticket.as_ref(), confluence_url.as_deref()),
        ServiceResponse::ChangeChainResult(chain) => render_change_chain(chain),
        ServiceResponse::ChecklistResult {
            work_item_id,
            checklist,
        } => vec![
            Block::Heading(format!(
                "Чек-лист БДК ЗЗЛ для элемента #{}",
                work_item_id.as_ref().map(ItemId::to_string).unwrap_or_default()
            )),
            Block::Preformatted(checklist.clone()),
        ],
        ServiceResponse::Message(message) => vec![Block::Text(
            message.clone().unwrap_or_else(|| SUCCESS_FALLBACK.to_string()),
        )],
    };

    DisplayContent {
        tone: Tone::Success,
        blocks,
    }
}

fn or_default(value: Option<&str>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn render_preview(preview: &Preview) -> Vec<Block> {
    let parent = preview
        .parent_ticket
        .as_ref()
        .map(ItemId::to_string)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_PARENT_TICKET.to_string());

    let mut blocks = vec![
        Block::Heading(format!(
            "Найдено {} User Stories для создания",
            preview.story_count()
        )),
        Block::Text("Пространство создания:".to_string()),
        Block::Field {
            label: "Команда".to_string(),
            value: or_default(preview.team.as_deref(), DEFAULT_TEAM),
        },
        Block::Field {
            label: "Область".to_string(),
            value: or_default(preview.area_path.as_deref(), DEFAULT_AREA_PATH),
        },
        Block::Field {
            label: "Итерация".to_string(),
            value: or_default(preview.iteration_path.as_deref(), DEFAULT_ITERATION_PATH),
        },
        Block::Field {
            label: "Родительский тикет".to_string(),
            value: parent,
        },
        Block::Link {
            label: "Открыть статью".to_string(),
            url: or_default(preview.article_link(), DEFAULT_WIKI_LINK),
        },
    ];

    blocks.extend(preview.user_stories.iter().map(|draft| {
        Block::Story(StoryView {
            title: draft.title.clone(),
            description: format_story_text(&draft.description),
            criteria: format_acceptance_criteria(draft),
        })
    }));

    blocks.push(Block::Note(CONFIRM_HINT.to_string()));
    blocks.push(Block::Note(CANCEL_HINT.to_string()));
    blocks
}

fn render_created_stories(
    stories: &[WorkItemRef],
    parent_ticket: Option<&ItemId>,
    confluence_url: Option<&str>,
) -> Vec<Block> {
    let mut blocks = vec![Block::Heading("User Stories созданы успешно!".to_string())];

    if !stories.is_empty() {
        blocks.push(Block::Text("Создано User Stories:".to_string()));
        blocks.extend(
            stories
                .iter()
                .map(|story| work_item_block(WorkItemRole::UserStory, story, false)),
        );
    }

    if let Some(parent) = parent_ticket {
        blocks.push(Block::Note(format!("Родительский тикет: {}", parent)));
    }

    if let Some(url) = confluence_url.filter(|u| !u.is_empty()) {
        blocks.push(Block::Link {
            label: "Открыть статью Confluence".to_string(),
            url: url.to_string(),
        });
    }

    blocks
}

fn render_change_chain(chain: &ChangeChain) -> Vec<Block> {
    let mut blocks = vec![Block::Heading("Цепочка изменений создана успешно!".to_string())];

    let roles = [
        (WorkItemRole::Epic, chain.epic.as_ref(), false),
        (WorkItemRole::Feature, chain.feature.as_ref(), false),
        (WorkItemRole::BacklogItem, chain.backlog_item.as_ref(), true),
    ];
    for (role, item, with_parent) in roles {
        if let Some(item) = item {
            blocks.push(work_item_block(role, item, with_parent));
        }
    }

    blocks
}

fn work_item_block(role: WorkItemRole, item: &WorkItemRef, with_parent: bool) -> Block {
    // The backlog item always names its parent, even when the backend left it out.
    let parent = with_parent.then(|| {
        item.parent
            .as_ref()
            .map(ItemId::to_string)
            .unwrap_or_default()
    });
    Block::WorkItem {
        role,
        id: item.id.to_string(),
        url: item.url.clone(),
        title: item.title.clone(),
        parent,
    }
}
