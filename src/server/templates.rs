//! Template rendering using minijinja with embedded templates.

use minijinja::{Environment, Error as JinjaError, ErrorKind};
use pulldown_cmark::{html, Options, Parser};
use rust_embed::Embed;
use serde::Serialize;

use crate::consent::{ConsentPreferences, CONSENT_STATUS};
use crate::export::ExportFormat;
use crate::library::{filter_prompts, LibraryStatus, PreviewTable, PromptTableRow};
use crate::session::{PromptMode, PromptRow, SessionState};
use crate::steps::{FieldKind, LinearWizard, StepDef, SubsetPreset, Variant};

/// Embedded HTML templates.
#[derive(Embed)]
#[folder = "templates/"]
pub struct Templates;

/// A template engine for rendering the workbook pages.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a new template engine with embedded templates.
    pub fn new() -> Result<Self, JinjaError> {
        let mut env = Environment::new();

        for file in Templates::iter() {
            let filename = file.to_string();
            if let Some(content) = Templates::get(&filename) {
                let template_str = std::str::from_utf8(content.data.as_ref())
                    .map_err(|_| JinjaError::from(ErrorKind::InvalidOperation))?;
                env.add_template_owned(filename, template_str.to_string())?;
            }
        }

        Ok(Self { env })
    }

    /// Render the full workbook page.
    pub fn render_page(&self, page: &PageView) -> Result<String, JinjaError> {
        let template = self.env.get_template("page.html")?;
        template.render(minijinja::context! { page => page })
    }

    /// Render the prompt library table fragment.
    pub fn render_prompt_table(&self, table: &PromptTableView) -> Result<String, JinjaError> {
        let template = self.env.get_template("prompt_table.html")?;
        template.render(minijinja::context! { table => table })
    }

    /// Render the prompt library status/preview fragment.
    pub fn render_library_panel(&self, panel: &LibraryPanelView) -> Result<String, JinjaError> {
        let template = self.env.get_template("library_panel.html")?;
        template.render(minijinja::context! { panel => panel })
    }

    /// Render a Markdown export as a standalone HTML page.
    pub fn render_preview(&self, markdown: &str) -> Result<String, JinjaError> {
        let template = self.env.get_template("preview.html")?;
        template.render(minijinja::context! { content_html => markdown_to_html(markdown) })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new().expect("failed to initialize template engine")
    }
}

/// A field input with its current value.
#[derive(Debug, Clone, Serialize)]
pub struct FieldView {
    /// Session key, `stepId.fieldKey`.
    pub key: String,
    pub label: &'static str,
    pub kind: FieldKind,
    pub value: String,
}

/// A stage card.
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub id: &'static str,
    pub title: &'static str,
    /// 1-based badge number.
    pub number: usize,
    pub fields: Vec<FieldView>,
}

impl StepView {
    pub fn new(step: &StepDef, number: usize, state: &SessionState) -> Self {
        Self {
            id: step.id,
            title: step.title,
            number,
            fields: step
                .fields
                .iter()
                .map(|field| {
                    let key = step.field_key(field);
                    FieldView {
                        value: state.get(&key),
                        key,
                        label: field.label,
                        kind: field.kind,
                    }
                })
                .collect(),
        }
    }
}

/// Variant A: one stage with Back / Next.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub step: StepView,
    pub index: usize,
    pub total: usize,
    pub is_first: bool,
    pub back_url: String,
    pub next_url: String,
    pub next_label: &'static str,
}

impl WizardView {
    pub fn new(wizard: &LinearWizard, state: &SessionState) -> Self {
        Self {
            step: StepView::new(wizard.current(), wizard.index() + 1, state),
            index: wizard.index(),
            total: wizard.len(),
            is_first: wizard.is_first(),
            back_url: format!("/?variant=A&step={}", wizard.back_index()),
            next_url: format!("/?variant=A&step={}", wizard.next_index()),
            next_label: wizard.next_label(),
        }
    }
}

/// A preset button of variant B.
#[derive(Debug, Clone, Serialize)]
pub struct PresetChoice {
    pub id: &'static str,
    pub label: &'static str,
    pub url: String,
    pub selected: bool,
}

/// Variant B: preset choices and, once chosen, the preset's stages.
#[derive(Debug, Clone, Serialize)]
pub struct SubsetView {
    pub choices: Vec<PresetChoice>,
    pub steps: Vec<StepView>,
}

impl SubsetView {
    pub fn new(selected: Option<SubsetPreset>, state: &SessionState) -> Self {
        let choices = SubsetPreset::ALL
            .iter()
            .map(|preset| PresetChoice {
                id: preset.as_str(),
                label: preset.label(),
                url: format!("/?variant=B&preset={}", preset.as_str()),
                selected: selected == Some(*preset),
            })
            .collect();

        // Badges count within the subset, not the whole questionnaire.
        let steps = selected
            .map(|preset| {
                preset
                    .steps()
                    .into_iter()
                    .enumerate()
                    .map(|(i, step)| StepView::new(step, i + 1, state))
                    .collect()
            })
            .unwrap_or_default();

        Self { choices, steps }
    }
}

/// Status line plus preview of the loaded prompt library.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryPanelView {
    pub status: String,
    pub preview: Option<PreviewTable>,
}

impl LibraryPanelView {
    pub fn new(status: &LibraryStatus, rows: &[PromptRow]) -> Self {
        let preview = match status {
            LibraryStatus::ParseError(_) | LibraryStatus::Cleared => None,
            _ => PreviewTable::from_rows(rows),
        };
        Self {
            status: status.to_string(),
            preview,
        }
    }
}

/// The searchable prompt library table.
#[derive(Debug, Clone, Serialize)]
pub struct PromptTableView {
    pub query: String,
    pub count_text: String,
    pub rows: Vec<PromptTableRow>,
}

impl PromptTableView {
    pub fn new(rows: &[PromptRow], query: &str) -> Self {
        let filter = filter_prompts(rows, query);
        Self {
            query: query.to_string(),
            count_text: filter.count_text(),
            rows: filter
                .rows
                .iter()
                .map(|row| PromptTableRow::from_row(row))
                .collect(),
        }
    }
}

/// A button that records a free-text prompt entry.
#[derive(Debug, Clone, Serialize)]
pub struct PromptButton {
    pub mode: &'static str,
    pub label: &'static str,
    /// Text of the browser input dialog.
    pub question: &'static str,
}

impl From<PromptMode> for PromptButton {
    fn from(mode: PromptMode) -> Self {
        Self {
            mode: mode.as_str(),
            label: match mode {
                PromptMode::Ask => "Ask a question",
                PromptMode::Clarify => "Clarify",
            },
            question: mode.input_prompt(),
        }
    }
}

/// A download link.
#[derive(Debug, Clone, Serialize)]
pub struct ExportLink {
    pub label: &'static str,
    pub url: String,
    pub file_name: &'static str,
}

/// Consent checkboxes.
#[derive(Debug, Clone, Serialize)]
pub struct ConsentView {
    pub personal: bool,
    pub share: bool,
    pub email: bool,
    pub status: &'static str,
}

impl From<ConsentPreferences> for ConsentView {
    fn from(prefs: ConsentPreferences) -> Self {
        Self {
            personal: prefs.personal,
            share: prefs.share,
            email: prefs.email,
            status: CONSENT_STATUS,
        }
    }
}

/// Everything the workbook page shows.
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub variant: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wizard: Option<WizardView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subset: Option<SubsetView>,
    pub prompt_buttons: Vec<PromptButton>,
    pub library: LibraryPanelView,
    pub prompts: PromptTableView,
    pub consent: ConsentView,
    pub exports: Vec<ExportLink>,
}

/// Inputs for building a [`PageView`].
pub struct PageRequest<'a> {
    pub variant: Variant,
    pub step: usize,
    pub preset: Option<SubsetPreset>,
    pub query: &'a str,
    pub library_status: &'a LibraryStatus,
    pub consent: ConsentPreferences,
}

impl PageView {
    pub fn new(state: &SessionState, request: &PageRequest<'_>) -> Self {
        let (wizard, subset) = match request.variant {
            Variant::A => (
                Some(WizardView::new(&LinearWizard::at(request.step), state)),
                None,
            ),
            Variant::B => (None, Some(SubsetView::new(request.preset, state))),
        };

        let exports = ExportFormat::ALL
            .iter()
            .map(|format| ExportLink {
                label: match format {
                    ExportFormat::Markdown => "Export Markdown",
                    ExportFormat::Json => "Export JSON",
                    ExportFormat::Transcript => "Export Transcript",
                },
                url: format!("/export/{}", format.as_str()),
                file_name: format.file_name(),
            })
            .collect();

        Self {
            variant: request.variant.as_str(),
            version: env!("CARGO_PKG_VERSION"),
            wizard,
            subset,
            prompt_buttons: PromptMode::ALL.into_iter().map(PromptButton::from).collect(),
            library: LibraryPanelView::new(request.library_status, &state.prompt_rows),
            prompts: PromptTableView::new(&state.prompt_rows, request.query),
            consent: request.consent.into(),
            exports,
        }
    }
}

/// Convert markdown text to HTML.
pub fn markdown_to_html(text: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_SMART_PUNCTUATION;

    let parser = Parser::new_ext(text, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}
