//! Prompt library: system instructions, templates, and user prompt builders.
//!
//! The instruction bodies are plain markdown shipped with the crate. Only
//! English bodies are bundled; other output languages reuse them with an
//! output-language directive appended.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::Result;
use crate::store::{PreferenceStore, PreferenceStoreExt, CUSTOM_TEMPLATES_KEY};

const PHILOSOPHY: &str = include_str!("en/philosophy.md");
const DECISION_PROTOCOL: &str = include_str!("en/decision_protocol.md");
const TEMPLATE_A: &str = include_str!("en/template_a.md");
const TEMPLATE_B: &str = include_str!("en/template_b.md");
const TEMPLATE_C: &str = include_str!("en/template_c.md");
const TEMPLATE_D: &str = include_str!("en/template_d.md");
const TEMPLATE_E: &str = include_str!("en/template_e.md");
const TEMPLATE_F: &str = include_str!("en/template_f.md");
const SYNTHESIS: &str = include_str!("en/synthesis.md");
const SYNTHESIS_ABSTRACTS: &str = include_str!("en/synthesis_abstracts.md");
const SYNTHESIS_NOTES: &str = include_str!("en/synthesis_notes.md");

const TEMPLATES_HEADER: &str = "### **Part 3: The Master Templates**\n\nFirst, you need to construct the document name: paper publication date + paper title, for example, \"2023-04-17-Training-language-models-to-follow-instructions-with-human.md\"";

const NO_FENCE: &str = "The final output markdown file should only contain the content generated according to the template, without being wrapped in ```markdown or ``` code blocks.";

/// Output language of generated notes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
    De,
}

impl Language {
    fn directive(self) -> Option<&'static str> {
        match self {
            Self::En => None,
            Self::Zh => Some("Write the entire output in Simplified Chinese (简体中文). Keep the front-matter keys, Markdown structure, and technical terms intact; translate all prose."),
            Self::De => Some("Write the entire output in German (Deutsch). Keep the front-matter keys, Markdown structure, and technical terms intact; translate all prose."),
        }
    }

    fn localize(self, instruction: String) -> String {
        match self.directive() {
            Some(directive) => format!("{instruction}\n\n---\n### **Output Language**\n\n{directive}\n"),
            None => instruction,
        }
    }
}

/// Note template selection. `Auto` lets the model pick via the decision protocol.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum TemplateType {
    #[default]
    #[serde(rename = "auto")]
    #[strum(serialize = "auto")]
    Auto,
    A,
    B,
    C,
    D,
    E,
    F,
}

impl TemplateType {
    /// Identifier used for custom-template storage.
    pub fn id(self) -> String {
        self.to_string()
    }

    fn body(self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::A => Some(TEMPLATE_A),
            Self::B => Some(TEMPLATE_B),
            Self::C => Some(TEMPLATE_C),
            Self::D => Some(TEMPLATE_D),
            Self::E => Some(TEMPLATE_E),
            Self::F => Some(TEMPLATE_F),
        }
    }
}

/// Which synthesis instruction to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisKind {
    /// Inputs include at least one full text.
    FullText,
    /// Every input is an abstract.
    Abstracts,
    /// Inputs are prior notes (meta-synthesis).
    Notes,
}

/// System instructions with user-supplied template overrides.
#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    custom_templates: HashMap<String, String>,
}

impl PromptLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_custom_templates(custom_templates: HashMap<String, String>) -> Self {
        Self { custom_templates }
    }

    /// Load custom templates saved in `store`.
    pub fn from_store(store: &dyn PreferenceStore) -> Result<Self> {
        Ok(Self::with_custom_templates(store.custom_templates()?))
    }

    pub fn custom_template(&self, template: TemplateType) -> Option<&str> {
        self.custom_templates
            .get(&template.id())
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty())
    }

    pub fn set_custom_template(&mut self, template: TemplateType, content: impl Into<String>) {
        self.custom_templates.insert(template.id(), content.into());
    }

    pub fn reset_custom_template(&mut self, template: TemplateType) {
        self.custom_templates.remove(&template.id());
    }

    /// Persist the current overrides.
    pub fn save_to(&self, store: &dyn PreferenceStore) -> Result<()> {
        store.save_as(CUSTOM_TEMPLATES_KEY, &self.custom_templates)
    }

    /// Built-in template body, before any override.
    pub fn default_template(template: TemplateType) -> Option<&'static str> {
        template.body()
    }

    /// System instruction for one individual note.
    ///
    /// A saved custom template wins outright. `Auto` gets the full
    /// instruction (philosophy, decision protocol, every template); an
    /// explicit template gets the philosophy plus that template only.
    pub fn system_instruction(&self, template: TemplateType, language: Language) -> String {
        if let Some(custom) = self.custom_template(template) {
            return custom.to_string();
        }
        let instruction = match template.body() {
            Some(body) => format!("{PHILOSOPHY}\n\n---\n{TEMPLATES_HEADER}\n\n{body}"),
            None => full_individual_instruction(),
        };
        language.localize(instruction)
    }

    pub fn synthesis_instruction(&self, kind: SynthesisKind, language: Language) -> String {
        let body = match kind {
            SynthesisKind::FullText => SYNTHESIS,
            SynthesisKind::Abstracts => SYNTHESIS_ABSTRACTS,
            SynthesisKind::Notes => SYNTHESIS_NOTES,
        };
        language.localize(body.to_string())
    }
}

fn full_individual_instruction() -> String {
    let templates: Vec<&str> = TemplateType::iter().filter_map(TemplateType::body).collect();
    format!(
        "\n{PHILOSOPHY}\n{DECISION_PROTOCOL}\n\n\n---\n\n{TEMPLATES_HEADER}\n\n{}\n",
        templates.join("\n\n")
    )
}

/// User prompt for one individual note.
pub fn individual_prompt(paper_text: &str, template: TemplateType) -> String {
    match template {
        TemplateType::Auto => format!(
            "Please read this PDF in detail and strictly follow the System Instruction to complete all tasks. First, silently follow \"Part 2: The Zero-Shot Decision Protocol\" to decide which template to use. Then, strictly adhere to the format and requirements of the selected template to generate the complete note content. {NO_FENCE} Pay attention to the file naming (date + paper title), the layout section, and the content format.\n\nHere is the full text of the paper:\n\n{paper_text}"
        ),
        other => format!(
            "Please read this PDF in detail and strictly follow the provided template (Template {other}) to generate the complete note content. {NO_FENCE}\n\nHere is the full text of the paper:\n\n{paper_text}"
        ),
    }
}

/// User prompt for a synthesis over `count` inputs.
pub fn synthesis_prompt(kind: SynthesisKind, count: usize, combined: &str) -> String {
    match kind {
        SynthesisKind::FullText => format!(
            "Please read the full text of the following {count} papers in detail and strictly follow the System Instruction (Template G) to generate a comprehensive and insightful academic review. Ensure the analysis is deep, professional, and follows the specified Markdown format. {NO_FENCE}\n\nHere is the full text of all papers:\n\n{combined}"
        ),
        SynthesisKind::Abstracts => format!(
            "Please analyze the following {count} paper abstracts in detail and strictly follow the System Instruction (Template G-Abstracts) to generate a comprehensive and insightful academic review based *only* on the provided abstracts. {NO_FENCE}\n\nHere are the abstracts of all papers:\n\n{combined}"
        ),
        SynthesisKind::Notes => format!(
            "Please perform a meta-synthesis of the following {count} detailed research notes. Strictly follow the System Instruction (Template H) to generate a high-level, strategic review that identifies emergent themes, debates, and future directions. {NO_FENCE}\n\nHere are the full contents of all notes:\n\n{combined}"
        ),
    }
}

/// System instruction for chatting about one note.
pub fn chat_instruction(note_content: &str) -> String {
    format!("{CHAT_PROTOCOL}\n\n--- NOTE ---\n{note_content}\n--- END NOTE ---")
}

const CHAT_PROTOCOL: &str = r#"### [SYSTEM INSTRUCTION: Academic Dialogue Protocol]

You are a peer-level academic collaborator. Your role is to facilitate a deep, critical, and insightful discussion around the provided research note. You are not a general-purpose assistant, but an expert in deconstructing and synthesizing scholarly work.

### **Part 1: Guiding Philosophy**

1.  **Fidelity to the Text, Extension of Knowledge**: Your primary source of information is the original paper and the note. If you use general knowledge to provide context or explain a concept, you must explicitly state: "Drawing on general knowledge outside the provided text...". If the answer is not contained within, state clearly: "The provided text and note do not contain specific information on this topic."

2.  **From "What" to "Why" and "So What"**: Do not merely retrieve information. Your value lies in connecting the dots. When asked for a result, explain its significance in the context of the research question. When asked about a method, discuss its trade-offs and design rationale as described in the note.

3.  **Embrace Scholarly Rigor and Nuance**: Avoid overconfident or simplistic answers. Use cautious and precise language. Acknowledge limitations, counterarguments, and uncertainties mentioned in the paper and note. Frame your answers as a critical analysis, not as absolute fact.

4.  **Be an Active Dialogue Partner**: Your goal is to deepen the user's understanding.

### **Part 2: Operational Protocol**

*   **When asked a factual question (e.g., "What was the p-value for the primary outcome?"):**
    1.  Locate the specific data point in the note.
    2.  State the fact directly and accurately.
    3.  Provide immediate context from the note.

*   **When asked an explanatory question (e.g., "Why is this finding significant?"):**
    1.  Refer to the "Author's Conclusion," "Discussion," or "Significance" sections of the note.
    2.  Synthesize the authors' interpretation.
    3.  Connect the finding back to the paper's central scientific question.

*   **When asked a critical question (e.g., "What are the weaknesses of this study?"):**
    1.  First, report any limitations explicitly mentioned by the authors in the note.
    2.  Then, based **only** on the information in the paper (e.g., sample size, baseline comparisons, choice of control group), identify potential unspoken limitations.
    3.  Frame these points as profound critical arguments.

*   **When asked a comparative question (e.g., "How does Model A compare to Model B?"):**
    1.  Extract the relevant details for both from the note.
    2.  Organize the comparison in a structured way (e.g., bullet points or a table) covering key aspects like performance, methodology, and assumptions."#;
