//! Prompt Builder System
//!
//! Section-based prompt construction shared by the answer, rewrite, and
//! feedback prompts. Sections render in insertion order, so identical
//! inputs always produce byte-identical prompts.

use std::fmt;

/// Prompt section types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSection {
    /// Free-form paragraph
    Text(String),
    /// Titled numbered list; each item may carry indented detail lines
    Numbered {
        title: String,
        items: Vec<(String, Vec<String>)>,
    },
    /// Content wrapped in `<tag>` / `</tag>`
    Tagged { tag: String, content: String },
    /// Single `Label: value` line; consecutive fields share a block
    Field { label: String, value: String },
}

/// Finished prompt text, consumed once by a completion call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Prompt {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a paragraph
    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.sections.push(PromptSection::Text(content.into()));
        self
    }

    /// Add a numbered list
    pub fn numbered(mut self, title: &str, items: Vec<(&str, Vec<&str>)>) -> Self {
        self.sections.push(PromptSection::Numbered {
            title: title.to_string(),
            items: items
                .into_iter()
                .map(|(item, details)| {
                    (
                        item.to_string(),
                        details.into_iter().map(String::from).collect(),
                    )
                })
                .collect(),
        });
        self
    }

    /// Add a tagged block
    pub fn tagged(mut self, tag: &str, content: impl Into<String>) -> Self {
        self.sections.push(PromptSection::Tagged {
            tag: tag.to_string(),
            content: content.into(),
        });
        self
    }

    /// Add a `Label: value` line
    pub fn field(mut self, label: &str, value: impl Into<String>) -> Self {
        self.sections.push(PromptSection::Field {
            label: label.to_string(),
            value: value.into(),
        });
        self
    }

    /// Build the final prompt
    pub fn build(self) -> Prompt {
        let mut prompt = String::new();
        let mut previous_was_field = false;

        for section in self.sections {
            let is_field = matches!(section, PromptSection::Field { .. });
            if !prompt.is_empty() {
                prompt.push_str(if is_field && previous_was_field {
                    "\n"
                } else {
                    "\n\n"
                });
            }
            previous_was_field = is_field;

            match section {
                PromptSection::Text(content) => prompt.push_str(content.trim_end()),
                PromptSection::Numbered { title, items } => {
                    prompt.push_str(&format!("{}:", title));
                    for (i, (item, details)) in items.iter().enumerate() {
                        prompt.push_str(&format!("\n{}. {}", i + 1, item));
                        for detail in details {
                            prompt.push_str(&format!("\n    {}", detail));
                        }
                    }
                }
                PromptSection::Tagged { tag, content } => {
                    prompt.push_str(&format!("<{}>\n", tag));
                    let content = content.trim_end();
                    if !content.is_empty() {
                        prompt.push_str(content);
                        prompt.push('\n');
                    }
                    prompt.push_str(&format!("</{}>", tag));
                }
                PromptSection::Field { label, value } => {
                    prompt.push_str(&format!("{}: {}", label, value));
                }
            }
        }

        Prompt(prompt)
    }
}
