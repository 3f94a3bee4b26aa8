//! Layered prompt builder.
//!
//! Prompts are assembled from plain-text fragments under `config/prompts/`,
//! appended in order and joined with blank lines. A layer whose file is
//! missing falls back to the copy compiled into the binary, so the assistant
//! still has a persona when run outside the repository.
//!
//! ```text
//! 0. persona.md: who the assistant is; {{name}}
//! 1. tools.md: tool list; {{tools}}
//! 2. format.md: answer style
//!
//!    router.md: standalone tier classification prompt; {{query}}
//! ```
//!
//! Variable substitution uses `{{key}}` and is applied once, at
//! [`build()`](PromptBuilder::build) time.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::llm::ToolSpec;

const SEPARATOR: &str = "\n\n";

const PERSONA: &str = include_str!("../../../config/prompts/persona.md");
const TOOLS: &str = include_str!("../../../config/prompts/tools.md");
const FORMAT: &str = include_str!("../../../config/prompts/format.md");
const ROUTER: &str = include_str!("../../../config/prompts/router.md");

pub struct PromptBuilder {
    prompts_dir: PathBuf,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
            parts: Vec::new(),
            vars: HashMap::new(),
        }
    }

    /// Append `filename` from the prompts directory. Skipped when missing.
    pub fn layer(self, filename: &str) -> Self {
        self.layer_or(filename, "")
    }

    /// Append `filename`, or `fallback` when the file cannot be read.
    pub fn layer_or(mut self, filename: &str, fallback: &str) -> Self {
        let path = self.prompts_dir.join(filename);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => {
                tracing::debug!("prompt: layer '{}' not found, using built-in", path.display());
                fallback.to_string()
            }
        };
        self.append(text)
    }

    /// Render `tools.md` with one `- Name: description` line per tool.
    pub fn with_tools(self, tools: &[ToolSpec]) -> Self {
        let listing = if tools.is_empty() {
            "none".to_string()
        } else {
            tools
                .iter()
                .map(|t| format!("- {}: {}", t.name, t.description))
                .collect::<Vec<_>>()
                .join("\n")
        };
        self.layer_or("tools.md", TOOLS).var("tools", listing)
    }

    pub fn append(mut self, text: impl Into<String>) -> Self {
        let s = text.into();
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            self.parts.push(trimmed.to_string());
        }
        self
    }

    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> String {
        let mut prompt = self.parts.join(SEPARATOR);
        for (k, v) in &self.vars {
            let placeholder = format!("{{{{{k}}}}}");
            prompt = prompt.replace(&placeholder, v);
        }
        prompt
    }
}

/// Persona + tools + answer format, the system message for every main-model call.
pub fn system_prompt(prompts_dir: impl AsRef<Path>, assistant_name: &str, tools: &[ToolSpec]) -> String {
    PromptBuilder::new(prompts_dir.as_ref())
        .layer_or("persona.md", PERSONA)
        .with_tools(tools)
        .layer_or("format.md", FORMAT)
        .var("name", assistant_name)
        .build()
}

/// Tier classification prompt for `query`.
pub fn router_prompt(prompts_dir: impl AsRef<Path>, query: &str) -> String {
    PromptBuilder::new(prompts_dir.as_ref())
        .layer_or("router.md", ROUTER)
        .var("query", query)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("config/prompts")
    }

    #[test]
    fn missing_layer_is_skipped() {
        let result = PromptBuilder::new(prompts_dir())
            .layer("nonexistent_file_xyz.md")
            .append("hello")
            .build();
        assert_eq!(result, "hello");
    }

    #[test]
    fn missing_dir_falls_back_to_builtin() {
        let result = system_prompt("/definitely/not/here", "Friday", &[]);
        assert!(result.starts_with("You are Friday"));
        assert!(result.contains("none"));
    }

    #[test]
    fn tools_are_listed_with_descriptions() {
        let tools = [ToolSpec { name: "Weather", description: "Gets the weather." }];
        let result = system_prompt(prompts_dir(), "Friday", &tools);
        assert!(result.contains("- Weather: Gets the weather."));
        assert!(!result.contains("{{tools}}"));
        assert!(!result.contains("{{name}}"));
    }

    #[test]
    fn router_prompt_embeds_query() {
        let p = router_prompt(prompts_dir(), "explain monads in depth");
        assert!(p.contains("User Query: \"explain monads in depth\""));
        assert!(p.contains("'standard' or 'powerful'"));
    }
}
