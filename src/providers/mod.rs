
pub mod ollama;

use anyhow::Result;

/// One message of a structured prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    #[inline]
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Maps text to a fixed-dimension vector. Chunk text and question text
/// must be embedded by the same provider instance so both live in the
/// same vector space; the answering engine depends on this.
pub trait EmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Maps a structured prompt to generated text. `suffix` is the bare
/// role prefix appended after the rendered turns (e.g. `"assistant:"`)
/// that cues the model to continue as that role.
pub trait GenerationProvider {
    fn generate(&self, turns: &[ChatTurn], suffix: &str, max_output_length: u32) -> Result<String>;
}

/// Render an ordered sequence of turns into a single prompt string.
///
/// Each turn becomes one `role: content` line; the suffix line is left
/// open for the model to complete.
#[inline]
pub fn render_conversation(turns: &[ChatTurn], suffix: &str) -> String {
    let mut rendered = String::new();
    for turn in turns {
        rendered.push_str(&turn.role);
        rendered.push_str(": ");
        rendered.push_str(&turn.content);
        rendered.push('\n');
    }
    rendered.push_str(suffix);
    rendered
}
