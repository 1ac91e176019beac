/*!
 * Prompt templates for the extraction oracle.
 *
 * Both calls ask for the same JSON shape so one parser handles every reply.
 */

/// Kind of oracle request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Bounded prefix scan that establishes the character roster
    Roster,
    /// Extraction of one chunk
    Chunk(usize),
}

/// Request passed to the oracle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub kind: RequestKind,
    pub text: String,
    /// Known character names to reuse verbatim
    pub character_hints: Vec<String>,
}

impl ExtractionRequest {
    pub fn roster(text: impl Into<String>) -> Self {
        Self {
            kind: RequestKind::Roster,
            text: text.into(),
            character_hints: Vec::new(),
        }
    }

    pub fn chunk(index: usize, text: impl Into<String>, character_hints: Vec<String>) -> Self {
        Self {
            kind: RequestKind::Chunk(index),
            text: text.into(),
            character_hints,
        }
    }
}

/// Builder for the (system, user) prompt pair of a request
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_prompt: String,
}

impl PromptBuilder {
    /// System prompt shared by roster and chunk calls
    pub const SCRIPT_ANALYST: &'static str = r#"You are a script supervisor preparing a scene breakdown of a screenplay.

## Output Requirements
- Return ONLY valid JSON, no text outside the JSON object
- Schema:
  {
    "is_script": true,
    "error_message": null,
    "characters": ["name", ...],
    "scenes": [{
      "episode": 1,
      "scene_number": "1",
      "location": "",
      "time_of_day": "",
      "content": "",
      "characters": ["name", ...],
      "props": ["", ...],
      "notes": ""
    }]
  }
- If the text is not a screenplay, return {"is_script": false, "error_message": "<reason>"}

## Rules
- Keep an age annotation on a character name exactly as written, e.g. "Tanaka(25)"
- Use the scene number printed in the script; omit episode when the script has none
- Summaries are one short sentence"#;

    pub fn new() -> Self {
        Self::with_system_prompt(Self::SCRIPT_ANALYST)
    }

    /// Use a custom system prompt
    pub fn with_system_prompt(system_prompt: &str) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Build the user prompt for a request
    pub fn user_prompt(&self, request: &ExtractionRequest) -> String {
        let mut prompt = String::new();

        match request.kind {
            RequestKind::Roster => {
                prompt.push_str("## Task\nThis is the opening of a screenplay. ");
                prompt.push_str("List every character that appears and every scene heading ");
                prompt.push_str("(episode, scene_number, location). Leave content, props and notes empty.\n\n");
            }
            RequestKind::Chunk(index) => {
                prompt.push_str(&format!("## Task\nThis is part {} of a screenplay. ", index + 1));
                prompt.push_str("Break down every scene that appears in it, including scenes cut off at the start or end.\n\n");
            }
        }

        if !request.character_hints.is_empty() {
            prompt.push_str("## Known Characters\nUse these spellings when the same person appears:\n");
            for name in &request.character_hints {
                prompt.push_str("- ");
                prompt.push_str(name);
                prompt.push('\n');
            }
            prompt.push('\n');
        }

        prompt.push_str("## Text\n");
        prompt.push_str(&request.text);
        prompt
    }

    /// Build both prompts
    pub fn build(&self, request: &ExtractionRequest) -> (String, String) {
        (self.system_prompt.clone(), self.user_prompt(request))
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
