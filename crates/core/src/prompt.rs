//! Prompt assembly for furniture visualization.
//!
//! Two prompt shapes exist: a from-scratch studio render, and a "reimagine"
//! variant that places the configured piece into a supplied room photo. The
//! builders are pure functions over [`PromptBuilderInput`]: identical inputs
//! always yield byte-identical strings, so the full prompt can be retained
//! on the generation record for audit.

// ---------------------------------------------------------------------------
// Input value objects
// ---------------------------------------------------------------------------

/// One selected design option, already sorted by its group's display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOption {
    /// Human-readable option group name, e.g. `"Upholstery"`.
    pub group_name: String,
    /// Stable group slug, e.g. `"upholstery"`.
    pub group_slug: String,
    /// Label of the selected value, e.g. `"Bouclé, cream"`.
    pub value_label: String,
    /// Optional extra phrasing for the generation prompt.
    pub prompt_hint: Option<String>,
}

/// Everything the prompt builders need, constructed once from validated,
/// already-sorted relational data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilderInput {
    pub category_name: String,
    pub category_description: Option<String>,
    /// Selected options in group display order.
    pub options: Vec<PromptOption>,
    /// Free-form user text appended verbatim.
    pub free_text: Option<String>,
}

/// The assembled prompt triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    pub system_instruction: String,
    pub generation_prompt: String,
    /// Concatenation retained on the generation record for audit.
    pub full_prompt_for_log: String,
}

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

const SCRATCH_SYSTEM_INSTRUCTION: &str = "You are a product visualization engine for a \
furniture studio. Produce a single photorealistic render of the described furniture piece \
on a neutral, softly lit studio background. Render exactly the materials, colors and \
finishes specified. Do not add text, watermarks, people or extra objects.";

const REIMAGINE_SYSTEM_INSTRUCTION: &str = "You are a product visualization engine for a \
furniture studio. A photograph of the customer's room is attached. Produce a single \
photorealistic image of that room with the described furniture piece placed into it, \
matching the photo's perspective, lighting and shadows. Keep the rest of the room \
unchanged. Do not add text, watermarks or people.";

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build the from-scratch generation prompt.
pub fn build_prompt(input: &PromptBuilderInput) -> BuiltPrompt {
    let mut prompt = format!("A photorealistic render of a {}.", input.category_name);
    if let Some(desc) = non_empty(&input.category_description) {
        prompt.push(' ');
        prompt.push_str(desc);
    }
    push_configuration(&mut prompt, input);
    finish(SCRATCH_SYSTEM_INSTRUCTION, prompt)
}

/// Build the "reimagine" prompt: the same configuration, but placed into the
/// attached room photo, with optional free-form placement instructions.
pub fn build_reimagine_prompt(
    input: &PromptBuilderInput,
    placement_instructions: Option<&str>,
) -> BuiltPrompt {
    let mut prompt = format!(
        "Place a {} into the attached room photograph.",
        input.category_name
    );
    if let Some(desc) = non_empty(&input.category_description) {
        prompt.push(' ');
        prompt.push_str(desc);
    }
    push_configuration(&mut prompt, input);
    if let Some(placement) = placement_instructions.filter(|p| !p.trim().is_empty()) {
        prompt.push_str("\n\nPlacement: ");
        prompt.push_str(placement.trim());
    }
    finish(REIMAGINE_SYSTEM_INSTRUCTION, prompt)
}

// ---------------------------------------------------------------------------
// Shared assembly
// ---------------------------------------------------------------------------

/// Append the option configuration block and the user's free text.
fn push_configuration(prompt: &mut String, input: &PromptBuilderInput) {
    if !input.options.is_empty() {
        prompt.push_str("\n\nConfiguration:");
        for option in &input.options {
            prompt.push_str("\n- ");
            prompt.push_str(&option.group_name);
            prompt.push_str(": ");
            prompt.push_str(&option.value_label);
            if let Some(hint) = non_empty(&option.prompt_hint) {
                prompt.push_str(" (");
                prompt.push_str(hint);
                prompt.push(')');
            }
        }
    }
    if let Some(text) = non_empty(&input.free_text) {
        prompt.push_str("\n\nAdditional requests: ");
        prompt.push_str(text);
    }
}

fn finish(system_instruction: &str, generation_prompt: String) -> BuiltPrompt {
    let full_prompt_for_log = format!("{system_instruction}\n\n{generation_prompt}");
    BuiltPrompt {
        system_instruction: system_instruction.to_string(),
        generation_prompt,
        full_prompt_for_log,
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
