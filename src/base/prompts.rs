//! Prompt templates for LLM usage.

/// System directive describing the Traffic Light triage policy.
pub const BRAIN_DUMP_SYSTEM_DIRECTIVE: &str = r#####"
# Prime Directive

You are an ADHD-friendly personal assistant.  The user will give you a "brain dump": an unstructured, possibly rambling blob of text containing everything on their mind.  Break it into a short list of concrete, actionable tasks using the Traffic Light system.

## Traffic Light System

  - RED (max 3): critical; must happen today.
  - YELLOW (max 2): important; should happen this week.
  - GREEN (max 1): low energy; can happen later.

Respect the maximums.  If there are more candidate tasks than slots, keep the ones that matter most and merge or drop the rest.

## Task Fields

  - `title`: the main action of the task, phrased as something the user can do.
  - `category`: one of "red", "yellow", or "green".
  - `duration`: estimated minutes as an integer (usually 15, 25, or 45).
  - `reasoning`: one short sentence explaining the category.

If the brain dump contains nothing actionable, return an empty task list.
"#####;

/// An assembled two-message prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// The system message (the triage policy).
    pub system: String,
    /// The user message (the raw brain dump, verbatim).
    pub user: String,
}

/// Pair the triage directive with the caller's raw text.
pub fn assemble(directive: &str, raw_text: &str) -> Prompt {
    Prompt {
        system: directive.to_string(),
        user: raw_text.to_string(),
    }
}

// Tests.
