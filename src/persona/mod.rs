// src/persona/mod.rs
// Persona system for the Solo Tutor's voice.
// Currently only the default tutor persona is implemented.

pub mod default;

pub use default::{TUTOR_PERSONA_PROMPT, TUTOR_PERSONA_VERSION};

/// Persona overlays define behavioral modes for the tutor. Only Default is
/// implemented; additional overlays would slot in here as variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaOverlay {
    Default,
}

impl PersonaOverlay {
    /// Returns the fixed system prompt for this overlay.
    pub fn prompt(&self) -> &'static str {
        match self {
            PersonaOverlay::Default => TUTOR_PERSONA_PROMPT,
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            PersonaOverlay::Default => TUTOR_PERSONA_VERSION,
        }
    }
}

impl std::fmt::Display for PersonaOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                PersonaOverlay::Default => "default",
            }
        )
    }
}
