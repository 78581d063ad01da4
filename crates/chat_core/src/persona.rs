use serde::{Deserialize, Serialize};

/// Sampling parameters handed to the inference capability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneProfile {
    pub max_new_tokens: u32,
    pub do_sample: bool,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub diversity_penalty: f32,
    pub return_full_text: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    PlayfulSarcastic,
    FactualAssistant,
    WildUnpredictable,
    #[default]
    Balanced,
}

impl Tone {
    pub fn profile(self) -> ToneProfile {
        match self {
            Tone::PlayfulSarcastic => ToneProfile {
                max_new_tokens: 120,
                do_sample: true,
                temperature: 0.6,
                top_p: 0.9,
                repetition_penalty: 1.1,
                diversity_penalty: 0.5,
                return_full_text: false,
            },
            Tone::FactualAssistant => ToneProfile {
                max_new_tokens: 80,
                do_sample: false,
                temperature: 0.0,
                top_p: 1.0,
                repetition_penalty: 1.0,
                diversity_penalty: 0.0,
                return_full_text: false,
            },
            Tone::WildUnpredictable => ToneProfile {
                max_new_tokens: 150,
                do_sample: true,
                temperature: 0.85,
                top_p: 0.85,
                repetition_penalty: 1.15,
                diversity_penalty: 0.3,
                return_full_text: false,
            },
            Tone::Balanced => ToneProfile {
                max_new_tokens: 100,
                do_sample: true,
                temperature: 0.45,
                top_p: 0.92,
                repetition_penalty: 1.05,
                diversity_penalty: 0.5,
                return_full_text: false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    pub name: &'static str,
    pub system_prompt: &'static str,
    pub tone: Tone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaId {
    Playful,
    Safe,
    Wild,
    #[default]
    Balanced,
}

impl PersonaId {
    pub fn persona(self) -> Persona {
        match self {
            PersonaId::Playful => Persona {
                name: "Playful Emma",
                system_prompt:
                    "A witty, sarcastic, and slightly flirty persona with a knack for dark humor.",
                tone: Tone::PlayfulSarcastic,
            },
            // No tone of its own; falls back to the default.
            PersonaId::Safe => Persona {
                name: "Safe Emma",
                system_prompt: "A polite, empathetic, and reliable persona focused on clear and caring responses.",
                tone: Tone::default(),
            },
            PersonaId::Wild => Persona {
                name: "Wild Emma",
                system_prompt:
                    "A chaotic, unpredictable, and humorous persona with a flair for the absurd.",
                tone: Tone::WildUnpredictable,
            },
            PersonaId::Balanced => Persona {
                name: "Balanced Emma",
                system_prompt:
                    "A friendly, thoughtful persona with a touch of wit and professionalism.",
                tone: Tone::Balanced,
            },
        }
    }
}
