//! Fixed catalog of vision models offered to callers

/// A gateway model identifier and whether it is offered to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelEntry {
    pub id: &'static str,
    pub enabled: bool,
}

/// Every gateway model the prompts were tuned against
pub const KNOWN_MODELS: &[ModelEntry] = &[
    ModelEntry {
        id: "allenai/molmo-2-8b:free",
        enabled: false,
    },
    ModelEntry {
        id: "nvidia/nemotron-nano-12b-v2-vl:free",
        enabled: true,
    },
    ModelEntry {
        id: "mistralai/mistral-small-3.1-24b-instruct:free",
        enabled: true,
    },
    ModelEntry {
        id: "google/gemma-3-4b-it:free",
        enabled: false,
    },
    ModelEntry {
        id: "google/gemma-3-12b-it:free",
        enabled: false,
    },
    ModelEntry {
        id: "google/gemma-3-27b-it:free",
        enabled: false,
    },
    ModelEntry {
        id: "qwen/qwen-2.5-vl-7b-instruct:free",
        enabled: false,
    },
];

/// Default model of the guide service
pub const GUIDE_DEFAULT_MODEL: &str = "nvidia/nemotron-nano-12b-v2-vl:free";

/// Default model of the analysis and walkthrough services
pub const ANALYSIS_DEFAULT_MODEL: &str = "qwen/qwen-2.5-vl-7b-instruct:free";

/// Default model of the generative-AI client
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Models offered to callers, in catalog order
pub fn available_models() -> Vec<&'static str> {
    KNOWN_MODELS
        .iter()
        .filter(|entry| entry.enabled)
        .map(|entry| entry.id)
        .collect()
}
