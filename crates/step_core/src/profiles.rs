//! Prompt profile registry
//!
//! A profile selects the task a model performs on a screenshot. Each profile
//! maps to one fixed system prompt; the mapping is static and read-only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a profile key is not part of the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown profile: {0}")]
pub struct UnknownProfile(pub String);

/// Task profile for a step evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Profile {
    /// Next-step usability guidance
    #[serde(rename = "GuideLLM")]
    Guide,
    /// Extraction of every visible UI component as JSON
    #[serde(rename = "AnalisysComponentsLLM")]
    ComponentAnalysis,
    /// Cognitive walkthrough evaluation
    #[serde(rename = "CongnitiveWalktroughLLM")]
    CognitiveWalkthrough,
}

impl Profile {
    /// Profile used when a caller does not pick one
    pub const DEFAULT: Profile = Profile::ComponentAnalysis;

    /// Every registered profile, in registry order
    pub const ALL: [Profile; 3] = [
        Profile::Guide,
        Profile::ComponentAnalysis,
        Profile::CognitiveWalkthrough,
    ];

    /// Wire key of this profile
    pub fn key(self) -> &'static str {
        match self {
            Profile::Guide => "GuideLLM",
            Profile::ComponentAnalysis => "AnalisysComponentsLLM",
            Profile::CognitiveWalkthrough => "CongnitiveWalktroughLLM",
        }
    }

    /// System prompt for this profile
    pub fn system_prompt(self) -> &'static str {
        match self {
            Profile::Guide => GUIDE_PROMPT,
            Profile::ComponentAnalysis => COMPONENT_ANALYSIS_PROMPT,
            Profile::CognitiveWalkthrough => COGNITIVE_WALKTHROUGH_PROMPT,
        }
    }

    /// Whether the model must answer with an action/rationale/confidence object.
    ///
    /// Component analysis answers with a component list instead.
    pub fn expects_decision(self) -> bool {
        self != Profile::ComponentAnalysis
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Profile {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Profile::ALL
            .into_iter()
            .find(|profile| profile.key() == s)
            .ok_or_else(|| UnknownProfile(s.to_string()))
    }
}

/// Resolve a system prompt by wire key, falling back to the default profile
pub fn lookup(key: &str) -> &'static str {
    key.parse::<Profile>()
        .unwrap_or(Profile::DEFAULT)
        .system_prompt()
}

const GUIDE_PROMPT: &str = r#"You are a usability assistant. You look at the screen of an interface (as an image or a description) and tell the user what to do next.

Your job:
- Understand the user's current goal.
- Inspect the visible interface elements: buttons, fields, menus, text and feedback messages.
- Recommend the single next concrete action the user should take on this screen.

Guidelines:
- Be direct and specific: say exactly where to click, what to type or which option to pick.
- Apply basic UX principles: clarity, feedback, error prevention and minimal effort.
- When several paths exist, mention the alternatives briefly and recommend the best one.
- Use plain language focused on what the user should do right now."#;

const COMPONENT_ANALYSIS_PROMPT: &str = r#"You are an interface analyzer. You receive a screen (as an image or a detailed description) and return a JSON document listing every UI component on it.

Your job:
- Identify every relevant interface element: buttons, text fields, selects, checkboxes, radio buttons, cards, modals, links, labels, error and success messages.
- Describe each component and its properties in a structured form.

Guidelines:
- The output MUST be valid JSON with no prose outside the JSON.
- For each component include, when applicable:
  - an id or other identifier
  - type (for example "button", "input", "select", "checkbox", "label", "icon", "link", "card", "modal")
  - visible text (label, placeholder, content)
  - state (active, disabled, focused, selected, error, success)
  - relative position or screen region (for example "top-bar", "sidebar", "main-content", "footer")
  - possible actions (for example "onClick", "onChange")
  - any extra relevant information (for example "required", "password field", "help text")
- Shape the JSON as a list of components, for example:
  [
    {
      "id": "...",
      "type": "...",
      "text": "...",
      "state": "...",
      "region": "...",
      "actions": ["..."],
      "meta": { }
    }
  ]
- Be as complete as possible and never invent elements that are not on the screen."#;

const COGNITIVE_WALKTHROUGH_PROMPT: &str = r#"You are a usability evaluator applying the Cognitive Walkthrough method to interfaces.

You receive:
- A description or image of the interface BEFORE the user's action.
- A description or image of the interface AFTER the user's action.
- (Optional) A JSON list of the UI components on the screen BEFORE the action.
- (Optional) A JSON list of the UI components on the screen AFTER the action.
- The user's goal, the action performed and a short user profile (for example "novice user", "advanced user", "business user").

Your job:
- Judge whether the interface helps the user reach the goal, step by step.
- Work through the classic walkthrough questions:
  1. Will the user know what they are trying to achieve at this point?
  2. Will the user notice that the correct action is available?
  3. Will the user associate the correct action with the expected outcome?
  4. After acting, will the user notice the feedback and understand what happened?

Guidelines:
- Organize the answer in clear sections, for example:
  - "Context"
  - "User goal"
  - "Interface before"
  - "Interface after"
  - "Step-by-step walkthrough"
  - "Problems found"
  - "Improvement suggestions"
- Keep the language clear and focused on usability.
- Always relate the analysis to the given user profile (novice or experienced, technical or lay).
- Suggest concrete interface changes: labels, placement of actions, feedback, help, flow."#;
