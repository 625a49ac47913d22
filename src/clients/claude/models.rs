use std::fmt;

/// Claude models that accept PDF document blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClaudeModel {
    #[default]
    Sonnet4,
    Opus4,
    Sonnet37,
    Haiku35,
    Custom(String),
}

impl ClaudeModel {
    pub fn model_id(&self) -> &str {
        match self {
            Self::Sonnet4 => ClaudeModels::SONNET_4,
            Self::Opus4 => ClaudeModels::OPUS_4,
            Self::Sonnet37 => ClaudeModels::SONNET_3_7,
            Self::Haiku35 => ClaudeModels::HAIKU_3_5,
            Self::Custom(id) => id,
        }
    }
}

impl fmt::Display for ClaudeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_id())
    }
}

impl From<&str> for ClaudeModel {
    fn from(id: &str) -> Self {
        match id {
            ClaudeModels::SONNET_4 => Self::Sonnet4,
            ClaudeModels::OPUS_4 => Self::Opus4,
            ClaudeModels::SONNET_3_7 => Self::Sonnet37,
            ClaudeModels::HAIKU_3_5 => Self::Haiku35,
            other => Self::Custom(other.to_string()),
        }
    }
}

pub struct ClaudeModels;

impl ClaudeModels {
    // Claude 4 Models
    pub const OPUS_4: &'static str = "claude-opus-4-20250514";
    pub const SONNET_4: &'static str = "claude-sonnet-4-20250514";

    // Claude 3.x Models
    pub const SONNET_3_7: &'static str = "claude-3-7-sonnet-20250219";
    pub const HAIKU_3_5: &'static str = "claude-3-5-haiku-20241022";
}
