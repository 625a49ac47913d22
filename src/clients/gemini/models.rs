use std::fmt;

/// Gemini model ids usable with inline PDF input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GeminiModel {
    #[default]
    Flash25,
    Pro25,
    Flash20,
    FlashLite20,
    Custom(String),
}

impl GeminiModel {
    pub fn model_id(&self) -> &str {
        match self {
            Self::Flash25 => GeminiModels::FLASH_2_5,
            Self::Pro25 => GeminiModels::PRO_2_5,
            Self::Flash20 => GeminiModels::FLASH_2_0,
            Self::FlashLite20 => GeminiModels::FLASH_LITE_2_0,
            Self::Custom(id) => id,
        }
    }
}

impl fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_id())
    }
}

impl From<&str> for GeminiModel {
    fn from(id: &str) -> Self {
        match id {
            GeminiModels::FLASH_2_5 => Self::Flash25,
            GeminiModels::PRO_2_5 => Self::Pro25,
            GeminiModels::FLASH_2_0 => Self::Flash20,
            GeminiModels::FLASH_LITE_2_0 => Self::FlashLite20,
            other => Self::Custom(other.to_string()),
        }
    }
}

pub struct GeminiModels;

impl GeminiModels {
    pub const FLASH_2_5: &'static str = "gemini-2.5-flash";
    pub const PRO_2_5: &'static str = "gemini-2.5-pro";
    pub const FLASH_2_0: &'static str = "gemini-2.0-flash";
    pub const FLASH_LITE_2_0: &'static str = "gemini-2.0-flash-lite";
}
