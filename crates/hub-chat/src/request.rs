use hub_primitives::Message;

/// Deployment-configured generation parameters (spec.md §4.8 step 4).
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_TOP_P: f32 = 0.9;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// A fully composed chat turn: system rules, the reference block, prior
/// history, and the new user message, ready to hand to a
/// [`crate::model::ChatModelClient`].
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub reference_block: String,
    pub history: Vec<Message>,
    pub user_message: String,
    pub params: GenerationParams,
}
