pub mod intent;
pub mod openai;

use async_trait::async_trait;

/// Opaque text generation: one assistant reply for one user message, with the
/// system context (prompt + catalog summary) supplied per call. No history,
/// no streaming.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_text: &str) -> anyhow::Result<String>;
}
