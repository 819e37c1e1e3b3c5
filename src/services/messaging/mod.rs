pub mod telegram;

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub label: String,
    pub action: String,
}

impl Button {
    pub fn new(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: action.into(),
        }
    }
}

/// Keyboard shape attached to an outbound message. Inline buttons carry a
/// compact action token (category code, item id, "back" + coordinates);
/// reply rows are plain labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Keyboard {
    #[default]
    None,
    Inline(Vec<Vec<Button>>),
    Reply(Vec<Vec<String>>),
    Remove,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: &Keyboard)
        -> anyhow::Result<()>;

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &str,
        caption: &str,
        keyboard: &Keyboard,
    ) -> anyhow::Result<()>;

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: &Keyboard,
    ) -> anyhow::Result<()>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> anyhow::Result<()>;

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> anyhow::Result<()>;
}
