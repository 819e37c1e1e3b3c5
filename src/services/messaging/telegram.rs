use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ChatProvider, Keyboard};

pub struct TelegramProvider {
    token: String,
    client: reqwest::Client,
}

impl TelegramProvider {
    pub fn new(token: String) -> Self {
        Self {
            token,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.token, method)
    }

    async fn call(&self, method: &str, body: Value) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(self.url(method))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to call Telegram {method}"))?;

        let status = resp.status();
        let data: Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse Telegram {method} response"))?;

        if !status.is_success() || !data["ok"].as_bool().unwrap_or(false) {
            anyhow::bail!(
                "Telegram {method} error ({}): {}",
                status,
                data["description"].as_str().unwrap_or("unknown")
            );
        }
        Ok(())
    }
}

fn reply_markup(keyboard: &Keyboard) -> Option<Value> {
    match keyboard {
        Keyboard::None => None,
        Keyboard::Inline(rows) => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| json!({"text": b.label, "callback_data": b.action}))
                        .collect()
                })
                .collect();
            Some(json!({"inline_keyboard": rows}))
        }
        Keyboard::Reply(rows) => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| row.iter().map(|label| json!({"text": label})).collect())
                .collect();
            Some(json!({"keyboard": rows, "resize_keyboard": true}))
        }
        Keyboard::Remove => Some(json!({"remove_keyboard": true})),
    }
}

#[async_trait]
impl ChatProvider for TelegramProvider {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: &Keyboard,
    ) -> anyhow::Result<()> {
        let mut body = json!({"chat_id": chat_id, "text": text});
        if let Some(markup) = reply_markup(keyboard) {
            body["reply_markup"] = markup;
        }
        self.call("sendMessage", body).await
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &str,
        caption: &str,
        keyboard: &Keyboard,
    ) -> anyhow::Result<()> {
        let mut body = json!({"chat_id": chat_id, "photo": photo, "caption": caption});
        if let Some(markup) = reply_markup(keyboard) {
            body["reply_markup"] = markup;
        }
        self.call("sendPhoto", body).await
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: &Keyboard,
    ) -> anyhow::Result<()> {
        let mut body = json!({"chat_id": chat_id, "message_id": message_id, "text": text});
        if let Some(markup) = reply_markup(keyboard) {
            body["reply_markup"] = markup;
        }
        self.call("editMessageText", body).await
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> anyhow::Result<()> {
        self.call(
            "deleteMessage",
            json!({"chat_id": chat_id, "message_id": message_id}),
        )
        .await
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> anyhow::Result<()> {
        let mut body = json!({"callback_query_id": callback_id});
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        self.call("answerCallbackQuery", body).await
    }
}
