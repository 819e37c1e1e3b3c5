use std::env;

const DEFAULT_SYSTEM_PROMPT: &str = "You are the sales assistant of an outdoor gear store. \
Help the customer pick the right equipment from the product catalog below, answer questions \
about materials, sizing and use cases, and recommend specific items by their exact catalog \
name. When the customer is ready to order, say that you are proceeding with the order and \
that you will need their information.";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub bot_token: String,
    pub webhook_secret: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub admin_chat_id: i64,
    pub system_prompt: String,
    pub catalog_path: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "gearbot.db".to_string()),
            bot_token: env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            webhook_secret: env::var("TELEGRAM_WEBHOOK_SECRET").unwrap_or_default(),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            admin_chat_id: env::var("ADMIN_CHAT_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            system_prompt: env::var("SYSTEM_PROMPT")
                .unwrap_or_else(|_| DEFAULT_SYSTEM_PROMPT.to_string()),
            catalog_path: env::var("CATALOG_PATH").unwrap_or_else(|_| "catalog.json".to_string()),
        }
    }
}
