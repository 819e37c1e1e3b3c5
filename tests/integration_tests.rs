use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceExt;

use gearbot::config::AppConfig;
use gearbot::db;
use gearbot::handlers;
use gearbot::models::{CatalogItem, Category, ChatState, Subcategory};
use gearbot::services::ai::intent::IntentVocabulary;
use gearbot::services::ai::LlmProvider;
use gearbot::services::catalog::Catalog;
use gearbot::services::conversation::{MENU_ASSISTANT, MENU_CATALOG, MENU_EXIT, MENU_WHOLESALE};
use gearbot::services::messaging::{ChatProvider, Keyboard};
use gearbot::services::sessions::SessionStore;
use gearbot::state::AppState;

const ADMIN_ID: i64 = 999;

// ── Mock Providers ──

struct MockLlm {
    calls: Arc<Mutex<usize>>,
    fail: bool,
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn generate(&self, _system_prompt: &str, user_text: &str) -> anyhow::Result<String> {
        *self.calls.lock().unwrap() += 1;

        if self.fail {
            anyhow::bail!("provider unreachable");
        }

        // Deterministic replies keyed off the user message.
        if user_text.contains("order now") {
            Ok("Great, proceeding with the order for Trail Boots. I'll need your information."
                .to_string())
        } else if user_text.contains("boots") {
            Ok("The Trail Boots are an excellent choice for wet terrain. Shall we order them?"
                .to_string())
        } else {
            Ok("We stock gear for every season. Tell me what trip you have planned.".to_string())
        }
    }
}

#[derive(Debug, Clone)]
enum Sent {
    Text { chat_id: i64, text: String },
    Photo { chat_id: i64, caption: String },
    Edit { chat_id: i64, text: String },
    Delete { chat_id: i64 },
    Callback { text: Option<String> },
}

struct MockChat {
    sent: Arc<Mutex<Vec<Sent>>>,
    fail_chat_id: Option<i64>,
}

#[async_trait]
impl ChatProvider for MockChat {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        _keyboard: &Keyboard,
    ) -> anyhow::Result<()> {
        if self.fail_chat_id == Some(chat_id) {
            anyhow::bail!("recipient unreachable");
        }
        self.sent.lock().unwrap().push(Sent::Text {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        _photo: &str,
        caption: &str,
        _keyboard: &Keyboard,
    ) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(Sent::Photo {
            chat_id,
            caption: caption.to_string(),
        });
        Ok(())
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        _message_id: i64,
        text: &str,
        _keyboard: &Keyboard,
    ) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(Sent::Edit {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, _message_id: i64) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(Sent::Delete { chat_id });
        Ok(())
    }

    async fn answer_callback(&self, _callback_id: &str, text: Option<&str>) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(Sent::Callback {
            text: text.map(|s| s.to_string()),
        });
        Ok(())
    }
}

// ── Helpers ──

fn test_catalog() -> Catalog {
    Catalog::from_categories(vec![Category {
        code: "footwear".to_string(),
        name: "Footwear".to_string(),
        subcats: vec![Subcategory {
            code: "boots".to_string(),
            name: "Boots".to_string(),
            items: vec![
                CatalogItem {
                    id: "boots-trail".to_string(),
                    name: "Trail Boots".to_string(),
                    price: "$120".to_string(),
                    desc: "Waterproof trail boots".to_string(),
                    photo: "https://example.com/boots.jpg".to_string(),
                },
                CatalogItem {
                    id: "boots-alpine".to_string(),
                    name: "Alpine Boots".to_string(),
                    price: "$240".to_string(),
                    desc: "Insulated boots".to_string(),
                    photo: "https://example.com/alpine.jpg".to_string(),
                },
            ],
        }],
    }])
}

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        bot_token: "test-token".to_string(),
        webhook_secret: "".to_string(), // empty = skip secret validation
        openai_api_key: "test-key".to_string(),
        openai_base_url: "http://localhost:1234".to_string(),
        openai_model: "test-model".to_string(),
        admin_chat_id: ADMIN_ID,
        system_prompt: "You are a sales assistant.".to_string(),
        catalog_path: "does-not-exist.json".to_string(),
    }
}

struct TestBot {
    state: Arc<AppState>,
    sent: Arc<Mutex<Vec<Sent>>>,
    llm_calls: Arc<Mutex<usize>>,
}

fn test_bot() -> TestBot {
    test_bot_with(test_catalog(), None, false)
}

fn test_bot_with(catalog: Catalog, fail_chat_id: Option<i64>, llm_fail: bool) -> TestBot {
    let conn = db::init_db(":memory:").unwrap();
    let sent = Arc::new(Mutex::new(vec![]));
    let llm_calls = Arc::new(Mutex::new(0));

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
        catalog,
        sessions: SessionStore::new(),
        vocab: IntentVocabulary::default(),
        llm: Some(Box::new(MockLlm {
            calls: Arc::clone(&llm_calls),
            fail: llm_fail,
        })),
        telegram: Box::new(MockChat {
            sent: Arc::clone(&sent),
            fail_chat_id,
        }),
    });

    TestBot {
        state,
        sent,
        llm_calls,
    }
}

fn test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/webhook/telegram", post(handlers::webhook::telegram_webhook))
        .with_state(state)
}

fn message_request(user_id: i64, text: &str) -> Request<Body> {
    let update = serde_json::json!({
        "update_id": 1,
        "message": {
            "message_id": 10,
            "from": {"id": user_id, "username": "tester", "first_name": "Test"},
            "chat": {"id": user_id},
            "text": text,
        }
    });
    Request::builder()
        .method("POST")
        .uri("/webhook/telegram")
        .header("Content-Type", "application/json")
        .body(Body::from(update.to_string()))
        .unwrap()
}

fn callback_request(user_id: i64, data: &str) -> Request<Body> {
    let update = serde_json::json!({
        "update_id": 2,
        "callback_query": {
            "id": "cb-1",
            "from": {"id": user_id, "username": "tester", "first_name": "Test"},
            "message": {
                "message_id": 20,
                "chat": {"id": user_id},
            },
            "data": data,
        }
    });
    Request::builder()
        .method("POST")
        .uri("/webhook/telegram")
        .header("Content-Type", "application/json")
        .body(Body::from(update.to_string()))
        .unwrap()
}

async fn send(bot: &TestBot, request: Request<Body>) {
    let res = test_app(bot.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

fn texts_to(bot: &TestBot, chat_id: i64) -> Vec<String> {
    bot.sent
        .lock()
        .unwrap()
        .iter()
        .filter_map(|s| match s {
            Sent::Text { chat_id: id, text } if *id == chat_id => Some(text.clone()),
            _ => None,
        })
        .collect()
}

fn callback_answers(bot: &TestBot) -> Vec<Option<String>> {
    bot.sent
        .lock()
        .unwrap()
        .iter()
        .filter_map(|s| match s {
            Sent::Callback { text } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let bot = test_bot();
    let res = test_app(bot.state.clone())
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

// ── Start & menu ──

#[tokio::test]
async fn test_start_sends_welcome_and_registers_user() {
    let bot = test_bot();
    send(&bot, message_request(1, "/start")).await;

    let texts = texts_to(&bot, 1);
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("Choose a section"));

    let db = bot.state.db.lock().unwrap();
    assert_eq!(gearbot::db::queries::count_users(&db).unwrap(), 1);
}

#[tokio::test]
async fn test_catalog_button_shows_categories() {
    let bot = test_bot();
    send(&bot, message_request(1, MENU_CATALOG)).await;

    let texts = texts_to(&bot, 1);
    assert_eq!(texts, vec!["Choose a category:".to_string()]);
    assert_eq!(bot.state.sessions.get(1).state, ChatState::Idle);
}

#[tokio::test]
async fn test_empty_catalog_degrades_gracefully() {
    let bot = test_bot_with(Catalog::empty(), None, false);

    // Browsing is refused...
    send(&bot, message_request(1, MENU_CATALOG)).await;
    assert!(texts_to(&bot, 1)[0].contains("temporarily unavailable"));
    assert_eq!(bot.state.sessions.get(1).state, ChatState::Idle);

    // ...but AI chat and wholesale remain reachable.
    send(&bot, message_request(1, MENU_ASSISTANT)).await;
    assert_eq!(bot.state.sessions.get(1).state, ChatState::AiChat);

    send(&bot, message_request(1, MENU_EXIT)).await;
    send(&bot, message_request(1, MENU_WHOLESALE)).await;
    assert_eq!(bot.state.sessions.get(1).state, ChatState::Wholesale);
}

#[tokio::test]
async fn test_exit_chat_resets_to_idle() {
    let bot = test_bot();
    send(&bot, message_request(1, MENU_ASSISTANT)).await;
    assert_eq!(bot.state.sessions.get(1).state, ChatState::AiChat);

    send(&bot, message_request(1, MENU_EXIT)).await;
    assert_eq!(bot.state.sessions.get(1).state, ChatState::Idle);
}

// ── AI chat & checkout interception ──

#[tokio::test]
async fn test_ai_checkout_confirmation_flow() {
    let bot = test_bot();
    send(&bot, message_request(1, MENU_ASSISTANT)).await;
    assert_eq!(bot.state.sessions.get(1).state, ChatState::AiChat);

    // Assistant mentions an item plus a checkout word -> confirmation.
    send(&bot, message_request(1, "tell me about boots")).await;
    let session = bot.state.sessions.get(1);
    assert_eq!(session.state, ChatState::AwaitingConfirmation);
    assert_eq!(session.selected_item.as_deref(), Some("boots-trail"));
    assert_eq!(*bot.llm_calls.lock().unwrap(), 1);

    // Sticky: off-topic input re-prompts and never reaches the provider.
    send(&bot, message_request(1, "why though?")).await;
    assert_eq!(bot.state.sessions.get(1).state, ChatState::AwaitingConfirmation);
    assert_eq!(*bot.llm_calls.lock().unwrap(), 1);
    let texts = texts_to(&bot, 1);
    assert!(texts.last().unwrap().contains("Trail Boots"));
    assert!(texts.last().unwrap().contains("'Yes' or 'No'"));

    // Affirmative -> name collection.
    send(&bot, message_request(1, "yes")).await;
    assert_eq!(bot.state.sessions.get(1).state, ChatState::AwaitingName);

    send(&bot, message_request(1, "Ivan Petrov")).await;
    assert_eq!(bot.state.sessions.get(1).state, ChatState::AwaitingContact);

    send(&bot, message_request(1, "@ivan")).await;
    assert_eq!(bot.state.sessions.get(1).state, ChatState::Idle);

    // Exactly one order with the snapshot taken at selection.
    let db = bot.state.db.lock().unwrap();
    let orders = gearbot::db::queries::list_orders(&db, 10).unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].item_name, "Trail Boots");
    assert_eq!(orders[0].item_price, "$120");
    assert_eq!(orders[0].customer_name, "Ivan Petrov");
    assert_eq!(orders[0].contact, "@ivan");
    assert_eq!(orders[0].status, "new");
    drop(db);

    // Operator was notified.
    let admin_texts = texts_to(&bot, ADMIN_ID);
    assert!(admin_texts.iter().any(|t| t.contains("New order")));
}

#[tokio::test]
async fn test_ai_immediate_checkout_skips_confirmation() {
    let bot = test_bot();
    send(&bot, message_request(1, MENU_ASSISTANT)).await;

    send(&bot, message_request(1, "boots please, order now")).await;
    let session = bot.state.sessions.get(1);
    assert_eq!(session.state, ChatState::AwaitingName);
    assert_eq!(session.selected_item.as_deref(), Some("boots-trail"));

    let texts = texts_to(&bot, 1);
    // The assistant reply plus the name prompt.
    assert!(texts.iter().any(|t| t.contains("proceeding with the order")));
    assert!(texts.last().unwrap().contains("full name"));
}

#[tokio::test]
async fn test_negative_cancels_checkout() {
    let bot = test_bot();
    send(&bot, message_request(1, MENU_ASSISTANT)).await;
    send(&bot, message_request(1, "tell me about boots")).await;
    assert_eq!(bot.state.sessions.get(1).state, ChatState::AwaitingConfirmation);

    send(&bot, message_request(1, "cancel that")).await;
    assert_eq!(bot.state.sessions.get(1).state, ChatState::AiChat);
    assert!(texts_to(&bot, 1).last().unwrap().contains("cancelling"));
}

#[tokio::test]
async fn test_llm_error_keeps_state_retryable() {
    let bot = test_bot_with(test_catalog(), None, true);
    send(&bot, message_request(1, MENU_ASSISTANT)).await;

    send(&bot, message_request(1, "hello")).await;
    assert_eq!(bot.state.sessions.get(1).state, ChatState::AiChat);
    assert!(texts_to(&bot, 1)
        .last()
        .unwrap()
        .contains("Something went wrong"));
}

#[tokio::test]
async fn test_plain_reply_stays_in_chat() {
    let bot = test_bot();
    send(&bot, message_request(1, MENU_ASSISTANT)).await;
    send(&bot, message_request(1, "what do you sell?")).await;

    let session = bot.state.sessions.get(1);
    assert_eq!(session.state, ChatState::AiChat);
    assert!(session.selected_item.is_none());
}

// ── Catalog browsing ──

#[tokio::test]
async fn test_navigation_edits_in_place() {
    let bot = test_bot();
    send(&bot, callback_request(1, "cat:footwear")).await;

    let sent = bot.sent.lock().unwrap();
    assert!(matches!(
        sent.first(),
        Some(Sent::Edit { chat_id: 1, text }) if text.contains("Footwear")
    ));
    drop(sent);
    assert_eq!(callback_answers(&bot), vec![None]);
}

#[tokio::test]
async fn test_unknown_category_answers_not_found() {
    let bot = test_bot();
    send(&bot, callback_request(1, "cat:nonexistent")).await;

    let answers = callback_answers(&bot);
    assert_eq!(answers.len(), 1);
    assert!(answers[0].as_deref().unwrap().contains("Not found"));
    assert_eq!(bot.state.sessions.get(1).state, ChatState::Idle);
}

#[tokio::test]
async fn test_item_card_replaces_message_with_photo() {
    let bot = test_bot();
    send(&bot, callback_request(1, "item:boots-trail")).await;

    let sent = bot.sent.lock().unwrap();
    assert!(matches!(sent.first(), Some(Sent::Delete { chat_id: 1 })));
    assert!(matches!(
        sent.get(1),
        Some(Sent::Photo { chat_id: 1, caption }) if caption.contains("Trail Boots")
    ));
}

#[tokio::test]
async fn test_buy_callback_checkout_completes() {
    let bot = test_bot();
    send(&bot, callback_request(1, "buy:boots-trail")).await;

    let session = bot.state.sessions.get(1);
    assert_eq!(session.state, ChatState::AwaitingName);
    assert_eq!(session.selected_item.as_deref(), Some("boots-trail"));

    send(&bot, message_request(1, "Ivan")).await;
    send(&bot, message_request(1, "@ivan")).await;
    assert_eq!(bot.state.sessions.get(1).state, ChatState::Idle);

    let db = bot.state.db.lock().unwrap();
    let orders = gearbot::db::queries::list_orders(&db, 10).unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].item_id, "boots-trail");
    assert_eq!(orders[0].item_name, "Trail Boots");
}

#[tokio::test]
async fn test_buy_unknown_item_answers_not_found() {
    let bot = test_bot();
    send(&bot, callback_request(1, "buy:ghost")).await;

    let answers = callback_answers(&bot);
    assert!(answers[0].as_deref().unwrap().contains("Item not found"));
    assert_eq!(bot.state.sessions.get(1).state, ChatState::Idle);
}

// ── Wholesale ──

#[tokio::test]
async fn test_wholesale_flow_persists_and_notifies() {
    let bot = test_bot();
    send(&bot, message_request(1, MENU_WHOLESALE)).await;
    assert_eq!(bot.state.sessions.get(1).state, ChatState::Wholesale);

    send(&bot, message_request(1, "Need 50 tents for a summer camp")).await;
    assert_eq!(bot.state.sessions.get(1).state, ChatState::Idle);

    let db = bot.state.db.lock().unwrap();
    let requests = gearbot::db::queries::list_wholesale_requests(&db, 10).unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].request_text, "Need 50 tents for a summer camp");
    drop(db);

    let admin_texts = texts_to(&bot, ADMIN_ID);
    assert!(admin_texts.iter().any(|t| t.contains("wholesale request")));
    assert!(texts_to(&bot, 1).last().unwrap().contains("has been received"));
}

// ── Operator surface ──

#[tokio::test]
async fn test_admin_command_denied_for_non_operator() {
    let bot = test_bot();
    send(&bot, message_request(1, "/admin")).await;
    assert!(texts_to(&bot, 1)[0].contains("don't have access"));
}

#[tokio::test]
async fn test_admin_callback_denied_for_non_operator() {
    let bot = test_bot();
    send(&bot, callback_request(1, "admin:stats")).await;

    let answers = callback_answers(&bot);
    assert!(answers[0].as_deref().unwrap().contains("No access"));
}

#[tokio::test]
async fn test_admin_stats_for_operator() {
    let bot = test_bot();
    send(&bot, message_request(ADMIN_ID, "/admin")).await;
    assert!(texts_to(&bot, ADMIN_ID)[0].contains("Admin panel"));

    send(&bot, callback_request(ADMIN_ID, "admin:stats")).await;
    let sent = bot.sent.lock().unwrap();
    assert!(sent.iter().any(|s| matches!(
        s,
        Sent::Edit { chat_id, text } if *chat_id == ADMIN_ID && text.contains("Users: 1")
    )));
}

#[tokio::test]
async fn test_broadcast_partial_failure_accounting() {
    let bot = test_bot_with(test_catalog(), Some(5), false);

    // Seed ten known users; recipient 5 will fail.
    {
        let db = bot.state.db.lock().unwrap();
        for id in 1..=10 {
            gearbot::db::queries::upsert_user(&db, id, Some("u"), Some("U"), None).unwrap();
        }
    }

    send(&bot, callback_request(ADMIN_ID, "admin:broadcast")).await;
    assert_eq!(
        bot.state.sessions.get(ADMIN_ID).state,
        ChatState::AdminBroadcast
    );

    send(&bot, message_request(ADMIN_ID, "Big summer sale!")).await;
    assert_eq!(bot.state.sessions.get(ADMIN_ID).state, ChatState::Idle);

    // 10 seeded users + the operator (upserted on their own updates); only
    // recipient 5 fails, later recipients are still attempted.
    let delivered = bot
        .sent
        .lock()
        .unwrap()
        .iter()
        .filter(|s| matches!(s, Sent::Text { text, .. } if text == "Big summer sale!"))
        .count();
    assert_eq!(delivered, 10);

    let report = texts_to(&bot, ADMIN_ID)
        .into_iter()
        .find(|t| t.contains("Broadcast finished"))
        .unwrap();
    assert!(report.contains("Delivered: 10"));
    assert!(report.contains("Failed: 1"));
}

// ── Webhook gate ──

#[tokio::test]
async fn test_webhook_secret_token_enforced() {
    let mut bot = test_bot();
    {
        let state = Arc::get_mut(&mut bot.state).unwrap();
        state.config.webhook_secret = "s3cret".to_string();
    }

    let res = test_app(bot.state.clone())
        .oneshot(message_request(1, "/start"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let update = serde_json::json!({
        "update_id": 1,
        "message": {
            "message_id": 10,
            "from": {"id": 1, "username": "tester", "first_name": "Test"},
            "chat": {"id": 1},
            "text": "/start",
        }
    });
    let request = Request::builder()
        .method("POST")
        .uri("/webhook/telegram")
        .header("Content-Type", "application/json")
        .header("X-Telegram-Bot-Api-Secret-Token", "s3cret")
        .body(Body::from(update.to_string()))
        .unwrap();
    let res = test_app(bot.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
