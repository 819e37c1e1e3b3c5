use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    CallbackQuery, ChatState, IncomingMessage, Order, Session, TgUser, WholesaleRequest,
};
use crate::services::ai::intent;
use crate::services::broadcast;
use crate::services::catalog::IndexedItem;
use crate::services::messaging::{Button, Keyboard};
use crate::services::navigator::{
    self, AdminAction, CallbackAction, NavAction, Screen, SendMode,
};
use crate::state::AppState;

pub const MENU_CATALOG: &str = "🛍 Catalog";
pub const MENU_ASSISTANT: &str = "🤖 AI Assistant";
pub const MENU_WHOLESALE: &str = "📦 Wholesale inquiry";
pub const MENU_EXIT: &str = "❌ Exit chat";

pub fn main_menu() -> Keyboard {
    Keyboard::Reply(vec![
        vec![MENU_CATALOG.to_string()],
        vec![MENU_ASSISTANT.to_string()],
        vec![MENU_WHOLESALE.to_string()],
    ])
}

fn chat_menu() -> Keyboard {
    Keyboard::Reply(vec![vec![MENU_EXIT.to_string()]])
}

fn admin_menu() -> Keyboard {
    Keyboard::Inline(vec![
        vec![Button::new("📊 Statistics", "admin:stats")],
        vec![Button::new("📩 Broadcast", "admin:broadcast")],
        vec![Button::new("📦 Orders", "admin:orders")],
        vec![Button::new("📋 Wholesale requests", "admin:wholesale")],
    ])
}

fn ensure_operator(state: &AppState, user_id: i64) -> Result<(), AppError> {
    if state.config.admin_chat_id != 0 && user_id == state.config.admin_chat_id {
        Ok(())
    } else {
        Err(AppError::AccessDenied)
    }
}

/// Resolves the session's selected item. A checkout state without a valid
/// selection is a controller bug, not user error.
fn selected_item<'a>(
    state: &'a AppState,
    session: &Session,
) -> Result<&'a IndexedItem, AppError> {
    session
        .selected_item
        .as_deref()
        .and_then(|id| state.catalog.item(id))
        .ok_or_else(|| {
            AppError::InvariantViolation("checkout state without a selected item".to_string())
        })
}

// ── Inbound messages ──

pub async fn handle_message(state: &Arc<AppState>, msg: &IncomingMessage) -> anyhow::Result<()> {
    let Some(from) = &msg.from else { return Ok(()) };
    let Some(text) = msg.text.as_deref() else { return Ok(()) };
    let text = text.trim();
    if text.is_empty() {
        return Ok(());
    }
    let chat_id = msg.chat.id;

    match text {
        "/start" => return start(state, chat_id, from.id).await,
        "/admin" => return admin_panel(state, chat_id, from).await,
        MENU_CATALOG => return show_catalog(state, chat_id, from.id).await,
        MENU_ASSISTANT => return start_ai_chat(state, chat_id, from.id).await,
        MENU_WHOLESALE => return start_wholesale(state, chat_id, from.id).await,
        MENU_EXIT => return exit_chat(state, chat_id, from.id).await,
        _ => {}
    }

    let session = state.sessions.get(from.id);
    tracing::debug!(
        user_id = from.id,
        state = session.state.as_str(),
        "dispatching message"
    );

    match session.state {
        ChatState::Idle => {
            state
                .telegram
                .send_text(chat_id, "Use the menu below to get started.", &main_menu())
                .await
        }
        ChatState::AiChat => ai_chat_turn(state, chat_id, from, text).await,
        ChatState::AwaitingConfirmation => confirm_turn(state, chat_id, from.id, text, session).await,
        ChatState::Wholesale => wholesale_turn(state, chat_id, from, text).await,
        ChatState::AwaitingName => {
            let mut session = session;
            session.customer_name = Some(text.to_string());
            session.state = ChatState::AwaitingContact;
            state.sessions.set(from.id, session);
            state
                .telegram
                .send_text(
                    chat_id,
                    "Enter your phone number or a handle we can reach you at:",
                    &Keyboard::None,
                )
                .await
        }
        ChatState::AwaitingContact => finish_order(state, chat_id, from, text, session).await,
        ChatState::AdminBroadcast => run_broadcast(state, chat_id, from, text).await,
    }
}

async fn start(state: &Arc<AppState>, chat_id: i64, user_id: i64) -> anyhow::Result<()> {
    state.sessions.clear(user_id);
    state
        .telegram
        .send_text(
            chat_id,
            "Summit Supply — outdoor gear\n\nWelcome! I can help you pick the right \
             equipment for your next trip.\n\nChoose a section:",
            &main_menu(),
        )
        .await
}

async fn admin_panel(state: &Arc<AppState>, chat_id: i64, from: &TgUser) -> anyhow::Result<()> {
    if ensure_operator(state, from.id).is_err() {
        return state
            .telegram
            .send_text(
                chat_id,
                "❌ You don't have access to this command.",
                &Keyboard::None,
            )
            .await;
    }
    state
        .telegram
        .send_text(chat_id, "🔐 Admin panel\n\nChoose an action:", &admin_menu())
        .await
}

async fn show_catalog(state: &Arc<AppState>, chat_id: i64, user_id: i64) -> anyhow::Result<()> {
    state.sessions.clear(user_id);

    match navigator::navigate(&NavAction::Categories, &state.catalog) {
        Ok(screen) => {
            state
                .telegram
                .send_text(chat_id, &screen.text, &screen.keyboard)
                .await
        }
        Err(AppError::CatalogUnavailable) => {
            state
                .telegram
                .send_text(
                    chat_id,
                    "⚠️ The catalog is temporarily unavailable. Please try again later.",
                    &Keyboard::None,
                )
                .await
        }
        Err(e) => Err(e.into()),
    }
}

async fn start_ai_chat(state: &Arc<AppState>, chat_id: i64, user_id: i64) -> anyhow::Result<()> {
    if state.llm.is_none() {
        return state
            .telegram
            .send_text(
                chat_id,
                "⚠️ The AI assistant is temporarily unavailable.",
                &Keyboard::None,
            )
            .await;
    }

    state.sessions.set(
        user_id,
        Session {
            state: ChatState::AiChat,
            ..Default::default()
        },
    );
    state
        .telegram
        .send_text(
            chat_id,
            "🤖 AI assistant activated!\n\nAsk me anything about our gear — I can help \
             you compare items and place an order.",
            &chat_menu(),
        )
        .await
}

async fn start_wholesale(state: &Arc<AppState>, chat_id: i64, user_id: i64) -> anyhow::Result<()> {
    state.sessions.set(
        user_id,
        Session {
            state: ChatState::Wholesale,
            ..Default::default()
        },
    );
    state
        .telegram
        .send_text(
            chat_id,
            "📦 Wholesale and bulk orders\n\nSend the list of items you need and any \
             quotes you already have — we will make a better offer.",
            &chat_menu(),
        )
        .await
}

async fn exit_chat(state: &Arc<AppState>, chat_id: i64, user_id: i64) -> anyhow::Result<()> {
    state.sessions.clear(user_id);
    state
        .telegram
        .send_text(chat_id, "Returning to the main menu.", &main_menu())
        .await
}

// ── AI chat ──

async fn generate_reply(state: &AppState, user_text: &str) -> Result<String, AppError> {
    let llm = state
        .llm
        .as_deref()
        .ok_or_else(|| AppError::Ai("provider not configured".to_string()))?;

    let system = format!(
        "{}\n\nPRODUCT CATALOG:\n{}",
        state.config.system_prompt,
        state.catalog.ai_summary()
    );

    llm.generate(&system, user_text)
        .await
        .map_err(|e| AppError::Ai(e.to_string()))
}

async fn ai_chat_turn(
    state: &Arc<AppState>,
    chat_id: i64,
    from: &TgUser,
    text: &str,
) -> anyhow::Result<()> {
    let reply = match generate_reply(state, text).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(user_id = from.id, error = %e, "AI generation failed");
            return state
                .telegram
                .send_text(
                    chat_id,
                    "⚠️ Something went wrong while talking to the assistant. Please try again.",
                    &chat_menu(),
                )
                .await;
        }
    };

    let detected = intent::detect(&reply, &state.catalog, &state.vocab);
    tracing::debug!(
        user_id = from.id,
        item = detected.item_id.as_deref().unwrap_or("-"),
        wants_checkout = detected.wants_checkout,
        ready = detected.ready_immediately,
        "intent detected"
    );

    if detected.wants_checkout {
        if let Some(indexed) = detected
            .item_id
            .as_deref()
            .and_then(|id| state.catalog.item(id))
        {
            let item_name = indexed.item.name.clone();
            if detected.ready_immediately {
                state.sessions.set(
                    from.id,
                    Session {
                        state: ChatState::AwaitingName,
                        selected_item: detected.item_id.clone(),
                        customer_name: None,
                    },
                );
                state
                    .telegram
                    .send_text(chat_id, &reply, &Keyboard::None)
                    .await?;
                return state
                    .telegram
                    .send_text(
                        chat_id,
                        &format!(
                            "Let's get your order for {item_name} started.\n\nPlease enter your full name:"
                        ),
                        &Keyboard::Remove,
                    )
                    .await;
            }

            state.sessions.set(
                from.id,
                Session {
                    state: ChatState::AwaitingConfirmation,
                    selected_item: detected.item_id.clone(),
                    customer_name: None,
                },
            );
            return state
                .telegram
                .send_text(chat_id, &reply, &Keyboard::None)
                .await;
        }
    }

    state
        .telegram
        .send_text(chat_id, &reply, &Keyboard::None)
        .await
}

async fn confirm_turn(
    state: &Arc<AppState>,
    chat_id: i64,
    user_id: i64,
    text: &str,
    session: Session,
) -> anyhow::Result<()> {
    let item_name: Option<String> =
        selected_item(state, &session).ok().map(|indexed| indexed.item.name.clone());

    if intent::is_affirmative(text, &state.vocab) {
        return match item_name {
            Some(name) => {
                state.sessions.set(
                    user_id,
                    Session {
                        state: ChatState::AwaitingName,
                        ..session
                    },
                );
                state
                    .telegram
                    .send_text(
                        chat_id,
                        &format!(
                            "To place your order for {name} I need a couple of details.\n\n\
                             Please enter your full name:"
                        ),
                        &Keyboard::Remove,
                    )
                    .await
            }
            None => {
                let e = selected_item(state, &session).unwrap_err();
                tracing::warn!(user_id, error = %e, "resetting conversation");
                state.sessions.set(
                    user_id,
                    Session {
                        state: ChatState::AiChat,
                        ..Default::default()
                    },
                );
                state
                    .telegram
                    .send_text(
                        chat_id,
                        "⚠️ The item is no longer selected. Please tell me again which item you want.",
                        &chat_menu(),
                    )
                    .await
            }
        };
    }

    if intent::is_negative(text, &state.vocab) {
        state.sessions.set(
            user_id,
            Session {
                state: ChatState::AiChat,
                ..session
            },
        );
        return state
            .telegram
            .send_text(
                chat_id,
                "Okay, cancelling the checkout. Back to consultation mode.",
                &chat_menu(),
            )
            .await;
    }

    // Sticky: nothing is forwarded to the assistant until we get a yes or no.
    let name = item_name.as_deref().unwrap_or("your item");
    state
        .telegram
        .send_text(
            chat_id,
            &format!(
                "We're currently placing an order for {name}.\n\n\
                 Do you want to continue? Please reply 'Yes' or 'No'."
            ),
            &chat_menu(),
        )
        .await
}

// ── Lead capture ──

async fn wholesale_turn(
    state: &Arc<AppState>,
    chat_id: i64,
    from: &TgUser,
    text: &str,
) -> anyhow::Result<()> {
    let request = WholesaleRequest {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: from.id,
        username: from.username.clone(),
        request_text: text.to_string(),
        created_at: Utc::now().naive_utc(),
    };

    let saved = {
        let db = state.db.lock().unwrap();
        queries::insert_wholesale_request(&db, &request)
    };
    state.sessions.clear(from.id);

    match saved {
        Ok(()) => {
            let notice = format!(
                "🚨 New wholesale request!\n\nFrom: @{}\nID: {}\n\n{}",
                from.username.as_deref().unwrap_or("none"),
                from.id,
                text
            );
            notify_operator(state, &notice).await;
            state
                .telegram
                .send_text(
                    chat_id,
                    "✅ Your request has been received!\n\nWe will review the list and get \
                     back to you with our best offer.",
                    &main_menu(),
                )
                .await
        }
        Err(e) => {
            tracing::error!(user_id = from.id, error = %e, "failed to save wholesale request");
            state
                .telegram
                .send_text(
                    chat_id,
                    "⚠️ Something went wrong. Please try again later.",
                    &main_menu(),
                )
                .await
        }
    }
}

async fn finish_order(
    state: &Arc<AppState>,
    chat_id: i64,
    from: &TgUser,
    contact: &str,
    session: Session,
) -> anyhow::Result<()> {
    let indexed = match selected_item(state, &session) {
        Ok(indexed) => indexed,
        Err(e) => {
            tracing::warn!(user_id = from.id, error = %e, "aborting checkout");
            state.sessions.clear(from.id);
            return state
                .telegram
                .send_text(
                    chat_id,
                    "⚠️ Something went wrong: no item is selected. Please pick the item again.",
                    &main_menu(),
                )
                .await;
        }
    };

    let order = Order {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: from.id,
        username: from.username.clone(),
        customer_name: session.customer_name.clone().unwrap_or_default(),
        contact: contact.to_string(),
        item_id: indexed.item.id.clone(),
        item_name: indexed.item.name.clone(),
        item_price: indexed.item.price.clone(),
        status: "new".to_string(),
        created_at: Utc::now().naive_utc(),
    };

    let saved = {
        let db = state.db.lock().unwrap();
        queries::insert_order(&db, &order)
    };
    // Cleared on both paths so a storage hiccup cannot strand the user
    // mid-checkout.
    state.sessions.clear(from.id);

    match saved {
        Ok(()) => {
            let notice = format!(
                "💰 New order!\n\nItem: {} (id {})\nPrice: {}\n\nCustomer: {}\nContact: {}\n\
                 Username: @{}\nUser ID: {}",
                order.item_name,
                order.item_id,
                order.item_price,
                order.customer_name,
                order.contact,
                order.username.as_deref().unwrap_or("none"),
                order.user_id
            );
            notify_operator(state, &notice).await;
            state
                .telegram
                .send_text(
                    chat_id,
                    "✅ Thank you! Your order has been received.\n\nA manager will contact \
                     you shortly to arrange delivery.",
                    &main_menu(),
                )
                .await
        }
        Err(e) => {
            tracing::error!(user_id = from.id, error = %e, "failed to save order");
            state
                .telegram
                .send_text(
                    chat_id,
                    "⚠️ Something went wrong while placing the order. Please try again later.",
                    &main_menu(),
                )
                .await
        }
    }
}

// ── Broadcast ──

async fn run_broadcast(
    state: &Arc<AppState>,
    chat_id: i64,
    from: &TgUser,
    text: &str,
) -> anyhow::Result<()> {
    state.sessions.clear(from.id);
    if ensure_operator(state, from.id).is_err() {
        // Unreachable in practice: only the operator can enter this state.
        return Ok(());
    }

    let users = {
        let db = state.db.lock().unwrap();
        queries::list_users(&db)
    };
    let users = match users {
        Ok(users) => users,
        Err(e) => {
            tracing::error!(error = %e, "failed to load broadcast recipients");
            return state
                .telegram
                .send_text(chat_id, "⚠️ Failed to load the recipient list.", &Keyboard::None)
                .await;
        }
    };

    if users.is_empty() {
        return state
            .telegram
            .send_text(chat_id, "❌ No users to broadcast to.", &Keyboard::None)
            .await;
    }

    state
        .telegram
        .send_text(
            chat_id,
            &format!("📤 Starting broadcast to {} users...", users.len()),
            &Keyboard::None,
        )
        .await?;

    let recipients: Vec<i64> = users.iter().map(|(id, _, _)| *id).collect();
    let report = broadcast::broadcast(state.telegram.as_ref(), &recipients, text).await;

    state
        .telegram
        .send_text(
            chat_id,
            &format!(
                "✅ Broadcast finished!\n\nDelivered: {}\nFailed: {}",
                report.success, report.failed
            ),
            &Keyboard::None,
        )
        .await
}

// ── Callbacks ──

pub async fn handle_callback(state: &Arc<AppState>, query: &CallbackQuery) -> anyhow::Result<()> {
    let data = query.data.as_deref().unwrap_or("");
    let Some(message) = &query.message else {
        return state.telegram.answer_callback(&query.id, None).await;
    };
    let chat_id = message.chat.id;
    let message_id = message.message_id;

    match navigator::parse_callback(data) {
        Some(CallbackAction::Buy(item_id)) => buy(state, query, chat_id, &item_id).await,
        Some(CallbackAction::Nav(action)) => {
            browse(state, query, chat_id, message_id, &action).await
        }
        Some(CallbackAction::Admin(action)) => {
            admin_callback(state, query, chat_id, message_id, &action).await
        }
        None => {
            state
                .telegram
                .answer_callback(&query.id, Some("Unknown action"))
                .await
        }
    }
}

async fn buy(
    state: &Arc<AppState>,
    query: &CallbackQuery,
    chat_id: i64,
    item_id: &str,
) -> anyhow::Result<()> {
    let Some(indexed) = state.catalog.item(item_id) else {
        return state
            .telegram
            .answer_callback(&query.id, Some("❌ Item not found"))
            .await;
    };

    // An explicit buy press is pre-confirmed: skip confirmation, go straight
    // to data collection.
    state.sessions.set(
        query.from.id,
        Session {
            state: ChatState::AwaitingName,
            selected_item: Some(item_id.to_string()),
            customer_name: None,
        },
    );
    state
        .telegram
        .send_text(
            chat_id,
            &format!(
                "Placing an order for {}.\n\nPlease enter your full name:",
                indexed.item.name
            ),
            &Keyboard::Remove,
        )
        .await?;
    state.telegram.answer_callback(&query.id, None).await
}

async fn browse(
    state: &Arc<AppState>,
    query: &CallbackQuery,
    chat_id: i64,
    message_id: i64,
    action: &NavAction,
) -> anyhow::Result<()> {
    match navigator::navigate(action, &state.catalog) {
        Ok(screen) => {
            present(state, chat_id, message_id, &screen).await?;
            state.telegram.answer_callback(&query.id, None).await
        }
        Err(AppError::NotFound(what)) => {
            tracing::debug!(%what, "navigation target not found");
            state
                .telegram
                .answer_callback(&query.id, Some("❌ Not found"))
                .await
        }
        Err(AppError::CatalogUnavailable) => {
            state
                .telegram
                .answer_callback(&query.id, Some("⚠️ The catalog is temporarily unavailable"))
                .await
        }
        Err(e) => {
            tracing::error!(error = %e, "navigation failed");
            state
                .telegram
                .answer_callback(&query.id, Some("⚠️ Display error"))
                .await
        }
    }
}

async fn present(
    state: &Arc<AppState>,
    chat_id: i64,
    message_id: i64,
    screen: &Screen,
) -> anyhow::Result<()> {
    match screen.mode {
        SendMode::Edit => {
            state
                .telegram
                .edit_text(chat_id, message_id, &screen.text, &screen.keyboard)
                .await
        }
        SendMode::Replace => {
            if let Err(e) = state.telegram.delete_message(chat_id, message_id).await {
                tracing::debug!(error = %e, "could not delete message before replacing");
            }
            match &screen.photo {
                Some(photo) => {
                    state
                        .telegram
                        .send_photo(chat_id, photo, &screen.text, &screen.keyboard)
                        .await
                }
                None => {
                    state
                        .telegram
                        .send_text(chat_id, &screen.text, &screen.keyboard)
                        .await
                }
            }
        }
    }
}

// ── Operator surface ──

async fn admin_callback(
    state: &Arc<AppState>,
    query: &CallbackQuery,
    chat_id: i64,
    message_id: i64,
    action: &AdminAction,
) -> anyhow::Result<()> {
    if ensure_operator(state, query.from.id).is_err() {
        return state
            .telegram
            .answer_callback(&query.id, Some("❌ No access"))
            .await;
    }

    let result = match action {
        AdminAction::Stats => admin_stats(state).map(|text| (text, admin_menu())),
        AdminAction::Orders => admin_orders(state).map(|text| (text, admin_menu())),
        AdminAction::Wholesale => admin_wholesale(state).map(|text| (text, admin_menu())),
        AdminAction::Broadcast => {
            state.sessions.set(
                query.from.id,
                Session {
                    state: ChatState::AdminBroadcast,
                    ..Default::default()
                },
            );
            Ok((
                "📩 Broadcast\n\nEnter the message text to send to every user:".to_string(),
                Keyboard::None,
            ))
        }
    };

    match result {
        Ok((text, keyboard)) => {
            state
                .telegram
                .edit_text(chat_id, message_id, &text, &keyboard)
                .await?;
            state.telegram.answer_callback(&query.id, None).await
        }
        Err(e) => {
            tracing::error!(error = %e, "admin query failed");
            state
                .telegram
                .answer_callback(&query.id, Some("⚠️ Failed to load data"))
                .await
        }
    }
}

fn admin_stats(state: &AppState) -> Result<String, AppError> {
    let db = state.db.lock().unwrap();
    let users = queries::count_users(&db)?;
    let orders = queries::count_orders(&db)?;
    Ok(format!(
        "📊 Statistics\n\n👥 Users: {users}\n📦 Orders: {orders}"
    ))
}

fn admin_orders(state: &AppState) -> Result<String, AppError> {
    let db = state.db.lock().unwrap();
    let orders = queries::list_orders(&db, 10)?;

    if orders.is_empty() {
        return Ok("📦 No orders yet.".to_string());
    }

    let mut text = String::from("📦 Last 10 orders:\n\n");
    for order in orders {
        let short_id = order.id.get(..8).unwrap_or(&order.id);
        let _ = writeln!(text, "#{short_id} | {}", order.item_name);
        let _ = writeln!(
            text,
            "👤 {} (@{})",
            order.customer_name,
            order.username.as_deref().unwrap_or("none")
        );
        let _ = writeln!(text, "📞 {} | 💰 {}", order.contact, order.item_price);
        let _ = writeln!(text, "📅 {}\n", order.created_at.format("%Y-%m-%d %H:%M"));
    }
    Ok(text)
}

fn admin_wholesale(state: &AppState) -> Result<String, AppError> {
    let db = state.db.lock().unwrap();
    let requests = queries::list_wholesale_requests(&db, 5)?;

    if requests.is_empty() {
        return Ok("📋 No wholesale requests yet.".to_string());
    }

    let mut text = String::from("📋 Last 5 wholesale requests:\n\n");
    for request in requests {
        let short_id = request.id.get(..8).unwrap_or(&request.id);
        let preview: String = request.request_text.chars().take(100).collect();
        let _ = writeln!(
            text,
            "#{short_id} | @{}",
            request.username.as_deref().unwrap_or("none")
        );
        let _ = writeln!(text, "{preview}");
        let _ = writeln!(text, "📅 {}\n", request.created_at.format("%Y-%m-%d %H:%M"));
    }
    Ok(text)
}

async fn notify_operator(state: &AppState, text: &str) {
    if state.config.admin_chat_id == 0 {
        tracing::warn!("ADMIN_CHAT_ID not configured, skipping notification");
        return;
    }
    if let Err(e) = state
        .telegram
        .send_text(state.config.admin_chat_id, text, &Keyboard::None)
        .await
    {
        tracing::error!(error = %e, "failed to notify operator");
    }
}
