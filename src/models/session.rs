/// The single active phase of interaction for one user. Exactly one state per
/// user at any time; the controller applies transitions atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ChatState {
    #[default]
    Idle,
    AiChat,
    Wholesale,
    AwaitingName,
    AwaitingContact,
    AwaitingConfirmation,
    AdminBroadcast,
}

impl ChatState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatState::Idle => "idle",
            ChatState::AiChat => "ai_chat",
            ChatState::Wholesale => "wholesale",
            ChatState::AwaitingName => "awaiting_name",
            ChatState::AwaitingContact => "awaiting_contact",
            ChatState::AwaitingConfirmation => "awaiting_confirmation",
            ChatState::AdminBroadcast => "admin_broadcast",
        }
    }
}

/// Per-user scratch context. `selected_item` must be present before any
/// checkout state (`AwaitingConfirmation`, `AwaitingName`, `AwaitingContact`)
/// is entered.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub state: ChatState,
    pub selected_item: Option<String>,
    pub customer_name: Option<String>,
}
