use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::Session;

/// In-memory per-user conversation store. Unknown users default to an idle
/// session; everything is lost on restart by design.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<i64, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: i64) -> Session {
        self.inner
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set(&self, user_id: i64, session: Session) {
        self.inner.lock().unwrap().insert(user_id, session);
    }

    pub fn clear(&self, user_id: i64) {
        self.inner.lock().unwrap().remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatState;

    #[test]
    fn test_unknown_user_defaults_to_idle() {
        let store = SessionStore::new();
        let session = store.get(1);
        assert_eq!(session.state, ChatState::Idle);
        assert!(session.selected_item.is_none());
    }

    #[test]
    fn test_set_get_clear_roundtrip() {
        let store = SessionStore::new();
        store.set(
            1,
            Session {
                state: ChatState::AiChat,
                selected_item: Some("boots-trail".to_string()),
                customer_name: None,
            },
        );
        assert_eq!(store.get(1).state, ChatState::AiChat);

        store.clear(1);
        assert_eq!(store.get(1).state, ChatState::Idle);
    }

    #[test]
    fn test_no_cross_user_visibility() {
        let store = SessionStore::new();
        store.set(
            1,
            Session {
                state: ChatState::Wholesale,
                ..Default::default()
            },
        );
        assert_eq!(store.get(2).state, ChatState::Idle);
    }
}
