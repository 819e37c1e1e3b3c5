use crate::errors::AppError;
use crate::services::catalog::Catalog;
use crate::services::messaging::{Button, Keyboard};

/// Catalog navigation request. Back-targets carry their parent coordinates in
/// the token itself, so navigation is stateless and a back press is
/// idempotent. `fresh` marks list screens reached from an item card, which
/// cannot be edited in place (photo messages have no text to edit).
#[derive(Debug, Clone, PartialEq)]
pub enum NavAction {
    Categories,
    Subcategories(String),
    Items {
        cat: String,
        sub: String,
        fresh: bool,
    },
    Item(String),
}

/// Everything an inline-keyboard token can ask for.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackAction {
    Nav(NavAction),
    Buy(String),
    Admin(AdminAction),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdminAction {
    Stats,
    Orders,
    Wholesale,
    Broadcast,
}

pub fn parse_callback(token: &str) -> Option<CallbackAction> {
    let parts: Vec<&str> = token.split(':').collect();
    match parts.as_slice() {
        ["cat", code] => Some(CallbackAction::Nav(NavAction::Subcategories(
            code.to_string(),
        ))),
        ["sub", cat, sub] => Some(CallbackAction::Nav(NavAction::Items {
            cat: cat.to_string(),
            sub: sub.to_string(),
            fresh: false,
        })),
        ["item", id] => Some(CallbackAction::Nav(NavAction::Item(id.to_string()))),
        ["buy", id] => Some(CallbackAction::Buy(id.to_string())),
        ["back", "main"] => Some(CallbackAction::Nav(NavAction::Categories)),
        ["back", "cat", code] => Some(CallbackAction::Nav(NavAction::Subcategories(
            code.to_string(),
        ))),
        ["back", "sub", cat, sub] => Some(CallbackAction::Nav(NavAction::Items {
            cat: cat.to_string(),
            sub: sub.to_string(),
            fresh: true,
        })),
        ["admin", "stats"] => Some(CallbackAction::Admin(AdminAction::Stats)),
        ["admin", "orders"] => Some(CallbackAction::Admin(AdminAction::Orders)),
        ["admin", "wholesale"] => Some(CallbackAction::Admin(AdminAction::Wholesale)),
        ["admin", "broadcast"] => Some(CallbackAction::Admin(AdminAction::Broadcast)),
        _ => None,
    }
}

/// How a screen replaces the message it was requested from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SendMode {
    /// Edit the originating message in place.
    Edit,
    /// Delete the originating message and send a fresh one.
    Replace,
}

#[derive(Debug, Clone)]
pub struct Screen {
    pub text: String,
    pub keyboard: Keyboard,
    pub photo: Option<String>,
    pub mode: SendMode,
}

/// Pure mapping from a navigation action to the next screen. Unknown codes
/// yield `NotFound`; browsing never touches conversation state.
pub fn navigate(action: &NavAction, catalog: &Catalog) -> Result<Screen, AppError> {
    match action {
        NavAction::Categories => {
            if catalog.is_empty() {
                return Err(AppError::CatalogUnavailable);
            }
            let rows = catalog
                .categories()
                .iter()
                .map(|c| vec![Button::new(&c.name, format!("cat:{}", c.code))])
                .collect();
            Ok(Screen {
                text: "Choose a category:".to_string(),
                keyboard: Keyboard::Inline(rows),
                photo: None,
                mode: SendMode::Edit,
            })
        }

        NavAction::Subcategories(code) => {
            let cat = catalog
                .category(code)
                .ok_or_else(|| AppError::NotFound(format!("category {code}")))?;
            let mut rows: Vec<Vec<Button>> = cat
                .subcats
                .iter()
                .map(|s| vec![Button::new(&s.name, format!("sub:{}:{}", cat.code, s.code))])
                .collect();
            rows.push(vec![Button::new("⬅️ Back", "back:main")]);
            Ok(Screen {
                text: format!("{}\n\nChoose a subcategory:", cat.name),
                keyboard: Keyboard::Inline(rows),
                photo: None,
                mode: SendMode::Edit,
            })
        }

        NavAction::Items { cat, sub, fresh } => {
            let subcat = catalog
                .subcategory(cat, sub)
                .ok_or_else(|| AppError::NotFound(format!("subcategory {cat}:{sub}")))?;
            let mut rows: Vec<Vec<Button>> = subcat
                .items
                .iter()
                .map(|i| {
                    vec![Button::new(
                        format!("{} | {}", i.name, i.price),
                        format!("item:{}", i.id),
                    )]
                })
                .collect();
            rows.push(vec![Button::new("⬅️ Back", format!("back:cat:{cat}"))]);
            Ok(Screen {
                text: format!("{}\n\nChoose an item:", subcat.name),
                keyboard: Keyboard::Inline(rows),
                photo: None,
                mode: if *fresh { SendMode::Replace } else { SendMode::Edit },
            })
        }

        NavAction::Item(id) => {
            let indexed = catalog
                .item(id)
                .ok_or_else(|| AppError::NotFound(format!("item {id}")))?;
            let item = &indexed.item;
            let keyboard = Keyboard::Inline(vec![
                vec![Button::new("💳 Buy", format!("buy:{}", item.id))],
                vec![Button::new(
                    "⬅️ Back",
                    format!("back:sub:{}:{}", indexed.cat_code, indexed.subcat_code),
                )],
            ]);
            Ok(Screen {
                text: format!("{}\n\n{}\n\n💰 Price: {}", item.name, item.desc, item.price),
                keyboard,
                photo: Some(item.photo.clone()),
                mode: SendMode::Replace,
            })
        }
    }
}
