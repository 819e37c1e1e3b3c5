pub mod catalog;
pub mod intent;
pub mod order;
pub mod session;
pub mod telegram;

pub use catalog::{CatalogItem, Category, Subcategory};
pub use intent::DetectedIntent;
pub use order::{Order, WholesaleRequest};
pub use session::{ChatState, Session};
pub use telegram::{CallbackQuery, Chat, IncomingMessage, TgUser, Update};
