use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub price: String,
    pub desc: String,
    pub photo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subcategory {
    pub code: String,
    pub name: String,
    pub items: Vec<CatalogItem>,
}

/// The catalog file is an ordered array of categories; document order is both
/// display order and the intent detector's iteration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub code: String,
    pub name: String,
    pub subcats: Vec<Subcategory>,
}
