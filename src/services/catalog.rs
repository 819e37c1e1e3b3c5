use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;

use crate::models::{CatalogItem, Category, Subcategory};

/// A catalog item together with its owning coordinates, so back-navigation
/// targets can be built without re-walking the tree.
#[derive(Debug, Clone)]
pub struct IndexedItem {
    pub item: CatalogItem,
    pub cat_code: String,
    pub subcat_code: String,
}

/// Immutable product catalog, built once at startup and shared read-only.
pub struct Catalog {
    categories: Vec<Category>,
    index: HashMap<String, IndexedItem>,
    item_order: Vec<String>,
    summary: String,
}

impl Catalog {
    /// Loads the catalog tree from a JSON file. A missing or malformed file
    /// degrades to an empty catalog: browsing is refused but the rest of the
    /// bot keeps working.
    pub fn load(path: &str) -> Catalog {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(path, error = %e, "catalog file not readable");
                return Catalog::empty();
            }
        };

        match serde_json::from_str::<Vec<Category>>(&raw) {
            Ok(categories) => Catalog::from_categories(categories),
            Err(e) => {
                tracing::error!(path, error = %e, "failed to parse catalog file");
                Catalog::empty()
            }
        }
    }

    pub fn empty() -> Catalog {
        Catalog::from_categories(vec![])
    }

    pub fn from_categories(categories: Vec<Category>) -> Catalog {
        let mut index = HashMap::new();
        let mut item_order = vec![];
        let mut summary = String::new();

        for cat in &categories {
            let _ = writeln!(summary, "{}", cat.name);
            for subcat in &cat.subcats {
                let _ = writeln!(summary, "  {}:", subcat.name);
                for item in &subcat.items {
                    let _ = writeln!(summary, "  - {} — {}", item.name, item.price);
                    if index.contains_key(&item.id) {
                        tracing::warn!(item_id = %item.id, "duplicate item id in catalog, keeping first");
                        continue;
                    }
                    index.insert(
                        item.id.clone(),
                        IndexedItem {
                            item: item.clone(),
                            cat_code: cat.code.clone(),
                            subcat_code: subcat.code.clone(),
                        },
                    );
                    item_order.push(item.id.clone());
                }
            }
        }

        Catalog {
            categories,
            index,
            item_order,
            summary,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, code: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.code == code)
    }

    pub fn subcategory(&self, cat_code: &str, subcat_code: &str) -> Option<&Subcategory> {
        self.category(cat_code)?
            .subcats
            .iter()
            .find(|s| s.code == subcat_code)
    }

    pub fn item(&self, id: &str) -> Option<&IndexedItem> {
        self.index.get(id)
    }

    /// Items in catalog document order — the intent detector's tie-break.
    pub fn items(&self) -> impl Iterator<Item = &IndexedItem> {
        self.item_order.iter().filter_map(|id| self.index.get(id))
    }

    /// Display-oriented condensation used only as textual context for the
    /// chat-completion provider.
    pub fn ai_summary(&self) -> &str {
        &self.summary
    }
}
