use serde::Deserialize;

use super::filter::{ProductFilter, SortKey};
use super::model::Category;

/// `GET /products` query string.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<Category>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub size: Option<String>,
    pub frame_type: Option<String>,
    pub featured: Option<bool>,
    #[serde(default)]
    pub sort: SortKey,
}

impl ProductQuery {
    pub fn into_parts(self) -> (ProductFilter, SortKey) {
        let filter = ProductFilter {
            category: self.category,
            min_price: self.min_price,
            max_price: self.max_price,
            size: self.size,
            frame_type: self.frame_type,
            featured: self.featured,
        };
        (filter, self.sort)
    }
}
