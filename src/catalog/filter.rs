//! Category page filtering and sorting.

use serde::Deserialize;

use super::model::{Category, Product};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Default,
    #[serde(alias = "low-high")]
    PriceAsc,
    #[serde(alias = "high-low")]
    PriceDesc,
}

/// Every set field must match (AND). `size` and `frame_type` treat `"All"` or an
/// empty string as unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<Category>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub size: Option<String>,
    pub frame_type: Option<String>,
    pub featured: Option<bool>,
}

fn active(v: &Option<String>) -> Option<&str> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
}

impl ProductFilter {
    pub fn matches(&self, p: &Product) -> bool {
        self.category.map_or(true, |c| p.category == c)
            && self.min_price.map_or(true, |min| p.price >= min)
            && self.max_price.map_or(true, |max| p.price <= max)
            && active(&self.size).map_or(true, |s| p.sizes.iter().any(|x| x == s))
            && active(&self.frame_type).map_or(true, |f| p.frame_types.iter().any(|x| x == f))
            && self.featured.map_or(true, |f| p.featured == f)
    }
}

/// Filters then sorts; both price sorts are stable so ties keep their input order.
pub fn apply(products: Vec<Product>, filter: &ProductFilter, sort: SortKey) -> Vec<Product> {
    let mut out: Vec<Product> = products.into_iter().filter(|p| filter.matches(p)).collect();
    match sort {
        SortKey::Default => {}
        SortKey::PriceAsc => out.sort_by(|a, b| a.price.cmp(&b.price)),
        SortKey::PriceDesc => out.sort_by(|a, b| b.price.cmp(&a.price)),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::sample_product;

    fn catalog() -> Vec<Product> {
        let mut godfather = sample_product("godfather", Category::Movie, 1299);
        godfather.featured = true;
        let mut spirited = sample_product("spirited", Category::Anime, 1499);
        spirited.frame_types = vec!["Sleek White".into(), "Natural Oak".into()];
        let mut misty = sample_product("misty", Category::Nature, 899);
        misty.sizes = vec!["8x10".into(), "12x18".into()];
        let mut tokyo = sample_product("tokyo", Category::Movie, 1199);
        tokyo.frame_types = vec!["Classic Black".into(), "Metallic Gold".into()];
        let twin = sample_product("tokyo-twin", Category::Movie, 1199);
        vec![godfather, spirited, misty, tokyo, twin]
    }

    fn names(ps: &[Product]) -> Vec<&str> {
        ps.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn empty_filter_keeps_input_order() {
        let out = apply(catalog(), &ProductFilter::default(), SortKey::Default);
        assert_eq!(names(&out), ["godfather", "spirited", "misty", "tokyo", "tokyo-twin"]);
    }

    #[test]
    fn predicates_combine_with_and() {
        let filter = ProductFilter {
            max_price: Some(1300),
            frame_type: Some("Classic Black".into()),
            size: Some("24x36".into()),
            ..Default::default()
        };
        let out = apply(catalog(), &filter, SortKey::Default);
        assert_eq!(names(&out), ["godfather", "tokyo", "tokyo-twin"]);
        assert!(out.iter().all(|p| filter.matches(p)));
    }

    #[test]
    fn all_sentinel_disables_option_filters() {
        let filter = ProductFilter {
            size: Some("All".into()),
            frame_type: Some("".into()),
            category: Some(Category::Movie),
            ..Default::default()
        };
        assert_eq!(apply(catalog(), &filter, SortKey::Default).len(), 3);
    }

    #[test]
    fn featured_and_min_price() {
        let filter = ProductFilter {
            featured: Some(true),
            ..Default::default()
        };
        assert_eq!(names(&apply(catalog(), &filter, SortKey::Default)), ["godfather"]);

        let filter = ProductFilter {
            min_price: Some(1200),
            ..Default::default()
        };
        assert_eq!(names(&apply(catalog(), &filter, SortKey::Default)), ["godfather", "spirited"]);
    }

    #[test]
    fn price_sorts_are_stable_in_both_directions() {
        let asc = apply(catalog(), &ProductFilter::default(), SortKey::PriceAsc);
        assert_eq!(names(&asc), ["misty", "tokyo", "tokyo-twin", "godfather", "spirited"]);

        let desc = apply(catalog(), &ProductFilter::default(), SortKey::PriceDesc);
        assert_eq!(names(&desc), ["spirited", "godfather", "tokyo", "tokyo-twin", "misty"]);
    }

    #[test]
    fn sort_applies_to_filtered_subset_only() {
        let filter = ProductFilter {
            category: Some(Category::Movie),
            ..Default::default()
        };
        let out = apply(catalog(), &filter, SortKey::PriceDesc);
        assert_eq!(names(&out), ["godfather", "tokyo", "tokyo-twin"]);
    }

    #[test]
    fn sort_key_accepts_legacy_aliases() {
        let k: SortKey = serde_json::from_str(r#""low-high""#).unwrap();
        assert_eq!(k, SortKey::PriceAsc);
        let k: SortKey = serde_json::from_str(r#""price_desc""#).unwrap();
        assert_eq!(k, SortKey::PriceDesc);
    }
}
