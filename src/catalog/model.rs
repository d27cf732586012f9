use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Highest accepted price, in whole rupees.
pub const MAX_PRICE: i64 = 10_000_000;

/// Product taxonomy tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Movie,
    Anime,
    Nature,
    Abstract,
    Superhero,
    Car,
    #[serde(rename = "TVSeries")]
    TvSeries,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Self::Movie,
        Self::Anime,
        Self::Nature,
        Self::Abstract,
        Self::Superhero,
        Self::Car,
        Self::TvSeries,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::Anime => "Anime",
            Self::Nature => "Nature",
            Self::Abstract => "Abstract",
            Self::Superhero => "Superhero",
            Self::Car => "Car",
            Self::TvSeries => "TVSeries",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow::anyhow!("unknown category {s:?}"))
    }
}

/// Row as stored in `products`.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub price: i64,
    pub description: String,
    pub images: Vec<String>,
    pub sizes: Vec<String>,
    pub frame_types: Vec<String>,
    pub stock: i32,
    pub featured: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: Category,
    /// Whole rupees.
    pub price: i64,
    pub description: String,
    pub images: Vec<String>,
    pub sizes: Vec<String>,
    pub frame_types: Vec<String>,
    pub stock: i32,
    pub featured: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Product {
    /// An empty option list means the product takes any value for it.
    pub fn offers(&self, size: &str, frame_type: &str) -> bool {
        let has = |list: &[String], v: &str| list.is_empty() || list.iter().any(|x| x == v);
        has(&self.sizes, size) && has(&self.frame_types, frame_type)
    }

    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = anyhow::Error;

    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            name: r.name,
            category: r.category.parse()?,
            price: r.price,
            description: r.description,
            images: r.images,
            sizes: r.sizes,
            frame_types: r.frame_types,
            stock: r.stock,
            featured: r.featured,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Admin-supplied product fields, shared by create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub category: Category,
    pub price: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub frame_types: Vec<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub featured: bool,
}

impl ProductInput {
    /// Trims text fields and drops blank list entries.
    pub fn normalized(mut self) -> Result<Self, String> {
        self.name = self.name.trim().to_string();
        self.description = self.description.trim().to_string();
        for list in [&mut self.images, &mut self.sizes, &mut self.frame_types] {
            list.iter_mut().for_each(|s| *s = s.trim().to_string());
            list.retain(|s| !s.is_empty());
            let mut seen = std::collections::HashSet::new();
            list.retain(|s| seen.insert(s.clone()));
        }
        if self.name.is_empty() {
            return Err("name must not be empty".into());
        }
        if self.price <= 0 {
            return Err("price must be positive".into());
        }
        if self.price > MAX_PRICE {
            return Err(format!("price must not exceed {MAX_PRICE}"));
        }
        if self.stock < 0 {
            return Err("stock must not be negative".into());
        }
        Ok(self)
    }
}

#[cfg(test)]
pub(crate) fn sample_product(name: &str, category: Category, price: i64) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.into(),
        category,
        price,
        description: String::new(),
        images: vec![format!("https://img.local/{name}.jpg")],
        sizes: vec!["12x18".into(), "24x36".into()],
        frame_types: vec!["Classic Black".into(), "Natural Oak".into()],
        stock: 10,
        featured: false,
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}
