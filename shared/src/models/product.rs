//! Product Model

use serde::{Deserialize, Serialize};

use crate::request::PaginationQuery;

/// Product lifecycle status
///
/// DELETED is a soft delete: products referenced by orders are never
/// hard-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductStatus {
    Active,
    Hide,
    Deleted,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Hide => "HIDE",
            Self::Deleted => "DELETED",
        }
    }
}

/// Product entity
///
/// `category_name` is always populated via join; `gallery_images` is stored
/// as a JSON text column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub quantity: i64,
    pub image_url: String,
    pub thumbnail_image: Option<String>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub gallery_images: Vec<String>,
    /// AR-viewable 3D asset produced by the external model-generation service
    pub glb_url: Option<String>,
    pub status: ProductStatus,
    pub category_id: String,
    pub category_name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub quantity: i64,
    pub image_url: String,
    pub thumbnail_image: Option<String>,
    #[serde(default)]
    pub gallery_images: Vec<String>,
    pub glb_url: Option<String>,
    pub status: Option<ProductStatus>,
    pub category_id: String,
}

/// Update product payload (partial)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub image_url: Option<String>,
    pub thumbnail_image: Option<String>,
    pub gallery_images: Option<Vec<String>>,
    pub glb_url: Option<String>,
    pub status: Option<ProductStatus>,
    pub category_id: Option<String>,
}

/// Admin product listing query
///
/// Pagination fields are inlined rather than `#[serde(flatten)]`-composed:
/// flattened numeric fields do not survive query-string deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductQuery {
    #[serde(default = "crate::request::default_page")]
    pub page: u32,
    #[serde(default = "crate::request::default_limit")]
    pub limit: u32,
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub status: Option<ProductStatus>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ProductQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Public product listing query (ACTIVE products only)
#[derive(Debug, Clone, Deserialize)]
pub struct PublicProductQuery {
    #[serde(default = "crate::request::default_page")]
    pub page: u32,
    #[serde(default = "crate::request::default_limit")]
    pub limit: u32,
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl PublicProductQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Public product detail with related products from the same category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub related_products: Vec<Product>,
}
