use serde::{Deserialize, Serialize};

use crate::entities::Money;

/// The slice of a catalog product the cart needs at add time.
///
/// A product with `has_variant` set must never be added without a
/// variant id; that is checked before any request is issued.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub image_url: Option<String>,
    pub final_price: Money,
    pub original_price: Money,
    pub has_variant: bool,
    pub stock_quantity: u32,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }
}
