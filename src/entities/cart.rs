use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monetary amount in a minor-unit-free decimal currency (VND).
///
/// Always non-negative and always computed server-side; the client never
/// derives authoritative amounts by local arithmetic.
pub type Money = i64;

/// One user's active shopping cart as last confirmed by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Cart {
    /// Server-assigned cart id; `None` for the guest placeholder.
    pub id: Option<i64>,
    /// Insertion order is display order, nothing more.
    pub items: Vec<CartLine>,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub shipping_fee: Money,
    pub total_amount: Money,
    /// At most one active code; applying a new one supersedes the old.
    pub discount_code: Option<String>,
    pub note: Option<String>,
    pub shipping_address_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// Static empty cart shown to anonymous visitors. Never persisted.
    pub fn guest() -> Self {
        Cart::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn line(&self, line_id: i64) -> Option<&CartLine> {
        self.items.iter().find(|l| l.id == line_id)
    }

    pub fn line_mut(&mut self, line_id: i64) -> Option<&mut CartLine> {
        self.items.iter_mut().find(|l| l.id == line_id)
    }

    pub(crate) fn apply_totals(&mut self, totals: &CartTotals) {
        self.subtotal = totals.subtotal;
        self.discount_amount = totals.discount_amount;
        self.shipping_fee = totals.shipping_fee;
        self.total_amount = totals.total_amount;
    }
}

/// One purchasable line: a product, or a product plus variant.
///
/// `id` is the cart-item id assigned by the server, distinct from the
/// product id. `total_price = unit_price * quantity - discount_amount`
/// holds server-side; the client must not rebuild it from a stale
/// `unit_price`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CartLine {
    pub id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
    pub discount_amount: Money,
    /// Stock ceiling reported by the server, used for the client-side
    /// quantity clamp.
    pub stock_quantity: u32,
}

/// Server-computed totals slice, returned by line mutations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CartTotals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub shipping_fee: Money,
    pub total_amount: Money,
}

/// Response to an add-line request: the (possibly merged) line echoed
/// back plus fresh totals.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AddLineResponse {
    pub cart_id: i64,
    pub item: CartLine,
    pub cart_total: CartTotals,
}

/// Response to an update/remove-line request: fresh totals, and for
/// updates the surviving line echoed back.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LineMutationResponse {
    #[serde(flatten)]
    pub totals: CartTotals,
    #[serde(default)]
    pub item: Option<CartLine>,
}
