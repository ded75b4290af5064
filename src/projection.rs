//! Pure, read-only derivations over a cart snapshot. Nothing in here
//! mutates the store or talks to the network.

use crate::entities::{Cart, CartLine, Money};

/// Subtotal at which shipping becomes free. Display affordance only; it
/// never gates checkout eligibility.
pub const FREE_SHIPPING_THRESHOLD: Money = 500_000;

/// Number of distinct lines in the cart.
///
/// This is the badge policy: two units of one product count once. Use
/// [`unit_count`] when summed quantities are wanted instead.
pub fn item_count(cart: &Cart) -> usize {
    cart.items.len()
}

/// Total units across all lines.
pub fn unit_count(cart: &Cart) -> u64 {
    cart.items.iter().map(|l| u64::from(l.quantity)).sum()
}

/// Formats a VND amount with `.` thousands grouping, e.g. `1.250.000 ₫`.
pub fn format_vnd(amount: Money) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut reversed = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().rev().enumerate() {
        if i != 0 && i % 3 == 0 {
            reversed.push('.');
        }
        reversed.push(ch);
    }
    let grouped: String = reversed.chars().rev().collect();
    if amount < 0 {
        format!("-{grouped} ₫")
    } else {
        format!("{grouped} ₫")
    }
}

/// Percentage of the free-shipping threshold reached, capped at 100.
pub fn free_shipping_progress(subtotal: Money) -> u8 {
    if subtotal <= 0 {
        return 0;
    }
    let pct = (subtotal as f64 / FREE_SHIPPING_THRESHOLD as f64 * 100.0).round();
    pct.min(100.0) as u8
}

/// Current quantity of a product (or product variant) in the cart.
///
/// A line with no variant only matches a lookup with no variant; a
/// variant lookup must match the variant id exactly.
pub fn quantity_of(cart: &Cart, product_id: i64, variant_id: Option<i64>) -> u32 {
    cart.items
        .iter()
        .find(|l| line_matches(l, product_id, variant_id))
        .map(|l| l.quantity)
        .unwrap_or(0)
}

pub fn is_in_cart(cart: &Cart, product_id: i64, variant_id: Option<i64>) -> bool {
    quantity_of(cart, product_id, variant_id) > 0
}

/// Transient estimate of a line's subtotal at a prospective quantity,
/// for rendering while a mutation is in flight. This is a preview: it is
/// discarded the moment the server responds and is never written back
/// into authoritative state.
pub fn line_subtotal_preview(line: &CartLine, quantity: u32) -> Money {
    line.unit_price * Money::from(quantity)
}

fn line_matches(line: &CartLine, product_id: i64, variant_id: Option<i64>) -> bool {
    line.product_id == product_id
        && match variant_id {
            Some(v) => line.variant_id == Some(v),
            None => line.variant_id.is_none(),
        }
}
