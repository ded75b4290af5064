use std::sync::Arc;

use storefront_cart::{
    projection, CartConfig, CartStore, HttpCartApi, Session, SessionHandle,
};

/// Smoke client: signs in from the environment, loads the cart and
/// prints what the storefront badge and summary would show.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let config = CartConfig::from_env();

    let session = Arc::new(SessionHandle::new());
    match (
        std::env::var("CART_USER_ID")
            .ok()
            .and_then(|raw| raw.parse::<i64>().ok()),
        std::env::var("CART_TOKEN").ok(),
    ) {
        (Some(user_id), Some(token)) => session.set(Session { user_id, token }),
        _ => tracing::warn!("CART_USER_ID/CART_TOKEN not set, running as guest"),
    }

    let api = HttpCartApi::new(&config, session.clone()).expect("Failed to build cart client");
    let store = CartStore::new(api, session);

    match store.load().await {
        Ok(cart) => {
            println!("Cart: {} line(s)", projection::item_count(&cart));
            for item in &cart.items {
                println!(
                    "  {} x{} = {}",
                    item.name,
                    item.quantity,
                    projection::format_vnd(item.total_price)
                );
            }
            println!("Subtotal: {}", projection::format_vnd(cart.subtotal));
            if let Some(code) = &cart.discount_code {
                println!(
                    "Discount {}: -{}",
                    code,
                    projection::format_vnd(cart.discount_amount)
                );
            }
            println!("Shipping: {}", projection::format_vnd(cart.shipping_fee));
            println!("Total: {}", projection::format_vnd(cart.total_amount));
            println!(
                "Free shipping progress: {}%",
                projection::free_shipping_progress(cart.subtotal)
            );
        }
        Err(e) => {
            eprintln!("Failed to load cart: {e}");
            std::process::exit(1);
        }
    }
}
