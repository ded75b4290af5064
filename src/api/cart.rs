use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::error::CartError;
use crate::config::CartConfig;
use crate::entities::{AddLineResponse, Cart, LineMutationResponse};
use crate::session::SessionProvider;

/// Capability interface over the remote cart resource.
///
/// One request/response pair per operation; everything is scoped by the
/// user identity supplied by the caller. Only `fetch_cart` and `clear`
/// are idempotent at the transport level; `add_line` in particular is
/// not, and callers must guard against duplicate submission.
#[allow(async_fn_in_trait)]
pub trait CartApi: Send + Sync {
    async fn fetch_cart(&self, user_id: i64) -> Result<Cart, CartError>;
    async fn add_line(
        &self,
        user_id: i64,
        product_id: i64,
        variant_id: Option<i64>,
        quantity: u32,
    ) -> Result<AddLineResponse, CartError>;
    async fn update_line(
        &self,
        cart_item_id: i64,
        quantity: u32,
    ) -> Result<LineMutationResponse, CartError>;
    async fn remove_line(&self, cart_item_id: i64) -> Result<LineMutationResponse, CartError>;
    async fn clear(&self, user_id: i64) -> Result<Cart, CartError>;
    async fn apply_discount(&self, user_id: i64, code: &str) -> Result<Cart, CartError>;
    async fn remove_discount(&self, user_id: i64) -> Result<Cart, CartError>;
    async fn update_shipping(
        &self,
        user_id: i64,
        shipping_address_id: Option<i64>,
        note: Option<&str>,
    ) -> Result<Cart, CartError>;
}

/// Gateway over the REST cart endpoints.
///
/// The session provider is injected explicitly; every request carries the
/// current bearer token and a fresh `x-request-id`. Transport and server
/// failures are normalized into [`CartError`] and rethrown, never
/// swallowed.
#[derive(Clone, Debug)]
pub struct HttpCartApi<S> {
    http: Client,
    base_url: String,
    session: Arc<S>,
}

impl<S: SessionProvider> HttpCartApi<S> {
    pub fn new(config: &CartConfig, session: Arc<S>) -> Result<Self, CartError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("storefront-cart/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CartError::Network(e.to_string()))?;

        Ok(HttpCartApi {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> Result<RequestBuilder, CartError> {
        let session = self.session.current().ok_or(CartError::Unauthorized)?;
        Ok(req
            .header(header::AUTHORIZATION, format!("Bearer {}", session.token))
            .header("x-request-id", Uuid::new_v4().to_string()))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        path: &str,
        fallback: &'static str,
    ) -> Result<T, CartError> {
        let req = self.authorize(req)?;
        let started = Instant::now();

        let res = req.send().await.map_err(|e| {
            let err = CartError::from(e);
            tracing::error!(path, error = %err, "Cart request failed to complete");
            err
        })?;

        let status = res.status();
        tracing::debug!(path, %status, elapsed = ?started.elapsed(), "Cart request finished");

        if status.is_success() {
            return res
                .json::<T>()
                .await
                .map_err(|e| CartError::Serde(e.to_string()));
        }

        let message = extract_message(&res.text().await.unwrap_or_default())
            .unwrap_or_else(|| fallback.to_owned());
        tracing::error!(path, %status, %message, "Cart request rejected");
        Err(map_status(status, message))
    }
}

impl<S: SessionProvider> CartApi for HttpCartApi<S> {
    async fn fetch_cart(&self, user_id: i64) -> Result<Cart, CartError> {
        let req = self
            .http
            .get(self.url("/api/cart"))
            .query(&[("userId", user_id)]);
        self.send_json(req, "/api/cart", "Error fetching cart").await
    }

    async fn add_line(
        &self,
        user_id: i64,
        product_id: i64,
        variant_id: Option<i64>,
        quantity: u32,
    ) -> Result<AddLineResponse, CartError> {
        let payload = AddLinePayload {
            user: UserRef { id: user_id },
            product_id,
            variant_id,
            quantity,
        };
        payload
            .validate()
            .map_err(|_| CartError::Validation("Quantity should be greater than 0".to_owned()))?;

        let req = self.http.post(self.url("/api/cart")).json(&payload);
        self.send_json(req, "/api/cart", "Error adding item to cart")
            .await
    }

    async fn update_line(
        &self,
        cart_item_id: i64,
        quantity: u32,
    ) -> Result<LineMutationResponse, CartError> {
        let payload = UpdateLinePayload { quantity };
        payload
            .validate()
            .map_err(|_| CartError::Validation("Quantity should be greater than 0".to_owned()))?;

        let path = format!("/api/cart/{cart_item_id}");
        let req = self.http.put(self.url(&path)).json(&payload);
        self.send_json(req, &path, "Error updating cart item").await
    }

    async fn remove_line(&self, cart_item_id: i64) -> Result<LineMutationResponse, CartError> {
        let path = format!("/api/cart/{cart_item_id}");
        let req = self.http.delete(self.url(&path));
        self.send_json(req, &path, "Error removing item from cart")
            .await
    }

    async fn clear(&self, user_id: i64) -> Result<Cart, CartError> {
        let req = self
            .http
            .delete(self.url("/api/cart/clear"))
            .json(&UserPayload {
                user: UserRef { id: user_id },
            });
        self.send_json(req, "/api/cart/clear", "Error clearing cart")
            .await
    }

    async fn apply_discount(&self, user_id: i64, code: &str) -> Result<Cart, CartError> {
        let payload = DiscountPayload {
            user: UserRef { id: user_id },
            discount_code: code.trim().to_owned(),
        };
        payload
            .validate()
            .map_err(|_| CartError::Validation("Please enter a valid discount code".to_owned()))?;

        let req = self
            .http
            .post(self.url("/api/cart/apply-discount"))
            .json(&payload);
        self.send_json(req, "/api/cart/apply-discount", "Error applying discount")
            .await
    }

    async fn remove_discount(&self, user_id: i64) -> Result<Cart, CartError> {
        let req = self
            .http
            .delete(self.url("/api/cart/remove-discount"))
            .json(&UserPayload {
                user: UserRef { id: user_id },
            });
        self.send_json(req, "/api/cart/remove-discount", "Error removing discount")
            .await
    }

    async fn update_shipping(
        &self,
        user_id: i64,
        shipping_address_id: Option<i64>,
        note: Option<&str>,
    ) -> Result<Cart, CartError> {
        let payload = ShippingPayload {
            user: UserRef { id: user_id },
            shipping_address_id,
            note: note.map(str::to_owned),
        };
        let req = self.http.put(self.url("/api/cart/shipping")).json(&payload);
        self.send_json(req, "/api/cart/shipping", "Error updating shipping info")
            .await
    }
}

//Structs
#[derive(Serialize)]
struct UserRef {
    id: i64,
}

#[derive(Serialize)]
struct UserPayload {
    user: UserRef,
}

#[derive(Serialize, Validate)]
struct AddLinePayload {
    user: UserRef,
    product_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    variant_id: Option<i64>,
    #[validate(range(min = 1))]
    quantity: u32,
}

#[derive(Serialize, Validate)]
struct UpdateLinePayload {
    #[validate(range(min = 1))]
    quantity: u32,
}

#[derive(Serialize, Validate)]
struct DiscountPayload {
    user: UserRef,
    #[validate(regex(path = *DISCOUNT_CODE_REGEX))]
    discount_code: String,
}

#[derive(Serialize)]
struct ShippingPayload {
    user: UserRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    shipping_address_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

//utils
static DISCOUNT_CODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9_-]{3,32}$").unwrap());

fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(|m| m.as_str())
        .map(str::to_owned)
}

fn map_status(status: StatusCode, message: String) -> CartError {
    match status {
        StatusCode::BAD_REQUEST => CartError::Validation(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CartError::Unauthorized,
        StatusCode::NOT_FOUND => CartError::NotFound(message),
        StatusCode::UNPROCESSABLE_ENTITY => CartError::InvalidDiscount(message),
        _ => CartError::Server {
            status: status.as_u16(),
            message,
        },
    }
}
