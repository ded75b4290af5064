mod sequence;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::api::{CartApi, CartError};
use crate::entities::{Cart, Product};
use crate::session::SessionProvider;
use sequence::{Generation, LineLocks};

/// Per-command lifecycle of the store.
///
/// `Failed` retains the last error until the next dispatch or an explicit
/// [`CartStore::clear_error`]. There is no automatic retry; a failure is
/// terminal for its attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandStatus {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// Point-in-time view of the store for rendering.
#[derive(Clone, Debug)]
pub struct CartSnapshot {
    pub cart: Cart,
    pub status: CommandStatus,
    pub error: Option<CartError>,
}

#[derive(Debug)]
struct CartState {
    cart: Cart,
    status: CommandStatus,
    last_error: Option<CartError>,
}

/// The single authoritative client-side view of one user's cart.
///
/// Views never touch the cart directly: reads go through snapshots and
/// writes go through the async commands below. Every successful command
/// reconciles state exclusively from the server payload; on failure the
/// prior state is left byte-for-byte untouched.
pub struct CartStore<C, S> {
    api: C,
    session: Arc<S>,
    state: RwLock<CartState>,
    line_locks: LineLocks,
    generation: Generation,
}

impl<C: CartApi, S: SessionProvider> CartStore<C, S> {
    pub fn new(api: C, session: Arc<S>) -> Self {
        CartStore {
            api,
            session,
            state: RwLock::new(CartState {
                cart: Cart::guest(),
                status: CommandStatus::Idle,
                last_error: None,
            }),
            line_locks: LineLocks::default(),
            generation: Generation::default(),
        }
    }

    pub async fn cart(&self) -> Cart {
        self.state.read().await.cart.clone()
    }

    pub async fn status(&self) -> CommandStatus {
        self.state.read().await.status
    }

    pub async fn last_error(&self) -> Option<CartError> {
        self.state.read().await.last_error.clone()
    }

    pub async fn snapshot(&self) -> CartSnapshot {
        let state = self.state.read().await;
        CartSnapshot {
            cart: state.cart.clone(),
            status: state.status,
            error: state.last_error.clone(),
        }
    }

    /// Fetches and fully replaces the cart. A no-op returning the current
    /// snapshot when no user identity is present, since an anonymous
    /// session has no cart to load.
    pub async fn load(&self) -> Result<Cart, CartError> {
        let Some(session) = self.session.current() else {
            return Ok(self.cart().await);
        };

        let gen = self.generation.snapshot();
        self.begin().await;
        match self.api.fetch_cart(session.user_id).await {
            Ok(fresh) => self.commit(gen, move |cart| *cart = fresh).await,
            Err(e) => Err(self.fail(gen, e).await),
        }
    }

    /// Adds a product (or product variant) to the cart.
    ///
    /// Preconditions are checked before any network I/O: a signed-in
    /// user, positive stock, and a variant id whenever the product
    /// requires one. On success the echoed line is merged by
    /// `(product_id, variant_id)` and totals are taken from the server.
    pub async fn add_item(
        &self,
        product: &Product,
        quantity: u32,
        variant_id: Option<i64>,
    ) -> Result<Cart, CartError> {
        let Some(session) = self.session.current() else {
            return Err(self.fail_local(CartError::Unauthorized).await);
        };
        if !product.in_stock() {
            return Err(self.fail_local(CartError::OutOfStock).await);
        }
        if product.has_variant && variant_id.is_none() {
            return Err(self.fail_local(CartError::NeedsVariant).await);
        }

        let gen = self.generation.snapshot();
        self.begin().await;
        match self
            .api
            .add_line(session.user_id, product.id, variant_id, quantity)
            .await
        {
            Ok(resp) => {
                self.commit(gen, move |cart| {
                    cart.id = Some(resp.cart_id);
                    let merged = cart.items.iter().position(|l| {
                        l.product_id == resp.item.product_id && l.variant_id == resp.item.variant_id
                    });
                    match merged {
                        Some(idx) => cart.items[idx] = resp.item,
                        None => cart.items.push(resp.item),
                    }
                    cart.apply_totals(&resp.cart_total);
                })
                .await
            }
            Err(e) => Err(self.fail(gen, e).await),
        }
    }

    /// Sets a line's quantity, clamped to `[1, stock_quantity]` before
    /// dispatch. The server clamp stays authoritative; the local clamp is
    /// a UX affordance. Quantity 0 is a removal, not an update.
    pub async fn update_item_quantity(
        &self,
        line_id: i64,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        if quantity == 0 {
            return self.remove_item(line_id).await;
        }
        if line_id <= 0 {
            return Err(
                self.fail_local(CartError::InvalidArgument("A cart item id is required"))
                    .await,
            );
        }

        let lock = self.line_locks.lock_for(line_id);
        let _guard = lock.lock().await;

        let stock = self.state.read().await.cart.line(line_id).map(|l| l.stock_quantity);
        let Some(stock) = stock else {
            return Err(self.stale_line(line_id).await);
        };
        let clamped = quantity.min(stock).max(1);

        let gen = self.generation.snapshot();
        self.begin().await;
        match self.api.update_line(line_id, clamped).await {
            Ok(resp) => {
                self.commit(gen, move |cart| {
                    match (resp.item, cart.line_mut(line_id)) {
                        (Some(echo), Some(line)) => *line = echo,
                        (None, Some(line)) => line.quantity = clamped,
                        _ => {}
                    }
                    cart.apply_totals(&resp.totals);
                })
                .await
            }
            Err(CartError::NotFound(msg)) => {
                self.resync(gen).await;
                Err(self.fail(gen, CartError::NotFound(msg)).await)
            }
            Err(e) => Err(self.fail(gen, e).await),
        }
    }

    /// Removes one line. A missing id is rejected locally with zero
    /// network calls.
    pub async fn remove_item(&self, line_id: i64) -> Result<Cart, CartError> {
        if line_id <= 0 {
            return Err(
                self.fail_local(CartError::InvalidArgument("A cart item id is required"))
                    .await,
            );
        }

        let lock = self.line_locks.lock_for(line_id);
        let _guard = lock.lock().await;

        let gen = self.generation.snapshot();
        self.begin().await;
        match self.api.remove_line(line_id).await {
            Ok(resp) => {
                self.commit(gen, move |cart| {
                    cart.items.retain(|l| l.id != line_id);
                    cart.apply_totals(&resp.totals);
                })
                .await
            }
            Err(CartError::NotFound(msg)) => {
                self.resync(gen).await;
                Err(self.fail(gen, CartError::NotFound(msg)).await)
            }
            Err(e) => Err(self.fail(gen, e).await),
        }
    }

    pub async fn clear(&self) -> Result<Cart, CartError> {
        let Some(session) = self.session.current() else {
            return Err(self.fail_local(CartError::Unauthorized).await);
        };

        let gen = self.generation.snapshot();
        self.begin().await;
        match self.api.clear(session.user_id).await {
            Ok(fresh) => self.commit(gen, move |cart| *cart = fresh).await,
            Err(e) => Err(self.fail(gen, e).await),
        }
    }

    /// Applies a discount code. Applying a new code while one is active
    /// is a replacement: the server enforces that a cart never holds two
    /// simultaneous discounts, and its response wins.
    pub async fn apply_discount(&self, code: &str) -> Result<Cart, CartError> {
        let Some(session) = self.session.current() else {
            return Err(self.fail_local(CartError::Unauthorized).await);
        };

        let gen = self.generation.snapshot();
        self.begin().await;
        match self.api.apply_discount(session.user_id, code).await {
            Ok(fresh) => self.commit(gen, move |cart| *cart = fresh).await,
            Err(e) => Err(self.fail(gen, e).await),
        }
    }

    pub async fn remove_discount(&self) -> Result<Cart, CartError> {
        let Some(session) = self.session.current() else {
            return Err(self.fail_local(CartError::Unauthorized).await);
        };

        let gen = self.generation.snapshot();
        self.begin().await;
        match self.api.remove_discount(session.user_id).await {
            Ok(fresh) => self.commit(gen, move |cart| *cart = fresh).await,
            Err(e) => Err(self.fail(gen, e).await),
        }
    }

    /// Sets the shipping address reference and/or the order note.
    pub async fn update_shipping(
        &self,
        shipping_address_id: Option<i64>,
        note: Option<&str>,
    ) -> Result<Cart, CartError> {
        let Some(session) = self.session.current() else {
            return Err(self.fail_local(CartError::Unauthorized).await);
        };

        let gen = self.generation.snapshot();
        self.begin().await;
        match self
            .api
            .update_shipping(session.user_id, shipping_address_id, note)
            .await
        {
            Ok(fresh) => self.commit(gen, move |cart| *cart = fresh).await,
            Err(e) => Err(self.fail(gen, e).await),
        }
    }

    /// Drops a retained failure without dispatching anything.
    pub async fn clear_error(&self) {
        let mut state = self.state.write().await;
        if state.status == CommandStatus::Failed {
            state.status = CommandStatus::Idle;
            state.last_error = None;
        }
    }

    /// Logout/unmount: restores the guest placeholder and invalidates
    /// every in-flight write-back.
    pub async fn reset(&self) {
        self.generation.bump();
        let mut state = self.state.write().await;
        state.cart = Cart::guest();
        state.status = CommandStatus::Idle;
        state.last_error = None;
    }

    async fn begin(&self) {
        let mut state = self.state.write().await;
        state.status = CommandStatus::Pending;
        state.last_error = None;
    }

    async fn commit<F>(&self, gen: u64, reconcile: F) -> Result<Cart, CartError>
    where
        F: FnOnce(&mut Cart),
    {
        let mut state = self.state.write().await;
        if !self.generation.is_current(gen) {
            return Err(CartError::Superseded);
        }
        reconcile(&mut state.cart);
        state.status = CommandStatus::Succeeded;
        state.last_error = None;
        tracing::debug!(items = state.cart.items.len(), total = state.cart.total_amount, "Cart state reconciled");
        Ok(state.cart.clone())
    }

    async fn fail(&self, gen: u64, err: CartError) -> CartError {
        let mut state = self.state.write().await;
        if !self.generation.is_current(gen) {
            return CartError::Superseded;
        }
        tracing::error!(error = %err, "Cart command failed");
        state.status = CommandStatus::Failed;
        state.last_error = Some(err.clone());
        err
    }

    async fn fail_local(&self, err: CartError) -> CartError {
        let mut state = self.state.write().await;
        tracing::error!(error = %err, "Cart command rejected before dispatch");
        state.status = CommandStatus::Failed;
        state.last_error = Some(err.clone());
        err
    }

    /// A line the local view no longer agrees with the server about:
    /// refetch authoritative state, then surface the failure.
    async fn stale_line(&self, line_id: i64) -> CartError {
        let gen = self.generation.snapshot();
        self.resync(gen).await;
        self.fail(
            gen,
            CartError::NotFound(format!("No cart item with {line_id} id was found")),
        )
        .await
    }

    async fn resync(&self, gen: u64) {
        let Some(session) = self.session.current() else {
            return;
        };
        if let Ok(fresh) = self.api.fetch_cart(session.user_id).await {
            let mut state = self.state.write().await;
            if self.generation.is_current(gen) {
                state.cart = fresh;
            }
        }
    }
}
