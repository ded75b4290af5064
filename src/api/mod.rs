pub mod cart;
pub mod error;

pub use cart::{CartApi, HttpCartApi};
pub use error::CartError;
