pub mod cart;
pub mod product;

pub use cart::{AddLineResponse, Cart, CartLine, CartTotals, LineMutationResponse, Money};
pub use product::Product;
