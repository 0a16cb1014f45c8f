// Accounts and catalog
pub mod account_service;
pub mod catalog_service;

// Cart and checkout workflow
pub mod cart_service;
pub mod checkout_service;

pub use account_service::{AccountService, RegisterUserInput};
pub use cart_service::{CartItem, CartService};
pub use catalog_service::CatalogService;
pub use checkout_service::{CheckoutService, OrderSummary};
