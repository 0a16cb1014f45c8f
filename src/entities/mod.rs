//! Persistent storefront records.
//!
//! The four tables share no behavior beyond CRUD; each module is a plain
//! sea-orm entity and all access goes through [`crate::repositories::Repository`].

pub mod cart_line;
pub mod order_line;
pub mod product;
pub mod user;

pub use cart_line::{Entity as CartLine, Model as CartLineModel};
pub use order_line::{Entity as OrderLine, Model as OrderLineModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use user::{Entity as User, Model as UserModel};

/// Storage-assigned user identifier.
pub type UserId = i32;
/// Storage-assigned product identifier.
pub type ProductId = i32;
/// Storage-assigned cart line identifier.
pub type CartLineId = i32;
