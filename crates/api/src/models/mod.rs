//! Domain models for the API.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`]. Types that leave the API serialize with camelCase keys.

pub mod cart;
pub mod coupon;
pub mod order;
pub mod page;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{CartLine, CartView};
pub use coupon::{AppliedCoupon, Coupon, CouponUpdate, NewCoupon};
pub use order::{Address, NewOrder, Order, OrderDraft, OrderItem, OrderLineDraft, OrderSummary};
pub use page::{Page, PageRequest};
pub use product::{NewProduct, Product, ProductFilter, ProductSort, ProductUpdate};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
