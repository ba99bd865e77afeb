pub mod catalog;
pub mod category;
pub mod product;
pub mod role;
pub mod stock_transaction;
pub mod user;

pub use catalog::Catalog;
pub use category::Category;
pub use product::{BarcodeProduct, Product, ProductListing};
pub use role::Role;
pub use stock_transaction::{
    StockTransaction, TransactionDetail, TransactionDetailRow, TransactionType,
};
pub use user::{User, UserResponse, UserRoleRow};
