//! Business logic services for the Boutique stock platform

pub mod catalog;
pub mod inventory;
pub mod notification;
pub mod order;
pub mod stock;

pub use catalog::CatalogService;
pub use inventory::InventoryService;
pub use notification::{NotificationHub, Notifier, Subscription};
pub use order::OrderService;
pub use stock::StockService;
