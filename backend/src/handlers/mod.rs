//! HTTP handlers for the Boutique stock platform

pub mod facilities;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod sse;

pub use facilities::*;
pub use health::*;
pub use inventory::*;
pub use orders::*;
pub use products::*;
pub use sse::*;
