//! Domain models for the Boutique stock platform

mod facility;
mod movement;
mod notification;
mod order;
mod product;
mod reception;

pub use facility::*;
pub use movement::*;
pub use notification::*;
pub use order::*;
pub use product::*;
pub use reception::*;
