//! Fixtures shared by the integration suites
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use boutique_backend::config::{Config, InventoryConfig, NotificationConfig, OrderStockPolicy};
use boutique_backend::middleware::Claims;
use boutique_backend::models::{Facility, Product, ProductKind};
use boutique_backend::services::{InventoryService, Notifier, OrderService, StockService};
use boutique_backend::store::{InventoryStore, MemoryInventoryStore};
use boutique_backend::AppState;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// A fresh in-memory store with one facility and the reference catalog:
/// - `TS001` T-shirt, sized S=5 M=10 L=0, cost 1200, price 2500
/// - `ACC-01` belt, accessory with 4 units, cost 300, price 900
pub struct Fixture {
    pub store: Arc<MemoryInventoryStore>,
    pub facility: Facility,
    pub tshirt: Product,
    pub belt: Product,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryInventoryStore::new());
        let facility = store.seed_facility("Atelier Bab Ezzouar").await;
        let tshirt = store
            .seed_product(
                "TS001",
                "T-shirt oversize",
                ProductKind::Sized,
                dec("1200"),
                dec("2500"),
                &[("S", 5), ("M", 10), ("L", 0)],
                0,
            )
            .await;
        let belt = store
            .seed_product(
                "ACC-01",
                "Ceinture cuir",
                ProductKind::Accessory,
                dec("300"),
                dec("900"),
                &[],
                4,
            )
            .await;

        Self {
            store,
            facility,
            tshirt,
            belt,
        }
    }

    pub fn dyn_store(&self) -> Arc<dyn InventoryStore> {
        self.store.clone()
    }

    pub fn inventory(&self) -> InventoryService {
        InventoryService::new(self.dyn_store(), InventoryConfig::default())
    }

    pub fn stock(&self) -> StockService {
        StockService::new(self.dyn_store())
    }

    pub fn orders(&self, notifier: Notifier, policy: OrderStockPolicy) -> OrderService {
        OrderService::new(self.dyn_store(), notifier, policy)
    }

    pub async fn product(&self, reference: &str) -> Product {
        self.store.find_product(reference).await.unwrap().unwrap()
    }

    /// Current stock of one size of a product
    pub async fn size_stock(&self, reference: &str, size: &str) -> i32 {
        self.product(reference)
            .await
            .find_size(size)
            .map(|s| s.stock)
            .unwrap()
    }

    pub fn state(&self, config: Config) -> AppState {
        let notifier = Notifier::local(&config.notifications);
        AppState::new(self.dyn_store(), notifier, config)
    }
}

pub fn local_notifier() -> Notifier {
    Notifier::local(&NotificationConfig::default())
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.jwt.secret = JWT_SECRET.to_string();
    config
}

pub fn token_for(user_id: Uuid, role: &str, secret: &str, ttl_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: now + ttl_secs,
        iat: now,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn admin_token() -> String {
    token_for(Uuid::new_v4(), "admin", JWT_SECRET, 3600)
}
