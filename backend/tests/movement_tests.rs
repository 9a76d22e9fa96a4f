//! Movement ledger tests
//!
//! Tests for the stock movement ledger including:
//! - Property: Tracking uniqueness is category-scoped
//! - Category/direction agreement
//! - Listing filters and limits

mod common;

use boutique_backend::config::InventoryConfig;
use boutique_backend::error::AppError;
use boutique_backend::models::{MovementCategory, MovementDirection};
use boutique_backend::services::inventory::{MovementQuery, RecordMovementInput};
use boutique_backend::services::InventoryService;
use common::Fixture;
use proptest::prelude::*;

fn movement(
    direction: MovementDirection,
    category: MovementCategory,
    tracking: Option<&str>,
) -> RecordMovementInput {
    RecordMovementInput {
        direction,
        category,
        product_id: None,
        reference: Some("TS001".to_string()),
        product_name: Some("T-shirt oversize".to_string()),
        size: Some("M".to_string()),
        quantity: 1,
        stock_before: None,
        stock_after: None,
        tracking_number: tracking.map(str::to_string),
        note: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[tokio::test]
    async fn test_record_normalises_tracking_number() {
        let fx = Fixture::new().await;
        let recorded = fx
            .inventory()
            .record_movement(
                None,
                movement(
                    MovementDirection::Out,
                    MovementCategory::Sortie,
                    Some("  yal-98765 "),
                ),
            )
            .await
            .unwrap();
        assert_eq!(recorded.tracking_number.as_deref(), Some("YAL-98765"));

        let blank = fx
            .inventory()
            .record_movement(
                None,
                movement(MovementDirection::In, MovementCategory::Retour, Some("   ")),
            )
            .await
            .unwrap();
        assert_eq!(blank.tracking_number, None);
    }

    /// Recording a movement never touches the counters
    #[tokio::test]
    async fn test_record_does_not_change_stock() {
        let fx = Fixture::new().await;
        fx.inventory()
            .record_movement(None, movement(MovementDirection::Out, MovementCategory::Sortie, None))
            .await
            .unwrap();
        assert_eq!(fx.size_stock("TS001", "M").await, 10);
    }

    #[tokio::test]
    async fn test_direction_must_match_category() {
        let fx = Fixture::new().await;
        let service = fx.inventory();

        for (direction, category) in [
            (MovementDirection::Out, MovementCategory::Entree),
            (MovementDirection::In, MovementCategory::Sortie),
            (MovementDirection::Out, MovementCategory::Retour),
        ] {
            let err = service
                .record_movement(None, movement(direction, category, None))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation { ref field, .. } if field == "direction"));
        }

        for direction in [MovementDirection::In, MovementDirection::Out] {
            assert!(service
                .record_movement(None, movement(direction, MovementCategory::Echange, None))
                .await
                .is_ok());
        }
    }

    #[tokio::test]
    async fn test_reference_or_name_required() {
        let fx = Fixture::new().await;
        let mut input = movement(MovementDirection::In, MovementCategory::Entree, None);
        input.reference = Some(" ".to_string());
        input.product_name = None;

        let err = fx.inventory().record_movement(None, input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "reference"));
    }

    #[tokio::test]
    async fn test_quantity_must_be_positive() {
        let fx = Fixture::new().await;
        let mut input = movement(MovementDirection::In, MovementCategory::Entree, None);
        input.quantity = 0;

        let err = fx.inventory().record_movement(None, input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "quantity"));
    }

    #[tokio::test]
    async fn test_malformed_tracking_number_is_rejected() {
        let fx = Fixture::new().await;
        let err = fx
            .inventory()
            .record_movement(
                None,
                movement(MovementDirection::Out, MovementCategory::Sortie, Some("AB 12 34")),
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Validation { ref field, .. } if field == "tracking_number")
        );
    }

    /// Property: a sortie tracking number is still free for retour
    #[tokio::test]
    async fn test_tracking_check_is_category_scoped() {
        let fx = Fixture::new().await;
        let service = fx.inventory();
        service
            .record_movement(
                None,
                movement(MovementDirection::Out, MovementCategory::Sortie, Some("YAL-1234")),
            )
            .await
            .unwrap();

        let same = service
            .validate_tracking("yal-1234", MovementCategory::Sortie)
            .await
            .unwrap();
        assert!(!same.valid);
        assert_eq!(same.tracking_number, "YAL-1234");

        let other = service
            .validate_tracking("YAL-1234", MovementCategory::Retour)
            .await
            .unwrap();
        assert!(other.valid);

        let err = service
            .validate_tracking("  ", MovementCategory::Retour)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_lookup_sortie_by_tracking() {
        let fx = Fixture::new().await;
        let service = fx.inventory();
        for (direction, category) in [
            (MovementDirection::Out, MovementCategory::Sortie),
            (MovementDirection::Out, MovementCategory::Sortie),
            (MovementDirection::In, MovementCategory::Retour),
        ] {
            service
                .record_movement(None, movement(direction, category, Some("ZR-5500")))
                .await
                .unwrap();
        }

        let lookup = service.lookup_sortie_by_tracking("zr-5500").await.unwrap();
        assert!(lookup.found);
        assert_eq!(lookup.movements.len(), 2);
        assert!(lookup
            .movements
            .iter()
            .all(|m| m.category == MovementCategory::Sortie));

        let missing = service.lookup_sortie_by_tracking("ZR-0000").await.unwrap();
        assert!(!missing.found);
        assert!(missing.movements.is_empty());
    }

    #[tokio::test]
    async fn test_sortie_lookup_is_capped() {
        let fx = Fixture::new().await;
        let limits = InventoryConfig {
            sortie_lookup_limit: 3,
            ..InventoryConfig::default()
        };
        let service = InventoryService::new(fx.dyn_store(), limits);
        for _ in 0..5 {
            service
                .record_movement(
                    None,
                    movement(MovementDirection::Out, MovementCategory::Sortie, Some("CAP-001")),
                )
                .await
                .unwrap();
        }

        let lookup = service.lookup_sortie_by_tracking("CAP-001").await.unwrap();
        assert_eq!(lookup.movements.len(), 3);
    }

    #[tokio::test]
    async fn test_list_filters_and_order() {
        let fx = Fixture::new().await;
        let service = fx.inventory();
        let first = service
            .record_movement(None, movement(MovementDirection::In, MovementCategory::Entree, None))
            .await
            .unwrap();
        let second = service
            .record_movement(None, movement(MovementDirection::Out, MovementCategory::Sortie, None))
            .await
            .unwrap();
        let third = service
            .record_movement(None, movement(MovementDirection::In, MovementCategory::Retour, None))
            .await
            .unwrap();

        let all = service.list_movements(MovementQuery::default()).await.unwrap();
        let ids: Vec<_> = all.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);

        let incoming = service
            .list_movements(MovementQuery {
                direction: Some(MovementDirection::In),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(incoming.len(), 2);

        let sorties = service
            .list_movements(MovementQuery {
                category: Some(MovementCategory::Sortie),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(sorties.len(), 1);

        let limited = service
            .list_movements(MovementQuery {
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited[0].id, third.id);
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_list_limit_is_capped() {
        let fx = Fixture::new().await;
        let limits = InventoryConfig {
            movement_max_limit: 2,
            ..InventoryConfig::default()
        };
        let service = InventoryService::new(fx.dyn_store(), limits);
        for _ in 0..4 {
            service
                .record_movement(None, movement(MovementDirection::In, MovementCategory::Entree, None))
                .await
                .unwrap();
        }

        let listed = service
            .list_movements(MovementQuery {
                limit: Some(1_000_000),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
    }

    /// A zero cap still lists one row instead of failing
    #[tokio::test]
    async fn test_zero_cap_lists_one_movement() {
        let fx = Fixture::new().await;
        let limits = InventoryConfig {
            movement_max_limit: 0,
            ..InventoryConfig::default()
        };
        assert!(limits.validate().is_err());

        let service = InventoryService::new(fx.dyn_store(), limits);
        for _ in 0..2 {
            service
                .record_movement(None, movement(MovementDirection::In, MovementCategory::Entree, None))
                .await
                .unwrap();
        }

        let listed = service.list_movements(MovementQuery::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn category_strategy() -> impl Strategy<Value = MovementCategory> {
        prop_oneof![
            Just(MovementCategory::Entree),
            Just(MovementCategory::Sortie),
            Just(MovementCategory::Echange),
            Just(MovementCategory::Retour),
        ]
    }

    fn direction_for(category: MovementCategory) -> MovementDirection {
        if category.accepts(MovementDirection::In) {
            MovementDirection::In
        } else {
            MovementDirection::Out
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: Tracking uniqueness is category-scoped
        /// A tracking number used for one category is invalid for that
        /// category only
        #[test]
        fn prop_tracking_reuse_is_category_scoped(
            tracking in "[A-Z]{2,4}-[0-9]{4,8}",
            used in category_strategy(),
            checked in category_strategy()
        ) {
            tokio_test::block_on(async {
                let fx = Fixture::new().await;
                let service = fx.inventory();
                service
                    .record_movement(None, movement(direction_for(used), used, Some(&tracking)))
                    .await
                    .unwrap();

                let check = service
                    .validate_tracking(&tracking.to_lowercase(), checked)
                    .await
                    .unwrap();
                prop_assert_eq!(check.valid, used != checked);
                Ok(())
            })?;
        }
    }
}
