//! Notification fan-out tests
//!
//! Tests for the admin notification hub including:
//! - Property: Dead streams are removed on write and never written again
//! - Unicast and broadcast reach counts

use boutique_backend::models::NotificationEvent;
use boutique_backend::services::NotificationHub;
use proptest::prelude::*;
use uuid::Uuid;

fn ping_event() -> NotificationEvent {
    NotificationEvent::connected(Uuid::nil())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[tokio::test]
    async fn test_register_queues_connected_event() {
        let hub = NotificationHub::new(8);
        let user = Uuid::new_v4();
        let mut sub = hub.register(user);

        match sub.next_event().await {
            Some(NotificationEvent::Connected { connection_id, .. }) => {
                assert_eq!(connection_id, sub.connection_id());
            }
            other => panic!("expected connected event, got {:?}", other),
        }
        assert_eq!(hub.connection_count(), 1);
        assert!(hub.is_registered(user));
    }

    #[tokio::test]
    async fn test_unicast_reaches_every_stream_of_user() {
        let hub = NotificationHub::new(8);
        let user = Uuid::new_v4();
        let mut first = hub.register(user);
        let mut second = hub.register(user);
        let mut other = hub.register(Uuid::new_v4());
        for sub in [&mut first, &mut second, &mut other] {
            sub.try_next_event();
        }

        assert!(hub.unicast(user, &ping_event()));
        assert!(first.try_next_event().is_some());
        assert!(second.try_next_event().is_some());
        assert!(other.try_next_event().is_none());

        assert!(!hub.unicast(Uuid::new_v4(), &ping_event()));
    }

    #[tokio::test]
    async fn test_broadcast_counts_users() {
        let hub = NotificationHub::new(8);
        let _a1 = hub.register(Uuid::new_v4());
        let user_b = Uuid::new_v4();
        let _b1 = hub.register(user_b);
        let _b2 = hub.register(user_b);

        assert_eq!(hub.user_count(), 2);
        assert_eq!(hub.connection_count(), 3);
        assert_eq!(hub.broadcast(&ping_event()), 2);
    }

    /// Property: a stream that fails a write is removed and not retried
    #[tokio::test]
    async fn test_closed_stream_is_removed_on_broadcast() {
        let hub = NotificationHub::new(8);
        let dead_user = Uuid::new_v4();
        let live_user = Uuid::new_v4();
        let mut dead = hub.register(dead_user);
        let mut live = hub.register(live_user);
        live.try_next_event();

        dead.close();
        assert_eq!(hub.broadcast(&ping_event()), 1);
        assert!(!hub.is_registered(dead_user));
        assert_eq!(hub.connection_count(), 1);

        assert_eq!(hub.broadcast(&ping_event()), 1);
        assert_eq!(hub.connection_count(), 1);
        assert!(live.try_next_event().is_some());
    }

    /// A stream that stops reading is dropped once its queue is full
    #[tokio::test]
    async fn test_full_stream_is_removed() {
        let hub = NotificationHub::new(1);
        let user = Uuid::new_v4();
        let _stalled = hub.register(user);

        // The connected event already fills the queue
        assert!(!hub.unicast(user, &ping_event()));
        assert!(!hub.is_registered(user));
    }

    #[tokio::test]
    async fn test_dropping_subscription_unregisters() {
        let hub = NotificationHub::new(8);
        let user = Uuid::new_v4();
        let keep = hub.register(user);
        let gone = hub.register(user);

        drop(gone);
        assert_eq!(hub.connection_count(), 1);
        assert!(hub.is_registered(user));

        drop(keep);
        assert_eq!(hub.connection_count(), 0);
        assert!(!hub.is_registered(user));
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(ping_event()).unwrap();
        assert_eq!(json["type"], "connected");
        assert!(json.get("connection_id").is_some());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: Notification at-most-once-per-connection
        /// Broadcast reaches exactly the users with a live stream, and closed
        /// streams are gone afterwards
        #[test]
        fn prop_broadcast_skips_dead_streams(
            streams in prop::collection::vec((0usize..4, any::<bool>()), 1..12)
        ) {
            let hub = NotificationHub::new(4);
            let users: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

            let mut subs = Vec::new();
            for (user, alive) in &streams {
                let mut sub = hub.register(users[*user]);
                sub.try_next_event();
                if !alive {
                    sub.close();
                }
                subs.push(sub);
            }

            let live_users: std::collections::HashSet<usize> = streams
                .iter()
                .filter(|(_, alive)| *alive)
                .map(|(user, _)| *user)
                .collect();
            let live_streams = streams.iter().filter(|(_, alive)| *alive).count();

            prop_assert_eq!(hub.broadcast(&ping_event()), live_users.len());
            prop_assert_eq!(hub.connection_count(), live_streams);
            prop_assert_eq!(hub.user_count(), live_users.len());
        }
    }
}
