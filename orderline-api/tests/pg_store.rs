//! Postgres store tests. Require a database with `sql/orders.sql` applied,
//! reachable through the `ORDERLINE_DB_*` variables.
//!
//! Run with `cargo test -p orderline-api --features db-tests`.
#![cfg(feature = "db-tests")]

use orderline_api::{DbConfig, PgOrderStore};
use orderline_core::StorageError;
use orderline_storage::OrderStore;
use orderline_test_utils::OrderGenerator;

fn store() -> PgOrderStore {
    PgOrderStore::from_config(&DbConfig::from_env()).expect("pool config")
}

#[tokio::test]
async fn test_create_then_get_round_trips_children() {
    let store = store();
    let order = OrderGenerator::new().order();

    store.create(&order).await.unwrap();
    let loaded = store.get_by_id(&order.order_uid).await.unwrap();

    assert_eq!(loaded.order_uid, order.order_uid);
    assert_eq!(loaded.delivery, order.delivery);
    assert_eq!(loaded.payment, order.payment);
    assert_eq!(loaded.items, order.items);
    assert_eq!(
        loaded.date_created.timestamp_micros(),
        order.date_created.timestamp_micros()
    );
}

#[tokio::test]
async fn test_duplicate_create_is_conflict() {
    let store = store();
    let order = OrderGenerator::new().order();

    store.create(&order).await.unwrap();
    let err = store.create(&order).await.unwrap_err();
    assert_eq!(
        err,
        StorageError::Conflict {
            order_uid: order.order_uid.clone()
        }
    );
}

#[tokio::test]
async fn test_missing_order_is_not_found() {
    let err = store().get_by_id("missing-order-uid").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn test_list_all_includes_created_orders() {
    let store = store();
    let mut generator = OrderGenerator::new();
    let orders = generator.orders(3);
    for order in &orders {
        store.create(order).await.unwrap();
    }

    let listed = store.list_all().await.unwrap();
    for order in &orders {
        let found = listed
            .iter()
            .find(|o| o.order_uid == order.order_uid)
            .expect("created order listed");
        assert_eq!(found.items.len(), order.items.len());
    }
}
