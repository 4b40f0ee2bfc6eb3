//! Orderline Test Utilities
//!
//! Shared test infrastructure for the Orderline workspace:
//! - Fixtures for well-formed orders and wire payloads
//! - Proptest strategies for order ids and valid orders
//! - Store doubles that count calls or inject failures
//! - A seedable fake-order generator (also behind the `generate-orders` binary)

pub mod generator;
pub mod stores;

pub use generator::OrderGenerator;
pub use stores::{CountingStore, ScriptedStore, StoreCallCounts};

// Re-export the types most tests need
pub use orderline_core::{Delivery, Item, Order, Payment, StorageError, Timestamp};
pub use orderline_storage::{InMemoryOrderStore, OrderStore};

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;
    use chrono::{Duration, Utc};

    /// The reference order id used across examples and tests.
    pub const SAMPLE_ORDER_UID: &str = "b563feb7b2b84b6test";

    /// One valid item for `track_number`.
    pub fn valid_item(track_number: &str) -> Item {
        Item {
            chrt_id: 9934930,
            track_number: track_number.to_string(),
            price: 453,
            rid: "ab4219087a764ae0btest".to_string(),
            name: "Mascaras".to_string(),
            sale: 30,
            size: "0".to_string(),
            total_price: Item::discounted_total(453, 30),
            nm_id: 2389212,
            brand: "Vivienne Sabo".to_string(),
            status: 202,
        }
    }

    /// An order that passes validation, created a day ago.
    pub fn valid_order(order_uid: &str) -> Order {
        let track_number = "WBILMTESTTRACK";
        let items = vec![valid_item(track_number)];
        let goods_total: i64 = items.iter().map(|i| i.total_price).sum();
        let now = Utc::now();

        Order {
            order_uid: order_uid.to_string(),
            track_number: track_number.to_string(),
            entry: "WBIL".to_string(),
            delivery: Delivery {
                name: "Test Testov".to_string(),
                phone: "+9720000000".to_string(),
                zip: "2639809".to_string(),
                city: "Kiryat Mozkin".to_string(),
                address: "Ploshad Mira 15".to_string(),
                region: "Kraiot".to_string(),
                email: Some("test@gmail.com".to_string()),
            },
            payment: Payment {
                transaction: order_uid.to_string(),
                request_id: String::new(),
                currency: "USD".to_string(),
                provider: "wbpay".to_string(),
                amount: 1500 + goods_total,
                payment_dt: now.timestamp(),
                bank: "alpha".to_string(),
                delivery_cost: 1500,
                goods_total,
                custom_fee: 0,
            },
            items,
            locale: "en".to_string(),
            internal_signature: String::new(),
            customer_id: "test".to_string(),
            delivery_service: "meest".to_string(),
            shardkey: "9".to_string(),
            sm_id: 99,
            date_created: now - Duration::days(1),
            oof_shard: "1".to_string(),
        }
    }

    /// [`valid_order`] with [`SAMPLE_ORDER_UID`].
    pub fn sample_order() -> Order {
        valid_order(SAMPLE_ORDER_UID)
    }

    /// JSON wire payload for `order`.
    pub fn order_payload(order: &Order) -> Vec<u8> {
        serde_json::to_vec(order).unwrap_or_default()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    /// Order ids within the accepted length window.
    pub fn arb_order_uid() -> impl Strategy<Value = String> {
        "[a-z0-9]{15,40}"
    }

    /// A valid item whose `total_price` matches its discount.
    pub fn arb_item(track_number: String) -> impl Strategy<Value = Item> {
        (
            1i64..10_000_000,
            100i64..100_000,
            0i32..100,
            "[a-z0-9]{20}",
            prop::sample::select(vec!["T-shirt", "Sneakers", "Mascaras", "Phone"]),
            prop::sample::select(vec!["XS", "S", "M", "L", "0"]),
            1i64..10_000_000,
            prop::sample::select(vec![200, 201, 202, 400, 404]),
        )
            .prop_map(
                move |(chrt_id, price, sale, rid, name, size, nm_id, status)| Item {
                    chrt_id,
                    track_number: track_number.clone(),
                    price,
                    rid,
                    name: name.to_string(),
                    sale,
                    size: size.to_string(),
                    total_price: Item::discounted_total(price, sale),
                    nm_id,
                    brand: "Vivienne Sabo".to_string(),
                    status,
                },
            )
    }

    /// Orders that satisfy every validation rule.
    pub fn arb_valid_order() -> impl Strategy<Value = Order> {
        (
            arb_order_uid(),
            prop::collection::vec(arb_item("WBILMTESTTRACK".to_string()), 1..4),
            prop::sample::select(orderline_core::SUPPORTED_LOCALES.to_vec()),
            prop::sample::select(vec!["USD", "rub", "EUR"]),
            0i64..5_000,
            1i64..1_000,
            60i64..(3000 * 86_400),
        )
            .prop_map(
                |(order_uid, items, locale, currency, delivery_cost, sm_id, age_secs)| {
                    let mut order = fixtures::valid_order(&order_uid);
                    let goods_total: i64 = items.iter().map(|i| i.total_price).sum();
                    order.items = items;
                    order.locale = locale.to_string();
                    order.payment.currency = currency.to_string();
                    order.payment.delivery_cost = delivery_cost;
                    order.payment.goods_total = goods_total;
                    order.payment.amount = delivery_cost + goods_total;
                    order.sm_id = sm_id;
                    order.date_created = Utc::now() - Duration::seconds(age_secs);
                    order
                },
            )
    }
}
