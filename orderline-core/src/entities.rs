//! Core entity structures
//!
//! Field names match the wire format of the order stream. Every struct is
//! `#[serde(default)]`: a field missing from the payload decodes to its zero
//! value and is reported by the validator rather than by the decoder.

use crate::Timestamp;
use serde::{Deserialize, Serialize};

/// Order - the cached and persisted unit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub order_uid: String,
    pub track_number: String,
    /// Origin tag of the order.
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<Item>,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i64,
    pub date_created: Timestamp,
    pub oof_shard: String,
}

impl Order {
    /// Sum of `total_price` over all items.
    pub fn items_total(&self) -> i64 {
        self.items.iter().map(|item| item.total_price).sum()
    }
}

/// Delivery - recipient and address of an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Delivery {
    pub name: String,
    /// International format, e.g. `+79001234567`.
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Payment - settlement details. Monetary values are integer minor units.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Payment {
    pub transaction: String,
    pub request_id: String,
    /// ISO 4217 code, upper-cased by validation.
    pub currency: String,
    pub provider: String,
    pub amount: i64,
    /// Payment time in epoch seconds.
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

impl Payment {
    /// `delivery_cost + goods_total`, which upstream producers make equal to `amount`.
    pub fn components_total(&self) -> i64 {
        self.delivery_cost + self.goods_total
    }
}

/// Item - a single line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    /// Catalog id.
    pub chrt_id: i64,
    /// Denormalized from the owning order.
    pub track_number: String,
    pub price: i64,
    pub rid: String,
    pub name: String,
    /// Discount percentage, 0..=100.
    pub sale: i32,
    pub size: String,
    pub total_price: i64,
    /// Secondary catalog id.
    pub nm_id: i64,
    pub brand: String,
    pub status: i32,
}

impl Item {
    /// Price after applying a percentage discount, using integer floor division.
    pub fn discounted_total(price: i64, sale: i32) -> i64 {
        (price * (100 - i64::from(sale))).div_euclid(100)
    }

    /// Whether `total_price` agrees with `price` and `sale`.
    pub fn total_matches_discount(&self) -> bool {
        self.total_price == Self::discounted_total(self.price, self.sale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_discounted_total_floors() {
        assert_eq!(Item::discounted_total(100, 50), 50);
        assert_eq!(Item::discounted_total(453, 30), 317);
        assert_eq!(Item::discounted_total(99, 0), 99);
        assert_eq!(Item::discounted_total(99, 100), 0);
    }

    #[test]
    fn test_missing_fields_decode_to_defaults() {
        let order: Order = serde_json::from_str(r#"{"order_uid":"abc12345"}"#).unwrap();
        assert_eq!(order.order_uid, "abc12345");
        assert!(order.items.is_empty());
        assert_eq!(order.payment.amount, 0);
        assert_eq!(order.date_created, Timestamp::default());
        assert!(order.delivery.email.is_none());
    }

    #[test]
    fn test_wire_format_field_names() {
        let payload = r#"{
            "order_uid": "b563feb7b2b84b6test",
            "track_number": "WBILMTESTTRACK",
            "entry": "WBIL",
            "delivery": {
                "name": "Test Testov",
                "phone": "+9720000000",
                "zip": "2639809",
                "city": "Kiryat Mozkin",
                "address": "Ploshad Mira 15",
                "region": "Kraiot",
                "email": "test@gmail.com"
            },
            "payment": {
                "transaction": "b563feb7b2b84b6test",
                "request_id": "",
                "currency": "USD",
                "provider": "wbpay",
                "amount": 1817,
                "payment_dt": 1637907727,
                "bank": "alpha",
                "delivery_cost": 1500,
                "goods_total": 317,
                "custom_fee": 0
            },
            "items": [{
                "chrt_id": 9934930,
                "track_number": "WBILMTESTTRACK",
                "price": 453,
                "rid": "ab4219087a764ae0btest",
                "name": "Mascaras",
                "sale": 30,
                "size": "0",
                "total_price": 317,
                "nm_id": 2389212,
                "brand": "Vivienne Sabo",
                "status": 202
            }],
            "locale": "en",
            "internal_signature": "",
            "customer_id": "test",
            "delivery_service": "meest",
            "shardkey": "9",
            "sm_id": 99,
            "date_created": "2021-11-26T06:22:19Z",
            "oof_shard": "1"
        }"#;

        let order: Order = serde_json::from_str(payload).unwrap();
        assert_eq!(order.payment.components_total(), order.payment.amount);
        assert!(order.items[0].total_matches_discount());
        assert_eq!(order.items_total(), 317);
        assert_eq!(
            order.date_created,
            Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 19).unwrap()
        );
        assert_eq!(order.delivery.email.as_deref(), Some("test@gmail.com"));
    }

    #[test]
    fn test_absent_email_is_not_serialized() {
        let order = Order::default();
        let json = serde_json::to_value(&order).unwrap();
        assert!(json["delivery"].get("email").is_none());
    }

    proptest::proptest! {
        #[test]
        fn prop_discounted_total_bounded_by_price(price in 0i64..10_000_000, sale in 0i32..=100) {
            let total = Item::discounted_total(price, sale);
            proptest::prop_assert!(total >= 0);
            proptest::prop_assert!(total <= price);
        }
    }
}
