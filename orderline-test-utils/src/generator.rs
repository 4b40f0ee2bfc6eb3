//! Fake order generator.
//!
//! Produces orders shaped like the production stream: fixed track and entry,
//! values drawn from short pick lists, 1 to 3 items. Seeded generators are
//! deterministic, which keeps fixtures and load files reproducible.

use chrono::{Duration, Utc};
use orderline_core::{Delivery, Item, Order, Payment};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

const TRACK_NUMBER: &str = "WBILMTESTTRACK";
const ENTRY: &str = "WBIL";
const ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

const NAMES: &[&str] = &[
    "Ivan Ivanov",
    "Petr Petrov",
    "Anna Sidorova",
    "Maria Komarova",
    "Test Testov",
];
const CITIES: &[&str] = &[
    "Moscow",
    "Saint Petersburg",
    "Kiryat Mozkin",
    "Kazan",
    "Novosibirsk",
];
const REGIONS: &[&str] = &[
    "Moscow Region",
    "Leningrad Region",
    "Kraiot",
    "Tatarstan",
    "Novosibirsk Region",
];
const ADDRESSES: &[&str] = &[
    "Ploshad Mira 15",
    "Lenina 10",
    "Pushkina 5",
    "Gagarina 20",
    "Sovetskaya 1",
];
const PHONE_PREFIXES: &[&str] = &["+7", "+1", "+44", "+49", "+33"];
const EMAIL_USERS: &[&str] = &["test", "user", "admin", "client", "customer"];
const EMAIL_DOMAINS: &[&str] = &["gmail.com", "yandex.ru", "mail.ru", "example.com"];
const CURRENCIES: &[&str] = &["USD", "RUB", "EUR"];
const PROVIDERS: &[&str] = &["wbpay", "sberbank", "tinkoff", "yandex"];
const BANKS: &[&str] = &["alpha", "sberbank", "tinkoff", "vtb"];
const BRANDS: &[&str] = &["Nike", "Adidas", "Vivienne Sabo", "Apple", "Samsung"];
const ITEM_NAMES: &[&str] = &["T-shirt", "Sneakers", "Mascaras", "Phone", "Laptop"];
const SIZES: &[&str] = &["XS", "S", "M", "L", "XL", "0"];
const STATUSES: &[i32] = &[200, 201, 202, 400, 404];
const LOCALES: &[&str] = &["en", "ru", "de", "fr", "es"];
const DELIVERY_SERVICES: &[&str] = &["meest", "cdek", "boxberry", "pickpoint", "dhl"];

/// Source of random, realistic orders.
#[derive(Debug, Clone)]
pub struct OrderGenerator {
    rng: StdRng,
}

impl Default for OrderGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderGenerator {
    /// Generator seeded from the OS.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic generator.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// One order that passes validation.
    pub fn order(&mut self) -> Order {
        let order_uid = format!("{}test", self.random_id(19));

        let item_count = self.rng.random_range(1..=3);
        let items: Vec<Item> = (0..item_count).map(|_| self.item()).collect();
        let goods_total: i64 = items.iter().map(|item| item.total_price).sum();
        let delivery_cost = self.rng.random_range(100..3000);

        let now = Utc::now();
        let date_created = now - Duration::days(self.rng.random_range(0..30));

        Order {
            track_number: TRACK_NUMBER.to_string(),
            entry: ENTRY.to_string(),
            delivery: self.delivery(),
            payment: Payment {
                transaction: order_uid.clone(),
                request_id: String::new(),
                currency: self.pick(CURRENCIES).to_string(),
                provider: self.pick(PROVIDERS).to_string(),
                amount: delivery_cost + goods_total,
                payment_dt: date_created.timestamp(),
                bank: self.pick(BANKS).to_string(),
                delivery_cost,
                goods_total,
                custom_fee: self.rng.random_range(0..100),
            },
            items,
            locale: self.pick(LOCALES).to_string(),
            internal_signature: String::new(),
            customer_id: format!("test{}", self.rng.random_range(0..1000)),
            delivery_service: self.pick(DELIVERY_SERVICES).to_string(),
            shardkey: self.rng.random_range(0..10).to_string(),
            sm_id: self.rng.random_range(1..=100),
            date_created,
            oof_shard: self.rng.random_range(0..5).to_string(),
            order_uid,
        }
    }

    /// An otherwise valid order carrying exactly one defect the validator rejects.
    pub fn invalid_order(&mut self) -> Order {
        let mut order = self.order();
        match self.rng.random_range(0..6) {
            0 => order.payment.currency = "US".to_string(),
            1 => order.items[0].sale = 150,
            2 => order.items.clear(),
            3 => order.delivery.phone = "12345".to_string(),
            4 => order.locale = "xx".to_string(),
            _ => order.sm_id = 0,
        }
        order
    }

    /// `count` valid orders.
    pub fn orders(&mut self, count: usize) -> Vec<Order> {
        (0..count).map(|_| self.order()).collect()
    }

    /// True with the given probability.
    pub fn chance(&mut self, probability: f64) -> bool {
        probability > 0.0 && self.rng.random::<f64>() < probability
    }

    fn delivery(&mut self) -> Delivery {
        let phone = format!(
            "{}{}",
            self.pick(PHONE_PREFIXES),
            self.rng.random_range(1_000_000_000u64..10_000_000_000)
        );
        let email = format!(
            "{}{}@{}",
            self.pick(EMAIL_USERS),
            self.rng.random_range(0..1000),
            self.pick(EMAIL_DOMAINS)
        );

        Delivery {
            name: self.pick(NAMES).to_string(),
            phone,
            zip: self.rng.random_range(100_000..1_000_000).to_string(),
            city: self.pick(CITIES).to_string(),
            address: self.pick(ADDRESSES).to_string(),
            region: self.pick(REGIONS).to_string(),
            email: Some(email),
        }
    }

    fn item(&mut self) -> Item {
        let price = self.rng.random_range(50..1050);
        let sale = self.rng.random_range(0..50);

        Item {
            chrt_id: self.rng.random_range(1_000_000..11_000_000),
            track_number: TRACK_NUMBER.to_string(),
            price,
            rid: format!("{}test", self.random_id(20)),
            name: self.pick(ITEM_NAMES).to_string(),
            sale,
            size: self.pick(SIZES).to_string(),
            total_price: Item::discounted_total(price, sale),
            nm_id: self.rng.random_range(1_000_000..11_000_000),
            brand: self.pick(BRANDS).to_string(),
            status: *STATUSES.choose(&mut self.rng).unwrap_or(&200),
        }
    }

    fn pick(&mut self, choices: &[&'static str]) -> &'static str {
        choices.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn random_id(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| char::from(ID_CHARSET[self.rng.random_range(0..ID_CHARSET.len())]))
            .collect()
    }
}
