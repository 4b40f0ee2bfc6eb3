//! Postgres Order Store
//!
//! Connection pooling with deadpool-postgres. An order is spread over four
//! tables (see `sql/orders.sql`); `create` writes them in one transaction so
//! a partially stored order is never visible.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, PoolError, RecyclingMethod, Runtime};
use orderline_core::{Delivery, Item, Order, Payment, StorageError, StorageResult};
use orderline_storage::OrderStore;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection wait and create timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            dbname: "orderline".to_string(),
            user: "orderline".to_string(),
            password: String::new(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("ORDERLINE_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("ORDERLINE_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("ORDERLINE_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("ORDERLINE_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("ORDERLINE_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("ORDERLINE_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: std::env::var("ORDERLINE_DB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Create a connection pool from this configuration.
    ///
    /// No connection is opened until the pool is first used.
    pub fn create_pool(&self) -> StorageResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = PoolConfig::new(self.max_size.max(1));
        pool_cfg.timeouts.wait = Some(self.timeout);
        pool_cfg.timeouts.create = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StorageError::Unavailable {
                reason: format!("Failed to create pool: {}", e),
            })
    }
}

// ============================================================================
// QUERIES
// ============================================================================

const INSERT_ORDER: &str = "INSERT INTO orders (order_uid, track_number, entry, locale, \
     internal_signature, customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)";

const INSERT_DELIVERY: &str = "INSERT INTO deliveries (order_uid, name, phone, zip, city, \
     address, region, email) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

const INSERT_PAYMENT: &str = "INSERT INTO payments (order_uid, transaction, request_id, currency, \
     provider, amount, payment_dt, bank, delivery_cost, goods_total, custom_fee) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)";

const INSERT_ITEM: &str = "INSERT INTO items (order_uid, chrt_id, track_number, price, rid, name, \
     sale, size, total_price, nm_id, brand, status) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)";

const SELECT_ORDERS: &str = "SELECT o.order_uid, o.track_number, o.entry, o.locale, \
     o.internal_signature, o.customer_id, o.delivery_service, o.shardkey, o.sm_id, \
     o.date_created, o.oof_shard, \
     d.name, d.phone, d.zip, d.city, d.address, d.region, d.email, \
     p.transaction, p.request_id, p.currency, p.provider, p.amount, p.payment_dt, p.bank, \
     p.delivery_cost, p.goods_total, p.custom_fee \
     FROM orders o \
     JOIN deliveries d ON d.order_uid = o.order_uid \
     JOIN payments p ON p.order_uid = o.order_uid";

const SELECT_ITEMS: &str = "SELECT order_uid, chrt_id, track_number, price, rid, name, sale, \
     size, total_price, nm_id, brand, status FROM items";

// ============================================================================
// STORE
// ============================================================================

/// [`OrderStore`] over a Postgres pool.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: Pool,
}

impl PgOrderStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &DbConfig) -> StorageResult<Self> {
        Ok(Self::new(config.create_pool()?))
    }

    /// Current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    async fn client(&self) -> StorageResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, order: &Order) -> StorageResult<()> {
        let uid = order.order_uid.as_str();
        let mut client = self.client().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| query_error(uid, e))?;

        tx.execute(
            INSERT_ORDER,
            &[
                &order.order_uid,
                &order.track_number,
                &order.entry,
                &order.locale,
                &order.internal_signature,
                &order.customer_id,
                &order.delivery_service,
                &order.shardkey,
                &order.sm_id,
                &order.date_created,
                &order.oof_shard,
            ],
        )
        .await
        .map_err(|e| query_error(uid, e))?;

        let d = &order.delivery;
        tx.execute(
            INSERT_DELIVERY,
            &[
                &order.order_uid,
                &d.name,
                &d.phone,
                &d.zip,
                &d.city,
                &d.address,
                &d.region,
                &d.email,
            ],
        )
        .await
        .map_err(|e| query_error(uid, e))?;

        let p = &order.payment;
        tx.execute(
            INSERT_PAYMENT,
            &[
                &order.order_uid,
                &p.transaction,
                &p.request_id,
                &p.currency,
                &p.provider,
                &p.amount,
                &p.payment_dt,
                &p.bank,
                &p.delivery_cost,
                &p.goods_total,
                &p.custom_fee,
            ],
        )
        .await
        .map_err(|e| query_error(uid, e))?;

        for item in &order.items {
            tx.execute(
                INSERT_ITEM,
                &[
                    &order.order_uid,
                    &item.chrt_id,
                    &item.track_number,
                    &item.price,
                    &item.rid,
                    &item.name,
                    &item.sale,
                    &item.size,
                    &item.total_price,
                    &item.nm_id,
                    &item.brand,
                    &item.status,
                ],
            )
            .await
            .map_err(|e| query_error(uid, e))?;
        }

        tx.commit().await.map_err(|e| query_error(uid, e))?;
        tracing::debug!(order_uid = uid, items = order.items.len(), "Order persisted");
        Ok(())
    }

    async fn get_by_id(&self, order_uid: &str) -> StorageResult<Order> {
        let client = self.client().await?;

        let sql = format!("{} WHERE o.order_uid = $1", SELECT_ORDERS);
        let row = client
            .query_opt(sql.as_str(), &[&order_uid])
            .await
            .map_err(|e| query_error(order_uid, e))?
            .ok_or_else(|| StorageError::NotFound {
                order_uid: order_uid.to_string(),
            })?;

        let sql = format!("{} WHERE order_uid = $1 ORDER BY id", SELECT_ITEMS);
        let item_rows = client
            .query(sql.as_str(), &[&order_uid])
            .await
            .map_err(|e| query_error(order_uid, e))?;

        let items = item_rows
            .iter()
            .map(item_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| query_error(order_uid, e))?;

        order_from_row(&row, items).map_err(|e| query_error(order_uid, e))
    }

    async fn list_all(&self) -> StorageResult<Vec<Order>> {
        let client = self.client().await?;

        let sql = format!("{} ORDER BY o.date_created", SELECT_ORDERS);
        let rows = client
            .query(sql.as_str(), &[])
            .await
            .map_err(|e| query_error("*", e))?;

        let sql = format!("{} ORDER BY order_uid, id", SELECT_ITEMS);
        let item_rows = client
            .query(sql.as_str(), &[])
            .await
            .map_err(|e| query_error("*", e))?;

        let mut items_by_order: HashMap<String, Vec<Item>> = HashMap::new();
        for row in &item_rows {
            let order_uid: String = row.try_get("order_uid").map_err(|e| query_error("*", e))?;
            let item = item_from_row(row).map_err(|e| query_error(&order_uid, e))?;
            items_by_order.entry(order_uid).or_default().push(item);
        }

        rows.iter()
            .map(|row| {
                let order_uid: String =
                    row.try_get("order_uid").map_err(|e| query_error("*", e))?;
                let items = items_by_order.remove(&order_uid).unwrap_or_default();
                order_from_row(row, items).map_err(|e| query_error(&order_uid, e))
            })
            .collect()
    }

    async fn close(&self) -> StorageResult<()> {
        self.pool.close();
        tracing::info!("Postgres pool closed");
        Ok(())
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn order_from_row(row: &Row, items: Vec<Item>) -> Result<Order, tokio_postgres::Error> {
    Ok(Order {
        order_uid: row.try_get("order_uid")?,
        track_number: row.try_get("track_number")?,
        entry: row.try_get("entry")?,
        delivery: Delivery {
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            zip: row.try_get("zip")?,
            city: row.try_get("city")?,
            address: row.try_get("address")?,
            region: row.try_get("region")?,
            email: row.try_get("email")?,
        },
        payment: Payment {
            transaction: row.try_get("transaction")?,
            request_id: row.try_get("request_id")?,
            currency: row.try_get("currency")?,
            provider: row.try_get("provider")?,
            amount: row.try_get("amount")?,
            payment_dt: row.try_get("payment_dt")?,
            bank: row.try_get("bank")?,
            delivery_cost: row.try_get("delivery_cost")?,
            goods_total: row.try_get("goods_total")?,
            custom_fee: row.try_get("custom_fee")?,
        },
        items,
        locale: row.try_get("locale")?,
        internal_signature: row.try_get("internal_signature")?,
        customer_id: row.try_get("customer_id")?,
        delivery_service: row.try_get("delivery_service")?,
        shardkey: row.try_get("shardkey")?,
        sm_id: row.try_get("sm_id")?,
        date_created: row.try_get("date_created")?,
        oof_shard: row.try_get("oof_shard")?,
    })
}

fn item_from_row(row: &Row) -> Result<Item, tokio_postgres::Error> {
    Ok(Item {
        chrt_id: row.try_get("chrt_id")?,
        track_number: row.try_get("track_number")?,
        price: row.try_get("price")?,
        rid: row.try_get("rid")?,
        name: row.try_get("name")?,
        sale: row.try_get("sale")?,
        size: row.try_get("size")?,
        total_price: row.try_get("total_price")?,
        nm_id: row.try_get("nm_id")?,
        brand: row.try_get("brand")?,
        status: row.try_get("status")?,
    })
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

fn query_error(order_uid: &str, err: tokio_postgres::Error) -> StorageError {
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        return StorageError::Conflict {
            order_uid: order_uid.to_string(),
        };
    }
    if err.is_closed() {
        return StorageError::Unavailable {
            reason: err.to_string(),
        };
    }
    StorageError::QueryFailed {
        reason: format!("{:?}", err),
    }
}

fn pool_error(err: PoolError) -> StorageError {
    StorageError::Unavailable {
        reason: format!("Failed to acquire database connection: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "orderline");
        assert_eq!(config.max_size, 16);
    }

    #[tokio::test]
    async fn test_pool_creation_is_lazy() {
        let config = DbConfig {
            port: 1,
            ..DbConfig::default()
        };
        let store = PgOrderStore::from_config(&config).unwrap();
        assert_eq!(store.pool_size(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_database_is_unavailable() {
        let config = DbConfig {
            port: 1,
            timeout: Duration::from_secs(2),
            ..DbConfig::default()
        };
        let store = PgOrderStore::from_config(&config).unwrap();
        let err = store.get_by_id("order-00001").await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let store = PgOrderStore::from_config(&DbConfig::default()).unwrap();
        store.close().await.unwrap();
        let err = store.list_all().await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
    }
}
