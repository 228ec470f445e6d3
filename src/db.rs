use std::path::Path;

use deadpool_sqlite::{BuildError, Config, Manager, Pool, PoolError, Runtime};
use rusqlite::{ffi, params, Connection, Row};
use thiserror::Error;

use crate::model::{NewOrder, NewOrderItem, Order, OrderItem};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS orders (
        id       INTEGER PRIMARY KEY AUTOINCREMENT,
        number   TEXT NOT NULL UNIQUE,
        customer TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS order_items (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        order_number TEXT NOT NULL,
        item_index   INTEGER NOT NULL,
        sku          TEXT NOT NULL,
        product_name TEXT NOT NULL,
        unit_price   REAL NOT NULL,
        quantity     INTEGER NOT NULL,
        FOREIGN KEY (order_number) REFERENCES orders(number)
    );
    CREATE INDEX IF NOT EXISTS order_items_by_order ON order_items (order_number, item_index);
    CREATE INDEX IF NOT EXISTS order_items_by_product ON order_items (product_name);
";

const ITEM_COLUMNS: &str =
    "id, order_number, item_index, sku, product_name, unit_price, quantity";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// Unique constraint violation; carries the engine's message.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(rusqlite::Error),

    #[error("connection pool: {0}")]
    Pool(#[from] PoolError),

    #[error("building connection pool: {0}")]
    Build(#[from] BuildError),

    #[error("connection task failed: {0}")]
    Interact(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            rusqlite::Error::SqliteFailure(code, ref msg)
                if code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                StoreError::Conflict(msg.clone().unwrap_or_else(|| code.to_string()))
            }
            other => StoreError::Database(other),
        }
    }
}

/// Process-wide handle to the SQLite file. Cheap to clone.
#[derive(Clone)]
pub struct DbPool(pub Pool);

impl DbPool {
    /// Builds the pool. The file itself is created by the first connection.
    pub fn open(path: impl AsRef<Path>, max_size: usize) -> Result<Self, StoreError> {
        let cfg = Config::new(path.as_ref());
        let mgr = Manager::from_config(&cfg, Runtime::Tokio1);
        let pool = Pool::builder(mgr)
            .max_size(max_size)
            .runtime(Runtime::Tokio1)
            .build()?;
        Ok(DbPool(pool))
    }

    async fn interact<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let conn = self.0.get().await?;
        // bundled SQLite defaults foreign_keys to ON; items may name unknown orders
        conn.interact(move |conn: &mut Connection| -> Result<R, StoreError> {
            conn.execute_batch("PRAGMA foreign_keys = OFF")?;
            f(conn)
        })
        .await
        .map_err(|e| StoreError::Interact(e.to_string()))?
    }

    pub async fn init_schema(&self) -> Result<(), StoreError> {
        self.interact(|conn| Ok(conn.execute_batch(SCHEMA)?)).await
    }

    pub async fn insert_order(&self, new: NewOrder) -> Result<Order, StoreError> {
        self.interact(move |conn| {
            conn.prepare_cached("INSERT INTO orders (number, customer) VALUES (?1, ?2)")?
                .execute(params![new.number, new.customer])?;
            Ok(Order {
                id: conn.last_insert_rowid(),
                number: new.number,
                customer: new.customer,
            })
        })
        .await
    }

    pub async fn get_order_by_number(&self, number: &str) -> Result<Order, StoreError> {
        let number = number.to_owned();
        self.interact(move |conn| {
            let order = conn
                .prepare_cached("SELECT id, number, customer FROM orders WHERE number = ?1")?
                .query_row(params![number], order_from_row)?;
            Ok(order)
        })
        .await
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        self.interact(|conn| {
            let mut stmt = conn.prepare_cached("SELECT id, number, customer FROM orders ORDER BY id")?;
            let orders = stmt
                .query_map([], order_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(orders)
        })
        .await
    }

    /// Does not check that `number` names an existing order.
    pub async fn insert_order_item(
        &self,
        number: &str,
        new: NewOrderItem,
    ) -> Result<OrderItem, StoreError> {
        let number = number.to_owned();
        self.interact(move |conn| {
            conn.prepare_cached(
                "INSERT INTO order_items (order_number, item_index, sku, product_name, unit_price, quantity)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?
            .execute(params![
                number,
                new.index,
                new.sku,
                new.product_name,
                new.unit_price,
                new.quantity
            ])?;
            Ok(OrderItem {
                id: conn.last_insert_rowid(),
                order_number: number,
                index: new.index,
                sku: new.sku,
                product_name: new.product_name,
                unit_price: new.unit_price,
                quantity: new.quantity,
            })
        })
        .await
    }

    /// Duplicate (number, index) pairs resolve to the lowest id.
    pub async fn get_order_item(&self, number: &str, index: i64) -> Result<OrderItem, StoreError> {
        let number = number.to_owned();
        self.interact(move |conn| {
            let sql = format!(
                "SELECT {ITEM_COLUMNS} FROM order_items
                 WHERE order_number = ?1 AND item_index = ?2 ORDER BY id LIMIT 1"
            );
            let item = conn
                .prepare_cached(&sql)?
                .query_row(params![number, index], item_from_row)?;
            Ok(item)
        })
        .await
    }

    pub async fn list_order_items(&self, number: &str) -> Result<Vec<OrderItem>, StoreError> {
        self.select_items("order_number", number).await
    }

    pub async fn list_order_items_by_product(
        &self,
        product_name: &str,
    ) -> Result<Vec<OrderItem>, StoreError> {
        self.select_items("product_name", product_name).await
    }

    async fn select_items(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<Vec<OrderItem>, StoreError> {
        let value = value.to_owned();
        self.interact(move |conn| {
            let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE {column} = ?1 ORDER BY id");
            let mut stmt = conn.prepare_cached(&sql)?;
            let items = stmt
                .query_map(params![value], item_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        })
        .await
    }
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        number: row.get(1)?,
        customer: row.get(2)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<OrderItem> {
    Ok(OrderItem {
        id: row.get(0)?,
        order_number: row.get(1)?,
        index: row.get(2)?,
        sku: row.get(3)?,
        product_name: row.get(4)?,
        unit_price: row.get(5)?,
        quantity: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn fresh_pool() -> (TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = DbPool::open(dir.path().join("orders.db"), 4).unwrap();
        pool.init_schema().await.unwrap();
        (dir, pool)
    }

    fn item(index: i64, product: &str) -> NewOrderItem {
        NewOrderItem {
            index,
            sku: format!("SKU{index}"),
            product_name: product.to_string(),
            unit_price: 9.99,
            quantity: 2,
        }
    }

    fn order(number: &str) -> NewOrder {
        NewOrder { number: number.into(), customer: "Ana".into() }
    }

    #[tokio::test]
    async fn init_schema_is_idempotent_and_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.db");
        let pool = DbPool::open(&path, 2).unwrap();
        pool.init_schema().await.unwrap();
        pool.init_schema().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn foreign_keys_stay_declared_but_unenforced() {
        let (_dir, pool) = fresh_pool().await;
        for _ in 0..8 {
            let enforced: i64 = pool
                .interact(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0))?))
                .await
                .unwrap();
            assert_eq!(enforced, 0);
        }
        pool.insert_order_item("NO-SUCH-ORDER", item(3, "Widget")).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_order_number_is_conflict() {
        let (_dir, pool) = fresh_pool().await;
        let first = pool.insert_order(order("PED-1")).await.unwrap();
        assert!(first.id > 0);

        let err = pool.insert_order(order("PED-1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
        assert!(err.to_string().contains("UNIQUE"));
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let (_dir, pool) = fresh_pool().await;
        let err = pool.get_order_by_number("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn lookup_is_case_sensitive() {
        let (_dir, pool) = fresh_pool().await;
        pool.insert_order(order("PED-1")).await.unwrap();
        assert!(matches!(
            pool.get_order_by_number("ped-1").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn item_may_reference_unknown_order() {
        let (_dir, pool) = fresh_pool().await;
        let created = pool.insert_order_item("GHOST", item(0, "Widget")).await.unwrap();
        assert_eq!(created.order_number, "GHOST");
        assert_eq!(pool.get_order_item("GHOST", 0).await.unwrap(), created);
    }

    #[tokio::test]
    async fn duplicate_index_resolves_to_lowest_id() {
        let (_dir, pool) = fresh_pool().await;
        let first = pool.insert_order_item("PED-1", item(0, "Widget")).await.unwrap();
        let second = pool.insert_order_item("PED-1", item(0, "Gadget")).await.unwrap();
        assert!(second.id > first.id);

        let found = pool.get_order_item("PED-1", 0).await.unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn product_listing_matches_exactly_across_orders() {
        let (_dir, pool) = fresh_pool().await;
        pool.insert_order_item("A", item(0, "Widget")).await.unwrap();
        pool.insert_order_item("B", item(0, "Widget")).await.unwrap();
        pool.insert_order_item("B", item(1, "widget")).await.unwrap();
        pool.insert_order_item("C", item(0, "Widget XL")).await.unwrap();

        let items = pool.list_order_items_by_product("Widget").await.unwrap();
        let orders: Vec<_> = items.iter().map(|i| i.order_number.as_str()).collect();
        assert_eq!(orders, ["A", "B"]);
        assert!(pool.list_order_items_by_product("Nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_inserts_all_land() {
        let (_dir, pool) = fresh_pool().await;
        let mut handles = Vec::new();
        for n in 0..16 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                pool.insert_order(order(&format!("PED-{n}"))).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(pool.list_orders().await.unwrap().len(), 16);
    }
}
