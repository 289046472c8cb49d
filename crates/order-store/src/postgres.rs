use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{CustomerId, Money};

use crate::{
    Customer, OrderId, OrderNumber, Product, ProductId, Result, StoreError, TaxId,
    store::{CustomerLookup, OrderRecord, OrderSequence, OrderStore, ProductLookup},
};

/// SQLSTATE raised by `nextval` once a sequence reaches its maximum.
const SEQUENCE_LIMIT_EXCEEDED: &str = "2200H";

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// PostgreSQL-backed product and customer catalog.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Creates a new catalog over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or updates a product.
    pub async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                price_cents = EXCLUDED.price_cents,
                description = EXCLUDED.description
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(&product.description)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts or updates a customer, keyed by tax ID.
    pub async fn upsert_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, tax_id, name, email, phone)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (tax_id) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(customer.tax_id.as_str())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            description: row.try_get("description")?,
        })
    }

    fn row_to_customer(row: PgRow) -> Result<Customer> {
        Ok(Customer {
            id: CustomerId::from_uuid(row.try_get::<Uuid, _>("id")?),
            tax_id: TaxId::new(row.try_get::<String, _>("tax_id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
        })
    }
}

#[async_trait]
impl ProductLookup for PostgresCatalog {
    #[tracing::instrument(skip(self))]
    async fn find_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, price_cents, description
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }
}

#[async_trait]
impl CustomerLookup for PostgresCatalog {
    #[tracing::instrument(skip(self))]
    async fn find_by_tax_id(&self, tax_id: &TaxId) -> Result<Option<Customer>> {
        let row = sqlx::query(
            r#"
            SELECT id, tax_id, name, email, phone
            FROM customers
            WHERE tax_id = $1
            "#,
        )
        .bind(tax_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_customer).transpose()
    }
}

/// Order sequence backed by the `order_number_seq` database sequence.
///
/// Unique across every process sharing the database.
#[derive(Clone)]
pub struct PostgresOrderSequence {
    pool: PgPool,
}

impl PostgresOrderSequence {
    /// Creates a new sequence over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderSequence for PostgresOrderSequence {
    #[tracing::instrument(skip(self))]
    async fn next_order_number(&self) -> Result<OrderNumber> {
        let value: i64 = sqlx::query_scalar("SELECT nextval('order_number_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.code().as_deref() == Some(SEQUENCE_LIMIT_EXCEEDED)
                {
                    return StoreError::SequenceExhausted;
                }
                StoreError::Database(e)
            })?;

        u64::try_from(value)
            .map(OrderNumber::new)
            .map_err(|_| StoreError::SequenceExhausted)
    }
}

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new order store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: PgRow) -> Result<OrderRecord> {
        let number: i64 = row.try_get("order_number")?;

        Ok(OrderRecord {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_number: OrderNumber::new(number as u64),
            status: row.try_get("status")?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn number_to_column(number: OrderNumber) -> Result<i64> {
    i64::try_from(number.value()).map_err(|_| StoreError::SequenceExhausted)
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, record), fields(order_id = %record.order_id))]
    async fn insert(&self, record: OrderRecord) -> Result<()> {
        let order_id = record.order_id;

        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, status, payload, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(number_to_column(record.order_number)?)
        .bind(&record.status)
        .bind(&record.payload)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::DuplicateOrder(order_id);
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    #[tracing::instrument(skip(self, record), fields(order_id = %record.order_id))]
    async fn update(&self, record: OrderRecord, expected_status: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(record.order_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;

        let current = current.ok_or(StoreError::OrderNotFound(record.order_id))?;
        if current != expected_status {
            return Err(StoreError::ConcurrencyConflict {
                order_id: record.order_id,
                expected: expected_status.to_string(),
                actual: current,
            });
        }

        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, payload = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(record.order_id.as_uuid())
        .bind(&record.status)
        .bind(&record.payload)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, order_number, status, payload, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn list(&self) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_number, status, payload, created_at, updated_at
            FROM orders
            ORDER BY order_number ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }
}
