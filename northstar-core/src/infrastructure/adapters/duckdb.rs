// northstar-core/src/infrastructure/adapters/duckdb.rs

// Loads the per-user aggregate table through an in-memory DuckDB. CSV files are exposed
// as views and either read as-is (aggregates) or aggregated with SQL (raw orders).

use duckdb::{Config, Connection, Params, params};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::domain::table::{AggregateTable, Column, PerUserAggregate};
use crate::error::NorthstarError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::source::{AggregateSource, ColumnSchema};

const AGGREGATES_VIEW: &str = "aggregates";
const ORDERS_VIEW: &str = "raw_orders";
const ORDER_PRODUCTS_VIEW: &str = "raw_order_products";

const ORDERS_COLUMNS: [&str; 4] = ["order_id", "user_id", "order_number", "days_since_prior_order"];
const ORDER_PRODUCTS_COLUMNS: [&str; 2] = ["order_id", "reordered"];

const SELECT_AGGREGATES: &str = r#"
SELECT
    CAST(user_id AS VARCHAR),
    CAST(orders AS BIGINT),
    CAST(items AS BIGINT),
    CAST(avg_basket_size AS DOUBLE),
    CAST(reorder_rate AS DOUBLE),
    CAST(small_basket_share AS DOUBLE),
    CAST(median_days_since_prior AS DOUBLE),
    CAST(lifetime_orders AS BIGINT)
FROM aggregates
"#;

// Orders without line items drop out at the join. MEDIAN ignores the NULL gap of first orders.
const AGGREGATE_RAW_ORDERS: &str = r#"
WITH order_lines AS (
    SELECT
        o.user_id,
        o.order_number,
        o.days_since_prior_order,
        COUNT(*) AS items,
        SUM(CAST(op.reordered AS BIGINT)) AS reordered_items
    FROM raw_orders o
    JOIN raw_order_products op ON op.order_id = o.order_id
    GROUP BY o.order_id, o.user_id, o.order_number, o.days_since_prior_order
),
per_user AS (
    SELECT
        user_id AS uid,
        COUNT(*) AS orders,
        SUM(items) AS items,
        SUM(reordered_items) AS reordered_items,
        AVG(CASE WHEN items <= ? THEN 1.0 ELSE 0.0 END) AS small_basket_share,
        MEDIAN(CAST(days_since_prior_order AS DOUBLE)) AS median_days_since_prior,
        MAX(order_number) AS lifetime_orders
    FROM order_lines
    GROUP BY user_id
)
SELECT
    CAST(uid AS VARCHAR),
    CAST(orders AS BIGINT),
    CAST(items AS BIGINT),
    CAST(items AS DOUBLE) / orders,
    CAST(reordered_items AS DOUBLE) / items,
    CAST(small_basket_share AS DOUBLE),
    CAST(median_days_since_prior AS DOUBLE),
    CAST(lifetime_orders AS BIGINT)
FROM per_user
ORDER BY uid
"#;

#[derive(Debug, Clone)]
enum SourceMode {
    Aggregates {
        path: PathBuf,
    },
    Raw {
        orders: PathBuf,
        order_products: PathBuf,
        small_basket_threshold: u32,
    },
}

/// Owns its connection for its whole lifetime; dropping the source releases it.
pub struct DuckDbSource {
    conn: Connection,
    mode: SourceMode,
}

impl DuckDbSource {
    /// Reads a CSV that already holds one row per user.
    pub fn from_aggregates(path: impl AsRef<Path>) -> Result<Self, InfrastructureError> {
        let path = existing(path.as_ref())?;
        let source = Self {
            conn: open_in_memory()?,
            mode: SourceMode::Aggregates { path: path.clone() },
        };
        source.register_csv(AGGREGATES_VIEW, &path)?;
        Ok(source)
    }

    /// Aggregates raw `orders` and `order_products` CSVs per user.
    pub fn from_raw(
        orders: impl AsRef<Path>,
        order_products: impl AsRef<Path>,
        small_basket_threshold: u32,
    ) -> Result<Self, InfrastructureError> {
        let orders = existing(orders.as_ref())?;
        let order_products = existing(order_products.as_ref())?;
        let source = Self {
            conn: open_in_memory()?,
            mode: SourceMode::Raw {
                orders: orders.clone(),
                order_products: order_products.clone(),
                small_basket_threshold,
            },
        };
        source.register_csv(ORDERS_VIEW, &orders)?;
        source.register_csv(ORDER_PRODUCTS_VIEW, &order_products)?;
        Ok(source)
    }

    fn register_csv(&self, view: &str, path: &Path) -> Result<(), InfrastructureError> {
        let literal = path.to_string_lossy().replace('\'', "''");
        let query = format!(
            "CREATE OR REPLACE VIEW \"{}\" AS SELECT * FROM read_csv_auto('{}', header = true)",
            view, literal
        );
        self.conn.execute(&query, [])?;
        debug!(view, path = %path.display(), "Registered CSV view");
        Ok(())
    }

    pub fn fetch_columns(&self, view: &str) -> Result<Vec<ColumnSchema>, InfrastructureError> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info('{}')", view))?;
        let rows = stmt.query_map([], |row| {
            Ok(ColumnSchema {
                name: row.get("name")?,
                data_type: row.get("type")?,
                is_nullable: !row.get::<_, bool>("notnull")?,
            })
        })?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }

    fn check_contract(&self, view: &str, required: &[&str]) -> Result<(), InfrastructureError> {
        let present = self.fetch_columns(view)?;
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| !present.iter().any(|c| c.name == *name))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(InfrastructureError::SchemaMismatch {
                source_name: self.describe(),
                reason: format!("missing column(s): {}", missing.join(", ")),
            })
        }
    }

    fn read_rows<P: Params>(&self, sql: &str, params: P) -> Result<AggregateTable, InfrastructureError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(NullableRow {
                user_id: row.get(0)?,
                orders: row.get(1)?,
                items: row.get(2)?,
                avg_basket_size: row.get(3)?,
                reorder_rate: row.get(4)?,
                small_basket_share: row.get(5)?,
                median_days_since_prior: row.get(6)?,
                lifetime_orders: row.get(7)?,
            })
        })?;

        let origin = self.describe();
        let mut table = Vec::new();
        for row in rows {
            table.push(row?.into_aggregate(&origin)?);
        }
        Ok(AggregateTable::new(table))
    }
}

impl AggregateSource for DuckDbSource {
    fn describe(&self) -> String {
        match &self.mode {
            SourceMode::Aggregates { path } => format!("aggregates:{}", path.display()),
            SourceMode::Raw {
                orders,
                order_products,
                ..
            } => format!("raw:{}+{}", orders.display(), order_products.display()),
        }
    }

    #[instrument(skip(self), fields(source = %self.describe()))]
    fn load(&self) -> Result<AggregateTable, NorthstarError> {
        let start = Instant::now();

        let table = match &self.mode {
            SourceMode::Aggregates { .. } => {
                let required: Vec<&str> = std::iter::once("user_id")
                    .chain(Column::ALL.iter().map(Column::as_str))
                    .collect();
                self.check_contract(AGGREGATES_VIEW, &required)?;
                self.read_rows(SELECT_AGGREGATES, params![])?
            }
            SourceMode::Raw {
                small_basket_threshold,
                ..
            } => {
                self.check_contract(ORDERS_VIEW, &ORDERS_COLUMNS)?;
                self.check_contract(ORDER_PRODUCTS_VIEW, &ORDER_PRODUCTS_COLUMNS)?;
                self.read_rows(
                    AGGREGATE_RAW_ORDERS,
                    params![i64::from(*small_basket_threshold)],
                )?
            }
        };

        info!(rows = table.len(), "Aggregate table loaded in {:.2?}", start.elapsed());
        Ok(table)
    }
}

impl Drop for DuckDbSource {
    fn drop(&mut self) {
        debug!(source = %self.describe(), "Releasing DuckDB connection");
    }
}

/// Row as read from SQL, before the null policy is applied.
struct NullableRow {
    user_id: Option<String>,
    orders: Option<i64>,
    items: Option<i64>,
    avg_basket_size: Option<f64>,
    reorder_rate: Option<f64>,
    small_basket_share: Option<f64>,
    median_days_since_prior: Option<f64>,
    lifetime_orders: Option<i64>,
}

impl NullableRow {
    /// NULL keys and counts are unusable; NULL rates become NaN so the quality
    /// checker reports them as nulls.
    fn into_aggregate(self, origin: &str) -> Result<PerUserAggregate, InfrastructureError> {
        let required = |value: Option<i64>, column: &str| {
            value.ok_or_else(|| InfrastructureError::SchemaMismatch {
                source_name: origin.to_string(),
                reason: format!("NULL in required column '{}'", column),
            })
        };
        let user_id = self.user_id.ok_or_else(|| InfrastructureError::SchemaMismatch {
            source_name: origin.to_string(),
            reason: "NULL in required column 'user_id'".to_string(),
        })?;

        Ok(PerUserAggregate {
            user_id,
            orders: required(self.orders, "orders")?,
            items: required(self.items, "items")?,
            avg_basket_size: self.avg_basket_size.unwrap_or(f64::NAN),
            reorder_rate: self.reorder_rate.unwrap_or(f64::NAN),
            small_basket_share: self.small_basket_share.unwrap_or(f64::NAN),
            median_days_since_prior: self.median_days_since_prior,
            lifetime_orders: required(self.lifetime_orders, "lifetime_orders")?,
        })
    }
}

fn open_in_memory() -> Result<Connection, InfrastructureError> {
    Ok(Connection::open_in_memory_with_flags(Config::default())?)
}

fn existing(path: &Path) -> Result<PathBuf, InfrastructureError> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(InfrastructureError::InputNotFound(path.display().to_string()))
    }
}
