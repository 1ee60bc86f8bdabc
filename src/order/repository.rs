use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::models::{OrderLine, OrderModel, OrderSortKey, OrderStatus, PaymentStatus};
use crate::shared::{db_error, AppError, ListParams, Page};

/// Filters for order listings. `client_ids` restricts to a precomputed set
/// (the result of a client search); an empty set matches nothing.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub client_id: Option<Uuid>,
    pub client_ids: Option<Vec<Uuid>>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl OrderFilter {
    fn matches(&self, order: &OrderModel) -> bool {
        self.client_id.map_or(true, |id| order.client_id == id)
            && self
                .client_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&order.client_id))
            && self.status.map_or(true, |status| order.status == status)
            && self
                .payment_status
                .map_or(true, |status| order.payment_status == status)
    }
}

/// Result of a guarded order transition
#[derive(Debug, Clone)]
pub enum OrderTransition {
    /// Order was pending and moved on, returns the updated order
    Applied(OrderModel),
    /// Order already left pending
    Rejected(OrderStatus),
    NotFound,
}

/// Trait for order repository operations
#[async_trait]
pub trait OrderRepository {
    /// Writes the order and its lines as one unit
    async fn create_order(&self, order: &OrderModel, lines: &[OrderLine]) -> Result<(), AppError>;
    async fn get_order(&self, id: Uuid) -> Result<Option<OrderModel>, AppError>;
    async fn list_orders(
        &self,
        filter: &OrderFilter,
        params: &ListParams,
    ) -> Result<Page<OrderModel>, AppError>;
    async fn lines_for(&self, order_ids: &[Uuid]) -> Result<Vec<OrderLine>, AppError>;

    /// pending -> completed with payment marked paid
    async fn confirm_payment(&self, id: Uuid) -> Result<OrderTransition, AppError>;

    /// pending -> cancelled; payment status is left as is
    async fn cancel_order(&self, id: Uuid) -> Result<OrderTransition, AppError>;

    /// True when a completed order of the client has a line for the package
    async fn has_completed_purchase(
        &self,
        client_id: Uuid,
        package_id: Uuid,
    ) -> Result<bool, AppError>;
}

fn sort_orders(orders: &mut [OrderModel], params: &ListParams) {
    let key: OrderSortKey = params.sort_key();
    orders.sort_by(|a, b| {
        let ordering = match key {
            OrderSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            OrderSortKey::OrderDate => a.order_date.cmp(&b.order_date),
            OrderSortKey::TotalAmount => a.total_amount.cmp(&b.total_amount),
        };
        params.sort_order.apply(ordering)
    });
}

#[derive(Default)]
struct OrderBook {
    orders: HashMap<Uuid, OrderModel>,
    lines: Vec<OrderLine>,
}

/// In-memory implementation of OrderRepository for development and testing.
/// Orders and lines share one lock so placement is all-or-nothing.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    book: RwLock<OrderBook>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn from_pending(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut OrderModel),
    ) -> OrderTransition {
        let mut book = self.book.write().await;
        let Some(order) = book.orders.get_mut(&id) else {
            return OrderTransition::NotFound;
        };
        if order.status != OrderStatus::Pending {
            return OrderTransition::Rejected(order.status);
        }
        apply(order);
        order.updated_at = Utc::now();
        OrderTransition::Applied(order.clone())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    #[instrument(skip(self, order, lines), fields(order_id = %order.id))]
    async fn create_order(&self, order: &OrderModel, lines: &[OrderLine]) -> Result<(), AppError> {
        let mut book = self.book.write().await;
        book.orders.insert(order.id, order.clone());
        book.lines.extend_from_slice(lines);

        debug!(lines = lines.len(), "Order stored in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_order(&self, id: Uuid) -> Result<Option<OrderModel>, AppError> {
        Ok(self.book.read().await.orders.get(&id).cloned())
    }

    #[instrument(skip(self, filter, params))]
    async fn list_orders(
        &self,
        filter: &OrderFilter,
        params: &ListParams,
    ) -> Result<Page<OrderModel>, AppError> {
        let book = self.book.read().await;
        let mut orders: Vec<OrderModel> = book
            .orders
            .values()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect();
        sort_orders(&mut orders, params);
        Ok(params.paginate(orders))
    }

    #[instrument(skip(self, order_ids), fields(count = order_ids.len()))]
    async fn lines_for(&self, order_ids: &[Uuid]) -> Result<Vec<OrderLine>, AppError> {
        let book = self.book.read().await;
        Ok(book
            .lines
            .iter()
            .filter(|line| order_ids.contains(&line.order_id))
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn confirm_payment(&self, id: Uuid) -> Result<OrderTransition, AppError> {
        Ok(self
            .from_pending(id, |order| {
                order.status = OrderStatus::Completed;
                order.payment_status = PaymentStatus::Paid;
            })
            .await)
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, id: Uuid) -> Result<OrderTransition, AppError> {
        Ok(self
            .from_pending(id, |order| order.status = OrderStatus::Cancelled)
            .await)
    }

    #[instrument(skip(self))]
    async fn has_completed_purchase(
        &self,
        client_id: Uuid,
        package_id: Uuid,
    ) -> Result<bool, AppError> {
        let book = self.book.read().await;
        Ok(book.lines.iter().any(|line| {
            line.package_id == package_id
                && book.orders.get(&line.order_id).is_some_and(|order| {
                    order.client_id == client_id && order.status == OrderStatus::Completed
                })
        }))
    }
}

const ORDER_COLUMNS: &str = "id, client_id, order_date, total_amount, status, payment_method, \
     payment_status, created_at, updated_at";

fn push_order_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    builder.push(" WHERE TRUE");
    if let Some(client_id) = filter.client_id {
        builder.push(" AND client_id = ").push_bind(client_id);
    }
    if let Some(ids) = &filter.client_ids {
        builder.push(" AND client_id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(payment_status) = filter.payment_status {
        builder.push(" AND payment_status = ").push_bind(payment_status);
    }
}

/// PostgreSQL implementation of OrderRepository
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn after_miss(&self, id: Uuid) -> Result<OrderTransition, AppError> {
        Ok(match self.get_order(id).await? {
            Some(order) => OrderTransition::Rejected(order.status),
            None => OrderTransition::NotFound,
        })
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    #[instrument(skip(self, order, lines), fields(order_id = %order.id))]
    async fn create_order(&self, order: &OrderModel, lines: &[OrderLine]) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error(e, "Order could not be placed"))?;

        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(order.id)
        .bind(order.client_id)
        .bind(order.order_date)
        .bind(order.total_amount)
        .bind(order.status)
        .bind(&order.payment_method)
        .bind(order.payment_status)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e, "Order could not be placed"))?;

        for line in lines {
            sqlx::query(
                "INSERT INTO order_lines (id, order_id, package_id, price_at_purchase, duration_at_purchase, quantity) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(line.id)
            .bind(line.order_id)
            .bind(line.package_id)
            .bind(line.price_at_purchase)
            .bind(line.duration_at_purchase)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(e, "Order could not be placed"))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error(e, "Order could not be placed"))?;

        debug!(lines = lines.len(), "Order stored in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_order(&self, id: Uuid) -> Result<Option<OrderModel>, AppError> {
        sqlx::query_as::<_, OrderModel>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "Order lookup failed"))
    }

    #[instrument(skip(self, filter, params))]
    async fn list_orders(
        &self,
        filter: &OrderFilter,
        params: &ListParams,
    ) -> Result<Page<OrderModel>, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        push_order_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error(e, "Order count failed"))?;

        let key: OrderSortKey = params.sort_key();
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        push_order_filters(&mut query, filter);
        query
            .push(format!(
                " ORDER BY {} {}",
                key.column(),
                params.sort_order.as_sql()
            ))
            .push(" LIMIT ")
            .push_bind(params.limit)
            .push(" OFFSET ")
            .push_bind(params.offset());

        let items = query
            .build_query_as::<OrderModel>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error(e, "Order listing failed"))?;

        Ok(Page { items, total })
    }

    #[instrument(skip(self, order_ids), fields(count = order_ids.len()))]
    async fn lines_for(&self, order_ids: &[Uuid]) -> Result<Vec<OrderLine>, AppError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, OrderLine>(
            "SELECT id, order_id, package_id, price_at_purchase, duration_at_purchase, quantity \
             FROM order_lines WHERE order_id = ANY($1)",
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, "Order line lookup failed"))
    }

    #[instrument(skip(self))]
    async fn confirm_payment(&self, id: Uuid) -> Result<OrderTransition, AppError> {
        let updated = sqlx::query_as::<_, OrderModel>(&format!(
            "UPDATE orders SET status = $1, payment_status = $2, updated_at = NOW() \
             WHERE id = $3 AND status = $4 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(OrderStatus::Completed)
        .bind(PaymentStatus::Paid)
        .bind(id)
        .bind(OrderStatus::Pending)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "Order update failed"))?;

        match updated {
            Some(order) => {
                info!(order_id = %id, "Order completed in database");
                Ok(OrderTransition::Applied(order))
            }
            None => self.after_miss(id).await,
        }
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, id: Uuid) -> Result<OrderTransition, AppError> {
        let updated = sqlx::query_as::<_, OrderModel>(&format!(
            "UPDATE orders SET status = $1, updated_at = NOW() \
             WHERE id = $2 AND status = $3 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(OrderStatus::Cancelled)
        .bind(id)
        .bind(OrderStatus::Pending)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "Order update failed"))?;

        match updated {
            Some(order) => Ok(OrderTransition::Applied(order)),
            None => self.after_miss(id).await,
        }
    }

    #[instrument(skip(self))]
    async fn has_completed_purchase(
        &self,
        client_id: Uuid,
        package_id: Uuid,
    ) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM order_lines l JOIN orders o ON o.id = l.order_id \
             WHERE o.client_id = $1 AND o.status = $2 AND l.package_id = $3)",
        )
        .bind(client_id)
        .bind(OrderStatus::Completed)
        .bind(package_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, "Purchase lookup failed"))
    }
}
