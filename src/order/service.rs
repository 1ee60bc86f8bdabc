use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    models::{
        OrderLine, OrderLineView, OrderModel, OrderStatus, OrderView, PaymentStatus,
        DEFAULT_PAYMENT_METHOD,
    },
    repository::{OrderFilter, OrderRepository, OrderTransition},
    types::PlaceOrderRequest,
};
use crate::account::{models::AccountSummary, AccountRepository, Role};
use crate::catalog::{models::PackageSummary, CatalogRepository};
use crate::shared::{parse_id, AppError, AppState, ListParams, Page};

fn not_found() -> AppError {
    AppError::NotFound("Order not found".to_string())
}

/// Service for order placement, listing and the confirm/cancel guards
pub struct OrderService {
    orders: Arc<dyn OrderRepository + Send + Sync>,
    catalog: Arc<dyn CatalogRepository + Send + Sync>,
    accounts: Arc<dyn AccountRepository + Send + Sync>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository + Send + Sync>,
        catalog: Arc<dyn CatalogRepository + Send + Sync>,
        accounts: Arc<dyn AccountRepository + Send + Sync>,
    ) -> Self {
        Self {
            orders,
            catalog,
            accounts,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            Arc::clone(&state.order_repository),
            Arc::clone(&state.catalog_repository),
            Arc::clone(&state.account_repository),
        )
    }

    /// Places a pending order for one package. Quantity falls back to 1.
    #[instrument(skip(self, request), fields(client_id = %client_id))]
    pub async fn place_order(
        &self,
        client_id: Uuid,
        request: PlaceOrderRequest,
    ) -> Result<OrderModel, AppError> {
        let raw_id = request
            .package_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::Validation("packageId is required".to_string()))?;
        let package_id = parse_id(&raw_id, "package")?;
        let quantity = request.quantity.filter(|q| *q > 0).unwrap_or(1);

        let package = self
            .catalog
            .get_package(package_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Package not found".to_string()))?;
        if !package.is_active() {
            return Err(AppError::Validation(
                "This package is currently unavailable".to_string(),
            ));
        }

        let total_amount = package
            .price
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| AppError::Validation("Order total is too large".to_string()))?;
        let payment_method = request
            .payment_method
            .map(|method| method.trim().to_string())
            .filter(|method| !method.is_empty())
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string());

        let order = OrderModel::new(client_id, total_amount, payment_method);
        let line = OrderLine {
            id: Uuid::new_v4(),
            order_id: order.id,
            package_id: package.id,
            price_at_purchase: package.price,
            duration_at_purchase: package.duration_in_days,
            quantity,
        };
        self.orders.create_order(&order, &[line]).await?;

        info!(order_id = %order.id, total_amount, quantity, "Order placed");
        Ok(order)
    }

    /// Orders of one client, newest first by default
    #[instrument(skip(self, params))]
    pub async fn list_client_orders(
        &self,
        client_id: Uuid,
        params: &ListParams,
    ) -> Result<Page<OrderView>, AppError> {
        let filter = OrderFilter {
            client_id: Some(client_id),
            status: params.status_filter::<OrderStatus>()?,
            ..OrderFilter::default()
        };
        let page = self.orders.list_orders(&filter, params).await?;
        self.populate(page).await
    }

    /// All orders; `search` matches the client's fullname or email
    #[instrument(skip(self, params))]
    pub async fn list_orders(
        &self,
        params: &ListParams,
        payment_status: Option<&str>,
    ) -> Result<Page<OrderView>, AppError> {
        let payment_status = payment_status
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                PaymentStatus::from_str(raw).map_err(|_| {
                    AppError::Validation(format!("Invalid payment status filter: {raw}"))
                })
            })
            .transpose()?;

        let client_ids = match params.search() {
            Some(term) => Some(self.accounts.search_ids(Role::Client, term).await?),
            None => None,
        };

        let filter = OrderFilter {
            client_id: None,
            client_ids,
            status: params.status_filter::<OrderStatus>()?,
            payment_status,
        };
        let page = self.orders.list_orders(&filter, params).await?;
        self.populate(page).await
    }

    /// Resolves clients, lines and line packages with one bulk query each
    async fn populate(&self, page: Page<OrderModel>) -> Result<Page<OrderView>, AppError> {
        let order_ids: Vec<Uuid> = page.items.iter().map(|o| o.id).collect();
        let mut client_ids: Vec<Uuid> = page.items.iter().map(|o| o.client_id).collect();
        client_ids.sort_unstable();
        client_ids.dedup();

        let clients: HashMap<Uuid, AccountSummary> = self
            .accounts
            .find_by_ids(&client_ids)
            .await?
            .iter()
            .map(|account| (account.id, AccountSummary::from(account)))
            .collect();

        let lines = self.orders.lines_for(&order_ids).await?;
        let mut package_ids: Vec<Uuid> = lines.iter().map(|l| l.package_id).collect();
        package_ids.sort_unstable();
        package_ids.dedup();
        let packages: HashMap<Uuid, PackageSummary> = self
            .catalog
            .find_packages(&package_ids)
            .await?
            .iter()
            .map(|package| (package.id, PackageSummary::from(package)))
            .collect();

        let mut lines_by_order: HashMap<Uuid, Vec<OrderLineView>> = HashMap::new();
        for line in lines {
            let package_info = packages.get(&line.package_id).cloned();
            lines_by_order
                .entry(line.order_id)
                .or_default()
                .push(OrderLineView { line, package_info });
        }

        Ok(page.map(|order| OrderView {
            client_info: clients.get(&order.client_id).cloned(),
            lines: lines_by_order.remove(&order.id).unwrap_or_default(),
            order,
        }))
    }

    /// Confirms payment: pending -> completed + paid
    #[instrument(skip(self))]
    pub async fn check_order(&self, id: Uuid) -> Result<OrderModel, AppError> {
        match self.orders.confirm_payment(id).await? {
            OrderTransition::Applied(order) => {
                info!(order_id = %id, "Order confirmed");
                Ok(order)
            }
            OrderTransition::Rejected(status) => {
                warn!(order_id = %id, %status, "Refused to confirm order");
                Err(AppError::InvalidTransition(format!(
                    "Order is already {status} and cannot be confirmed"
                )))
            }
            OrderTransition::NotFound => Err(not_found()),
        }
    }

    /// pending -> cancelled
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, id: Uuid) -> Result<OrderModel, AppError> {
        match self.orders.cancel_order(id).await? {
            OrderTransition::Applied(order) => {
                info!(order_id = %id, "Order cancelled");
                Ok(order)
            }
            OrderTransition::Rejected(status) => {
                warn!(order_id = %id, %status, "Refused to cancel order");
                Err(AppError::InvalidTransition(format!(
                    "Order is already {status} and cannot be cancelled"
                )))
            }
            OrderTransition::NotFound => Err(not_found()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{
        models::{AccountModel, AccountProfile, HealthInfo, DEFAULT_AVATAR},
        repository::InMemoryAccountRepository,
    };
    use crate::catalog::{
        models::{CatalogStatus, PackageModel},
        repository::InMemoryCatalogRepository,
    };
    use crate::order::repository::InMemoryOrderRepository;
    use chrono::Utc;

    struct Fixture {
        service: OrderService,
        catalog: Arc<InMemoryCatalogRepository>,
        client: AccountModel,
        package: PackageModel,
    }

    async fn fixture() -> Fixture {
        let accounts = Arc::new(InMemoryAccountRepository::new());
        let catalog = Arc::new(InMemoryCatalogRepository::new());
        let orders = Arc::new(InMemoryOrderRepository::new());

        let client = AccountModel::new(
            "Ann Lee".to_string(),
            "ann@gym.io",
            "hash".to_string(),
            AccountProfile::Client {
                phone: Some("0900".to_string()),
                avatar_url: DEFAULT_AVATAR.to_string(),
                health_info: HealthInfo::default(),
            },
        );
        accounts.create_account(&client).await.unwrap();

        let now = Utc::now();
        let package = PackageModel {
            id: Uuid::new_v4(),
            package_name: "Gold".to_string(),
            description: "All access".to_string(),
            price: 450,
            duration_in_days: 30,
            features: Vec::new(),
            category_id: Uuid::new_v4(),
            status: CatalogStatus::Active,
            display_order: 0,
            created_at: now,
            updated_at: now,
        };
        catalog.create_package(&package).await.unwrap();

        Fixture {
            service: OrderService::new(orders, catalog.clone(), accounts),
            catalog,
            client,
            package,
        }
    }

    fn request(package_id: Uuid, quantity: Option<i32>) -> PlaceOrderRequest {
        PlaceOrderRequest {
            package_id: Some(package_id.to_string()),
            quantity,
            payment_method: None,
        }
    }

    #[tokio::test]
    async fn test_place_order_defaults_quantity_and_snapshots_price() {
        let f = fixture().await;

        let order = f
            .service
            .place_order(f.client.id, request(f.package.id, Some(0)))
            .await
            .unwrap();
        assert_eq!(order.total_amount, 450);
        assert_eq!(order.payment_method, DEFAULT_PAYMENT_METHOD);

        let order = f
            .service
            .place_order(f.client.id, request(f.package.id, Some(3)))
            .await
            .unwrap();
        assert_eq!(order.total_amount, 1350);

        let mine = f
            .service
            .list_client_orders(f.client.id, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(mine.total, 2);
        let view = mine.items.iter().find(|v| v.order.id == order.id).unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].line.price_at_purchase, 450);
        assert_eq!(view.lines[0].line.quantity, 3);
        assert_eq!(
            view.lines[0].package_info.as_ref().map(|p| p.package_name.as_str()),
            Some("Gold")
        );
        assert_eq!(
            view.client_info.as_ref().map(|c| c.fullname.as_str()),
            Some("Ann Lee")
        );
    }

    #[tokio::test]
    async fn test_place_order_rejections() {
        let f = fixture().await;

        let missing = PlaceOrderRequest::default();
        assert!(matches!(
            f.service.place_order(f.client.id, missing).await,
            Err(AppError::Validation(_))
        ));

        assert!(matches!(
            f.service
                .place_order(f.client.id, request(Uuid::new_v4(), None))
                .await,
            Err(AppError::NotFound(_))
        ));

        f.catalog
            .set_package_status(f.package.id, CatalogStatus::Inactive)
            .await
            .unwrap();
        assert!(matches!(
            f.service
                .place_order(f.client.id, request(f.package.id, None))
                .await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_terminal_orders_reject_transitions() {
        let f = fixture().await;
        let order = f
            .service
            .place_order(f.client.id, request(f.package.id, None))
            .await
            .unwrap();

        let cancelled = f.service.cancel_order(order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(matches!(
            f.service.check_order(order.id).await,
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            f.service.cancel_order(order.id).await,
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            f.service.check_order(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_search_by_client_name() {
        let f = fixture().await;
        f.service
            .place_order(f.client.id, request(f.package.id, None))
            .await
            .unwrap();

        let hit = f
            .service
            .list_orders(&ListParams::default().with_search("ann"), None)
            .await
            .unwrap();
        assert_eq!(hit.total, 1);

        let miss = f
            .service
            .list_orders(&ListParams::default().with_search("zed"), None)
            .await
            .unwrap();
        assert_eq!(miss.total, 0);

        let paid = f
            .service
            .list_orders(&ListParams::default(), Some("paid"))
            .await
            .unwrap();
        assert_eq!(paid.total, 0);

        assert!(matches!(
            f.service
                .list_orders(&ListParams::default(), Some("refunded"))
                .await,
            Err(AppError::Validation(_))
        ));
    }
}
