//! HTTP client for the backend's REST table surface (`rest/v1/{table}`).
//!
//! Requests carry the anon key in `apikey` and, as bearer token, the signed-in
//! user's access token when there is one (the anon key otherwise), so that
//! row-level security sees the right identity.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use voltline_core::{CartItemId, OrderId, ProductId, UserId};

use super::query::{Direction, TableQuery};
use super::{ApiError, BackendError, RemoteStore, Table};
use crate::auth::SessionSlot;
use crate::config::{BackendConfig, anon_key};
use crate::models::{
    AnalyticsEvent, CartItem, CartItemPatch, DateRange, NewAnalyticsEvent, NewCartItem, NewOrder,
    NewOrderItem, NewProduct, NewUserRole, Order, OrderItem, OrderStatusUpdate, Product, Profile,
    RoleUpdate, StockUpdate, UserRole,
};

/// Cart rows embed the full product row.
const CART_SELECT: &str = "*,product:products(*)";

/// Orders embed their lines, each with a product summary.
const ORDER_SELECT: &str = "*,order_items(*,product:products(id,name,image,brand))";

/// Server-side function returning a user's orders with embedded lines.
const USER_ORDERS_RPC: &str = "get_user_orders";

const RETURN_REPRESENTATION: &str = "return=representation";
const UPSERT_REPRESENTATION: &str = "resolution=merge-duplicates,return=representation";

/// [`RemoteStore`] over HTTP.
#[derive(Clone)]
pub struct RestStore {
    inner: Arc<RestStoreInner>,
}

struct RestStoreInner {
    client: reqwest::Client,
    config: BackendConfig,
    session: SessionSlot,
}

impl RestStore {
    /// Create a client that authenticates with whatever session is in `session`.
    ///
    /// # Errors
    ///
    /// Returns error if the anon key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &BackendConfig, session: SessionSlot) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(anon_key(config))
                .map_err(|e| BackendError::Transport(format!("Invalid anon key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(RestStoreInner {
                client,
                config: config.clone(),
                session,
            }),
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let token = self
            .inner
            .session
            .access_token()
            .unwrap_or_else(|| anon_key(&self.inner.config).to_string());
        self.inner.client.request(method, url).bearer_auth(token)
    }

    fn url(&self, query: &TableQuery) -> Result<Url, BackendError> {
        query
            .url(&self.inner.config)
            .map_err(|e| BackendError::Transport(format!("invalid request URL: {e}")))
    }

    /// Send a request and return the response body of a success status.
    async fn send(&self, table: Table, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let mut error = serde_json::from_str::<ApiError>(&text)
                .unwrap_or_else(|_| ApiError::new(0, text.chars().take(200).collect::<String>()));
            error.status = status.as_u16();
            tracing::error!(
                table = %table,
                status = %status,
                code = ?error.code,
                body = %text.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(BackendError::api(table, error));
        }

        Ok(text)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        table: Table,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let text = self.send(table, request).await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                table = %table,
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Decode {
                table: table.as_str(),
                message: e.to_string(),
            }
        })
    }

    async fn select<T: DeserializeOwned>(&self, query: TableQuery) -> Result<Vec<T>, BackendError> {
        let url = self.url(&query)?;
        debug!(table = %query.table(), "select");
        self.send_json(query.table(), self.request(Method::GET, url))
            .await
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        query: TableQuery,
    ) -> Result<Option<T>, BackendError> {
        Ok(self.select(query.limit(1)).await?.into_iter().next())
    }

    async fn insert<B, T>(&self, table: Table, select: &str, body: &B) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(&TableQuery::new(table).select(select))?;
        let request = self
            .request(Method::POST, url)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(body);
        self.send_json(table, request).await
    }

    async fn insert_one<B, T>(&self, table: Table, select: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.insert(table, select, body)
            .await?
            .into_iter()
            .next()
            .ok_or(BackendError::MissingRow(table.as_str()))
    }

    async fn update_one<B, T>(&self, query: TableQuery, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let table = query.table();
        let url = self.url(&query)?;
        let request = self
            .request(Method::PATCH, url)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(body);
        let rows: Vec<T> = self.send_json(table, request).await?;
        rows.into_iter()
            .next()
            .ok_or(BackendError::MissingRow(table.as_str()))
    }

    async fn delete(&self, query: TableQuery) -> Result<(), BackendError> {
        let url = self.url(&query)?;
        self.send(query.table(), self.request(Method::DELETE, url))
            .await
            .map(drop)
    }

    async fn rpc<B, T>(&self, name: &str, table: Table, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self
            .inner
            .config
            .endpoint(&format!("rest/v1/rpc/{name}"))
            .map_err(|e| BackendError::Transport(format!("invalid request URL: {e}")))?;
        self.send_json(table, self.request(Method::POST, url).json(body))
            .await
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        self.select(
            TableQuery::new(Table::Products)
                .select("*")
                .order("created_at", Direction::Desc),
        )
        .await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, BackendError> {
        self.select_one(TableQuery::new(Table::Products).select("*").eq("id", id))
            .await
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product, BackendError> {
        self.insert_one(Table::Products, "*", product).await
    }

    async fn update_product_stock(
        &self,
        id: ProductId,
        update: &StockUpdate,
    ) -> Result<Product, BackendError> {
        self.update_one(
            TableQuery::new(Table::Products).select("*").eq("id", id),
            update,
        )
        .await
    }

    async fn list_cart_items(&self, user: UserId) -> Result<Vec<CartItem>, BackendError> {
        self.select(
            TableQuery::new(Table::CartItems)
                .select(CART_SELECT)
                .eq("user_id", user)
                .order("created_at", Direction::Asc),
        )
        .await
    }

    async fn find_cart_item(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<Option<CartItem>, BackendError> {
        self.select_one(
            TableQuery::new(Table::CartItems)
                .select("*")
                .eq("user_id", user)
                .eq("product_id", product),
        )
        .await
    }

    async fn insert_cart_item(&self, item: &NewCartItem) -> Result<CartItem, BackendError> {
        self.insert_one(Table::CartItems, CART_SELECT, item).await
    }

    async fn update_cart_item(
        &self,
        id: CartItemId,
        patch: &CartItemPatch,
    ) -> Result<CartItem, BackendError> {
        self.update_one(
            TableQuery::new(Table::CartItems)
                .select(CART_SELECT)
                .eq("id", id),
            patch,
        )
        .await
    }

    async fn delete_cart_items(&self, ids: &[CartItemId]) -> Result<(), BackendError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.delete(TableQuery::new(Table::CartItems).in_list("id", ids))
            .await
    }

    async fn delete_cart_items_for_user(&self, user: UserId) -> Result<(), BackendError> {
        self.delete(TableQuery::new(Table::CartItems).eq("user_id", user))
            .await
    }

    #[instrument(skip(self), fields(user_id = ?user))]
    async fn list_orders(&self, user: Option<UserId>) -> Result<Vec<Order>, BackendError> {
        let query = TableQuery::new(Table::Orders)
            .select(ORDER_SELECT)
            .order("created_at", Direction::Desc);

        let Some(user) = user else {
            return self.select(query).await;
        };

        let body = serde_json::json!({ "p_user_id": user });
        match self
            .rpc::<_, Vec<Order>>(USER_ORDERS_RPC, Table::Orders, &body)
            .await
        {
            Ok(orders) => Ok(orders),
            Err(err) => {
                warn!(error = %err, "get_user_orders failed, falling back to select");
                self.select(query.eq("user_id", user)).await
            }
        }
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, BackendError> {
        self.select_one(
            TableQuery::new(Table::Orders)
                .select(ORDER_SELECT)
                .eq("id", id),
        )
        .await
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<Order, BackendError> {
        self.insert_one(Table::Orders, "*", order).await
    }

    async fn insert_order_items(
        &self,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, BackendError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        self.insert(Table::OrderItems, "*", items).await
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        update: &OrderStatusUpdate,
    ) -> Result<Order, BackendError> {
        self.update_one(
            TableQuery::new(Table::Orders)
                .select(ORDER_SELECT)
                .eq("id", id),
            update,
        )
        .await
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError> {
        self.select(
            TableQuery::new(Table::Profiles)
                .select("*")
                .order("created_at", Direction::Desc),
        )
        .await
    }

    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, BackendError> {
        self.select_one(TableQuery::new(Table::Profiles).select("*").eq("id", user))
            .await
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile, BackendError> {
        let mut url = self.url(&TableQuery::new(Table::Profiles).select("*"))?;
        url.query_pairs_mut().append_pair("on_conflict", "id");
        let request = self
            .request(Method::POST, url)
            .header("Prefer", UPSERT_REPRESENTATION)
            .json(profile);
        let rows: Vec<Profile> = self.send_json(Table::Profiles, request).await?;
        rows.into_iter()
            .next()
            .ok_or(BackendError::MissingRow(Table::Profiles.as_str()))
    }

    async fn get_user_role(&self, user: UserId) -> Result<Option<UserRole>, BackendError> {
        self.select_one(
            TableQuery::new(Table::UserRoles)
                .select("*")
                .eq("user_id", user),
        )
        .await
    }

    async fn list_user_roles(&self) -> Result<Vec<UserRole>, BackendError> {
        self.select(TableQuery::new(Table::UserRoles).select("*"))
            .await
    }

    async fn insert_user_role(&self, role: &NewUserRole) -> Result<UserRole, BackendError> {
        self.insert_one(Table::UserRoles, "*", role).await
    }

    async fn update_user_role(
        &self,
        user: UserId,
        update: &RoleUpdate,
    ) -> Result<UserRole, BackendError> {
        self.update_one(
            TableQuery::new(Table::UserRoles)
                .select("*")
                .eq("user_id", user),
            update,
        )
        .await
    }

    async fn insert_analytics_event(
        &self,
        event: &NewAnalyticsEvent,
    ) -> Result<AnalyticsEvent, BackendError> {
        self.insert_one(Table::Analytics, "*", event).await
    }

    async fn list_analytics_events(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<AnalyticsEvent>, BackendError> {
        let mut query = TableQuery::new(Table::Analytics)
            .select("*")
            .order("created_at", Direction::Desc);
        if let Some(range) = range {
            query = query
                .gte("created_at", range.from.to_rfc3339())
                .lte("created_at", range.to.to_rfc3339());
        }
        self.select(query).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use voltline_core::{Price, UserId};

    use super::*;
    use crate::auth::{AuthUser, Session, UserMetadata};

    const USER_ID: &str = "0b6a3c52-8a8e-4f5e-9a43-5a4c1e2f9d10";

    fn store(server: &MockServer, session: SessionSlot) -> RestStore {
        let config = BackendConfig {
            url: Url::parse(&server.uri()).unwrap(),
            anon_key: SecretString::from("anon-key-123"),
            request_timeout: Duration::from_secs(5),
        };
        RestStore::new(&config, session).unwrap()
    }

    fn signed_in() -> SessionSlot {
        let slot = SessionSlot::new();
        slot.set(Session {
            user: AuthUser {
                id: USER_ID.parse().unwrap(),
                email: None,
                metadata: UserMetadata::default(),
            },
            access_token: SecretString::from("user-jwt"),
            refresh_token: None,
            expires_at: None,
        });
        slot
    }

    fn product_json(id: i64, price: &str) -> serde_json::Value {
        json!({
            "id": id, "name": format!("P{id}"), "brand": "ABB", "category": "bt",
            "price": price, "in_stock": true, "stock_quantity": 20
        })
    }

    fn order_json() -> serde_json::Value {
        json!({
            "id": "a3d1b7f0-2c3e-4f8a-9b6d-1e2f3a4b5c6d",
            "user_id": USER_ID,
            "status": "pending",
            "payment_status": "pending",
            "total_amount": "110.00",
            "shipping_address": {
                "name": "n", "street": "s", "city": "c", "postal_code": "p", "country": "France"
            },
            "created_at": "2025-05-02T08:30:00Z",
            "updated_at": "2025-05-02T08:30:00Z",
            "order_items": []
        })
    }

    #[tokio::test]
    async fn test_list_cart_items_uses_user_token_and_join() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/cart_items"))
            .and(query_param("select", CART_SELECT))
            .and(query_param("user_id", format!("eq.{USER_ID}")))
            .and(query_param("order", "created_at.asc"))
            .and(header("apikey", "anon-key-123"))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "6f1c0b9e-3f59-4a57-8d1f-0c7a6c2b1d11",
                "user_id": USER_ID,
                "product_id": 7,
                "quantity": 2,
                "product": product_json(7, "50.00")
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let store = store(&server, signed_in());
        let items = store
            .list_cart_items(USER_ID.parse().unwrap())
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].snapshot_price(), Some(Price::from_cents(5000)));
    }

    #[tokio::test]
    async fn test_guest_requests_use_anon_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("order", "created_at.desc"))
            .and(header("authorization", "Bearer anon-key-123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([product_json(2, "10.00"), product_json(1, "5.00")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let products = store(&server, SessionSlot::new())
            .list_products()
            .await
            .unwrap();
        assert_eq!(products[0].id, ProductId::new(2));
    }

    #[tokio::test]
    async fn test_get_product_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("id", "eq.404"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let product = store(&server, SessionSlot::new())
            .get_product(ProductId::new(404))
            .await
            .unwrap();
        assert!(product.is_none());
    }

    #[tokio::test]
    async fn test_insert_cart_item_asks_for_representation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/cart_items"))
            .and(header("prefer", RETURN_REPRESENTATION))
            .and(body_json(json!({"user_id": USER_ID, "product_id": 9, "quantity": 1})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": "6f1c0b9e-3f59-4a57-8d1f-0c7a6c2b1d12",
                "user_id": USER_ID,
                "product_id": 9,
                "quantity": 1,
                "product": product_json(9, "10.00")
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let item = store(&server, signed_in())
            .insert_cart_item(&NewCartItem {
                user_id: USER_ID.parse().unwrap(),
                product_id: ProductId::new(9),
                quantity: 1,
            })
            .await
            .unwrap();
        assert_eq!(item.quantity, 1);
    }

    #[tokio::test]
    async fn test_structured_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/user_roles"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint \"user_roles_user_id_key\"",
                "details": "Key (user_id) already exists.",
                "hint": null
            })))
            .mount(&server)
            .await;

        let err = store(&server, signed_in())
            .insert_user_role(&NewUserRole {
                user_id: UserId::random(),
                role: voltline_core::AppRole::Admin,
            })
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(err.status(), Some(409));
        match err {
            BackendError::Api { table, error } => {
                assert_eq!(table, "user_roles");
                assert_eq!(error.details.as_deref(), Some("Key (user_id) already exists."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_cart_items_by_id_list() {
        let server = MockServer::start().await;
        let a: CartItemId = "6f1c0b9e-3f59-4a57-8d1f-0c7a6c2b1d11".parse().unwrap();
        let b: CartItemId = "6f1c0b9e-3f59-4a57-8d1f-0c7a6c2b1d12".parse().unwrap();
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/cart_items"))
            .and(query_param("id", format!("in.({a},{b})")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let store = store(&server, signed_in());
        store.delete_cart_items(&[a, b]).await.unwrap();
        // An empty id list never reaches the backend.
        store.delete_cart_items(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_user_orders_via_rpc() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_user_orders"))
            .and(body_json(json!({"p_user_id": USER_ID})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([order_json()])))
            .expect(1)
            .mount(&server)
            .await;

        let orders = store(&server, signed_in())
            .list_orders(Some(USER_ID.parse().unwrap()))
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].total_amount, Price::from_cents(11000));
    }

    #[tokio::test]
    async fn test_user_orders_fall_back_to_select() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_user_orders"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "code": "PGRST202",
                "message": "Could not find the function public.get_user_orders"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/orders"))
            .and(query_param("select", ORDER_SELECT))
            .and(query_param("user_id", format!("eq.{USER_ID}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([order_json()])))
            .expect(1)
            .mount(&server)
            .await;

        let orders = store(&server, signed_in())
            .list_orders(Some(USER_ID.parse().unwrap()))
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = store(&server, SessionSlot::new())
            .list_products()
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Decode { table: "products", .. }));
    }
}
