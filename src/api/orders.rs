use crate::{
    api::{IdList, materials::validate_description},
    auth::auth::AuthUser,
    model::{order::OrderStatus, user::display_name},
    utils::db_utils::{
        Filters, Page, SqlValue, bind_as, bind_query, bind_scalar, db_error, is_unique_violation,
        like_pattern, placeholders,
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, MySql, MySqlPool, Transaction};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};

pub const SITE_DESCRIPTION_MAX: usize = 200;
const MINE_SUMMARY_NAMES: usize = 2;
const ADMIN_SUMMARY_NAMES: usize = 3;

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderItemReq {
    /// Material description; unknown names become new materials
    #[schema(example = "Cement 25kg")]
    pub material: String,
    #[schema(example = 4.0)]
    pub quantity: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrder {
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub order_date: NaiveDate,
    #[schema(example = "Riverside block B")]
    pub site_description: Option<String>,
    pub items: Vec<OrderItemReq>,
}

/// Validates items and sums quantities of repeated materials.
/// Names compare case-insensitively; the first spelling wins.
pub fn merge_items(items: &[OrderItemReq]) -> Result<Vec<(String, f64)>, String> {
    if items.is_empty() {
        return Err("An order needs at least one item".to_string());
    }

    let mut merged: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let name = validate_description(&item.material).map_err(|e| format!("Material: {e}"))?;
        if !item.quantity.is_finite() || item.quantity <= 0.0 {
            return Err("Every item quantity must be greater than zero".to_string());
        }
        match index.get(&name.to_lowercase()) {
            Some(&i) => merged[i].1 += item.quantity,
            None => {
                index.insert(name.to_lowercase(), merged.len());
                merged.push((name, item.quantity));
            }
        }
    }
    Ok(merged)
}

/// `"a, b..."` style summary of the first `limit` material names.
pub fn summarize(names: &[String], limit: usize) -> String {
    if names.is_empty() {
        return "No materials".to_string();
    }
    let mut summary = names
        .iter()
        .take(limit)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if names.len() > limit {
        summary.push_str("...");
    }
    summary
}

#[derive(Serialize, ToSchema)]
pub struct OrderSummary {
    #[schema(example = 12)]
    pub id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub order_date: NaiveDate,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = "Riverside block B", nullable = true)]
    pub site_description: Option<String>,
    #[schema(example = 3)]
    pub item_count: i32,
    #[schema(example = "Cement 25kg, Sand...")]
    pub summary: String,
    #[schema(example = 14.5)]
    pub total_quantity: f64,
    #[schema(example = "Ana Silva", nullable = true)]
    pub user_name: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct OrderListResponse {
    pub data: Vec<OrderSummary>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(FromRow)]
struct OrderRow {
    id: u64,
    order_date: NaiveDate,
    status: String,
    site_description: Option<String>,
    item_count: i32,
    username: String,
    full_name: Option<String>,
}

#[derive(FromRow)]
struct LineRow {
    order_id: u64,
    description: String,
    quantity: f64,
}

#[derive(Deserialize, IntoParams)]
pub struct MyOrdersFilter {
    #[param(value_type = Option<String>, example = "2026-03-02")]
    pub date: Option<NaiveDate>,
    #[param(example = "pending")]
    pub status: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct AdminOrdersFilter {
    /// Matches user name, username or site description
    pub search: Option<String>,
    #[param(value_type = Option<String>, example = "2026-03-02")]
    pub date: Option<NaiveDate>,
    #[param(example = "pending")]
    pub status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct StatusReq {
    #[schema(example = "shipped")]
    pub status: String,
}

fn parse_status_filter(raw: Option<&str>) -> Result<Option<OrderStatus>, HttpResponse> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => OrderStatus::parse(s).map(Some).ok_or_else(invalid_status),
    }
}

fn invalid_status() -> HttpResponse {
    HttpResponse::BadRequest().json(json!({
        "message": "Status must be one of pending, processing, ready_to_ship, shipped, delivered, cancelled"
    }))
}

async fn material_id_for(
    name: &str,
    tx: &mut Transaction<'_, MySql>,
) -> Result<u64, sqlx::Error> {
    let existing = sqlx::query_scalar::<_, u64>("SELECT id FROM materials WHERE description = ?")
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?;
    if let Some(id) = existing {
        return Ok(id);
    }

    match sqlx::query("INSERT INTO materials (description) VALUES (?)")
        .bind(name)
        .execute(&mut **tx)
        .await
    {
        Ok(done) => {
            tracing::info!(material = name, "Material created from order");
            Ok(done.last_insert_id())
        }
        // Created by a concurrent order in the meantime.
        Err(e) if is_unique_violation(&e) => {
            sqlx::query_scalar::<_, u64>("SELECT id FROM materials WHERE description = ?")
                .bind(name)
                .fetch_one(&mut **tx)
                .await
        }
        Err(e) => Err(e),
    }
}

/// Place a material order
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrder,
    responses(
        (status = 201, description = "Order placed", body = Object, example = json!({
            "message": "Order placed", "id": 12, "item_count": 2
        })),
        (status = 400, description = "Invalid order", body = Object, example = json!({
            "message": "Every item quantity must be greater than zero"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateOrder>,
) -> actix_web::Result<impl Responder> {
    auth.require_collaborator()?;

    let items = match merge_items(&payload.items) {
        Ok(items) => items,
        Err(message) => return Ok(HttpResponse::BadRequest().json(json!({ "message": message }))),
    };

    let site = payload
        .site_description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if site.is_some_and(|s| s.chars().count() > SITE_DESCRIPTION_MAX) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Site description must be at most 200 characters"
        })));
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(db_error("Failed to start order transaction"))?;

    let order = sqlx::query(
        r#"
        INSERT INTO orders (user_id, order_date, item_count, status, site_description)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(payload.order_date)
    .bind(items.len() as i32)
    .bind(OrderStatus::Pending.as_ref())
    .bind(site)
    .execute(&mut *tx)
    .await
    .map_err(db_error("Failed to create order"))?;
    let order_id = order.last_insert_id();

    for (name, quantity) in &items {
        let material_id = material_id_for(name, &mut tx)
            .await
            .map_err(db_error("Failed to resolve material"))?;

        sqlx::query("INSERT INTO order_lines (material_id, order_id, quantity) VALUES (?, ?, ?)")
            .bind(material_id)
            .bind(order_id)
            .bind(*quantity)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to create order line"))?;
    }

    tx.commit()
        .await
        .map_err(db_error("Failed to commit order"))?;

    tracing::info!(user_id = auth.user_id, order_id, items = items.len(), "Order placed");
    Ok(HttpResponse::Created().json(json!({
        "message": "Order placed",
        "id": order_id,
        "item_count": items.len()
    })))
}

/// Loads the lines of `orders` and builds their summaries.
async fn summarize_orders(
    orders: Vec<OrderRow>,
    names_in_summary: usize,
    with_user: bool,
    pool: &MySqlPool,
) -> Result<Vec<OrderSummary>, sqlx::Error> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<SqlValue> = orders.iter().map(|o| SqlValue::U64(o.id)).collect();
    let sql = format!(
        r#"
        SELECT ol.order_id, m.description, ol.quantity
        FROM order_lines ol
        JOIN materials m ON m.id = ol.material_id
        WHERE ol.order_id IN ({})
        ORDER BY ol.order_id, ol.material_id
        "#,
        placeholders(ids.len())
    );
    let lines = bind_as(sqlx::query_as::<_, LineRow>(&sql), &ids)
        .fetch_all(pool)
        .await?;

    let mut by_order: HashMap<u64, (Vec<String>, f64)> = HashMap::new();
    for line in lines {
        let entry = by_order.entry(line.order_id).or_default();
        entry.0.push(line.description);
        entry.1 += line.quantity;
    }

    Ok(orders
        .into_iter()
        .map(|o| {
            let (names, total) = by_order.remove(&o.id).unwrap_or_default();
            OrderSummary {
                id: o.id,
                order_date: o.order_date,
                status: o.status,
                site_description: o.site_description,
                item_count: o.item_count,
                summary: summarize(&names, names_in_summary),
                total_quantity: total,
                user_name: with_user
                    .then(|| display_name(o.full_name.as_deref(), &o.username).to_string()),
            }
        })
        .collect())
}

const ORDER_ROW_SELECT: &str = r#"
    SELECT o.id, o.order_date, o.status, o.site_description, o.item_count, u.username, u.full_name
    FROM orders o
    JOIN users u ON u.id = o.user_id
"#;

/// Caller's orders, newest first
#[utoipa::path(
    get,
    path = "/api/orders/mine",
    params(MyOrdersFilter),
    responses(
        (status = 200, description = "Orders", body = [OrderSummary]),
        (status = 400, description = "Unknown status"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn my_orders(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MyOrdersFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_collaborator()?;

    let status = match parse_status_filter(query.status.as_deref()) {
        Ok(s) => s,
        Err(resp) => return Ok(resp),
    };

    let mut filters = Filters::new();
    filters.push("o.user_id = ?", [SqlValue::U64(auth.user_id)]);
    if let Some(date) = query.date {
        filters.push("o.order_date = ?", [SqlValue::Date(date)]);
    }
    if let Some(status) = status {
        filters.push("o.status = ?", [SqlValue::String(status.to_string())]);
    }

    let sql = format!("{ORDER_ROW_SELECT}{} ORDER BY o.order_date DESC, o.id DESC", filters.where_sql());
    let rows = bind_as(sqlx::query_as::<_, OrderRow>(&sql), filters.values())
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch orders"))?;

    let data = summarize_orders(rows, MINE_SUMMARY_NAMES, false, pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch order lines"))?;
    Ok(HttpResponse::Ok().json(data))
}

/// All orders with search, date and status filters
#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(AdminOrdersFilter),
    responses(
        (status = 200, description = "Paginated orders", body = OrderListResponse),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn admin_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AdminOrdersFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let status = match parse_status_filter(query.status.as_deref()) {
        Ok(s) => s,
        Err(resp) => return Ok(resp),
    };
    let page = Page::new(query.page, query.per_page);

    let mut filters = Filters::new();
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        filters.push(
            "(u.full_name LIKE ? OR u.username LIKE ? OR o.site_description LIKE ?)",
            [
                SqlValue::String(pattern.clone()),
                SqlValue::String(pattern.clone()),
                SqlValue::String(pattern),
            ],
        );
    }
    if let Some(date) = query.date {
        filters.push("o.order_date = ?", [SqlValue::Date(date)]);
    }
    if let Some(status) = status {
        filters.push("o.status = ?", [SqlValue::String(status.to_string())]);
    }
    let where_sql = filters.where_sql();

    let count_sql =
        format!("SELECT COUNT(*) FROM orders o JOIN users u ON u.id = o.user_id{where_sql}");
    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), filters.values())
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count orders"))?;

    let data_sql =
        format!("{ORDER_ROW_SELECT}{where_sql} ORDER BY o.order_date DESC, o.id DESC LIMIT ? OFFSET ?");
    let rows = bind_as(sqlx::query_as::<_, OrderRow>(&data_sql), filters.values())
        .bind(page.per_page)
        .bind(page.offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch orders"))?;

    let data = summarize_orders(rows, ADMIN_SUMMARY_NAMES, true, pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch order lines"))?;

    Ok(HttpResponse::Ok().json(OrderListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

/// Delete several orders and their lines
#[utoipa::path(
    post,
    path = "/api/admin/orders/delete",
    request_body = IdList,
    responses(
        (status = 200, description = "Deleted", body = Object, example = json!({ "deleted": 2 })),
        (status = 400, description = "No ids given"),
        (status = 404, description = "None of the ids exist"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn admin_delete_many(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<IdList>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let ids = payload.unique();
    if ids.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": "No orders selected" })));
    }
    let values: Vec<SqlValue> = ids.iter().map(|id| SqlValue::U64(*id)).collect();
    let in_list = placeholders(values.len());

    let mut tx = pool
        .begin()
        .await
        .map_err(db_error("Failed to start delete transaction"))?;

    let lines_sql = format!("DELETE FROM order_lines WHERE order_id IN ({in_list})");
    bind_query(sqlx::query(&lines_sql), &values)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to delete order lines"))?;

    let orders_sql = format!("DELETE FROM orders WHERE id IN ({in_list})");
    let deleted = bind_query(sqlx::query(&orders_sql), &values)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to delete orders"))?
        .rows_affected();

    if deleted == 0 {
        // Dropping the transaction rolls it back.
        return Ok(HttpResponse::NotFound().json(json!({ "message": "No orders found" })));
    }

    tx.commit()
        .await
        .map_err(db_error("Failed to commit order deletion"))?;

    tracing::info!(admin_id = auth.user_id, deleted, "Orders deleted");
    Ok(HttpResponse::Ok().json(json!({ "deleted": deleted })))
}

/// Change the status of an order
#[utoipa::path(
    put,
    path = "/api/admin/orders/{id}/status",
    params(("id" = u64, Path, description = "Order id")),
    request_body = StatusReq,
    responses(
        (status = 200, description = "Status changed", body = Object, example = json!({
            "message": "Order 12 is now shipped"
        })),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Not found"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn admin_set_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<StatusReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let id = path.into_inner();
    let Some(status) = OrderStatus::parse(&payload.status) else {
        return Ok(invalid_status());
    };

    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE id = ?")
        .bind(id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to look up order"))?;
    if exists == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": format!("Order {id} not found") })));
    }

    sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
        .bind(status.as_ref())
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Failed to change order status"))?;

    tracing::info!(admin_id = auth.user_id, order_id = id, %status, "Order status changed");
    Ok(HttpResponse::Ok().json(json!({ "message": format!("Order {id} is now {status}") })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(material: &str, quantity: f64) -> OrderItemReq {
        OrderItemReq { material: material.into(), quantity }
    }

    #[test]
    fn repeated_materials_are_merged() {
        let merged = merge_items(&[
            item("Sand", 2.0),
            item("Cement", 1.0),
            item(" sand ", 3.5),
        ])
        .unwrap();
        assert_eq!(merged, vec![("Sand".to_string(), 5.5), ("Cement".to_string(), 1.0)]);
    }

    #[test]
    fn invalid_items_are_refused() {
        assert!(merge_items(&[]).is_err());
        assert!(merge_items(&[item("Sand", 0.0)]).is_err());
        assert!(merge_items(&[item("Sand", -1.0)]).is_err());
        assert!(merge_items(&[item("Sand", f64::NAN)]).is_err());
        assert!(merge_items(&[item("  ", 1.0)]).unwrap_err().starts_with("Material"));
    }

    #[test]
    fn summaries_truncate_with_ellipsis() {
        let names: Vec<String> = ["Sand", "Cement", "Bricks"].iter().map(|s| s.to_string()).collect();
        assert_eq!(summarize(&names, 2), "Sand, Cement...");
        assert_eq!(summarize(&names, 3), "Sand, Cement, Bricks");
        assert_eq!(summarize(&names[..1], 2), "Sand");
        assert_eq!(summarize(&[], 3), "No materials");
    }

    #[test]
    fn status_filter_parsing() {
        assert_eq!(parse_status_filter(None).ok(), Some(None));
        assert_eq!(parse_status_filter(Some("  ")).ok(), Some(None));
        assert_eq!(
            parse_status_filter(Some("delivered")).ok(),
            Some(Some(OrderStatus::Delivered))
        );
        assert!(parse_status_filter(Some("lost")).is_err());
    }
}
