use crate::{
    auth::auth::AuthUser,
    model::order_line::OrderLine,
    utils::db_utils::{db_error, is_foreign_key_violation, is_unique_violation},
};
use actix_web::{HttpResponse, Responder, web};
use serde_json::json;
use sqlx::{MySql, MySqlPool, Transaction};

fn valid_quantity(quantity: f64) -> bool {
    quantity.is_finite() && quantity > 0.0
}

/// Keeps `orders.item_count` equal to the number of lines.
async fn refresh_item_count(
    order_id: u64,
    tx: &mut Transaction<'_, MySql>,
) -> actix_web::Result<()> {
    sqlx::query(
        "UPDATE orders SET item_count = (SELECT COUNT(*) FROM order_lines WHERE order_id = ?) WHERE id = ?",
    )
    .bind(order_id)
    .bind(order_id)
    .execute(&mut **tx)
    .await
    .map_err(db_error("Failed to refresh order item count"))?;
    Ok(())
}

/// An order always keeps at least one line.
fn would_empty_order(lines_in_order: i64) -> bool {
    lines_in_order <= 1
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "message": "Order line not found" }))
}

fn bad_quantity() -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "message": "Quantity must be greater than zero" }))
}

/// List every order line
#[utoipa::path(
    get,
    path = "/api/order-lines",
    responses(
        (status = 200, description = "Order lines", body = [OrderLine]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Order lines"
)]
pub async fn list_lines(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let lines = sqlx::query_as::<_, OrderLine>(
        "SELECT material_id, order_id, quantity FROM order_lines ORDER BY order_id, material_id",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(db_error("Failed to list order lines"))?;
    Ok(HttpResponse::Ok().json(lines))
}

/// Get one order line
#[utoipa::path(
    get,
    path = "/api/order-lines/{material_id}/{order_id}",
    params(
        ("material_id" = u64, Path, description = "Material id"),
        ("order_id" = u64, Path, description = "Order id")
    ),
    responses(
        (status = 200, description = "Order line", body = OrderLine),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Order lines"
)]
pub async fn get_line(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<(u64, u64)>,
) -> actix_web::Result<impl Responder> {
    let (material_id, order_id) = path.into_inner();
    let line = sqlx::query_as::<_, OrderLine>(
        "SELECT material_id, order_id, quantity FROM order_lines WHERE material_id = ? AND order_id = ?",
    )
    .bind(material_id)
    .bind(order_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(db_error("Failed to fetch order line"))?;

    match line {
        Some(l) => Ok(HttpResponse::Ok().json(l)),
        None => Ok(not_found()),
    }
}

/// Add a line to an existing order
#[utoipa::path(
    post,
    path = "/api/order-lines",
    request_body = OrderLine,
    responses(
        (status = 201, description = "Created", body = OrderLine),
        (status = 400, description = "Unknown material or order, or bad quantity"),
        (status = 409, description = "Line already exists"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Order lines"
)]
pub async fn create_line(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<OrderLine>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let line = payload.into_inner();
    if !valid_quantity(line.quantity) {
        return Ok(bad_quantity());
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(db_error("Failed to start order line transaction"))?;

    match sqlx::query("INSERT INTO order_lines (material_id, order_id, quantity) VALUES (?, ?, ?)")
        .bind(line.material_id)
        .bind(line.order_id)
        .bind(line.quantity)
        .execute(&mut *tx)
        .await
    {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Ok(HttpResponse::Conflict().json(json!({
                "message": "This order already has a line for that material"
            })));
        }
        Err(e) if is_foreign_key_violation(&e) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Material or order does not exist"
            })));
        }
        Err(e) => return Err(db_error("Failed to create order line")(e)),
    }

    refresh_item_count(line.order_id, &mut tx).await?;
    tx.commit()
        .await
        .map_err(db_error("Failed to commit order line"))?;

    Ok(HttpResponse::Created().json(line))
}

/// Change the quantity of a line
#[utoipa::path(
    put,
    path = "/api/order-lines/{material_id}/{order_id}",
    params(
        ("material_id" = u64, Path, description = "Material id"),
        ("order_id" = u64, Path, description = "Order id")
    ),
    request_body = OrderLine,
    responses(
        (status = 204, description = "Updated"),
        (status = 400, description = "Ids do not match the path, or bad quantity"),
        (status = 404, description = "Not found"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Order lines"
)]
pub async fn update_line(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<(u64, u64)>,
    payload: web::Json<OrderLine>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let (material_id, order_id) = path.into_inner();
    if payload.material_id != material_id || payload.order_id != order_id {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Ids in the URL do not match the ids in the body"
        })));
    }
    if !valid_quantity(payload.quantity) {
        return Ok(bad_quantity());
    }

    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM order_lines WHERE material_id = ? AND order_id = ?",
    )
    .bind(material_id)
    .bind(order_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(db_error("Failed to look up order line"))?;
    if exists == 0 {
        return Ok(not_found());
    }

    sqlx::query("UPDATE order_lines SET quantity = ? WHERE material_id = ? AND order_id = ?")
        .bind(payload.quantity)
        .bind(material_id)
        .bind(order_id)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Failed to update order line"))?;

    Ok(HttpResponse::NoContent().finish())
}

/// Remove a line
#[utoipa::path(
    delete,
    path = "/api/order-lines/{material_id}/{order_id}",
    params(
        ("material_id" = u64, Path, description = "Material id"),
        ("order_id" = u64, Path, description = "Order id")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Last line of its order"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Order lines"
)]
pub async fn delete_line(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<(u64, u64)>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let (material_id, order_id) = path.into_inner();

    let mut tx = pool
        .begin()
        .await
        .map_err(db_error("Failed to start order line transaction"))?;

    // Serialises line removals of the same order.
    let order = sqlx::query_scalar::<_, u64>("SELECT id FROM orders WHERE id = ? FOR UPDATE")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to lock order"))?;
    if order.is_none() {
        return Ok(not_found());
    }

    let lines = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM order_lines WHERE order_id = ?")
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to count order lines"))?;

    let result = sqlx::query("DELETE FROM order_lines WHERE material_id = ? AND order_id = ?")
        .bind(material_id)
        .bind(order_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to delete order line"))?;

    if result.rows_affected() == 0 {
        return Ok(not_found());
    }
    if would_empty_order(lines) {
        // Dropping the transaction rolls the delete back.
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "An order needs at least one line, delete the order instead"
        })));
    }

    refresh_item_count(order_id, &mut tx).await?;
    tx.commit()
        .await
        .map_err(db_error("Failed to commit order line deletion"))?;

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_must_be_positive_and_finite() {
        assert!(valid_quantity(0.5));
        assert!(valid_quantity(12.0));
        assert!(!valid_quantity(0.0));
        assert!(!valid_quantity(-3.0));
        assert!(!valid_quantity(f64::NAN));
        assert!(!valid_quantity(f64::INFINITY));
    }

    #[test]
    fn last_line_cannot_be_removed() {
        assert!(would_empty_order(1));
        assert!(would_empty_order(0));
        assert!(!would_empty_order(2));
    }

    #[test]
    fn line_body_shape() {
        let line: OrderLine =
            serde_json::from_value(json!({ "material_id": 3, "order_id": 9, "quantity": 2.5 }))
                .unwrap();
        assert_eq!((line.material_id, line.order_id), (3, 9));
        assert_eq!(line.quantity, 2.5);
    }
}
