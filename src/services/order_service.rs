use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, UpdateOrderStatusRequest},
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem},
    order_status::OrderStatus,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Places an order for `user`.
///
/// Everything runs in one transaction. Stock is re-checked by the
/// decrement itself (`stock_quantity >= quantity` in the `WHERE` clause),
/// so two concurrent orders can never both take the last units: the loser
/// matches zero rows and its whole transaction is rolled back.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    payload.validate()?;
    let CreateOrderRequest {
        shipping_address,
        order_items: lines,
    } = payload;

    let mut product_ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();

    let txn = state.orm.begin().await?;

    let products: HashMap<Uuid, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids.clone()))
        .filter(ProdCol::IsActive.eq(true))
        .all(&txn)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    if products.len() != product_ids.len() {
        tracing::warn!(user_id = %user.user_id, "order rejected: unavailable product");
        return Err(AppError::BadRequest(
            "Some products are not available".into(),
        ));
    }

    for line in &lines {
        let product = lookup(&products, line.product_id)?;
        if product.stock_quantity < line.quantity {
            tracing::warn!(
                user_id = %user.user_id,
                product_id = %product.id,
                requested = line.quantity,
                available = product.stock_quantity,
                "order rejected: insufficient stock"
            );
            return Err(insufficient_stock(product));
        }
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        total_amount: Set(0),
        status: Set(OrderStatus::Pending),
        shipping_address: Set(shipping_address.trim().to_string()),
        created_at: Set(Utc::now().into()),
        shipped_at: Set(None),
        delivered_at: Set(None),
    }
    .insert(&txn)
    .await?;

    let mut total_amount: i64 = 0;
    let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());

    for line in &lines {
        let product = lookup(&products, line.product_id)?;

        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            quantity: Set(line.quantity),
            unit_price: Set(product.price),
        }
        .insert(&txn)
        .await?;

        total_amount = product
            .price
            .checked_mul(i64::from(line.quantity))
            .and_then(|line_total| total_amount.checked_add(line_total))
            .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))?;

        // reduce stock, only if enough is still there
        let decremented = Products::update_many()
            .col_expr(
                ProdCol::StockQuantity,
                Expr::col(ProdCol::StockQuantity).sub(line.quantity),
            )
            .filter(ProdCol::Id.eq(product.id))
            .filter(ProdCol::IsActive.eq(true))
            .filter(ProdCol::StockQuantity.gte(line.quantity))
            .exec(&txn)
            .await?;

        if decremented.rows_affected == 0 {
            tracing::warn!(
                user_id = %user.user_id,
                product_id = %product.id,
                "order rejected: stock taken concurrently"
            );
            return Err(insufficient_stock(product));
        }

        items.push(OrderItem::from_entity(&item, product.name.clone()));
    }

    let mut active: OrderActive = order.into();
    active.total_amount = Set(total_amount);
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        total_amount,
        lines = items.len(),
        "order placed"
    );

    Ok(ApiResponse::success(
        "Order created",
        Order::from_entity(order, items),
        Some(Meta::empty()),
    ))
}

/// Orders of `user`, newest first.
pub async fn list_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut items_by_order = load_order_items(&state.orm, order_ids).await?;

    let items: Vec<Order> = orders
        .into_iter()
        .map(|order| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            Order::from_entity(order, items)
        })
        .collect();

    let meta = Meta::with_total(items.len());
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success(
        "OK",
        with_items(&state.orm, order).await?,
        Some(Meta::empty()),
    ))
}

/// Moves an order to `payload.status` if the transition table allows it.
///
/// Entering `Shipped` stamps `shipped_at`; entering `Delivered` stamps
/// `delivered_at` and keeps `shipped_at`.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    // A missing order is reported before a malformed status.
    let existing = Orders::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    let requested: OrderStatus = payload.status.parse()?;

    let current = existing.status;
    let next = current.transition_to(requested)?;

    let now = Utc::now();
    let mut changes = OrderActive {
        status: Set(next),
        ..Default::default()
    };
    match next {
        OrderStatus::Shipped => changes.shipped_at = Set(Some(now.into())),
        OrderStatus::Delivered => changes.delivered_at = Set(Some(now.into())),
        _ => {}
    }

    // compare-and-set on the status we validated against
    let updated = Orders::update_many()
        .set(changes)
        .filter(OrderCol::Id.eq(id))
        .filter(OrderCol::Status.eq(current))
        .exec(&state.orm)
        .await?;
    if updated.rows_affected == 0 {
        return Err(AppError::BadRequest(
            "Order status was changed concurrently, retry".into(),
        ));
    }

    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        from = current.as_str(),
        to = next.as_str(),
        "order status updated"
    );

    Ok(ApiResponse::success(
        "Order updated",
        with_items(&state.orm, order).await?,
        Some(Meta::empty()),
    ))
}

async fn with_items<C: ConnectionTrait>(conn: &C, order: OrderModel) -> AppResult<Order> {
    let mut items_by_order = load_order_items(conn, vec![order.id]).await?;
    let items = items_by_order.remove(&order.id).unwrap_or_default();
    Ok(Order::from_entity(order, items))
}

async fn load_order_items<C: ConnectionTrait>(
    conn: &C,
    order_ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, Vec<OrderItem>>> {
    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .order_by_asc(OrderItemCol::Id)
        .find_also_related(Products)
        .all(conn)
        .await?;

    for (item, product) in rows {
        let product_name = product.map(|p| p.name).unwrap_or_default();
        grouped
            .entry(item.order_id)
            .or_default()
            .push(OrderItem::from_entity(&item, product_name));
    }
    Ok(grouped)
}

fn lookup(products: &HashMap<Uuid, ProductModel>, id: Uuid) -> AppResult<&ProductModel> {
    products
        .get(&id)
        .ok_or_else(|| AppError::BadRequest("Some products are not available".into()))
}

fn insufficient_stock(product: &ProductModel) -> AppError {
    AppError::BadRequest(format!("Insufficient stock for product {}", product.name))
}
