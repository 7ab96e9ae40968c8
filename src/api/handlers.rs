use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use super::server::ApiState;
use crate::actors::{GetSystemHealth, HealthStatus};

const SERVICE_NAME: &str = "Kafka Order System";

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderRequest {
    pub order_id: String,
    pub product: String,
    pub price: f64,
}

pub async fn send_order(
    state: web::Data<ApiState>,
    body: web::Json<OrderRequest>,
) -> impl Responder {
    let request = body.into_inner();

    tracing::info!(
        order_id = %request.order_id,
        product = %request.product,
        price = request.price,
        "REST API: Sending order"
    );

    match state.ingress.send_order(&request.order_id, &request.product, request.price) {
        Ok(_) => HttpResponse::Ok().json(json!({
            "status": "success",
            "message": "Order sent to Kafka",
            "orderId": request.order_id,
            "product": request.product,
            "price": request.price,
        })),
        Err(e) => HttpResponse::BadRequest().json(json!({
            "status": "error",
            "message": e.to_string(),
        })),
    }
}

pub async fn send_batch(
    state: web::Data<ApiState>,
    body: web::Json<Vec<OrderRequest>>,
) -> impl Responder {
    let orders = body.into_inner();

    if orders.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "status": "error",
            "message": "Order list cannot be empty",
        }));
    }

    tracing::info!(count = orders.len(), "REST API: Sending batch of orders");

    let (mut success_count, mut fail_count) = (0usize, 0usize);
    for order in &orders {
        match state.ingress.send_order(&order.order_id, &order.product, order.price) {
            Ok(_) => success_count += 1,
            Err(e) => {
                tracing::warn!(order_id = %order.order_id, reason = %e, "Skipping invalid order");
                fail_count += 1;
            }
        }
    }

    HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Batch processing complete",
        "totalOrders": orders.len(),
        "successCount": success_count,
        "failCount": fail_count,
    }))
}

pub async fn stats(state: web::Data<ApiState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "success",
        "stats": state.analytics.stats(),
    }))
}

pub async fn reset_stats(state: web::Data<ApiState>) -> impl Responder {
    tracing::info!("REST API: Resetting aggregation stats");
    state.analytics.reset();

    HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Aggregation statistics reset",
    }))
}

pub async fn failed_orders(state: web::Data<ApiState>) -> impl Responder {
    let failed = state.archive.list();

    HttpResponse::Ok().json(json!({
        "status": "success",
        "failedOrderCount": failed.len(),
        "failedOrders": failed,
    }))
}

pub async fn clear_failed_orders(state: web::Data<ApiState>) -> impl Responder {
    tracing::info!("REST API: Clearing failed orders");
    state.archive.clear();

    HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Failed orders cleared",
    }))
}

pub async fn health(state: web::Data<ApiState>) -> impl Responder {
    let stats = state.analytics.stats();

    let (overall, components, check_time) = match state.health.ask(GetSystemHealth).await {
        Ok(health) => {
            let components: serde_json::Map<_, _> = health
                .components
                .values()
                .map(|c| {
                    (
                        c.name.clone(),
                        json!({
                            "status": c.status.label(),
                            "detail": c.status.detail().or(c.details.as_deref()),
                            "lastCheck": c.last_check,
                        }),
                    )
                })
                .collect();
            (health.overall_status, components, health.check_time)
        }
        Err(e) => {
            tracing::error!(error = ?e, "Failed to get system health");
            (
                HealthStatus::Unhealthy("health monitor unavailable".to_string()),
                serde_json::Map::new(),
                chrono::Utc::now(),
            )
        }
    };

    let body = json!({
        "status": overall.label(),
        "service": SERVICE_NAME,
        "totalOrdersProcessed": stats.total_orders,
        "currentAverage": stats.running_average,
        "failedOrders": state.archive.count(),
        "components": components,
        "checkTime": check_time,
    });

    match overall {
        HealthStatus::Unhealthy(_) => HttpResponse::ServiceUnavailable().json(body),
        _ => HttpResponse::Ok().json(body),
    }
}

pub async fn metrics(state: web::Data<ApiState>) -> impl Responder {
    match state.metrics.render() {
        Ok(buffer) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(buffer),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}
