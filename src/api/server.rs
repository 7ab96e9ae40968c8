use actix_web::{web, App, HttpServer};
use kameo::actor::ActorRef;
use std::sync::Arc;

use super::handlers;
use crate::actors::HealthMonitorActor;
use crate::analytics::PriceAnalytics;
use crate::metrics::Metrics;
use crate::pipeline::{DeadLetterArchive, OrderIngress};

/// Everything the management endpoints read or mutate.
pub struct ApiState {
    pub analytics: Arc<PriceAnalytics>,
    pub archive: Arc<DeadLetterArchive>,
    pub ingress: Arc<OrderIngress>,
    pub health: ActorRef<HealthMonitorActor>,
    pub metrics: Arc<Metrics>,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/orders")
            .route("/send", web::post().to(handlers::send_order))
            .route("/send-batch", web::post().to(handlers::send_batch))
            .route("/stats", web::get().to(handlers::stats))
            .route("/stats/reset", web::post().to(handlers::reset_stats))
            .route("/failed", web::get().to(handlers::failed_orders))
            .route("/failed", web::delete().to(handlers::clear_failed_orders))
            .route("/health", web::get().to(handlers::health)),
    )
    .route("/metrics", web::get().to(handlers::metrics));
}

/// Start the management API.
/// Runs on its own actix system; broker I/O is handed back to the pipeline
/// runtime through `OrderIngress`.
pub async fn serve(state: ApiState, port: u16) -> std::io::Result<()> {
    tracing::info!("🌐 Starting management API on http://0.0.0.0:{}/api/v1/orders", port);

    let state = web::Data::new(state);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}
