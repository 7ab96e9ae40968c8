use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod actors;
mod analytics;
mod api;
mod config;
mod domain;
mod messaging;
mod metrics;
mod pipeline;
mod utils;

use actors::HealthMonitorActor;
use analytics::PriceAnalytics;
use config::PipelineConfig;
use messaging::{OrderPublisher, RedpandaClient, StreamWorker};
use pipeline::{
    DeadLetterArchive, DeadLetterHandler, OrderIngress, OrderProcessor, RetryEscalation, StreamKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_dlq_pipeline=debug"))
        )
        .init();

    tracing::info!("🚀 Starting order pipeline with retry and dead letter escalation");

    // === 1. Configuration ===
    let config = PipelineConfig::from_env()?;
    tracing::info!(
        brokers = %config.brokers,
        orders_topic = %config.topics.orders,
        retry_topic = %config.topics.retry,
        dlq_topic = %config.topics.dead_letter,
        max_retry_attempts = config.retry.max_attempts,
        retry_delay_ms = config.retry.delay.as_millis() as u64,
        workers_per_stream = config.workers_per_stream,
        "Configuration loaded"
    );

    // === 2. Prometheus metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. Redpanda producer (with circuit breaker) ===
    let redpanda = Arc::new(RedpandaClient::new(
        &config.brokers,
        config.publish_timeout,
        metrics.clone(),
    )?);
    let publisher: Arc<dyn OrderPublisher> = redpanda.clone();

    // === 4. Health monitor ===
    let health = HealthMonitorActor::new()
        .with_producer(redpanda.clone(), metrics.clone())
        .start();

    // === 5. Shared pipeline state ===
    let analytics = Arc::new(PriceAnalytics::new());
    let archive = Arc::new(DeadLetterArchive::new());

    // Retry/DLQ routings and ingress publishes outlive the message that
    // triggered them; shutdown waits on this before exiting
    let in_flight = TaskTracker::new();

    let escalation = RetryEscalation::new(
        publisher.clone(),
        &config.topics,
        metrics.clone(),
        in_flight.clone(),
    );
    let processor = Arc::new(OrderProcessor::new(
        analytics.clone(),
        escalation,
        config.retry.clone(),
        metrics.clone(),
    ));
    let dead_letters = Arc::new(DeadLetterHandler::new(archive.clone(), metrics.clone()));
    let ingress = Arc::new(OrderIngress::new(
        publisher,
        config.topics.orders.clone(),
        tokio::runtime::Handle::current(),
        in_flight.clone(),
    ));

    // === 6. Consumer workers ===
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dead_letter_group = config.dead_letter_group();
    let mut workers = Vec::new();

    let streams = [
        (StreamKind::Orders, config.topics.orders.as_str(), config.consumer_group.as_str()),
        (StreamKind::Retry, config.topics.retry.as_str(), config.consumer_group.as_str()),
        (StreamKind::DeadLetter, config.topics.dead_letter.as_str(), dead_letter_group.as_str()),
    ];

    for (stream, topic, group_id) in streams {
        for worker_id in 0..config.workers_per_stream {
            let worker = StreamWorker::subscribe(
                &config.brokers,
                group_id,
                topic,
                stream,
                worker_id,
                metrics.clone(),
                health.clone(),
            )?;
            let shutdown = shutdown_rx.clone();

            let task = match stream {
                StreamKind::Orders => {
                    let processor = processor.clone();
                    tokio::spawn(worker.run(shutdown, move |delivery, ack| {
                        let processor = processor.clone();
                        async move {
                            processor.handle_primary(delivery, ack).await;
                        }
                    }))
                }
                StreamKind::Retry => {
                    let processor = processor.clone();
                    tokio::spawn(worker.run(shutdown, move |delivery, ack| {
                        let processor = processor.clone();
                        async move {
                            processor.handle_retry(delivery, ack).await;
                        }
                    }))
                }
                StreamKind::DeadLetter => {
                    let dead_letters = dead_letters.clone();
                    tokio::spawn(worker.run(shutdown, move |delivery, ack| {
                        let dead_letters = dead_letters.clone();
                        async move {
                            dead_letters.handle(delivery, ack).await;
                        }
                    }))
                }
            };
            workers.push(task);
        }
    }

    tracing::info!("✅ Started {} consumer workers", workers.len());

    // === 7. Management API on its own actix system ===
    let api_state = api::ApiState {
        analytics,
        archive,
        ingress,
        health,
        metrics,
    };
    let http_port = config.http_port;
    std::thread::spawn(move || {
        if let Err(e) = actix_web::rt::System::new().block_on(api::serve(api_state, http_port)) {
            tracing::error!("Management API error: {}", e);
        }
    });

    // === 8. Run until interrupted ===
    tokio::signal::ctrl_c().await?;
    tracing::info!("🛑 Shutdown requested, stopping consumer workers");

    let _ = shutdown_tx.send(true);
    for result in join_all(workers).await {
        if let Err(e) = result {
            tracing::error!("Consumer worker panicked: {}", e);
        }
    }

    // Every acknowledged failure must reach its retry/DLQ topic before exit
    in_flight.close();
    tracing::info!("⏳ Waiting for {} in-flight publishes", in_flight.len());
    in_flight.wait().await;

    let flush_timeout = config.publish_timeout;
    let producer = redpanda.clone();
    match tokio::task::spawn_blocking(move || producer.flush(flush_timeout)).await {
        Ok(Ok(())) => tracing::info!("Producer queue flushed"),
        Ok(Err(e)) => tracing::error!(error = %e, "Failed to flush producer queue"),
        Err(e) => tracing::error!(error = %e, "Producer flush task failed"),
    }

    tracing::info!("👋 Pipeline stopped");

    Ok(())
}
