//! Fraud Scoring Service - Main Entry Point
//!
//! Consumes validation and scoring request envelopes from NATS, runs them
//! through the validation and linear-scoring engines, and replies with
//! structured results. Supports parallel request processing.

use anyhow::{Context, Result};
use fraud_scoring_service::{
    config::AppConfig,
    consumer::{RequestConsumer, RequestFlow},
    metrics::{MetricsReporter, ServiceMetrics},
    model::artifact::ArtifactCache,
    model::scorer::LinearScorer,
    producer::ResultProducer,
    types::report::{FieldError, ScoreResult, ValidationReport},
    validation,
};
use futures::StreamExt;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fraud_scoring_service=info".parse()?),
        )
        .init();

    info!("Starting Fraud Scoring Service");

    // Load configuration
    let config = AppConfig::load()?;
    info!("Configuration loaded successfully");
    info!(
        policy = ?config.scoring.policy,
        artifact = %config.artifact.path,
        "Scoring flow configured"
    );

    // Initialize metrics
    let metrics = Arc::new(ServiceMetrics::new());

    // Load the scoring-parameter artifact once; it is immutable for the
    // process lifetime and shared by every request
    let artifact_cache = ArtifactCache::new(&config.artifact.path);
    let params = artifact_cache
        .get()
        .context("Failed to load scoring parameters")?
        .clone();
    info!(
        model_version = %params.model_version,
        decision_threshold = params.decision_threshold,
        encoded_width = params.encoded_width(),
        "Scoring parameters ready"
    );

    let scorer = Arc::new(LinearScorer::with_policy(params, config.scoring.policy));

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    // Initialize consumer and producer
    let consumer = RequestConsumer::new(
        client.clone(),
        &config.nats.validation_subject,
        &config.nats.scoring_subject,
    );
    let producer = Arc::new(ResultProducer::new(
        client.clone(),
        &config.nats.result_subject,
    ));

    // Parallel processing configuration
    let num_workers = config.pipeline.workers;
    info!(
        "Starting request processing loop with {} parallel workers",
        num_workers
    );
    info!(
        "Listening on subjects: {} (validate), {} (score)",
        consumer.validation_subject(),
        consumer.scoring_subject()
    );
    info!("Publishing results to: {}", config.nats.result_subject);

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    // Start metrics reporter (prints summary every 30 seconds)
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, 30);
        reporter.start().await;
    });

    // Process requests from both subjects in parallel
    let mut requests = consumer.subscribe().await?;

    while let Some(message) = requests.next().await {
        // Acquire permit (limits concurrent tasks)
        let permit = semaphore.clone().acquire_owned().await.unwrap();

        let flow = consumer.flow_of(message.subject.as_str());

        // Clone shared resources for the spawned task
        let scorer = scorer.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        // Spawn task to process this request
        tokio::spawn(async move {
            let start_time = Instant::now();

            let reply = message.reply.clone();

            let send_result = if flow == RequestFlow::Scoring {
                let result = match serde_json::from_slice::<Value>(&message.payload) {
                    Ok(payload) => scorer.score_request(&payload),
                    Err(e) => {
                        warn!(error = %e, "Failed to decode scoring request");
                        ScoreResult::failed(
                            Uuid::new_v4().to_string(),
                            None,
                            None,
                            "Invalid JSON body",
                        )
                    }
                };

                match (result.fraud_probability, result.fraud_label) {
                    (Some(probability), Some(label)) => {
                        metrics.record_score(start_time.elapsed(), probability, label);
                        debug!(
                            request_id = %result.request_id,
                            fraud_probability = probability,
                            fraud_label = label,
                            processing_time_us = start_time.elapsed().as_micros(),
                            "Request scored"
                        );
                    }
                    _ => {
                        metrics.record_scoring_error();
                        warn!(
                            request_id = %result.request_id,
                            error = result.error.as_deref().unwrap_or("unknown"),
                            "Scoring request failed"
                        );
                    }
                }

                deliver(&producer, reply, &result).await
            } else {
                let report = match serde_json::from_slice::<Value>(&message.payload) {
                    Ok(payload) => validation::validate_request(&payload),
                    Err(e) => {
                        warn!(error = %e, "Failed to decode validation request");
                        ValidationReport::invalid(
                            Uuid::new_v4().to_string(),
                            vec![FieldError::new("request", "Invalid JSON body")],
                        )
                    }
                };

                metrics.record_validation(start_time.elapsed(), report.is_valid);
                debug!(
                    request_id = %report.request_id,
                    is_valid = report.is_valid,
                    error_count = report.validation_errors.len(),
                    processing_time_us = start_time.elapsed().as_micros(),
                    "Request validated"
                );

                deliver(&producer, reply, &report).await
            };

            if let Err(e) = send_result {
                error!(error = %e, "Failed to deliver result");
            }

            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;

            // Log progress every 100 requests
            if count % 100 == 0 {
                let throughput = metrics.get_throughput();
                let processing_stats = metrics.get_processing_stats();
                info!(
                    processed = count,
                    throughput = format!("{:.1} req/s", throughput),
                    avg_latency_us = processing_stats.mean_us,
                    "Processing milestone"
                );
            }

            // Release permit when done
            drop(permit);
        });
    }

    // Print final summary
    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

/// Reply on the request's reply subject when present, otherwise publish to
/// the configured result subject.
async fn deliver<T: serde::Serialize>(
    producer: &ResultProducer,
    reply: Option<async_nats::Subject>,
    result: &T,
) -> Result<()> {
    match reply {
        Some(subject) => producer.respond(subject.to_string(), result).await,
        None => producer.publish(result).await,
    }
}
