use std::time::Duration;

use tokio::sync::watch;

use crate::error::StoreError;
use crate::queue;
use crate::state::SharedState;
use crate::store::WorkflowHost;
use crate::workflow::{DeliveryWorkflow, WorkflowParams};

/// Start the delivery workers on a dedicated Tokio runtime with its own thread pool.
/// This runs on a separate OS thread and blocks until shutdown is signaled.
pub fn run_pool(
    state: SharedState,
    shutdown: watch::Receiver<bool>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    let worker_count = state.config.worker.worker_count.max(1);

    std::thread::Builder::new()
        .name("worker-pool".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(worker_count)
                .thread_name("delivery-worker")
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!(error = %e, "failed to build worker runtime");
                    return;
                }
            };

            runtime.block_on(async {
                let mut handles = Vec::with_capacity(worker_count + 1);

                handles.push(tokio::spawn(run_consumer(state.clone(), shutdown.clone())));
                for id in 0..worker_count {
                    handles.push(tokio::spawn(run(id, state.clone(), shutdown.clone())));
                }

                tracing::info!(worker_count, "delivery worker pool started");

                for handle in handles {
                    let _ = handle.await;
                }

                tracing::info!("delivery worker pool stopped");
            });
        })
}

/// Drains the integration queue into workflow instances.
async fn run_consumer(state: SharedState, mut shutdown: watch::Receiver<bool>) {
    let batch_size = state.config.worker.queue_batch_size;
    let poll_interval = state.config.worker.poll_interval;

    loop {
        if *shutdown.borrow() {
            break;
        }

        match queue::consume_once(state.queue.as_ref(), &state.dispatcher, batch_size).await {
            Ok(0) => {}
            Ok(claimed) => {
                tracing::debug!(claimed, "integration queue batch dispatched");
                continue;
            }
            Err(e) => tracing::error!(error = %e, "integration queue consumer error"),
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    tracing::debug!("integration queue consumer stopped");
}

/// A single worker loop that leases workflow instances and runs them.
async fn run(id: usize, state: SharedState, mut shutdown: watch::Receiver<bool>) {
    tracing::debug!(worker = id, "workflow worker started");
    let lease = state.config.worker.lease;
    let poll_interval = state.config.worker.poll_interval;

    loop {
        if *shutdown.borrow() {
            break;
        }

        match process_next(state.host.as_ref(), &state.workflow, lease).await {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => tracing::error!(worker = id, error = %e, "workflow worker error"),
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    tracing::debug!(worker = id, "workflow worker stopped");
}

/// Lease and run the next workflow instance. Returns true if an instance was run.
pub async fn process_next(
    host: &dyn WorkflowHost,
    workflow: &DeliveryWorkflow,
    lease: Duration,
) -> Result<bool, StoreError> {
    let Some(instance) = host.claim_next(lease).await? else {
        return Ok(false);
    };

    tracing::debug!(
        instance_id = %instance.id,
        attempt = instance.attempts,
        "running workflow instance"
    );

    let params: WorkflowParams = match serde_json::from_value(instance.params.clone()) {
        Ok(params) => params,
        Err(e) => {
            tracing::error!(instance_id = %instance.id, error = %e, "undecodable workflow params");
            host.fail(&instance.id, &format!("invalid params: {e}")).await?;
            return Ok(true);
        }
    };

    match workflow.run(&instance.id, &params).await {
        Ok(_) => host.complete(&instance.id).await?,
        Err(e) => host.fail(&instance.id, &e.to_string()).await?,
    }

    Ok(true)
}
