use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::activity::{ActivityField, ActivityPatch, ActivityStore};

use super::{sensor::steps_since_midnight, StepSensor, StepSession};

// Set to true to log every sensor reading
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

pub async fn step_loop(
    mut readings: mpsc::Receiver<u64>,
    store: ActivityStore,
    sensor: Arc<dyn StepSensor>,
    session: Arc<Mutex<Option<StepSession>>>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            // Drain readings that already arrived before honouring a stop.
            biased;
            reading = readings.recv() => {
                let Some(cumulative) = reading else {
                    log_info!("step sensor stream closed");
                    break;
                };
                if let Err(err) = apply_reading(cumulative, &store, sensor.as_ref(), &session).await {
                    log_error!("failed to apply step reading {cumulative}: {err:?}");
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("step loop shutting down");
                break;
            }
        }
    }
}

async fn apply_reading(
    cumulative: u64,
    store: &ActivityStore,
    sensor: &dyn StepSensor,
    session: &Mutex<Option<StepSession>>,
) -> Result<()> {
    let mut guard = session.lock().await;
    let Some(state) = guard.as_mut() else {
        return Ok(());
    };

    let today = store.today();
    if state.day != today {
        let historical = match steps_since_midnight(sensor, today, store.clock().now_local()).await {
            Ok(historical) => {
                store.update(ActivityPatch::steps(historical)).await;
                historical
            }
            Err(err) => {
                log_warn!("re-anchoring on recorded steps, {err:#}");
                store.get_current().await.steps
            }
        };
        log_info!(
            "step session crossed midnight ({} -> {today}); re-anchoring at {historical} steps",
            state.day
        );
        state.reanchor(today, historical, cumulative);
        return Ok(());
    }

    match state.observe(cumulative) {
        Some(delta) => {
            let amount = i64::try_from(delta).context("step delta exceeds i64")?;
            let record = store.increment(ActivityField::Steps, amount).await?;
            log_debug!("+{delta} steps (cumulative {cumulative}, today {})", record.steps);
        }
        None => {
            log_debug!(
                "discarded step reading {cumulative} (baseline {})",
                state.baseline_device_count
            );
        }
    }

    Ok(())
}
