//! Registration wait with exponential backoff
//!
//! Services register with discovery asynchronously some time after their
//! process starts. `wait_until_registered` polls the registry, sleeping 1, 2,
//! 4, 8... seconds between empty answers, and gives up once the total slept
//! exceeds the budget. The budget is checked after each sleep, so the final
//! sleep may overshoot it; total wait never exceeds twice the budget plus one
//! second.

use std::time::Duration;

use shared::{instance_debug, instance_info, instance_warn};

use crate::traits::DiscoveryClient;

/// Poll `discovery` until `application` has at least one registered instance
///
/// Returns `false` without querying when no discovery client is available, and
/// `false` once more than `max_wait` has been spent sleeping. Query errors are
/// treated like an empty answer.
pub async fn wait_until_registered(
    discovery: Option<&dyn DiscoveryClient>,
    application: &str,
    max_wait: Duration,
) -> bool {
    let Some(discovery) = discovery else {
        instance_warn!(application, "⚠️ No discovery client, registration cannot be verified");
        return false;
    };

    let mut next_wait = Duration::from_secs(1);
    let mut sum_wait = Duration::ZERO;

    loop {
        match discovery.get_instances(application).await {
            Ok(instances) if !instances.is_empty() => {
                instance_info!(
                    application,
                    "✅ Registered with discovery after {:?} ({} instance(s), {} up)",
                    sum_wait,
                    instances.len(),
                    instances.iter().filter(|i| i.is_up()).count()
                );
                return true;
            }
            Ok(_) => {
                instance_debug!(application, "Not registered yet, retrying in {:?}", next_wait);
            }
            Err(e) => {
                instance_debug!(application, "Discovery query failed ({}), retrying in {:?}", e, next_wait);
            }
        }

        tokio::time::sleep(next_wait).await;
        sum_wait += next_wait;
        next_wait *= 2;

        if sum_wait > max_wait {
            instance_warn!(application, "⏰ Not registered after waiting {:?}", sum_wait);
            return false;
        }
    }
}
