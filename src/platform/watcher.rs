//! Hotplug emulation for backends without attach/detach callbacks.
//!
//! midir exposes no device notifications, so the watcher polls the
//! platform's device list on an interval and diffs it against the last
//! snapshot, feeding synthesized appear/remove events into the bridge.
//! Bridge calls run on the blocking pool: a device open can block for up
//! to its timeout.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{DeviceInfo, MidiPlatform};
use crate::bridge::Bridge;

pub struct DeviceWatcher;

impl DeviceWatcher {
    /// Spawn the polling task. The initial device list is taken as the
    /// baseline, so devices already handled at startup are not
    /// re-announced.
    pub fn spawn(
        platform: Arc<dyn MidiPlatform>,
        bridge: Arc<Bridge>,
        period: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut known = match snapshot(&platform).await {
                Some(devices) => devices,
                None => Vec::new(),
            };

            let mut tick = tokio::time::interval(period);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tick.tick().await;

                let current = match snapshot(&platform).await {
                    Some(devices) => devices,
                    None => continue,
                };

                for info in current
                    .iter()
                    .filter(|d| !known.iter().any(|k| k.identity == d.identity))
                {
                    debug!("device appeared: {}", info.identity.product);
                    let bridge = Arc::clone(&bridge);
                    let info = info.clone();
                    if let Err(e) =
                        tokio::task::spawn_blocking(move || bridge.on_device_appeared(&info)).await
                    {
                        warn!("device-appeared handler panicked: {}", e);
                    }
                }

                for info in known
                    .iter()
                    .filter(|k| !current.iter().any(|d| d.identity == k.identity))
                {
                    debug!("device removed: {}", info.identity.product);
                    let bridge = Arc::clone(&bridge);
                    let identity = info.identity.clone();
                    if let Err(e) =
                        tokio::task::spawn_blocking(move || bridge.on_device_removed(&identity))
                            .await
                    {
                        warn!("device-removed handler panicked: {}", e);
                    }
                }

                known = current;
            }
        })
    }
}

async fn snapshot(platform: &Arc<dyn MidiPlatform>) -> Option<Vec<DeviceInfo>> {
    let platform = Arc::clone(platform);
    tokio::task::spawn_blocking(move || platform.devices())
        .await
        .ok()
}
