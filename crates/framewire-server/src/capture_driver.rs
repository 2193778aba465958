//! Drives `--synthetic` mode's procedural motion into the shared capture
//! source at a fixed cadence, independent of any session's own pace —
//! standing in for a real desktop-duplication backend, which advances on
//! its own schedule regardless of how fast clients drain it.

use std::sync::Arc;
use std::time::Duration;

use framewire_capture::SyntheticSource;
use tokio::sync::Mutex;

use crate::demo_pattern::DemoPattern;

/// Spawn the background task that feeds `source` one [`DemoPattern`] tick
/// per `interval`. Runs until the process exits.
pub fn spawn(source: Arc<Mutex<SyntheticSource>>, width: u32, height: u32, interval: Duration) {
    tokio::spawn(async move {
        let mut pattern = DemoPattern::new(width, height);
        let mut ticker = tokio::time::interval(interval);
        let mut frame_index: u64 = 0;
        loop {
            ticker.tick().await;
            let tick = pattern.next_tick(frame_index);
            frame_index += 1;
            source.lock().await.push(tick);
        }
    });
}
