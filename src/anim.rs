//! Progress-bar easing.
//!
//! Purely cosmetic: a per-render loop eases the displayed value toward the
//! target percentage. Retargeting cancels the running loop and starts a new
//! one. Nothing in the workflow engine waits on this — state transitions
//! settle regardless of where the displayed value is.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::AnimConfig;

pub struct ProgressAnimator {
    displayed: watch::Sender<f32>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    tick: Duration,
    /// Fraction of the remaining distance covered per tick.
    smoothing: f32,
}

impl ProgressAnimator {
    pub fn new(config: &AnimConfig) -> Self {
        let (displayed, _) = watch::channel(0.0);
        Self {
            displayed,
            loop_handle: Mutex::new(None),
            tick: Duration::from_millis(config.tick_ms),
            smoothing: config.smoothing,
        }
    }

    /// Ease the displayed value toward `percent`, restarting any loop that
    /// is still easing toward a previous target.
    pub fn set_target(&self, percent: u8) {
        let target = f32::from(percent.min(100));
        let displayed = self.displayed.clone();
        let tick = self.tick;
        let smoothing = self.smoothing;

        let mut handle = self
            .loop_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = handle.take() {
            previous.abort();
        }
        *handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            loop {
                interval.tick().await;
                let current = *displayed.borrow();
                let remaining = target - current;
                if remaining.abs() < 0.5 {
                    displayed.send_replace(target);
                    break;
                }
                displayed.send_replace(current + remaining * smoothing);
            }
        }));
    }

    /// Observe the eased value as it moves.
    pub fn subscribe(&self) -> watch::Receiver<f32> {
        self.displayed.subscribe()
    }

    pub fn displayed(&self) -> f32 {
        *self.displayed.borrow()
    }
}

impl Drop for ProgressAnimator {
    fn drop(&mut self) {
        if let Some(handle) = self
            .loop_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> AnimConfig {
        AnimConfig {
            tick_ms: 1,
            smoothing: 0.5,
        }
    }

    #[tokio::test]
    async fn eases_to_target() {
        let animator = ProgressAnimator::new(&fast_config());
        let mut rx = animator.subscribe();
        animator.set_target(80);
        loop {
            rx.changed().await.unwrap();
            let value = *rx.borrow();
            assert!(value <= 80.0);
            if (value - 80.0).abs() < f32::EPSILON {
                break;
            }
        }
    }

    #[tokio::test]
    async fn retarget_cancels_and_restarts() {
        let animator = ProgressAnimator::new(&fast_config());
        animator.set_target(100);
        // Retarget mid-flight; the loop must converge on the new value.
        animator.set_target(10);
        let mut rx = animator.subscribe();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while (*rx.borrow() - 10.0).abs() >= f32::EPSILON {
            assert!(tokio::time::Instant::now() < deadline, "never converged");
            rx.changed().await.unwrap();
        }
    }
}
