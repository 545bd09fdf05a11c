//! Finger capture loop shared by the workflows

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fingerlink_core::{Instruction, Status};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::sensor::Sensor;

/// Cancels a running workflow from another task
///
/// Cancellation is checked before each capture attempt; an exchange already
/// in flight runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Capture until the module reports a finger image
///
/// No finger means try again; any other non-ok status fails. `captures` is
/// incremented for every capture issued.
pub(crate) async fn await_finger(
    sensor: &Sensor,
    max_captures: Option<u32>,
    cancel: &CancelHandle,
    captures: &mut u32,
) -> Result<()> {
    let mut attempts = 0;

    loop {
        if cancel.is_cancelled() {
            debug!(attempts, "Capture cancelled");
            return Err(Error::Cancelled);
        }

        if max_captures.is_some_and(|max| attempts >= max) {
            return Err(Error::CaptureAttemptsExhausted { attempts });
        }

        attempts += 1;
        *captures += 1;

        match sensor.capture_image().await? {
            Status::Ok => return Ok(()),
            Status::NoFinger => trace!(attempts, "Waiting for finger"),
            status => {
                return Err(Error::DeviceRejected {
                    operation: Instruction::GenerateImage.name(),
                    status,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;

    #[tokio::test]
    async fn test_retries_until_finger() {
        let line = ScriptedTransport::new();
        line.ack(0x02, &[]).ack(0x02, &[]).ack(0x00, &[]);
        let sensor = Sensor::new(line.clone());

        let mut captures = 0;
        await_finger(&sensor, None, &CancelHandle::default(), &mut captures)
            .await
            .unwrap();
        assert_eq!(captures, 3);
        assert_eq!(line.instructions(), vec![0x01, 0x01, 0x01]);
    }

    #[tokio::test]
    async fn test_quality_failure_stops_loop() {
        let line = ScriptedTransport::new();
        line.ack(0x02, &[]).ack(0x06, &[]).ack(0x00, &[]);
        let sensor = Sensor::new(line.clone());

        let mut captures = 0;
        let result = await_finger(&sensor, None, &CancelHandle::default(), &mut captures).await;
        assert_eq!(captures, 2);
        assert_eq!(result.unwrap_err().status(), Some(Status::DisorderlyPrint));
        assert_eq!(line.remaining(), 1);
    }

    #[tokio::test]
    async fn test_capture_cap() {
        let line = ScriptedTransport::new();
        line.ack(0x02, &[]).ack(0x02, &[]).ack(0x02, &[]);
        let sensor = Sensor::new(line.clone());

        let mut captures = 0;
        let result = await_finger(&sensor, Some(2), &CancelHandle::default(), &mut captures).await;
        assert_eq!(captures, 2);
        assert!(matches!(
            result,
            Err(Error::CaptureAttemptsExhausted { attempts: 2 })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_capture() {
        let line = ScriptedTransport::new();
        let sensor = Sensor::new(line.clone());
        let cancel = CancelHandle::default();
        cancel.cancel();

        let mut captures = 0;
        let result = await_finger(&sensor, None, &cancel, &mut captures).await;
        assert_eq!(captures, 0);
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(line.sent().is_empty());
    }
}
