//! Finger enrollment
//!
//! ```text
//! Idle → Reset → AwaitFirstImage → ImageToCharacter(1) → Delay
//!      → AwaitSecondImage → ImageToCharacter(2) → GenerateTemplate
//!      → StoreTemplate → Done
//! ```
//!
//! Any failing step moves to `Failed` and the run returns
//! [`Error::Enrollment`] naming the step.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use fingerlink_core::{constants::DEFAULT_SETTLE_DELAY_MS, BufferId};
use fingerlink_types::EnrollReport;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::capture::{await_finger, CancelHandle};
use crate::error::{Error, Result};
use crate::sensor::Sensor;

/// Cancels a running enrollment
pub type EnrollHandle = CancelHandle;

/// Enrollment step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollState {
    Idle,
    Reset,
    AwaitFirstImage,
    ImageToCharacter(BufferId),
    Delay,
    AwaitSecondImage,
    GenerateTemplate,
    StoreTemplate,
    Done,
    Failed,
}

impl fmt::Display for EnrollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Reset => write!(f, "reset"),
            Self::AwaitFirstImage => write!(f, "first image"),
            Self::ImageToCharacter(buffer) => write!(f, "image to character {}", u8::from(*buffer)),
            Self::Delay => write!(f, "settle delay"),
            Self::AwaitSecondImage => write!(f, "second image"),
            Self::GenerateTemplate => write!(f, "generate template"),
            Self::StoreTemplate => write!(f, "store template"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Enrolls one finger at a library page
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use fingerlink::{Enrollment, Sensor, SerialTransport};
///
/// #[tokio::main]
/// async fn main() -> fingerlink::Result<()> {
///     let sensor = Sensor::new(SerialTransport::new("/dev/ttyUSB0"));
///     sensor.open().await?;
///
///     let report = Enrollment::new(1)
///         .with_settle_delay(Duration::from_secs(1))
///         .run(&sensor)
///         .await?;
///     println!("{}", report);
///     Ok(())
/// }
/// ```
pub struct Enrollment {
    page: u16,
    settle_delay: Duration,
    max_captures: Option<u32>,
    progress: Option<mpsc::UnboundedSender<EnrollState>>,
    cancel: CancelHandle,
    state: EnrollState,
    captures: u32,
}

impl Enrollment {
    /// Enroll into library page `page`
    pub fn new(page: u16) -> Self {
        Self {
            page,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            max_captures: None,
            progress: None,
            cancel: CancelHandle::default(),
            state: EnrollState::Idle,
            captures: 0,
        }
    }

    /// Set the pause between the two captures
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Give up on a capture loop after `attempts` captures without a finger
    pub fn with_max_captures(mut self, attempts: u32) -> Self {
        self.max_captures = Some(attempts);
        self
    }

    /// Report every state change on `progress`
    pub fn with_progress(mut self, progress: mpsc::UnboundedSender<EnrollState>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Handle for cancelling the run from another task
    pub fn handle(&self) -> EnrollHandle {
        self.cancel.clone()
    }

    /// Run the enrollment to completion
    ///
    /// A cancelled run returns [`Error::Cancelled`]; any other failure is
    /// [`Error::Enrollment`] carrying the step it happened in.
    pub async fn run(mut self, sensor: &Sensor) -> Result<EnrollReport> {
        let started_at = Utc::now();
        info!(page = self.page, "Enrollment started");

        match self.drive(sensor).await {
            Ok(()) => {
                self.enter(EnrollState::Done);

                let report = EnrollReport {
                    page_id: self.page,
                    captures: self.captures,
                    started_at,
                    finished_at: Utc::now(),
                };
                info!(%report, "Enrollment finished");
                Ok(report)
            }
            Err(Error::Cancelled) => {
                info!(state = %self.state, "Enrollment cancelled");
                self.enter(EnrollState::Failed);
                Err(Error::Cancelled)
            }
            Err(source) => {
                let state = self.state;
                warn!(%state, error = %source, "Enrollment failed");
                self.enter(EnrollState::Failed);
                Err(Error::Enrollment {
                    state,
                    source: Box::new(source),
                })
            }
        }
    }

    async fn drive(&mut self, sensor: &Sensor) -> Result<()> {
        self.enter(EnrollState::Reset);
        sensor.reset_buffers().await?;

        self.enter(EnrollState::AwaitFirstImage);
        await_finger(sensor, self.max_captures, &self.cancel, &mut self.captures).await?;

        self.enter(EnrollState::ImageToCharacter(BufferId::One));
        sensor.image_to_character(BufferId::One).await?;

        self.enter(EnrollState::Delay);
        tokio::time::sleep(self.settle_delay).await;

        self.enter(EnrollState::AwaitSecondImage);
        await_finger(sensor, self.max_captures, &self.cancel, &mut self.captures).await?;

        self.enter(EnrollState::ImageToCharacter(BufferId::Two));
        sensor.image_to_character(BufferId::Two).await?;

        self.enter(EnrollState::GenerateTemplate);
        sensor.generate_template().await?;

        self.enter(EnrollState::StoreTemplate);
        sensor.store_template(BufferId::One, self.page).await
    }

    fn enter(&mut self, state: EnrollState) {
        debug!(from = %self.state, to = %state, "Enrollment step");
        self.state = state;

        if let Some(progress) = &self.progress {
            // A dropped receiver only means nobody is watching
            let _ = progress.send(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use fingerlink_core::Status;
    use pretty_assertions::assert_eq;

    const OK: u8 = 0x00;
    const NO_FINGER: u8 = 0x02;

    fn happy_path(line: &ScriptedTransport, first_misses: usize) {
        line.ack(OK, &[]);
        for _ in 0..first_misses {
            line.ack(NO_FINGER, &[]);
        }
        line.ack(OK, &[])
            .ack(OK, &[])
            .ack(OK, &[])
            .ack(OK, &[])
            .ack(OK, &[])
            .ack(OK, &[]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrollment_sequence() {
        let line = ScriptedTransport::new();
        happy_path(&line, 2);
        let sensor = Sensor::new(line.clone());

        let report = Enrollment::new(7).run(&sensor).await.unwrap();

        assert_eq!(report.page_id, 7);
        assert_eq!(report.captures, 4);
        assert_eq!(
            line.instructions(),
            vec![0x16, 0x01, 0x01, 0x01, 0x02, 0x01, 0x02, 0x05, 0x06]
        );

        // Both extractions name their buffer; the template is stored from buffer 1
        let sent = line.sent();
        assert_eq!(sent[4][10], 0x01);
        assert_eq!(sent[6][10], 0x02);
        assert_eq!(&sent[8][10..13], &[0x01, 0x00, 0x07]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_delay_between_captures() {
        let line = ScriptedTransport::new();
        happy_path(&line, 0);
        let sensor = Sensor::new(line.clone());

        let start = tokio::time::Instant::now();
        Enrollment::new(1)
            .with_settle_delay(Duration::from_secs(3))
            .run(&sensor)
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_reports_every_state() {
        let line = ScriptedTransport::new();
        happy_path(&line, 1);
        let sensor = Sensor::new(line.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        Enrollment::new(2).with_progress(tx).run(&sensor).await.unwrap();

        let mut states = Vec::new();
        while let Ok(state) = rx.try_recv() {
            states.push(state);
        }
        assert_eq!(
            states,
            vec![
                EnrollState::Reset,
                EnrollState::AwaitFirstImage,
                EnrollState::ImageToCharacter(BufferId::One),
                EnrollState::Delay,
                EnrollState::AwaitSecondImage,
                EnrollState::ImageToCharacter(BufferId::Two),
                EnrollState::GenerateTemplate,
                EnrollState::StoreTemplate,
                EnrollState::Done,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_poor_second_image_fails_enrollment() {
        let line = ScriptedTransport::new();
        line.ack(OK, &[])
            .ack(OK, &[])
            .ack(OK, &[])
            .ack(NO_FINGER, &[])
            .ack(0x06, &[]);
        let sensor = Sensor::new(line.clone());

        let err = Enrollment::new(3).run(&sensor).await.unwrap_err();

        match &err {
            Error::Enrollment { state, .. } => assert_eq!(*state, EnrollState::AwaitSecondImage),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.status(), Some(Status::DisorderlyPrint));
        assert!(!line.instructions().contains(&0x05));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_names_step() {
        let line = ScriptedTransport::new();
        line.ack(OK, &[])
            .ack(OK, &[])
            .ack(OK, &[])
            .ack(OK, &[])
            .ack(OK, &[])
            .ack(OK, &[])
            .ack(0x0B, &[]);
        let sensor = Sensor::new(line.clone());

        let err = Enrollment::new(1000).run(&sensor).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Enrollment {
                state: EnrollState::StoreTemplate,
                ..
            }
        ));
        assert_eq!(err.status(), Some(Status::AddressOutOfRange));
    }

    #[tokio::test]
    async fn test_cancel_stops_at_capture_loop() {
        let line = ScriptedTransport::new();
        line.ack(OK, &[]);
        let sensor = Sensor::new(line.clone());

        let enrollment = Enrollment::new(1);
        enrollment.handle().cancel();

        let err = enrollment.run(&sensor).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(line.instructions(), vec![0x16]);
    }

    #[tokio::test]
    async fn test_capture_cap_fails_enrollment() {
        let line = ScriptedTransport::new();
        line.ack(OK, &[])
            .ack(NO_FINGER, &[])
            .ack(NO_FINGER, &[])
            .ack(NO_FINGER, &[]);
        let sensor = Sensor::new(line.clone());

        let err = Enrollment::new(1)
            .with_max_captures(2)
            .run(&sensor)
            .await
            .unwrap_err();

        match err {
            Error::Enrollment { state, source } => {
                assert_eq!(state, EnrollState::AwaitFirstImage);
                assert!(matches!(*source, Error::CaptureAttemptsExhausted { attempts: 2 }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(line.remaining(), 1);
    }
}
