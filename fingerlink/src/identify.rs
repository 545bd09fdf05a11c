//! Finger identification: capture, extract, search

use fingerlink_core::BufferId;
use fingerlink_types::SearchResult;
use tracing::{debug, info};

use crate::capture::{await_finger, CancelHandle};
use crate::error::Result;
use crate::sensor::Sensor;

/// Identifies a finger against a range of library pages
pub struct Identification {
    start: u16,
    count: u16,
    high_speed: bool,
    max_captures: Option<u32>,
    cancel: CancelHandle,
}

impl Identification {
    /// Search `count` pages starting at `start`
    pub fn new(start: u16, count: u16) -> Self {
        Self {
            start,
            count,
            high_speed: false,
            max_captures: None,
            cancel: CancelHandle::default(),
        }
    }

    /// Use the module's high-speed search
    pub fn with_high_speed(mut self, enabled: bool) -> Self {
        self.high_speed = enabled;
        self
    }

    /// Give up after `attempts` captures without a finger
    pub fn with_max_captures(mut self, attempts: u32) -> Self {
        self.max_captures = Some(attempts);
        self
    }

    /// Handle for cancelling the run from another task
    pub fn handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for a finger and search the library for it
    pub async fn run(self, sensor: &Sensor) -> Result<SearchResult> {
        let mut captures = 0;
        await_finger(sensor, self.max_captures, &self.cancel, &mut captures).await?;
        debug!(captures, "Finger captured");

        sensor.image_to_character(BufferId::One).await?;

        let result = if self.high_speed {
            sensor
                .high_speed_search(BufferId::One, self.start, self.count)
                .await?
        } else {
            sensor.search(BufferId::One, self.start, self.count).await?
        };

        info!(%result, "Identification finished");
        Ok(result)
    }
}
