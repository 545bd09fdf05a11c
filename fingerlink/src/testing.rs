//! In-memory module for engine and workflow tests

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use fingerlink_core::{
    constants::{offsets, packet_id, DEFAULT_ADDRESS},
    Frame,
};
use fingerlink_transport::{Error, Result, Transport};
use parking_lot::Mutex;

/// One scripted answer to a `send`
pub(crate) enum Step {
    Reply(Vec<u8>),
    Fail(fn() -> Error),
    Hang,
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    sent: Vec<Vec<u8>>,
    written: Vec<Vec<u8>>,
    open: bool,
}

/// Transport that answers from a script and records what it was given
///
/// Clones share the script, so a test keeps one handle and gives the other to
/// the sensor.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        let transport = Self::default();
        transport.inner.lock().open = true;
        transport
    }

    /// Queue an acknowledge with the given status and data bytes
    pub(crate) fn ack(&self, status: u8, data: &[u8]) -> &Self {
        self.push(Step::Reply(ack(status, data)))
    }

    /// Queue raw reply bytes
    pub(crate) fn raw(&self, bytes: Vec<u8>) -> &Self {
        self.push(Step::Reply(bytes))
    }

    pub(crate) fn push(&self, step: Step) -> &Self {
        self.inner.lock().steps.push_back(step);
        self
    }

    /// Frames passed to `send`
    pub(crate) fn sent(&self) -> Vec<Vec<u8>> {
        self.inner.lock().sent.clone()
    }

    /// Bytes passed to `write`
    pub(crate) fn written(&self) -> Vec<Vec<u8>> {
        self.inner.lock().written.clone()
    }

    /// Instruction byte of every frame passed to `send`
    pub(crate) fn instructions(&self) -> Vec<u8> {
        self.inner
            .lock()
            .sent
            .iter()
            .map(|frame| frame[offsets::STATUS])
            .collect()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.inner.lock().steps.len()
    }
}

/// Build an acknowledge frame from the default address
pub(crate) fn ack(status: u8, data: &[u8]) -> Vec<u8> {
    let length = 1 + data.len() + Frame::CHECKSUM_LEN;
    let mut frame = Frame::build(DEFAULT_ADDRESS, Frame::HEADER_LEN + length).unwrap();
    frame.write_byte(packet_id::ACK).unwrap();
    frame.write_u16(length as u16).unwrap();
    frame.write_byte(status).unwrap();
    frame.write_bytes(data).unwrap();
    frame.finish_wide().unwrap();
    frame.as_bytes().to_vec()
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&mut self) -> Result<()> {
        self.inner.lock().open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.lock().open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.inner.lock().open
    }

    async fn send(&mut self, frame: &[u8]) -> Result<BytesMut> {
        let step = {
            let mut script = self.inner.lock();
            if !script.open {
                return Err(Error::NotConnected);
            }
            script.sent.push(frame.to_vec());
            script.steps.pop_front()
        };

        match step {
            Some(Step::Reply(bytes)) => Ok(BytesMut::from(&bytes[..])),
            Some(Step::Fail(error)) => Err(error()),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(Error::ReadTimeout),
        }
    }

    async fn write(&mut self, frame: &[u8]) -> Result<()> {
        let mut script = self.inner.lock();
        if !script.open {
            return Err(Error::NotConnected);
        }
        script.written.push(frame.to_vec());
        Ok(())
    }

    fn name(&self) -> String {
        "scripted".to_string()
    }
}
