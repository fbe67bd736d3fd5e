//! Host-side stand-ins for the hardware and network traits.

extern crate std;

use core::convert::Infallible;
use std::collections::VecDeque;
use std::string::String;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};
use embedded_hal_async::delay::DelayNs;

use crate::http::Connection;
use crate::reading::SensorReading;
use crate::sensors::Co2Sensor;

/// Records every requested delay instead of sleeping.
#[derive(Default)]
pub struct RecordingDelay {
    pub delays_ns: Vec<u32>,
}

impl RecordingDelay {
    pub fn delays_ms(&self) -> Vec<u32> {
        self.delays_ns.iter().map(|ns| ns / 1_000_000).collect()
    }
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.delays_ns.push(ns);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.delays_ns.push(ms * 1_000_000);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCall {
    Init,
    SetInterval(u16),
    Start(u16),
    Stop,
    Read,
}

/// Sensor whose reads are answered from a script. An exhausted script fails
/// every further read.
///
/// With `requires_start` set it behaves like an idle sensor: reads fail
/// without consuming the script until a start command succeeds.
#[derive(Default)]
pub struct StubSensor {
    pub script: VecDeque<Result<SensorReading, ()>>,
    pub calls: Vec<SensorCall>,
    pub fail_init: bool,
    /// Number of start commands that fail before one succeeds
    pub failing_starts: u8,
    pub requires_start: bool,
    pub measuring: bool,
}

impl StubSensor {
    pub fn scripted<const N: usize>(script: [Result<SensorReading, ()>; N]) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.calls.iter().filter(|c| **c == SensorCall::Read).count()
    }
}

impl Co2Sensor for StubSensor {
    type Error = ();

    async fn init(&mut self) -> Result<(), ()> {
        self.calls.push(SensorCall::Init);
        if self.fail_init { Err(()) } else { Ok(()) }
    }

    async fn set_measurement_interval(&mut self, seconds: u16) -> Result<(), ()> {
        self.calls.push(SensorCall::SetInterval(seconds));
        Ok(())
    }

    async fn start_periodic_measurement(&mut self, ambient_pressure_mbar: u16) -> Result<(), ()> {
        self.calls.push(SensorCall::Start(ambient_pressure_mbar));
        if self.failing_starts > 0 {
            self.failing_starts -= 1;
            return Err(());
        }
        self.measuring = true;
        Ok(())
    }

    async fn stop_periodic_measurement(&mut self) -> Result<(), ()> {
        self.calls.push(SensorCall::Stop);
        self.measuring = false;
        Ok(())
    }

    async fn blocking_read_measurement(&mut self) -> Result<SensorReading, ()> {
        self.calls.push(SensorCall::Read);
        if self.requires_start && !self.measuring {
            return Err(());
        }
        self.script.pop_front().unwrap_or(Err(()))
    }
}

/// Output pin that remembers its level and counts toggles.
#[derive(Default)]
pub struct StubPin {
    pub high: bool,
    pub toggles: usize,
}

impl ErrorType for StubPin {
    type Error = Infallible;
}

impl OutputPin for StubPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = true;
        Ok(())
    }
}

impl StatefulOutputPin for StubPin {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.high)
    }

    fn toggle(&mut self) -> Result<(), Infallible> {
        self.toggles += 1;
        self.high = !self.high;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubIoError;

/// What happened on a [`StubConnection`]. Outlives the connection so tests
/// can inspect it after the handler consumed and closed it.
#[derive(Default)]
pub struct Transcript {
    pub request: Vec<u8>,
    pub written: Vec<u8>,
    pub flushes: usize,
    pub closes: usize,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

impl Transcript {
    pub fn with_request(request: &[u8]) -> Self {
        Self {
            request: request.to_vec(),
            ..Self::default()
        }
    }

    pub fn response(&self) -> String {
        String::from_utf8(self.written.clone()).unwrap()
    }
}

pub struct StubConnection<'a> {
    transcript: &'a mut Transcript,
}

impl<'a> StubConnection<'a> {
    pub fn new(transcript: &'a mut Transcript) -> Self {
        Self { transcript }
    }
}

impl Connection for StubConnection<'_> {
    type Error = StubIoError;

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StubIoError> {
        if self.transcript.fail_reads {
            return Err(StubIoError);
        }
        let n = buf.len().min(self.transcript.request.len());
        buf[..n].copy_from_slice(&self.transcript.request[..n]);
        self.transcript.request.drain(..n);
        Ok(n)
    }

    async fn write_all(&mut self, buf: &[u8]) -> Result<(), StubIoError> {
        assert_eq!(self.transcript.closes, 0, "write after close");
        if self.transcript.fail_writes {
            return Err(StubIoError);
        }
        self.transcript.written.extend_from_slice(buf);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), StubIoError> {
        self.transcript.flushes += 1;
        Ok(())
    }

    async fn close(self) {
        self.transcript.closes += 1;
    }
}
