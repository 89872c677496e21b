//! The cooperative scheduler and the node state it owns.
//!
//! One logical thread drives everything: the main loop services pending HTTP
//! work, then calls [`Node::tick`], which runs whichever periodic tasks are
//! due. Tasks never preempt each other, so the single transducer is accessed
//! by at most one caller at a time.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::clock::TimestampProvider;
use crate::cloud::Uploader;
use crate::codec;
use crate::prelude::*;
use crate::sensor::{Reading, Sensor};
use crate::settings::Settings;

/// One fixed-period task: a last-fired instant and the period.
///
/// The reference point resets exactly once per fire, at the moment the task
/// fires, regardless of what the task body then accomplishes.
pub struct PeriodicTask {
    period: Duration,
    last_fired: Instant,
}

impl PeriodicTask {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            last_fired: now,
        }
    }

    /// Whether the period has elapsed; resets the reference point when it has.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_fired) >= self.period {
            self.last_fired = now;
            true
        } else {
            false
        }
    }
}

/// All mutable node state, owned in one place and passed by reference:
/// the sensor, the clock, the uploader and the two task timers.
pub struct Node {
    pub device_id: String,
    pub network_name: String,
    pub clock: TimestampProvider,
    pub local_addr: Option<SocketAddr>,

    sensor: Box<dyn Sensor>,
    uploader: Box<dyn Uploader>,
    log_task: PeriodicTask,
    upload_task: PeriodicTask,
    started: Instant,
}

impl Node {
    pub fn new(
        settings: &Settings,
        sensor: Box<dyn Sensor>,
        clock: TimestampProvider,
        uploader: Box<dyn Uploader>,
        now: Instant,
    ) -> Self {
        Self {
            device_id: settings.device_id.clone(),
            network_name: settings.network_name.clone(),
            clock,
            local_addr: None,
            sensor,
            uploader,
            log_task: PeriodicTask::new(Duration::from_millis(settings.log_period_ms), now),
            upload_task: PeriodicTask::new(Duration::from_millis(settings.cloud.period_ms), now),
            started: now,
        }
    }

    /// Run the periodic tasks that are due. Both may fire on the same
    /// iteration; each runs to completion once started.
    pub fn tick(&mut self, now: Instant) {
        if self.log_task.fire_due(now) {
            let reading = self.sensor.read();
            if reading.is_valid() {
                info!("T={:.2} °C  H={:.1} %", reading.temp_c, reading.rh_pct);
            } else {
                warn!("sensor read failed");
            }
        }

        if self.upload_task.fire_due(now) {
            // Independent sample: readings are never reused across tasks.
            match self.metrics_record() {
                Some(record) => {
                    if self.uploader.upload(&record) {
                        debug!("uploaded {}", record);
                    } else {
                        warn!("upload failed, dropping the record");
                    }
                }
                None => warn!("sensor read failed, skipping this upload"),
            }
        }
    }

    /// Take one fresh measurement.
    pub fn sample(&mut self) -> Reading {
        self.sensor.read()
    }

    /// A fresh, fully valid metrics record, or `None` on a sensor fault.
    /// This is the only call site of the codec, which keeps the
    /// no-invalid-readings precondition in one place.
    pub fn metrics_record(&mut self) -> Option<String> {
        let reading = self.sensor.read();
        if !reading.is_valid() {
            return None;
        }
        let timestamp = self.clock.now_iso8601();
        Some(codec::encode(&self.device_id, timestamp.as_deref(), &reading, None))
    }

    /// On-demand upload: encode a fresh reading and push it. `None` means the
    /// sensor failed before an upload was even attempted.
    pub fn push(&mut self) -> Option<bool> {
        let record = self.metrics_record()?;
        Some(self.uploader.upload(&record))
    }

    pub fn uptime(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }
}
