use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const DRY_THRESHOLD: f64 = 30.0;
const WET_THRESHOLD: f64 = 60.0;

/// Soil moisture reading as stored and served by the controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorRecord {
    pub id: u64,
    pub moisture: f64,
    pub pump: bool,
    pub timestamp: DateTime<Utc>,
}

/// Manual override window on top of the automatic pump logic
#[derive(Debug, Clone, Default, Serialize)]
pub struct PumpControl {
    pub id: u64,
    pub pump_status: bool,
    #[serde(rename = "override")]
    pub override_active: bool,
    pub override_until: Option<DateTime<Utc>>,
}

impl PumpControl {
    /// `0` when no override is active or it has expired, `-1` for an
    /// indefinite override, otherwise whole seconds left.
    pub fn override_remaining(&self, now: DateTime<Utc>) -> i64 {
        if !self.override_active {
            return 0;
        }

        match self.override_until {
            None => -1,
            Some(until) if until <= now => 0,
            Some(until) => (until - now).num_seconds(),
        }
    }

    /// Manual command. Without a duration the override lasts until the next
    /// command.
    pub fn set_manual(&mut self, pump_status: bool, override_seconds: Option<u64>, now: DateTime<Utc>) {
        self.pump_status = pump_status;
        self.override_active = true;
        self.override_until = override_seconds.map(|secs| now + Duration::seconds(secs as i64));
    }

    fn expire(&mut self, now: DateTime<Utc>) -> bool {
        if self.override_active && self.override_remaining(now) == 0 {
            self.override_active = false;
            self.override_until = None;
            return true;
        }
        false
    }
}

/// Simulated field: one moisture sensor and one pump.
#[derive(Debug)]
pub struct Field {
    latest: Option<SensorRecord>,
    next_id: u64,
    pub control: PumpControl,
}

impl Field {
    pub fn new() -> Self {
        Self {
            latest: None,
            next_id: 1,
            control: PumpControl {
                id: 1,
                ..Default::default()
            },
        }
    }

    pub fn latest(&self) -> Option<&SensorRecord> {
        self.latest.as_ref()
    }

    pub fn record(&mut self, moisture: f64, pump: bool, now: DateTime<Utc>) -> SensorRecord {
        let record = SensorRecord {
            id: self.next_id,
            moisture,
            pump,
            timestamp: now,
        };
        self.next_id += 1;

        self.latest = Some(record.clone());
        record
    }

    /// Advances the simulation by one tick: expires overrides, applies the
    /// automatic hysteresis when no override is active and records a new
    /// reading.
    pub fn step(&mut self, rng: &mut impl Rng, now: DateTime<Utc>, start_moisture: f64) -> SensorRecord {
        if self.control.expire(now) {
            tracing::info!("Override expired, automatic control resumed");
        }

        let moisture = self.latest().map(|r| r.moisture).unwrap_or(start_moisture);

        if !self.control.override_active {
            if moisture < DRY_THRESHOLD && !self.control.pump_status {
                tracing::info!("Soil dry ({:.1}%), pump ON", moisture);
                self.control.pump_status = true;
            } else if moisture > WET_THRESHOLD && self.control.pump_status {
                tracing::info!("Soil wet ({:.1}%), pump OFF", moisture);
                self.control.pump_status = false;
            }
        }

        let delta = if self.control.pump_status {
            rng.gen_range(0.5..2.5)
        } else {
            -rng.gen_range(0.1..0.8)
        };
        let moisture = (moisture + delta).clamp(0.0, 100.0);

        self.record(moisture, self.control.pump_status, now)
    }
}

impl Default for Field {
    fn default() -> Self {
        Self::new()
    }
}
