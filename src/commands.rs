use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::client::IZoneClient;
use crate::protocol::{
    CMD_SYSTEM_FAN, CMD_SYSTEM_MODE, CMD_SYSTEM_ON, CMD_UNIT_SETPOINT, CMD_ZONE, power_payload,
    zone_payload,
};
use crate::types::*;
use crate::{Error, Result};

/// How a successful command ended. Callers that only care about completion
/// can treat both the same way.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The device was already in the requested state. Nothing was written.
    Unchanged(T),
    /// Written, and the follow-up read shows the requested state.
    Confirmed(T),
}

impl<T> Outcome<T> {
    pub fn was_written(&self) -> bool {
        matches!(self, Outcome::Confirmed(_))
    }

    /// The snapshot from the command's own read.
    pub fn get(&self) -> &T {
        match self {
            Outcome::Unchanged(v) | Outcome::Confirmed(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Outcome::Unchanged(v) | Outcome::Confirmed(v) => v,
        }
    }
}

/// Per-zone result of pushing one setpoint to every zone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneDistribution {
    /// Already at the target, not written.
    pub unchanged: Vec<u8>,
    /// Written and verified.
    pub confirmed: Vec<u8>,
    /// Write rejected, or written but the verification read disagrees.
    pub failed: Vec<u8>,
    /// Why each rejected write failed, keyed by zone index.
    pub write_errors: Vec<(u8, String)>,
    /// Constant-pressure zones, never written.
    pub skipped: Vec<u8>,
    /// Zones as last read.
    pub zones: Vec<Zone>,
}

impl ZoneDistribution {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetpointOutcome {
    System(Outcome<System>),
    Zones(ZoneDistribution),
}

impl SetpointOutcome {
    pub fn is_complete(&self) -> bool {
        match self {
            SetpointOutcome::System(_) => true,
            SetpointOutcome::Zones(d) => d.is_complete(),
        }
    }
}

impl IZoneClient {
    pub async fn set_power(&self, on: bool) -> Result<Outcome<System>> {
        self.command_verify(
            CMD_SYSTEM_ON,
            None,
            power_payload(on),
            move || self.get_system(),
            |s: &System| s.on == on,
        )
        .await
    }

    pub async fn enable_system(&self) -> Result<Outcome<System>> {
        self.set_power(true).await
    }

    pub async fn disable_system(&self) -> Result<Outcome<System>> {
        self.set_power(false).await
    }

    pub async fn set_mode(&self, mode: SystemMode) -> Result<Outcome<System>> {
        self.command_verify(
            CMD_SYSTEM_MODE,
            None,
            json!(mode.as_izone_str()),
            move || self.get_system(),
            |s: &System| s.mode == mode,
        )
        .await
    }

    pub async fn set_fan_speed(&self, speed: FanSpeed) -> Result<Outcome<System>> {
        self.command_verify(
            CMD_SYSTEM_FAN,
            None,
            json!(speed.as_izone_str()),
            move || self.get_system(),
            |s: &System| s.fan_speed == speed,
        )
        .await
    }

    /// Set the target temperature for the whole system. Uses the unit
    /// setpoint when one governs the system, otherwise pushes the value to
    /// each zone in turn.
    pub async fn set_target_temperature(&self, temp: Temperature) -> Result<SetpointOutcome> {
        let system = self.get_system().await?;
        if system.uses_system_setpoint() {
            let outcome = self
                .write_and_verify(
                    system,
                    CMD_UNIT_SETPOINT,
                    None,
                    json!(temp.to_izone_string()),
                    move || self.get_system(),
                    |s: &System| s.target_temperature.approx_eq(temp),
                )
                .await?;
            Ok(SetpointOutcome::System(outcome))
        } else {
            self.distribute_setpoint(system, temp)
                .await
                .map(SetpointOutcome::Zones)
        }
    }

    pub async fn set_zone_mode(&self, index: u8, mode: ZoneMode) -> Result<Outcome<Zone>> {
        self.check_zone_index(index)?;
        self.command_verify(
            CMD_ZONE,
            Some(index),
            zone_payload(index, mode.as_izone_str()),
            move || self.read_controllable_zone(index),
            |z: &Zone| z.mode == mode,
        )
        .await
    }

    pub async fn open_zone(&self, index: u8) -> Result<Outcome<Zone>> {
        self.set_zone_mode(index, ZoneMode::Open).await
    }

    pub async fn close_zone(&self, index: u8) -> Result<Outcome<Zone>> {
        self.set_zone_mode(index, ZoneMode::Close).await
    }

    pub async fn set_zone_target_temperature(
        &self,
        index: u8,
        temp: Temperature,
    ) -> Result<Outcome<Zone>> {
        self.check_zone_index(index)?;
        self.command_verify(
            CMD_ZONE,
            Some(index),
            zone_payload(index, &temp.to_izone_string()),
            move || self.read_controllable_zone(index),
            |z: &Zone| z.target_temperature.approx_eq(temp),
        )
        .await
    }

    // -- Helpers --

    fn check_zone_index(&self, index: u8) -> Result<()> {
        let count = self.cached_zone_count().ok_or(Error::NoSystem)?;
        if (index as usize) < count {
            Ok(())
        } else {
            Err(Error::InvalidZone(index))
        }
    }

    async fn read_controllable_zone(&self, index: u8) -> Result<Zone> {
        let zone = self.get_zone(index).await?;
        if !zone.is_controllable() {
            return Err(Error::ZoneNotControllable(index));
        }
        Ok(zone)
    }

    /// Read, skip if already applied, write, read again, and report whether
    /// the device now shows the requested state.
    async fn command_verify<T, F, Fut>(
        &self,
        command: &'static str,
        zone: Option<u8>,
        payload: Value,
        read: F,
        applied: impl Fn(&T) -> bool,
    ) -> Result<Outcome<T>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let current = read().await?;
        self.write_and_verify(current, command, zone, payload, read, applied)
            .await
    }

    async fn write_and_verify<T, F, Fut>(
        &self,
        current: T,
        command: &'static str,
        zone: Option<u8>,
        payload: Value,
        read: F,
        applied: impl Fn(&T) -> bool,
    ) -> Result<Outcome<T>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if applied(&current) {
            debug!(command, zone = ?zone, "already applied, no write");
            return Ok(Outcome::Unchanged(current));
        }

        self.send_command(command, zone, payload).await?;

        // The device answers 200 whether or not it applied the change.
        let after = read().await?;
        if applied(&after) {
            debug!(command, zone = ?zone, "command confirmed");
            Ok(Outcome::Confirmed(after))
        } else {
            warn!(command, zone = ?zone, "command not reflected in device state");
            Err(Error::Unconfirmed { command, zone })
        }
    }

    async fn distribute_setpoint(
        &self,
        system: System,
        temp: Temperature,
    ) -> Result<ZoneDistribution> {
        let mut report = ZoneDistribution::default();
        let zone_count = system.number_of_zones as usize;
        let mut zones = system.zones;
        zones.sort_by_key(|z| z.index);

        let mut pending = Vec::new();
        for zone in &zones {
            if !zone.is_controllable() {
                report.skipped.push(zone.index);
            } else if zone.target_temperature.approx_eq(temp) {
                report.unchanged.push(zone.index);
            } else {
                pending.push(zone.index);
            }
        }

        if pending.is_empty() {
            debug!(target = %temp, "all zones already at target");
            report.zones = zones;
            return Ok(report);
        }

        // One write at a time, in index order: the controller loses
        // overlapping writes.
        let command = temp.to_izone_string();
        let mut written = Vec::with_capacity(pending.len());
        for index in pending {
            match self
                .send_command(CMD_ZONE, Some(index), zone_payload(index, &command))
                .await
            {
                Ok(()) => written.push(index),
                Err(e) => {
                    warn!(zone = index, error = %e, "zone setpoint write failed");
                    report.failed.push(index);
                    report.write_errors.push((index, e.to_string()));
                }
            }
        }

        if written.is_empty() {
            report.zones = zones;
            return Ok(report);
        }

        let after = self.get_zones(zone_count).await?;
        for index in written {
            let applied = after
                .iter()
                .find(|z| z.index == index)
                .is_some_and(|z| z.target_temperature.approx_eq(temp));
            if applied {
                report.confirmed.push(index);
            } else {
                warn!(zone = index, target = %temp, "zone setpoint not reflected in device state");
                report.failed.push(index);
            }
        }
        report.failed.sort_unstable();

        debug!(
            confirmed = report.confirmed.len(),
            failed = report.failed.len(),
            unchanged = report.unchanged.len(),
            "zone setpoints distributed"
        );
        report.zones = after;
        Ok(report)
    }
}
