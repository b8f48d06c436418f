use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::types::*;
use crate::{Error, Result};

pub const SYSTEM_SETTINGS: &str = "SystemSettings";
pub const ZONE_PAGES: [&str; 3] = ["Zones1_4", "Zones5_8", "Zones9_12"];
pub const ZONES_PER_PAGE: usize = 4;

pub const CMD_SYSTEM_ON: &str = "SystemON";
pub const CMD_SYSTEM_MODE: &str = "SystemMODE";
pub const CMD_SYSTEM_FAN: &str = "SystemFAN";
pub const CMD_UNIT_SETPOINT: &str = "UnitSetpoint";
pub const CMD_ZONE: &str = "ZoneCommand";

/// Firmware revisions disagree on whether numbers and flags are sent as JSON
/// scalars or as strings, so every field is read through this.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SystemSettings {
    #[serde(rename = "AirStreamDeviceUId")]
    device_uid: Scalar,
    #[serde(default)]
    unit_type: Option<Scalar>,
    #[serde(default)]
    tag1: Option<Scalar>,
    #[serde(default)]
    tag2: Option<Scalar>,
    sys_on: Scalar,
    sys_mode: Scalar,
    sys_fan: Scalar,
    supply: Scalar,
    setpoint: Scalar,
    temp: Scalar,
    #[serde(rename = "RAS")]
    ras: Scalar,
    ctrl_zone: Scalar,
    eco_lock: Scalar,
    eco_min: Scalar,
    eco_max: Scalar,
    no_of_const: Scalar,
    no_of_zones: Scalar,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ZoneRecord {
    #[serde(rename = "AirStreamDeviceUId")]
    device_uid: Scalar,
    index: Scalar,
    name: Scalar,
    #[serde(rename = "Type")]
    zone_type: Scalar,
    mode: Scalar,
    set_point: Scalar,
    temp: Scalar,
    min_air: Scalar,
    max_air: Scalar,
    #[serde(rename = "Const")]
    constant: Scalar,
    #[serde(rename = "ConstA")]
    constant_active: Scalar,
}

fn parse_error(field: &'static str, value: &Scalar) -> Error {
    let value = match value {
        Scalar::Bool(b) => b.to_string(),
        Scalar::Number(n) => n.to_string(),
        Scalar::Text(s) => s.clone(),
    };
    Error::Parse { field, value }
}

fn text(value: &Scalar) -> String {
    match value {
        Scalar::Bool(b) => b.to_string(),
        Scalar::Number(n) => n.to_string(),
        Scalar::Text(s) => s.clone(),
    }
}

fn optional_text(value: &Option<Scalar>) -> String {
    value.as_ref().map(text).unwrap_or_default()
}

fn number(field: &'static str, value: &Scalar) -> Result<f64> {
    let n = match value {
        Scalar::Number(n) => *n,
        Scalar::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| parse_error(field, value))?,
        Scalar::Bool(_) => return Err(parse_error(field, value)),
    };
    if n.is_finite() {
        Ok(n)
    } else {
        Err(parse_error(field, value))
    }
}

fn temperature(field: &'static str, value: &Scalar) -> Result<Temperature> {
    number(field, value).map(Temperature::from_celsius)
}

/// Counts, indices and percentages. Fractions are truncated.
fn small_int(field: &'static str, value: &Scalar) -> Result<u8> {
    let n = number(field, value)?.trunc();
    if (0.0..=u8::MAX as f64).contains(&n) {
        Ok(n as u8)
    } else {
        Err(parse_error(field, value))
    }
}

fn flag(value: &Scalar, truthy: &str) -> bool {
    match value {
        Scalar::Bool(b) => *b,
        Scalar::Text(s) => s == truthy,
        Scalar::Number(_) => false,
    }
}

fn enumerated<T>(
    field: &'static str,
    value: &Scalar,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T> {
    match value {
        Scalar::Text(s) => parse(s).ok_or_else(|| parse_error(field, value)),
        _ => Err(parse_error(field, value)),
    }
}

impl SystemSettings {
    pub(crate) fn into_system(self) -> Result<System> {
        Ok(System {
            device_uid: text(&self.device_uid),
            unit_type: optional_text(&self.unit_type),
            tag1: optional_text(&self.tag1),
            tag2: optional_text(&self.tag2),
            on: flag(&self.sys_on, "on"),
            mode: enumerated("SysMode", &self.sys_mode, SystemMode::from_izone_str)?,
            fan_speed: enumerated("SysFan", &self.sys_fan, FanSpeed::from_izone_str)?,
            supply_temperature: temperature("Supply", &self.supply)?,
            target_temperature: temperature("Setpoint", &self.setpoint)?,
            temperature: temperature("Temp", &self.temp)?,
            control: enumerated("RAS", &self.ras, SystemControl::from_izone_str)?,
            control_zone: small_int("CtrlZone", &self.ctrl_zone)?,
            economy_lock: flag(&self.eco_lock, "true"),
            economy_min: temperature("EcoMin", &self.eco_min)?,
            economy_max: temperature("EcoMax", &self.eco_max)?,
            number_of_constants: small_int("NoOfConst", &self.no_of_const)?,
            number_of_zones: small_int("NoOfZones", &self.no_of_zones)?,
            zones: Vec::new(),
        })
    }
}

impl ZoneRecord {
    pub(crate) fn into_zone(self) -> Result<Zone> {
        Ok(Zone {
            device_uid: text(&self.device_uid),
            index: small_int("Index", &self.index)?,
            name: text(&self.name),
            zone_type: enumerated("Type", &self.zone_type, ZoneType::from_izone_str)?,
            mode: enumerated("Mode", &self.mode, ZoneMode::from_izone_str)?,
            target_temperature: temperature("SetPoint", &self.set_point)?,
            temperature: temperature("Temp", &self.temp)?,
            min_air: small_int("MinAir", &self.min_air)?,
            max_air: small_int("MaxAir", &self.max_air)?,
            constant: small_int("Const", &self.constant)?,
            constant_active: flag(&self.constant_active, "true"),
        })
    }
}

/// Parse a `SystemSettings` body. Zones are fetched separately.
pub fn parse_system(body: &str) -> Result<System> {
    let settings: SystemSettings = serde_json::from_str(body)?;
    settings.into_system()
}

/// Parse one `ZonesX_Y` page.
pub fn parse_zone_page(body: &str) -> Result<Vec<Zone>> {
    let records: Vec<ZoneRecord> = serde_json::from_str(body)?;
    records.into_iter().map(ZoneRecord::into_zone).collect()
}

/// Pages needed to cover the first `maximum` zones.
pub fn pages_for(maximum: usize) -> usize {
    maximum.min(MAX_ZONES).div_ceil(ZONES_PER_PAGE)
}

pub fn page_for_zone(index: u8) -> usize {
    index as usize / ZONES_PER_PAGE
}

/// Every write is a single-key object named after its endpoint.
pub fn command_body(command: &str, payload: Value) -> Value {
    let mut body = Map::new();
    body.insert(command.to_string(), payload);
    Value::Object(body)
}

pub fn power_payload(on: bool) -> Value {
    json!(if on { "on" } else { "off" })
}

pub fn zone_payload(index: u8, command: &str) -> Value {
    json!({
        "ZoneNo": (index as u16 + 1).to_string(),
        "Command": command,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEM_BODY: &str = r#"{
        "AirStreamDeviceUId": "000013170",
        "UnitType": "DKN",
        "Tag1": "Home",
        "Tag2": "Upstairs",
        "SysOn": "on",
        "SysMode": "heat",
        "SysFan": "med",
        "Supply": "32.5",
        "Setpoint": "22.0",
        "Temp": "19.5",
        "RAS": "master",
        "CtrlZone": "13",
        "EcoLock": "true",
        "EcoMin": "17.0",
        "EcoMax": "27.0",
        "NoOfConst": "1",
        "NoOfZones": "6"
    }"#;

    #[test]
    fn parses_string_encoded_system() {
        let system = parse_system(SYSTEM_BODY).unwrap();
        assert_eq!(system.device_uid, "000013170");
        assert_eq!(system.tag2, "Upstairs");
        assert!(system.on);
        assert_eq!(system.mode, SystemMode::Heat);
        assert_eq!(system.fan_speed, FanSpeed::Medium);
        assert_eq!(system.supply_temperature.celsius(), 32.5);
        assert_eq!(system.control, SystemControl::Main);
        assert_eq!(system.control_zone, 13);
        assert!(system.economy_lock);
        assert_eq!(system.number_of_constants, 1);
        assert_eq!(system.number_of_zones, 6);
        assert!(system.uses_system_setpoint());
        assert!(system.zones.is_empty());
    }

    #[test]
    fn parses_numeric_system() {
        let body = r#"{
            "AirStreamDeviceUId": 42, "SysOn": "off", "SysMode": "cool",
            "SysFan": "auto", "Supply": 14, "Setpoint": 24, "Temp": 26.5,
            "RAS": "RAS", "CtrlZone": 0, "EcoLock": "false",
            "EcoMin": 15, "EcoMax": 30, "NoOfConst": 0, "NoOfZones": 4
        }"#;
        let system = parse_system(body).unwrap();
        assert_eq!(system.device_uid, "42");
        assert!(!system.on);
        assert!(!system.economy_lock);
        assert_eq!(system.unit_type, "");
        assert_eq!(system.target_temperature.celsius(), 24.0);
    }

    #[test]
    fn unknown_mode_is_parse_error() {
        let body = SYSTEM_BODY.replace(r#""SysMode": "heat""#, r#""SysMode": "turbo""#);
        let err = parse_system(&body).unwrap_err();
        match err {
            Error::Parse { field, value } => {
                assert_eq!(field, "SysMode");
                assert_eq!(value, "turbo");
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_temperature_is_parse_error() {
        let body = SYSTEM_BODY.replace(r#""Temp": "19.5""#, r#""Temp": "n/a""#);
        assert!(matches!(
            parse_system(&body),
            Err(Error::Parse { field: "Temp", .. })
        ));
    }

    #[test]
    fn missing_field_is_json_error() {
        assert!(matches!(parse_system(r#"{"SysOn": "on"}"#), Err(Error::Json(_))));
        assert!(matches!(parse_system("not json"), Err(Error::Json(_))));
    }

    #[test]
    fn parses_zone_page() {
        let body = r#"[
            {"AirStreamDeviceUId": "000013170", "Index": 0, "Name": "Living",
             "Type": "auto", "Mode": "auto", "SetPoint": "21.5", "Temp": "20.0",
             "MinAir": "0", "MaxAir": "100", "Const": "0", "ConstA": "false"},
            {"AirStreamDeviceUId": "000013170", "Index": 1, "Name": "Hall",
             "Type": "const", "Mode": "open", "SetPoint": "22", "Temp": "21",
             "MinAir": "10", "MaxAir": "90", "Const": "1", "ConstA": "true"}
        ]"#;
        let zones = parse_zone_page(body).unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].name, "Living");
        assert_eq!(zones[0].target_temperature.celsius(), 21.5);
        assert_eq!(zones[1].zone_type, ZoneType::Constant);
        assert_eq!(zones[1].min_air, 10);
        assert!(zones[1].constant_active);
    }

    #[test]
    fn page_counts() {
        let cases = [(0, 0), (1, 1), (4, 1), (5, 2), (8, 2), (9, 3), (12, 3), (15, 3)];
        for (maximum, pages) in cases {
            assert_eq!(pages_for(maximum), pages, "maximum {maximum}");
        }
        assert_eq!(page_for_zone(0), 0);
        assert_eq!(page_for_zone(4), 1);
        assert_eq!(page_for_zone(11), 2);
    }

    #[test]
    fn command_bodies() {
        assert_eq!(
            command_body(CMD_SYSTEM_ON, power_payload(true)),
            json!({"SystemON": "on"})
        );
        assert_eq!(
            command_body(CMD_ZONE, zone_payload(0, "close")),
            json!({"ZoneCommand": {"ZoneNo": "1", "Command": "close"}})
        );
        assert_eq!(
            command_body(CMD_ZONE, zone_payload(11, "22.5")),
            json!({"ZoneCommand": {"ZoneNo": "12", "Command": "22.5"}})
        );
    }
}
