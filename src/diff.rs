use serde_json::Value;

use crate::types::*;

pub(crate) fn diff_json(
    previous: &Value,
    current: &Value,
    path_prefix: &str,
    changes: &mut Vec<(String, Value, Value)>,
) {
    match (previous, current) {
        (Value::Object(prev_map), Value::Object(curr_map)) => {
            for (key, curr_val) in curr_map {
                let path = if path_prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{path_prefix}.{key}")
                };
                match prev_map.get(key) {
                    Some(prev_val) => diff_json(prev_val, curr_val, &path, changes),
                    None => changes.push((path, Value::Null, curr_val.clone())),
                }
            }
        }
        // Zone pages are arrays of objects; diff them element by element.
        (Value::Array(prev_arr), Value::Array(curr_arr)) => {
            for (i, curr_val) in curr_arr.iter().enumerate() {
                let path = if path_prefix.is_empty() {
                    i.to_string()
                } else {
                    format!("{path_prefix}.{i}")
                };
                match prev_arr.get(i) {
                    Some(prev_val) => diff_json(prev_val, curr_val, &path, changes),
                    None => changes.push((path, Value::Null, curr_val.clone())),
                }
            }
        }
        (prev, curr) if prev != curr => {
            changes.push((path_prefix.to_string(), prev.clone(), curr.clone()));
        }
        _ => {}
    }
}

/// Events describing how `current` differs from `previous`. With no previous
/// snapshot everything is reported.
pub(crate) fn diff_systems(previous: Option<&System>, current: &System) -> Vec<Event> {
    let mut events = Vec::new();

    if previous.map(|p| p.on) != Some(current.on) {
        events.push(Event::PowerChanged { on: current.on });
    }
    if previous.map(|p| p.mode) != Some(current.mode) {
        events.push(Event::ModeChanged { mode: current.mode });
    }
    if previous.map(|p| p.fan_speed) != Some(current.fan_speed) {
        events.push(Event::FanSpeedChanged {
            speed: current.fan_speed,
        });
    }
    if !previous.is_some_and(|p| p.target_temperature.approx_eq(current.target_temperature)) {
        events.push(Event::SetpointChanged {
            temp: current.target_temperature,
        });
    }
    if !previous.is_some_and(|p| p.temperature.approx_eq(current.temperature)) {
        events.push(Event::TemperatureChanged {
            temp: current.temperature,
        });
    }

    for zone in &current.zones {
        let prev_zone = previous.and_then(|p| p.zone(zone.index));
        diff_zone(prev_zone, zone, &mut events);
    }

    if let Some(prev) = previous {
        for zone in &prev.zones {
            if current.zone(zone.index).is_none() {
                events.push(Event::ZoneRemoved { index: zone.index });
            }
        }
    }

    events
}

fn diff_zone(previous: Option<&Zone>, current: &Zone, events: &mut Vec<Event>) {
    let index = current.index;
    let name = || current.name.clone();

    if previous.is_none() {
        events.push(Event::ZoneAdded {
            index,
            name: name(),
        });
    }
    if previous.map(|p| p.mode) != Some(current.mode) {
        events.push(Event::ZoneModeChanged {
            index,
            name: name(),
            mode: current.mode,
        });
    }
    if !previous.is_some_and(|p| p.target_temperature.approx_eq(current.target_temperature)) {
        events.push(Event::ZoneSetpointChanged {
            index,
            name: name(),
            temp: current.target_temperature,
        });
    }
    if !previous.is_some_and(|p| p.temperature.approx_eq(current.temperature)) {
        events.push(Event::ZoneTemperatureChanged {
            index,
            name: name(),
            temp: current.temperature,
        });
    }
}
