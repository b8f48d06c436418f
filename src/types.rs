use std::fmt;

/// Highest zone count a controller can report. Also the `CtrlZone` value at
/// which no single zone is in charge.
pub const MAX_ZONES: usize = 12;

/// Setpoint bounds used while the economy lock is off.
pub const DEFAULT_MIN_SETPOINT_C: f64 = 15.0;
pub const DEFAULT_MAX_SETPOINT_C: f64 = 30.0;

/// Two readings closer than this are the same setpoint.
const SETPOINT_TOLERANCE_C: f64 = 0.05;

/// Temperature in Celsius, as reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Temperature(f64);

impl Temperature {
    pub fn from_celsius(c: f64) -> Self {
        Self(c)
    }

    pub fn celsius(&self) -> f64 {
        self.0
    }

    /// The device echoes setpoints back with its own formatting, so equality
    /// is checked within a small tolerance.
    pub fn approx_eq(&self, other: Temperature) -> bool {
        (self.0 - other.0).abs() < SETPOINT_TOLERANCE_C
    }

    /// Command payload form, to one decimal: `23` for whole degrees, `21.5`
    /// otherwise.
    pub fn to_izone_string(&self) -> String {
        format!("{}", (self.0 * 10.0).round() / 10.0)
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}\u{00b0}C", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMode {
    Cool,
    Heat,
    Vent,
    Dry,
    Auto,
}

impl SystemMode {
    pub fn as_izone_str(&self) -> &'static str {
        match self {
            SystemMode::Cool => "cool",
            SystemMode::Heat => "heat",
            SystemMode::Vent => "vent",
            SystemMode::Dry => "dry",
            SystemMode::Auto => "auto",
        }
    }

    pub fn from_izone_str(s: &str) -> Option<Self> {
        match s {
            "cool" => Some(SystemMode::Cool),
            "heat" => Some(SystemMode::Heat),
            "vent" => Some(SystemMode::Vent),
            "dry" => Some(SystemMode::Dry),
            "auto" => Some(SystemMode::Auto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanSpeed {
    Low,
    Medium,
    High,
    Auto,
}

impl FanSpeed {
    pub fn as_izone_str(&self) -> &'static str {
        match self {
            FanSpeed::Low => "low",
            FanSpeed::Medium => "med",
            FanSpeed::High => "high",
            FanSpeed::Auto => "auto",
        }
    }

    pub fn from_izone_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(FanSpeed::Low),
            "med" => Some(FanSpeed::Medium),
            "high" => Some(FanSpeed::High),
            "auto" => Some(FanSpeed::Auto),
            _ => None,
        }
    }

    /// Rotation-speed percentage, in steps of 25 with auto at the top.
    pub fn as_percent(&self) -> u8 {
        match self {
            FanSpeed::Low => 25,
            FanSpeed::Medium => 50,
            FanSpeed::High => 75,
            FanSpeed::Auto => 100,
        }
    }

    /// Nearest speed for a percentage. Anything under 12.5% maps to no speed.
    pub fn from_percent(percent: f64) -> Option<Self> {
        if percent >= 87.5 {
            Some(FanSpeed::Auto)
        } else if percent >= 62.5 {
            Some(FanSpeed::High)
        } else if percent >= 37.5 {
            Some(FanSpeed::Medium)
        } else if percent >= 12.5 {
            Some(FanSpeed::Low)
        } else {
            None
        }
    }
}

/// Where the setpoint lives: the return-air sensor, a master zone, or the zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemControl {
    Central,
    Main,
    Zones,
}

impl SystemControl {
    pub fn as_izone_str(&self) -> &'static str {
        match self {
            SystemControl::Central => "RAS",
            SystemControl::Main => "master",
            SystemControl::Zones => "zones",
        }
    }

    pub fn from_izone_str(s: &str) -> Option<Self> {
        match s {
            "RAS" => Some(SystemControl::Central),
            "master" => Some(SystemControl::Main),
            "zones" => Some(SystemControl::Zones),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneType {
    OpenClose,
    Auto,
    Constant,
}

impl ZoneType {
    pub fn as_izone_str(&self) -> &'static str {
        match self {
            ZoneType::OpenClose => "opcl",
            ZoneType::Auto => "auto",
            ZoneType::Constant => "const",
        }
    }

    pub fn from_izone_str(s: &str) -> Option<Self> {
        match s {
            "opcl" => Some(ZoneType::OpenClose),
            "auto" => Some(ZoneType::Auto),
            "const" => Some(ZoneType::Constant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneMode {
    Open,
    Close,
    Auto,
}

impl ZoneMode {
    pub fn as_izone_str(&self) -> &'static str {
        match self {
            ZoneMode::Open => "open",
            ZoneMode::Close => "close",
            ZoneMode::Auto => "auto",
        }
    }

    pub fn from_izone_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(ZoneMode::Open),
            "close" => Some(ZoneMode::Close),
            "auto" => Some(ZoneMode::Auto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingState {
    #[default]
    Inactive,
    Idle,
    Heating,
    Cooling,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub device_uid: String,
    pub index: u8,
    pub name: String,
    pub zone_type: ZoneType,
    pub mode: ZoneMode,
    pub target_temperature: Temperature,
    pub temperature: Temperature,
    pub min_air: u8,
    pub max_air: u8,
    pub constant: u8,
    pub constant_active: bool,
}

impl Zone {
    /// Constant-pressure zones follow the system and take no commands.
    pub fn is_controllable(&self) -> bool {
        self.zone_type != ZoneType::Constant
    }

    /// Durable identity across snapshots.
    pub fn key(&self) -> String {
        format!("{}-{}", self.device_uid, self.index)
    }

    /// 1-based number used by `ZoneCommand`.
    pub fn number(&self) -> u8 {
        self.index + 1
    }

    /// Air is flowing: the system runs and the damper is not shut.
    pub fn is_active(&self, system: &System) -> bool {
        system.on && self.mode != ZoneMode::Close
    }

    /// What this zone is doing right now. In auto mode the system's own
    /// setpoint and return-air reading decide between heating and cooling.
    pub fn operating_state(&self, system: &System) -> OperatingState {
        if !self.is_active(system) {
            return OperatingState::Inactive;
        }
        match system.mode {
            SystemMode::Cool | SystemMode::Vent | SystemMode::Dry => OperatingState::Cooling,
            SystemMode::Heat => OperatingState::Heating,
            SystemMode::Auto => {
                if system.target_temperature.celsius() >= system.temperature.celsius() {
                    OperatingState::Heating
                } else {
                    OperatingState::Cooling
                }
            }
        }
    }

    /// The setpoint the zone is effectively held to. A closed zone just
    /// reports its reading, an open zone follows the system.
    pub fn effective_target_temperature(&self, system: &System) -> Temperature {
        match self.mode {
            ZoneMode::Close => self.temperature,
            ZoneMode::Open => system.target_temperature,
            ZoneMode::Auto => self.target_temperature,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct System {
    pub device_uid: String,
    pub unit_type: String,
    pub tag1: String,
    pub tag2: String,
    pub on: bool,
    pub mode: SystemMode,
    pub fan_speed: FanSpeed,
    pub supply_temperature: Temperature,
    pub target_temperature: Temperature,
    pub temperature: Temperature,
    pub control: SystemControl,
    pub control_zone: u8,
    pub economy_lock: bool,
    pub economy_min: Temperature,
    pub economy_max: Temperature,
    pub number_of_constants: u8,
    pub number_of_zones: u8,
    pub zones: Vec<Zone>,
}

impl System {
    /// True when a single setpoint governs the whole system. Otherwise each
    /// zone carries its own and temperature requests fan out per zone.
    pub fn uses_system_setpoint(&self) -> bool {
        match self.control {
            SystemControl::Central => true,
            SystemControl::Main => self.control_zone as usize >= MAX_ZONES,
            SystemControl::Zones => false,
        }
    }

    pub fn setpoint_range(&self) -> (Temperature, Temperature) {
        if self.economy_lock {
            (self.economy_min, self.economy_max)
        } else {
            (
                Temperature::from_celsius(DEFAULT_MIN_SETPOINT_C),
                Temperature::from_celsius(DEFAULT_MAX_SETPOINT_C),
            )
        }
    }

    pub fn operating_state(&self) -> OperatingState {
        if !self.on {
            return OperatingState::Inactive;
        }
        match self.mode {
            SystemMode::Cool | SystemMode::Vent | SystemMode::Dry => OperatingState::Cooling,
            SystemMode::Heat => OperatingState::Heating,
            SystemMode::Auto => {
                let supply = self.supply_temperature.celsius();
                let target = self.target_temperature.celsius();
                if supply > target {
                    OperatingState::Heating
                } else if supply < target {
                    OperatingState::Cooling
                } else {
                    OperatingState::Idle
                }
            }
        }
    }

    pub fn zone(&self, index: u8) -> Option<&Zone> {
        self.zones.iter().find(|z| z.index == index)
    }

    pub fn controllable_zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(|z| z.is_controllable())
    }

    /// Number of zones the device actually serves, capped at the page limit.
    pub fn zone_count(&self) -> usize {
        (self.number_of_zones as usize).min(MAX_ZONES)
    }
}

/// Changes detected between two consecutive snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PowerChanged { on: bool },
    ModeChanged { mode: SystemMode },
    FanSpeedChanged { speed: FanSpeed },
    SetpointChanged { temp: Temperature },
    TemperatureChanged { temp: Temperature },

    ZoneAdded { index: u8, name: String },
    ZoneRemoved { index: u8 },
    ZoneModeChanged { index: u8, name: String, mode: ZoneMode },
    ZoneSetpointChanged { index: u8, name: String, temp: Temperature },
    ZoneTemperatureChanged { index: u8, name: String, temp: Temperature },
}
