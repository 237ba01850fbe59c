//! The built-in entity tables.
//!
//! These are kept in the same shape a schema overlay file uses: message names and field
//! descriptors are strings and are only checked once the tables are loaded into a
//! [`Registry`](crate::registry::Registry).

use std::borrow::Cow;

use crate::messages::Direction;

/// Which kind of entity a table holds.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::VariantArray,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    /// Read-only numeric measurement.
    #[serde(alias = "measurement")]
    #[strum(to_string = "sensor", serialize = "measurement")]
    Sensor,
    /// Read-only boolean flag.
    #[serde(alias = "flag")]
    #[strum(to_string = "binary_sensor", serialize = "flag")]
    BinarySensor,
    /// Writable boolean.
    Switch,
    /// Writable numeric value.
    #[serde(alias = "number", alias = "input")]
    #[strum(to_string = "setpoint", serialize = "number", serialize = "input")]
    Setpoint,
}

impl Category {
    pub fn all() -> &'static [Category] {
        <Self as strum::VariantArray>::VARIANTS
    }

    pub const fn is_writable(self) -> bool {
        matches!(self, Category::Switch | Category::Setpoint)
    }

    /// How the message carrying an entity of this category is exchanged.
    pub const fn direction(self) -> Direction {
        if self.is_writable() { Direction::Write } else { Direction::Read }
    }

    /// Whether entities of this category carry a boolean (flag) value.
    pub const fn is_boolean(self) -> bool {
        matches!(self, Category::BinarySensor | Category::Switch)
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a switch does when the device starts up.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::IntoStaticStr,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RestoreMode {
    RestoreDefaultOff,
    RestoreDefaultOn,
    AlwaysOff,
    AlwaysOn,
}

impl RestoreMode {
    /// The state to apply at start, given the previously persisted state if there is one.
    pub fn initial_state(self, persisted: Option<bool>) -> bool {
        match self {
            RestoreMode::RestoreDefaultOff => persisted.unwrap_or(false),
            RestoreMode::RestoreDefaultOn => persisted.unwrap_or(true),
            RestoreMode::AlwaysOff => false,
            RestoreMode::AlwaysOn => true,
        }
    }
}

impl std::fmt::Display for RestoreMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.into())
    }
}

/// A setpoint bound reported by the device in a message of its own.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawBound<'a> {
    #[serde(borrow)]
    pub message: Cow<'a, str>,
    #[serde(borrow)]
    pub message_data: Cow<'a, str>,
}

/// An entity descriptor as written down, before validation.
///
/// Attributes that only apply to some categories are optional here; the registry checks that
/// each category gets the ones it needs and none of the ones it does not.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct RawEntity<'a> {
    #[serde(borrow, default)]
    pub description: Cow<'a, str>,
    #[serde(borrow)]
    pub message: Cow<'a, str>,
    #[serde(borrow)]
    pub message_data: Cow<'a, str>,
    pub keep_updated: bool,
    #[serde(default)]
    pub default_mode: Option<RestoreMode>,
    #[serde(default)]
    pub range: Option<(f32, f32)>,
    #[serde(default)]
    pub step: Option<f32>,
    #[serde(borrow, default)]
    pub auto_min_value: Option<RawBound<'a>>,
    #[serde(borrow, default)]
    pub auto_max_value: Option<RawBound<'a>>,
}

/// The entities of one category, in the order they were written.
///
/// Repeated keys are kept, so that the registry can reject them rather than have one entry
/// silently replace another.
#[derive(Clone, Debug, Default)]
pub struct RawTable<'a>(pub Vec<(Cow<'a, str>, RawEntity<'a>)>);

impl<'de: 'a, 'a> serde::Deserialize<'de> for RawTable<'a> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor<'a>(std::marker::PhantomData<RawTable<'a>>);

        impl<'de: 'a, 'a> serde::de::Visitor<'de> for Visitor<'a> {
            type Value = RawTable<'a>;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map from entity keys to entity descriptors")
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut map: A,
            ) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<Cow<'a, str>, RawEntity<'a>>()? {
                    entries.push(entry);
                }
                Ok(RawTable(entries))
            }
        }

        deserializer.deserialize_map(Visitor(std::marker::PhantomData))
    }
}

/// A whole schema: for each category, entity key to descriptor.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSchema<'a> {
    #[serde(borrow, default, alias = "measurement")]
    pub sensor: RawTable<'a>,
    #[serde(borrow, default, alias = "flag")]
    pub binary_sensor: RawTable<'a>,
    #[serde(borrow, default)]
    pub switch: RawTable<'a>,
    #[serde(borrow, default, alias = "number", alias = "input")]
    pub setpoint: RawTable<'a>,
}

impl<'a> RawSchema<'a> {
    pub fn entries(&self) -> impl Iterator<Item = (Category, &str, &RawEntity<'a>)> {
        let tables = [
            (Category::Sensor, &self.sensor),
            (Category::BinarySensor, &self.binary_sensor),
            (Category::Switch, &self.switch),
            (Category::Setpoint, &self.setpoint),
        ];
        tables
            .into_iter()
            .flat_map(|(category, table)| table.0.iter().map(move |(k, v)| (category, &**k, v)))
    }
}

macro_rules! optional {
    () => {
        None
    };
    ($($lit: tt)+) => {
        Some($($lit)*)
    };
}

macro_rules! bound {
    ($message: literal / $data: literal) => {
        RawBound { message: Cow::Borrowed($message), message_data: Cow::Borrowed($data) }
    };
}

macro_rules! entity_table {
    ($(
        $key: literal: $message: literal, $data: literal, $keep_updated: literal, $description: literal
        $(, default = $default: ident)?
        $(, range = ($min: literal, $max: literal), step = $step: literal)?
        $(, auto_min = $min_message: literal / $min_data: literal)?
        $(, auto_max = $max_message: literal / $max_data: literal)?
    ;)+) => {
        &[$(($key, RawEntity {
            description: Cow::Borrowed($description),
            message: Cow::Borrowed($message),
            message_data: Cow::Borrowed($data),
            keep_updated: $keep_updated,
            default_mode: optional!($(RestoreMode::$default)?),
            range: optional!($(($min, $max))?),
            step: optional!($($step)?),
            auto_min_value: optional!($(bound!($min_message / $min_data))?),
            auto_max_value: optional!($(bound!($max_message / $max_data))?),
        })),+]
    };
}

pub type Table = &'static [(&'static str, RawEntity<'static>)];

pub static SENSORS: Table = entity_table! {
    "rel_mod_level": "RelModLevel", "f88", true, "Relative modulation level";
    "ch_pressure": "CHPressure", "f88", true, "Water pressure in CH circuit";
    "dhw_flow_rate": "DHWFlowRate", "f88", true, "Water flow rate in DHW circuit";
    "t_boiler": "Tboiler", "f88", true, "Boiler water temperature";
    "t_dhw": "Tdhw", "f88", true, "DHW temperature";
    "t_outside": "Toutside", "f88", true, "Outside temperature";
    "t_ret": "Tret", "f88", true, "Return water temperature";
    "t_storage": "Tstorage", "f88", true, "Solar storage temperature";
    "t_collector": "Tcollector", "s16", true, "Solar collector temperature";
    "t_flow_ch2": "TflowCH2", "f88", true, "Flow water temperature CH2 circuit";
    "t_dhw2": "Tdhw2", "f88", true, "Domestic hot water temperature 2";
    "t_exhaust": "Texhaust", "s16", true, "Boiler exhaust temperature";
    "burner_starts": "SuccessfulBurnerStarts", "u16", true, "Number of starts burner";
    "ch_pump_starts": "CHPumpStarts", "u16", true, "Number of starts CH pump";
    "dhw_pump_valve_starts": "DHWPumpValveStarts", "u16", true, "Number of starts DHW pump/valve";
    "dhw_burner_starts": "DHWBurnerStarts", "u16", true, "Number of starts burner during DHW mode";
    "burner_operation_hours": "BurnerOperationHours", "u16", true,
        "Number of hours that burner is in operation";
    "ch_pump_operation_hours": "CHPumpOperationHours", "u16", true,
        "Number of hours that CH pump has been running";
    "dhw_pump_valve_operation_hours": "DHWPumpValveOperationHours", "u16", true,
        "Number of hours that DHW pump has been running or DHW valve has been opened";
    "dhw_burner_operation_hours": "DHWBurnerOperationHours", "u16", true,
        "Number of hours that burner is in operation during DHW mode";
    "t_dhw_set_ub": "TdhwSetUBTdhwSetLB", "s8_hb", false, "Upper bound for adjustment of DHW setpoint";
    "t_dhw_set_lb": "TdhwSetUBTdhwSetLB", "s8_lb", false, "Lower bound for adjustment of DHW setpoint";
    "max_t_set_ub": "MaxTSetUBMaxTSetLB", "s8_hb", false,
        "Upper bound for adjustment of max CH setpoint";
    "max_t_set_lb": "MaxTSetUBMaxTSetLB", "s8_lb", false,
        "Lower bound for adjustment of max CH setpoint";
    "otc_ratio_ub": "OTCratio", "s8_hb", false, "Upper bound of OTC curve";
    "otc_ratio_lb": "OTCratio", "s8_lb", false, "Lower bound of OTC curve";
    "t_dhw_set": "TdhwSet", "f88", true, "Domestic hot water temperature setpoint";
    "max_t_set": "MaxTSet", "f88", true, "Maximum allowable CH water setpoint";
    "otc_hc_ratio": "Hcratio", "f88", true, "OTC heat curve ratio";
    "oem_fault_code": "ASFflags", "u8_lb", true, "OEM fault code";
    "t_heat_exchanger": "TboilerHeatExchanger", "s16", true, "Boiler heat exchanger temperature";
    "fan_speed": "BoilerFanSpeedSetpointAndActual", "u8_lb_60", true, "Boiler fan speed";
    "boiler_flame_current": "FlameCurrent", "f88", true, "Boiler flame current (uA)";
    "oem_diagnostic_code": "OEMDiagnosticCode", "u16", true, "OEM diagnostic code";
    "max_capacity": "MaxCapacityMinModLevel", "u8_hb", false, "Maximum boiler capacity (KW)";
    "min_mod_level": "MaxCapacityMinModLevel", "u8_lb", false, "Minimum modulation level";
    "opentherm_version_device": "OpenThermVersionSlave", "f88", false,
        "Version of OpenTherm implemented by slave";
    "device_type": "SlaveVersion", "u8_hb", false, "Slave product type";
    "device_version": "SlaveVersion", "u8_lb", false, "Slave product version";
    "device_id": "SConfigSMemberIDcode", "u8_lb", false, "Slave ID code";
};

pub static BINARY_SENSORS: Table = entity_table! {
    "fault_indication": "Status", "flag8_lb_0", true, "Status: Fault indication";
    "ch_active": "Status", "flag8_lb_1", true, "Status: Central Heating active";
    "dhw_active": "Status", "flag8_lb_2", true, "Status: Domestic Hot Water active";
    "flame_on": "Status", "flag8_lb_3", true, "Status: Flame on";
    "cooling_active": "Status", "flag8_lb_4", true, "Status: Cooling active";
    "ch2_active": "Status", "flag8_lb_5", true, "Status: Central Heating 2 active";
    "diagnostic_indication": "Status", "flag8_lb_6", true, "Status: Diagnostic event";
    "dhw_present": "SConfigSMemberIDcode", "flag8_hb_0", false, "Configuration: DHW present";
    "control_type_on_off": "SConfigSMemberIDcode", "flag8_hb_1", false,
        "Configuration: Control type is on/off";
    "cooling_supported": "SConfigSMemberIDcode", "flag8_hb_2", false,
        "Configuration: Cooling supported";
    "dhw_storage_tank": "SConfigSMemberIDcode", "flag8_hb_3", false,
        "Configuration: DHW storage tank";
    "controller_pump_control_allowed": "SConfigSMemberIDcode", "flag8_hb_4", false,
        "Configuration: Master pump control allowed";
    "master_pump_control_allowed": "SConfigSMemberIDcode", "flag8_hb_4", false,
        "Configuration: Master pump control allowed";
    "ch2_present": "SConfigSMemberIDcode", "flag8_hb_5", false, "Configuration: CH2 present";
    "dhw_setpoint_transfer_enabled": "RBPflags", "flag8_hb_0", false,
        "Remote boiler parameters: DHW setpoint transfer enabled";
    "max_ch_setpoint_transfer_enabled": "RBPflags", "flag8_hb_1", false,
        "Remote boiler parameters: CH maximum setpoint transfer enabled";
    "dhw_setpoint_rw": "RBPflags", "flag8_lb_0", false,
        "Remote boiler parameters: DHW setpoint read/write";
    "max_ch_setpoint_rw": "RBPflags", "flag8_lb_1", false,
        "Remote boiler parameters: CH maximum setpoint read/write";
    "service_request": "ASFflags", "flag8_hb_0", true, "Service Request";
    "lockout_reset": "ASFflags", "flag8_hb_1", true, "Lockout Reset";
    "low_water_pressure": "ASFflags", "flag8_hb_2", true, "Low Water Pressure";
    "flame_fault": "ASFflags", "flag8_hb_3", true, "Gas/Flame Fault";
    "air_pressure_fault": "ASFflags", "flag8_hb_4", true, "Air Pressure Fault";
    "water_over_temperature": "ASFflags", "flag8_hb_5", true, "Water Over Temperature";
};

pub static SWITCHES: Table = entity_table! {
    "ch_enable": "Status", "flag8_hb_0", true, "Central Heating enabled",
        default = RestoreDefaultOn;
    "dhw_enable": "Status", "flag8_hb_1", true, "Domestic Hot Water enabled",
        default = RestoreDefaultOn;
    "cooling_enable": "Status", "flag8_hb_2", true, "Cooling enabled",
        default = RestoreDefaultOff;
    "otc_active": "Status", "flag8_hb_3", true, "Outside temperature compensation active",
        default = RestoreDefaultOff;
    "ch2_active": "Status", "flag8_hb_4", true, "Central Heating 2 active",
        default = RestoreDefaultOff;
    "sm_active": "Status", "flag8_hb_5", true, "Summer mode active",
        default = RestoreDefaultOff;
    "dhw_block": "Status", "flag8_hb_6", true, "DHW Blocking",
        default = RestoreDefaultOff;
    "lock_out_reset": "RemoteRequest", "flag8_hb_1", true, "Boiler Lock-out Reset",
        default = RestoreDefaultOff;
};

pub static SETPOINTS: Table = entity_table! {
    "t_set": "TSet", "f88", true,
        "Control setpoint: temperature setpoint for the boiler's supply water",
        range = (0.0, 100.0), step = 0.1,
        auto_max = "MaxTSet" / "f88";
    "t_set_ch2": "TsetCH2", "f88", true,
        "Control setpoint 2: temperature setpoint for the boiler's supply water on the second \
         heating circuit",
        range = (0.0, 100.0), step = 0.1,
        auto_max = "MaxTSet" / "f88";
    "cooling_control": "CoolingControl", "f88", true, "Cooling control signal",
        range = (0.0, 100.0), step = 1.0;
    "t_dhw_set": "TdhwSet", "f88", true, "Domestic hot water temperature setpoint",
        range = (0.0, 127.0), step = 0.1,
        auto_min = "TdhwSetUBTdhwSetLB" / "s8_lb",
        auto_max = "TdhwSetUBTdhwSetLB" / "s8_hb";
    "max_t_set": "MaxTSet", "f88", true, "Maximum allowable CH water setpoint",
        range = (0.0, 127.0), step = 0.1,
        auto_min = "MaxTSetUBMaxTSetLB" / "s8_lb",
        auto_max = "MaxTSetUBMaxTSetLB" / "s8_hb";
    "t_room_set": "TrSet", "f88", true, "Current room temperature setpoint (informational)",
        range = (-40.0, 127.0), step = 0.1;
    "t_room_set_ch2": "TrSetCH2", "f88", true,
        "Current room temperature setpoint on CH2 (informational)",
        range = (-40.0, 127.0), step = 0.1;
    "t_room": "Tr", "f88", true, "Current sensed room temperature (informational)",
        range = (-40.0, 127.0), step = 0.1;
    "max_rel_mod_level": "MaxRelModLevelSetting", "f88", true, "Maximum relative modulation level",
        range = (0.0, 127.0), step = 0.1,
        auto_min = "MaxCapacityMinModLevel" / "u8_lb";
};

/// The built-in tables, in category order.
pub fn builtin() -> [(Category, Table); 4] {
    [
        (Category::Sensor, SENSORS),
        (Category::BinarySensor, BINARY_SENSORS),
        (Category::Switch, SWITCHES),
        (Category::Setpoint, SETPOINTS),
    ]
}
