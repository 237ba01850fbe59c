//! The catalog of OpenTherm data items this tool knows about.
//!
//! Every message is referenced by its symbolic name in the entity schema. Names are resolved to
//! [`MessageId`]s when the schema is loaded, so that nothing downstream has to deal with a name
//! that the protocol does not define.

use num_traits::FromPrimitive as _;

macro_rules! for_each_message {
    ($m:ident) => {
        $m! {
            0: Status, "Master and slave status flags";
            1: TSet, "Control setpoint (CH water temperature setpoint)";
            2: MConfigMMemberIDcode, "Master configuration flags and master MemberID code";
            3: SConfigSMemberIDcode, "Slave configuration flags and slave MemberID code";
            4: RemoteRequest, "Remote request command";
            5: ASFflags, "Application-specific fault flags and OEM fault code";
            6: RBPflags, "Remote boiler parameter transfer-enable and read/write flags";
            7: CoolingControl, "Cooling control signal";
            8: TsetCH2, "Control setpoint for the second CH circuit";
            9: TrOverride, "Remote override room setpoint";
            10: TSP, "Number of transparent slave parameters supported by the slave";
            11: TSPindexTSPvalue, "Index and value of a transparent slave parameter";
            12: FHBsize, "Size of the fault history buffer supported by the slave";
            13: FHBindexFHBvalue, "Index and value of a fault history buffer entry";
            14: MaxRelModLevelSetting, "Maximum relative modulation level setting";
            15: MaxCapacityMinModLevel, "Maximum boiler capacity and minimum modulation level";
            16: TrSet, "Room setpoint";
            17: RelModLevel, "Relative modulation level";
            18: CHPressure, "Water pressure in the CH circuit";
            19: DHWFlowRate, "Water flow rate in the DHW circuit";
            20: DayTime, "Day of week and time of day";
            21: Date, "Calendar date";
            22: Year, "Calendar year";
            23: TrSetCH2, "Room setpoint for the second CH circuit";
            24: Tr, "Room temperature";
            25: Tboiler, "Boiler flow water temperature";
            26: Tdhw, "DHW temperature";
            27: Toutside, "Outside temperature";
            28: Tret, "Return water temperature";
            29: Tstorage, "Solar storage temperature";
            30: Tcollector, "Solar collector temperature";
            31: TflowCH2, "Flow water temperature of the second CH circuit";
            32: Tdhw2, "Second DHW temperature";
            33: Texhaust, "Boiler exhaust temperature";
            34: TboilerHeatExchanger, "Boiler heat exchanger temperature";
            35: BoilerFanSpeedSetpointAndActual, "Boiler fan speed setpoint and actual value";
            36: FlameCurrent, "Electrical current through the burner flame";
            37: TrCH2, "Room temperature of the second CH circuit";
            38: RelativeHumidity, "Relative humidity measured by an external sensor";
            39: TrOverride2, "Remote override room setpoint for the second CH circuit";
            48: TdhwSetUBTdhwSetLB, "Upper and lower bounds for adjustment of the DHW setpoint";
            49: MaxTSetUBMaxTSetLB, "Upper and lower bounds for adjustment of the max CH setpoint";
            50: OTCratio, "Upper and lower bounds for adjustment of the OTC heat curve ratio";
            56: TdhwSet, "DHW setpoint";
            57: MaxTSet, "Maximum allowable CH water setpoint";
            58: Hcratio, "OTC heat curve ratio";
            100: RemoteOverrideFunction, "Function of manual and program changes to the room setpoint";
            115: OEMDiagnosticCode, "OEM-specific diagnostic or service code";
            116: SuccessfulBurnerStarts, "Number of starts of the burner";
            117: CHPumpStarts, "Number of starts of the CH pump";
            118: DHWPumpValveStarts, "Number of starts of the DHW pump or valve";
            119: DHWBurnerStarts, "Number of starts of the burner during DHW mode";
            120: BurnerOperationHours, "Number of hours the burner has been in operation";
            121: CHPumpOperationHours, "Number of hours the CH pump has been running";
            122: DHWPumpValveOperationHours, "Number of hours the DHW pump or valve has been active";
            123: DHWBurnerOperationHours, "Number of hours the burner has been on during DHW mode";
            124: OpenThermVersionMaster, "OpenTherm protocol version implemented by the master";
            125: OpenThermVersionSlave, "OpenTherm protocol version implemented by the slave";
            126: MasterVersion, "Master product type and version";
            127: SlaveVersion, "Slave product type and version";
        }
    };
}

macro_rules! make_catalog {
    ($($id: literal: $name: ident, $description: literal;)+) => {
        /// A known OpenTherm data item.
        ///
        /// The discriminant is the data-id that goes on the wire.
        #[derive(
            Clone,
            Copy,
            Debug,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            strum::EnumString,
            strum::IntoStaticStr,
            strum::VariantArray,
            num_derive::FromPrimitive,
        )]
        #[repr(u8)]
        pub enum MessageId {
            $($name = $id),+
        }

        impl MessageId {
            pub const fn description(self) -> &'static str {
                match self {
                    $(Self::$name => $description),+
                }
            }
        }
    };
}

for_each_message!(make_catalog);

/// Names that other OpenTherm implementations use for the same data item.
static ALIASES: &[(&str, MessageId)] = &[("HcratioUBHcratioLB", MessageId::OTCratio)];

impl MessageId {
    pub fn all() -> &'static [MessageId] {
        <Self as strum::VariantArray>::VARIANTS
    }

    /// Look up a message by its symbolic name (case-sensitive).
    pub fn from_name(name: &str) -> Option<MessageId> {
        if let Ok(id) = name.parse::<MessageId>() {
            return Some(id);
        }
        ALIASES.iter().find(|(alias, _)| *alias == name).map(|(_, id)| *id)
    }

    pub fn from_id(id: u8) -> Option<MessageId> {
        MessageId::from_u8(id)
    }

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl serde::Serialize for MessageId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Whether a message is exchanged as a read-data or as a write-data request.
///
/// The same data-id can be used with both; they are two different operations on the bus.
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
    strum::IntoStaticStr,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    /// The master-to-slave message type code for this direction (`READ-DATA` or `WRITE-DATA`).
    pub const fn message_type(self) -> u8 {
        match self {
            Direction::Read => 0b000,
            Direction::Write => 0b001,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.into())
    }
}
