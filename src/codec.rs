//! Extraction and injection of typed values from/into the two data bytes of an OpenTherm message.

use std::num::NonZeroU16;

/// The two data bytes of a message, high byte first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Payload(pub [u8; 2]);

impl Payload {
    pub const ZERO: Self = Self([0, 0]);

    pub const fn new(hb: u8, lb: u8) -> Self {
        Self([hb, lb])
    }

    pub const fn from_u16(word: u16) -> Self {
        Self(word.to_be_bytes())
    }

    pub const fn to_u16(self) -> u16 {
        u16::from_be_bytes(self.0)
    }

    pub const fn hb(self) -> u8 {
        self.0[0]
    }

    pub const fn lb(self) -> u8 {
        self.0[1]
    }

    pub const fn byte(self, byte: Byte) -> u8 {
        match byte {
            Byte::High => self.hb(),
            Byte::Low => self.lb(),
        }
    }

    const fn with_byte(self, byte: Byte, value: u8) -> Self {
        match byte {
            Byte::High => Self([value, self.0[1]]),
            Byte::Low => Self([self.0[0], value]),
        }
    }
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02X}{:02X}", self.hb(), self.lb())
    }
}

impl serde::Serialize for Payload {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("`{0}` is not a payload, expected four hex digits such as `0x0190` or `01 90`")]
pub struct InvalidPayload(String);

impl std::str::FromStr for Payload {
    type Err = InvalidPayload;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let digits = digits.split_whitespace().collect::<String>();
        if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidPayload(s.to_string()));
        }
        u16::from_str_radix(&digits, 16)
            .map(Self::from_u16)
            .map_err(|_| InvalidPayload(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Byte {
    High,
    Low,
}

impl Byte {
    const fn suffix(self) -> &'static str {
        match self {
            Byte::High => "hb",
            Byte::Low => "lb",
        }
    }

    fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "hb" => Some(Byte::High),
            "lb" => Some(Byte::Low),
            _ => None,
        }
    }
}

/// How a value is laid out in a [`Payload`].
///
/// Parsed from the descriptor strings used in the entity schema (`flag8_lb_3`, `s8_hb`, `f88`,
/// ...) and rendered back to the same canonical form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    /// A single bit of one byte; bit 0 is the least significant one.
    Flag { byte: Byte, bit: u8 },
    /// An unsigned byte, optionally divided by `scale` when presented.
    Unsigned8 { byte: Byte, scale: Option<NonZeroU16> },
    Signed8 { byte: Byte },
    Unsigned16,
    Signed16,
    /// 1 sign bit, 7 integer bits and 8 fractional bits.
    Fixed88,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("`{0}` is not a valid field descriptor")]
pub struct InvalidDescriptor(pub String);

impl std::str::FromStr for Field {
    type Err = InvalidDescriptor;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidDescriptor(s.to_string());
        let mut parts = s.split('_');
        let kind = parts.next().ok_or_else(invalid)?;
        let byte = parts.next();
        let extra = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }
        let field = match (kind, byte, extra) {
            ("u16", None, None) => Field::Unsigned16,
            ("s16", None, None) => Field::Signed16,
            ("f88", None, None) => Field::Fixed88,
            ("flag8", Some(byte), Some(bit)) => {
                let byte = Byte::from_suffix(byte).ok_or_else(invalid)?;
                let [digit @ b'0'..=b'7'] = bit.as_bytes() else {
                    return Err(invalid());
                };
                Field::Flag { byte, bit: digit - b'0' }
            }
            ("u8", Some(byte), None) => {
                Field::Unsigned8 { byte: Byte::from_suffix(byte).ok_or_else(invalid)?, scale: None }
            }
            ("u8", Some("lb"), Some(scale)) => {
                if !scale.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                let scale = scale.parse::<NonZeroU16>().map_err(|_| invalid())?;
                Field::Unsigned8 { byte: Byte::Low, scale: Some(scale) }
            }
            ("s8", Some(byte), None) => {
                Field::Signed8 { byte: Byte::from_suffix(byte).ok_or_else(invalid)? }
            }
            _ => return Err(invalid()),
        };
        Ok(field)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Field::Flag { byte, bit } => write!(f, "flag8_{}_{}", byte.suffix(), bit),
            Field::Unsigned8 { byte, scale: None } => write!(f, "u8_{}", byte.suffix()),
            Field::Unsigned8 { byte, scale: Some(k) } => write!(f, "u8_{}_{}", byte.suffix(), k),
            Field::Signed8 { byte } => write!(f, "s8_{}", byte.suffix()),
            Field::Unsigned16 => f.write_str("u16"),
            Field::Signed16 => f.write_str("s16"),
            Field::Fixed88 => f.write_str("f88"),
        }
    }
}

impl serde::Serialize for Field {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Unsigned(u16),
    Signed(i16),
    Float(f32),
}

impl Value {
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Bool(b) => f64::from(u8::from(b)),
            Value::Unsigned(n) => f64::from(n),
            Value::Signed(n) => f64::from(n),
            Value::Float(n) => f64::from(n),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Unsigned(n) => write!(f, "{}", n),
            Value::Signed(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Value::Bool(b) => serializer.serialize_bool(b),
            Value::Unsigned(n) => serializer.serialize_u16(n),
            Value::Signed(n) => serializer.serialize_i16(n),
            Value::Float(n) => serializer.serialize_f32(n),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("`{0}` is not a value, expected a boolean or a number")]
pub struct InvalidValue(String);

impl std::str::FromStr for Value {
    type Err = InvalidValue;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "true" | "on" => return Ok(Value::Bool(true)),
            "false" | "off" => return Ok(Value::Bool(false)),
            _ => {}
        }
        if let Ok(n) = s.parse::<u16>() {
            return Ok(Value::Unsigned(n));
        }
        if let Ok(n) = s.parse::<i16>() {
            return Ok(Value::Signed(n));
        }
        match s.parse::<f32>() {
            Ok(n) if n.is_finite() => Ok(Value::Float(n)),
            _ => Err(InvalidValue(s.to_string())),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RangeError {
    #[error("value {0} cannot be encoded as `{1}`")]
    Unrepresentable(Value, Field),
    #[error("value {0} is outside of the allowed range {1}..={2}")]
    OutsideBounds(Value, f32, f32),
}

impl Field {
    pub const fn is_flag(&self) -> bool {
        matches!(self, Field::Flag { .. })
    }

    pub fn decode(&self, payload: Payload) -> Value {
        match *self {
            Field::Flag { byte, bit } => Value::Bool(payload.byte(byte) & (1 << bit) != 0),
            Field::Unsigned8 { byte, scale: None } => Value::Unsigned(payload.byte(byte).into()),
            Field::Unsigned8 { byte, scale: Some(k) } => {
                Value::Float(f32::from(payload.byte(byte)) / f32::from(k.get()))
            }
            Field::Signed8 { byte } => Value::Signed((payload.byte(byte) as i8).into()),
            Field::Unsigned16 => Value::Unsigned(payload.to_u16()),
            Field::Signed16 => Value::Signed(payload.to_u16() as i16),
            Field::Fixed88 => Value::Float(f32::from(payload.to_u16() as i16) / 256.0),
        }
    }

    /// Encode `value` into an otherwise all-zero payload.
    pub fn encode(&self, value: Value) -> Result<Payload, RangeError> {
        self.encode_into(value, Payload::ZERO)
    }

    /// Encode `value` on top of `base`, leaving the bits this field does not cover untouched.
    pub fn encode_into(&self, value: Value, base: Payload) -> Result<Payload, RangeError> {
        let unrepresentable = || RangeError::Unrepresentable(value, *self);
        Ok(match *self {
            Field::Flag { byte, bit } => {
                let set = match value {
                    Value::Bool(b) => b,
                    _ => match integral(value, 0, 1) {
                        Some(n) => n == 1,
                        None => return Err(unrepresentable()),
                    },
                };
                let mask = 1u8 << bit;
                let current = base.byte(byte);
                base.with_byte(byte, if set { current | mask } else { current & !mask })
            }
            Field::Unsigned8 { byte, scale: None } => {
                let n = integral(value, 0, 255).ok_or_else(unrepresentable)?;
                base.with_byte(byte, n as u8)
            }
            Field::Unsigned8 { byte, scale: Some(k) } => {
                let raw = (value.as_f64() * f64::from(k.get())).round();
                if !(0.0..=255.0).contains(&raw) || matches!(value, Value::Bool(_)) {
                    return Err(unrepresentable());
                }
                base.with_byte(byte, raw as u8)
            }
            Field::Signed8 { byte } => {
                let n = integral(value, -128, 127).ok_or_else(unrepresentable)?;
                base.with_byte(byte, n as i8 as u8)
            }
            Field::Unsigned16 => {
                Payload::from_u16(integral(value, 0, 65535).ok_or_else(unrepresentable)? as u16)
            }
            Field::Signed16 => {
                let n = integral(value, -32768, 32767).ok_or_else(unrepresentable)?;
                Payload::from_u16(n as i16 as u16)
            }
            Field::Fixed88 => {
                let raw = (value.as_f64() * 256.0).round();
                if !raw.is_finite()
                    || raw < f64::from(i16::MIN)
                    || raw > f64::from(i16::MAX)
                    || matches!(value, Value::Bool(_))
                {
                    return Err(unrepresentable());
                }
                Payload::from_u16(raw as i16 as u16)
            }
        })
    }
}

/// `value` as an integer within `min..=max`, if it is one.
fn integral(value: Value, min: i32, max: i32) -> Option<i32> {
    let n = match value {
        Value::Bool(_) => return None,
        Value::Unsigned(n) => i32::from(n),
        Value::Signed(n) => i32::from(n),
        Value::Float(n) => {
            if !n.is_finite() || n.fract() != 0.0 {
                return None;
            }
            let n = f64::from(n);
            if n < f64::from(min) || n > f64::from(max) {
                return None;
            }
            n as i32
        }
    };
    (min..=max).contains(&n).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(s: &str) -> Field {
        s.parse().unwrap()
    }

    #[test]
    fn parse_grammar() {
        assert_eq!(field("flag8_hb_0"), Field::Flag { byte: Byte::High, bit: 0 });
        assert_eq!(field("flag8_lb_7"), Field::Flag { byte: Byte::Low, bit: 7 });
        assert_eq!(field("u8_hb"), Field::Unsigned8 { byte: Byte::High, scale: None });
        assert_eq!(
            field("u8_lb_60"),
            Field::Unsigned8 { byte: Byte::Low, scale: NonZeroU16::new(60) }
        );
        assert_eq!(field("s8_lb"), Field::Signed8 { byte: Byte::Low });
        assert_eq!(field("u16"), Field::Unsigned16);
        assert_eq!(field("s16"), Field::Signed16);
        assert_eq!(field("f88"), Field::Fixed88);
    }

    #[test]
    fn reject_malformed_descriptors() {
        for bad in [
            "", "f8.8", "F88", "flag8_hb", "flag8_hb_8", "flag8_xb_1", "flag8_lb_01", "flag8_hb_-1",
            "u8", "u8_lb_0", "u8_hb_60", "u8_lb_x", "u8_lb_+5", "s8", "s8_lb_2", "u16_hb", "s16_",
            "f88_lb", "u32", "flag8_lb_1_2",
        ] {
            assert_eq!(bad.parse::<Field>(), Err(InvalidDescriptor(bad.to_string())), "{bad}");
        }
    }

    #[test]
    fn display_is_canonical() {
        for s in ["flag8_hb_4", "flag8_lb_0", "u8_hb", "u8_lb", "u8_lb_60", "s8_hb", "s8_lb", "u16", "s16", "f88"] {
            assert_eq!(field(s).to_string(), s);
        }
    }

    #[test]
    fn decode_status_flags() {
        let payload = Payload::new(0x00, 0x05);
        assert_eq!(field("flag8_lb_0").decode(payload), Value::Bool(true));
        assert_eq!(field("flag8_lb_1").decode(payload), Value::Bool(false));
        assert_eq!(field("flag8_lb_2").decode(payload), Value::Bool(true));
        assert_eq!(field("flag8_hb_0").decode(payload), Value::Bool(false));
    }

    #[test]
    fn decode_numbers() {
        assert_eq!(Field::Fixed88.decode(Payload::new(0x01, 0x90)), Value::Float(1.5625));
        assert_eq!(Field::Fixed88.decode(Payload::new(0xFF, 0x80)), Value::Float(-0.5));
        assert_eq!(Field::Fixed88.decode(Payload::new(0x80, 0x00)), Value::Float(-128.0));
        assert_eq!(Field::Unsigned16.decode(Payload::new(0x01, 0x90)), Value::Unsigned(400));
        assert_eq!(Field::Signed16.decode(Payload::new(0xFF, 0xFE)), Value::Signed(-2));
        assert_eq!(field("s8_hb").decode(Payload::new(0xF6, 0x28)), Value::Signed(-10));
        assert_eq!(field("s8_lb").decode(Payload::new(0xF6, 0x28)), Value::Signed(40));
        assert_eq!(field("u8_hb").decode(Payload::new(0xF6, 0x28)), Value::Unsigned(246));
        assert_eq!(field("u8_lb_60").decode(Payload::new(0x00, 0x1E)), Value::Float(0.5));
    }

    #[test]
    fn flag_round_trip() {
        for byte in ["hb", "lb"] {
            for bit in 0..8 {
                let f = field(&format!("flag8_{byte}_{bit}"));
                for state in [true, false] {
                    let encoded = f.encode(Value::Bool(state)).unwrap();
                    assert_eq!(f.decode(encoded), Value::Bool(state));
                }
            }
        }
    }

    #[test]
    fn signed_byte_round_trip() {
        for f in [field("s8_hb"), field("s8_lb")] {
            for v in -128i16..=127 {
                let encoded = f.encode(Value::Signed(v)).unwrap();
                assert_eq!(f.decode(encoded), Value::Signed(v));
            }
        }
    }

    #[test]
    fn word_round_trip() {
        for v in 0..=u16::MAX {
            let encoded = Field::Unsigned16.encode(Value::Unsigned(v)).unwrap();
            assert_eq!(Field::Unsigned16.decode(encoded), Value::Unsigned(v));
        }
        for v in i16::MIN..=i16::MAX {
            let encoded = Field::Signed16.encode(Value::Signed(v)).unwrap();
            assert_eq!(Field::Signed16.decode(encoded), Value::Signed(v));
        }
    }

    #[test]
    fn fixed_point_round_trip() {
        let mut x = -128.0f32;
        while x <= 127.996 {
            let encoded = Field::Fixed88.encode(Value::Float(x)).unwrap();
            let Value::Float(decoded) = Field::Fixed88.decode(encoded) else {
                panic!("f88 decodes to a float");
            };
            assert!((decoded - x).abs() <= 1.0 / 256.0, "{x} decoded as {decoded}");
            x += 0.0137;
        }
        assert_eq!(Field::Fixed88.encode(Value::Float(1.5625)), Ok(Payload::new(0x01, 0x90)));
    }

    #[test]
    fn byte_halves_leave_the_other_half_alone() {
        assert_eq!(field("s8_hb").encode(Value::Signed(-1)), Ok(Payload::new(0xFF, 0x00)));
        assert_eq!(field("u8_lb").encode(Value::Unsigned(7)), Ok(Payload::new(0x00, 0x07)));
        let base = Payload::new(0x12, 0x34);
        assert_eq!(field("u8_lb").encode_into(Value::Unsigned(7), base), Ok(Payload::new(0x12, 0x07)));
        assert_eq!(
            field("flag8_hb_0").encode_into(Value::Bool(true), base),
            Ok(Payload::new(0x13, 0x34))
        );
        assert_eq!(
            field("flag8_lb_2").encode_into(Value::Bool(false), base),
            Ok(Payload::new(0x12, 0x30))
        );
        assert_eq!(Field::Fixed88.encode_into(Value::Float(1.0), base), Ok(Payload::new(0x01, 0x00)));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let s8 = field("s8_hb");
        assert!(s8.encode(Value::Signed(128)).is_err());
        assert!(s8.encode(Value::Signed(-129)).is_err());
        assert!(s8.encode(Value::Float(1.5)).is_err());
        assert!(field("u8_lb").encode(Value::Signed(-1)).is_err());
        assert!(field("u8_lb").encode(Value::Unsigned(256)).is_err());
        assert!(Field::Signed16.encode(Value::Unsigned(32768)).is_err());
        assert!(Field::Unsigned16.encode(Value::Signed(-1)).is_err());
        assert!(Field::Fixed88.encode(Value::Float(128.0)).is_err());
        assert!(Field::Fixed88.encode(Value::Float(f32::NAN)).is_err());
        assert!(Field::Fixed88.encode(Value::Bool(true)).is_err());
        assert!(field("flag8_lb_0").encode(Value::Unsigned(2)).is_err());
        assert_eq!(
            s8.encode(Value::Signed(200)),
            Err(RangeError::Unrepresentable(Value::Signed(200), s8))
        );
    }

    #[test]
    fn numeric_flags_and_scaled_bytes() {
        let flag = field("flag8_hb_1");
        assert_eq!(flag.encode(Value::Unsigned(1)), Ok(Payload::new(0x02, 0x00)));
        assert_eq!(flag.encode(Value::Float(0.0)), Ok(Payload::ZERO));
        let fan = field("u8_lb_60");
        assert_eq!(fan.encode(Value::Float(0.5)), Ok(Payload::new(0x00, 30)));
        assert!(fan.encode(Value::Float(5.0)).is_err());
    }

    #[test]
    fn payload_text() {
        assert_eq!("0x0190".parse::<Payload>(), Ok(Payload::new(0x01, 0x90)));
        assert_eq!("01 90".parse::<Payload>(), Ok(Payload::new(0x01, 0x90)));
        assert_eq!("ff80".parse::<Payload>(), Ok(Payload::new(0xFF, 0x80)));
        assert!("0x190".parse::<Payload>().is_err());
        assert!("0x01900".parse::<Payload>().is_err());
        assert!("zz00".parse::<Payload>().is_err());
        assert_eq!(Payload::new(0x01, 0x90).to_string(), "0x0190");
    }

    #[test]
    fn value_text() {
        assert_eq!("on".parse::<Value>(), Ok(Value::Bool(true)));
        assert_eq!("42".parse::<Value>(), Ok(Value::Unsigned(42)));
        assert_eq!("-4".parse::<Value>(), Ok(Value::Signed(-4)));
        assert_eq!("55.5".parse::<Value>(), Ok(Value::Float(55.5)));
        assert!("warm".parse::<Value>().is_err());
        assert!("inf".parse::<Value>().is_err());
    }
}
