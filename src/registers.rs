//! The EZT-570i holding register catalog and the per-register value codec.
//!
//! Every register is assigned exactly one encoding rule. The rule converts
//! between the raw word on the wire and the human-meaningful value: a
//! fixed-point decimal, a packed byte pair, an enumeration member, a set of
//! named status bits or a plain count. Registers are looked up by address or
//! by name; the parallel tables below are generated from one tabulated list
//! so they can never go out of sync.

/// A two-state sub-flag of an alarm mode word: bit position, name, and the
/// labels for the clear/set state of the bit.
pub type Group = (u8, &'static str, [&'static str; 2]);

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// `raw = value * 10`, signed. Displayed with one decimal place.
    Tenths,
    /// `raw = value * 100`, signed. Displayed with two decimal places.
    Hundredths,
    /// Plain unsigned count, transmitted unchanged.
    Count,
    /// Two independent unsigned bytes (year+month, hour+minute, ...).
    BytePair,
    /// Two printable ASCII character codes (32..=126 each).
    CharPair,
    /// Raw value maps to exactly one name via a fixed table.
    Enumerated(&'static [(u16, &'static str)]),
    /// The low bits each carry an independent normal/alarm meaning.
    Bits(&'static [&'static str]),
    /// Bits 0, 1, 4 and 5 form independent two-state sub-flags.
    Grouped(&'static [Group]),
}

impl Rule {
    // Short aliases for the tabulated `for_each_register` definition below.
    pub const TEN: Self = Self::Tenths;
    pub const HUN: Self = Self::Hundredths;
    pub const RAW: Self = Self::Count;
    pub const PAIR: Self = Self::BytePair;
    pub const CHR: Self = Self::CharPair;
    pub const ONF: Self = Self::Enumerated(&ON_OFF);
    pub const PWR: Self = Self::Enumerated(&POWER_RECOVERY_MODES);
    pub const DFM: Self = Self::Enumerated(&DEFROST_MODES);
    pub const DFS: Self = Self::Enumerated(&DEFROST_STATES);
    pub const PRD: Self = Self::Enumerated(&PRODUCT_CONTROL_MODES);
    pub const CCM: Self = Self::Enumerated(&CONDENSATION_MONITOR_MODES);
    pub const PCS: Self = Self::Enumerated(&PROFILE_CONTROL_STATES);
    pub const ADV: Self = Self::Enumerated(&ADVANCE_STEP_ACTIONS);
    pub const WFS: Self = Self::Enumerated(&WAIT_FOR_INPUTS);
    pub const ACK: Self = Self::Enumerated(&ALARM_ACKNOWLEDGE_ACTIONS);
    pub const ATN: Self = Self::Enumerated(&AUTOTUNE_STATES);
    pub const LAT: Self = Self::Enumerated(&LOOP_ALARM_TYPES);
    pub const MAT: Self = Self::Enumerated(&MONITOR_ALARM_TYPES);
    pub const OAS: Self = Self::Enumerated(&OUTPUT_ASSIGNMENTS);
    pub const OFL: Self = Self::Enumerated(&DOWNLOAD_STATES);
    pub const CCI: Self = Self::Bits(&CONDENSATION_INPUT_BITS);
    pub const EVT: Self = Self::Bits(&EVENT_BITS);
    pub const EZA: Self = Self::Bits(&CONTROLLER_ALARM_BITS);
    pub const INA: Self = Self::Bits(&INPUT_ALARM_BITS);
    pub const CHA: Self = Self::Bits(&CHAMBER_ALARM_BITS);
    pub const RFA: Self = Self::Bits(&REFRIGERATION_ALARM_BITS);
    pub const SYS: Self = Self::Bits(&SYSTEM_STATUS_BITS);
    pub const ALM: Self = Self::Grouped(&ALARM_MODE_GROUPS);

    /// Whether the wire word is interpreted as two's complement.
    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Tenths | Self::Hundredths)
    }

    pub fn decode(self, raw: u16) -> Value {
        match self {
            Self::Tenths => Value::Tenths(raw as i16),
            Self::Hundredths => Value::Hundredths(raw as i16),
            Self::Count => Value::Integer(raw),
            Self::BytePair => {
                let [high, low] = raw.to_be_bytes();
                Value::Pair(high, low)
            }
            Self::CharPair => {
                let [high, low] = raw.to_be_bytes();
                Value::Chars(high, low)
            }
            Self::Enumerated(table) => match table.iter().find(|(v, _)| *v == raw) {
                Some((_, name)) => Value::Name(name),
                // Controllers report reserved bit patterns; degrade, never fail.
                None => Value::Unspecified(raw),
            },
            Self::Bits(labels) => Value::Flags { labels, raw },
            Self::Grouped(groups) => Value::Groups { groups, raw },
        }
    }

    pub fn encode(self, input: &Input) -> Result<u16, Error> {
        match self {
            Self::Tenths => scaled_word(input.number()?, 10.0),
            Self::Hundredths => scaled_word(input.number()?, 100.0),
            Self::Count => {
                let value = input.number()?;
                if value.fract() != 0.0 || !(0.0..=65535.0).contains(&value) {
                    return Err(Error::OutOfRange {
                        value: value.to_string(),
                        min: "0".to_string(),
                        max: "65535".to_string(),
                    });
                }
                Ok(value as u16)
            }
            Self::BytePair => {
                let (high, low) = input.pair()?;
                Ok(u16::from_be_bytes([high, low]))
            }
            Self::CharPair => {
                let (high, low) = input.chars()?;
                Ok(u16::from_be_bytes([high, low]))
            }
            Self::Enumerated(table) => {
                let name = input.text()?;
                let found = table.iter().find(|(_, n)| n.eq_ignore_ascii_case(name));
                match found {
                    Some((value, _)) => Ok(*value),
                    None => Err(Error::NoMatch {
                        name: name.to_string(),
                    }),
                }
            }
            // Status words are set as a raw mask; only 15 bits are defined.
            Self::Bits(_) | Self::Grouped(_) => {
                let value = input.number()?;
                if value.fract() != 0.0 || !(0.0..=32767.0).contains(&value) {
                    return Err(Error::OutOfRange {
                        value: value.to_string(),
                        min: "0".to_string(),
                        max: "32767".to_string(),
                    });
                }
                Ok(value as u16)
            }
        }
    }
}

/// Fixed-point encode shared by the tenths and hundredths rules. Rounds to
/// the nearest wire unit; values whose scaled form does not fit the signed
/// 16-bit domain are rejected, never wrapped or clamped.
fn scaled_word(value: f64, scale: f64) -> Result<u16, Error> {
    let scaled = (value * scale).round();
    if !(f64::from(i16::MIN)..=f64::from(i16::MAX)).contains(&scaled) {
        return Err(Error::OutOfRange {
            value: value.to_string(),
            min: format!("{}", f64::from(i16::MIN) / scale),
            max: format!("{}", f64::from(i16::MAX) / scale),
        });
    }
    Ok((scaled as i16) as u16)
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Tenths => "decimal/10",
            Self::Hundredths => "decimal/100",
            Self::Count => "count",
            Self::BytePair => "byte pair",
            Self::CharPair => "characters",
            Self::Enumerated(_) => "enumeration",
            Self::Bits(_) => "bitfield",
            Self::Grouped(_) => "bit groups",
        })
    }
}

impl serde::Serialize for Rule {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// A decoded register value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    /// The raw word divided by ten, kept unscaled to avoid precision loss.
    Tenths(i16),
    /// The raw word divided by one hundred.
    Hundredths(i16),
    Integer(u16),
    Pair(u8, u8),
    Chars(u8, u8),
    Name(&'static str),
    /// An enumeration decode for which the controller reported a value
    /// outside the documented table. Carries the raw word.
    Unspecified(u16),
    Flags {
        labels: &'static [&'static str],
        raw: u16,
    },
    Groups {
        groups: &'static [Group],
        raw: u16,
    },
}

impl Value {
    // Constructors named after the rule aliases so the `make_lists` macro
    // can expand tabulated min/max literals.
    #[allow(non_snake_case)]
    const fn HUN(raw: i16) -> Self {
        Self::Hundredths(raw)
    }
    #[allow(non_snake_case)]
    const fn RAW(raw: u16) -> Self {
        Self::Integer(raw)
    }

    /// The wire-order magnitude of a bound, for range comparisons.
    fn bound(&self) -> i32 {
        match *self {
            Self::Tenths(n) | Self::Hundredths(n) => i32::from(n),
            Self::Integer(n) => i32::from(n),
            _ => 0,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Tenths(n) => write!(f, "{:.1}", f64::from(n) / 10.0),
            Self::Hundredths(n) => write!(f, "{:.2}", f64::from(n) / 100.0),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Pair(high, low) => write!(f, "{}:{}", high, low),
            Self::Chars(high, low) => {
                for byte in [high, low] {
                    if (32..=126).contains(&byte) {
                        write!(f, "{}", byte as char)?;
                    } else {
                        f.write_str("?")?;
                    }
                }
                Ok(())
            }
            Self::Name(name) => f.write_str(name),
            Self::Unspecified(raw) => write!(f, "unspecified ({raw})"),
            Self::Flags { labels, raw } => {
                for (bit, label) in labels.iter().enumerate() {
                    if bit != 0 {
                        f.write_str(", ")?;
                    }
                    let state = if raw & (1 << bit) != 0 {
                        "alarm"
                    } else {
                        "normal"
                    };
                    write!(f, "{label}: {state}")?;
                }
                Ok(())
            }
            Self::Groups { groups, raw } => {
                for (position, (bit, name, states)) in groups.iter().enumerate() {
                    if position != 0 {
                        f.write_str(", ")?;
                    }
                    let state = states[usize::from(raw & (1 << bit) != 0)];
                    write!(f, "{name}: {state}")?;
                }
                Ok(())
            }
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap as _;
        match *self {
            Self::Tenths(n) => serializer.serialize_f64(f64::from(n) / 10.0),
            Self::Hundredths(n) => serializer.serialize_f64(f64::from(n) / 100.0),
            Self::Integer(n) => serializer.serialize_u16(n),
            Self::Pair(high, low) => [high, low].serialize(serializer),
            Self::Chars(..) | Self::Name(_) | Self::Unspecified(_) => {
                serializer.serialize_str(&self.to_string())
            }
            Self::Flags { labels, raw } => {
                let mut map = serializer.serialize_map(Some(labels.len()))?;
                for (bit, label) in labels.iter().enumerate() {
                    map.serialize_entry(label, &(raw & (1 << bit) != 0))?;
                }
                map.end()
            }
            Self::Groups { groups, raw } => {
                let mut map = serializer.serialize_map(Some(groups.len()))?;
                for (bit, name, states) in groups {
                    map.serialize_entry(name, states[usize::from(raw & (1 << bit) != 0)])?;
                }
                map.end()
            }
        }
    }
}

/// A semantic value on its way to the controller, as given by the operator.
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    Number(f64),
    Pair(u8, u8),
    Text(String),
}

impl Input {
    fn number(&self) -> Result<f64, Error> {
        match self {
            Self::Number(n) => Ok(*n),
            _ => Err(Error::WrongShape {
                expected: "a number",
            }),
        }
    }

    fn pair(&self) -> Result<(u8, u8), Error> {
        match self {
            Self::Pair(high, low) => Ok((*high, *low)),
            _ => Err(Error::WrongShape {
                expected: "a `high:low` byte pair",
            }),
        }
    }

    fn chars(&self) -> Result<(u8, u8), Error> {
        let Self::Text(text) = self else {
            return Err(Error::WrongShape {
                expected: "two printable characters",
            });
        };
        let mut bytes = text.bytes();
        match (bytes.next(), bytes.next(), bytes.next()) {
            (Some(high), Some(low), None)
                if (32..=126).contains(&high) && (32..=126).contains(&low) =>
            {
                Ok((high, low))
            }
            _ => Err(Error::WrongShape {
                expected: "two printable characters",
            }),
        }
    }

    fn text(&self) -> Result<&str, Error> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Number(n) => Err(Error::NoMatch {
                name: n.to_string(),
            }),
            Self::Pair(..) => Err(Error::WrongShape {
                expected: "an enumeration name",
            }),
        }
    }
}

impl std::str::FromStr for Input {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((high, low)) = s.split_once(':') {
            if let (Ok(high), Ok(low)) = (high.parse(), low.parse()) {
                return Ok(Self::Pair(high, low));
            }
        }
        if let Ok(number) = s.parse() {
            return Ok(Self::Number(number));
        }
        Ok(Self::Text(s.to_string()))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("`{0}` does not name a documented register")]
    UnknownRegister(String),
    #[error("register {0} is read-only")]
    NotWritable(&'static str),
    #[error("{value} is outside the valid range {min} ..= {max}")]
    OutOfRange {
        value: String,
        min: String,
        max: String,
    },
    #[error("`{name}` does not match any value accepted by this register")]
    NoMatch { name: String },
    #[error("this register expects {expected}")]
    WrongShape { expected: &'static str },
}

#[derive(Clone, Copy, serde::Serialize, PartialEq, Eq)]
#[repr(transparent)]
pub struct Mode(u8);

impl Mode {
    pub const R: Self = Self(1 << 0);
    pub const W: Self = Self(1 << 1);
    pub const RW: Self = Self(Self::R.0 | Self::W.0);
    const R_: Self = Self::R;
    const W_: Self = Self::W;

    pub const fn readable(&self) -> bool {
        self.0 & Self::R.0 != 0
    }
    pub const fn writable(&self) -> bool {
        self.0 & Self::W.0 != 0
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.readable() { "R" } else { "-" })?;
        f.write_str(if self.writable() { "W" } else { "-" })?;
        Ok(())
    }
}

/// A validated position in the catalog tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterIndex(usize);

impl RegisterIndex {
    pub fn from_address(address: u16) -> Option<RegisterIndex> {
        let index = ADDRESSES.partition_point(|v| *v < address);
        (ADDRESSES.get(index) == Some(&address)).then_some(Self(index))
    }

    pub fn from_name(name: &str) -> Option<RegisterIndex> {
        NAMES
            .iter()
            .position(|v| v.eq_ignore_ascii_case(name))
            .map(Self)
    }

    /// Accepts either a register name or a bare decimal address.
    pub fn lookup(register: &str) -> Result<RegisterIndex, Error> {
        let found = match register.parse::<u16>() {
            Ok(address) => Self::from_address(address),
            Err(_) => Self::from_name(register),
        };
        found.ok_or_else(|| Error::UnknownRegister(register.to_string()))
    }

    pub fn address(&self) -> u16 {
        ADDRESSES[self.0]
    }

    pub fn name(&self) -> &'static str {
        NAMES[self.0]
    }

    pub fn mode(&self) -> Mode {
        MODES[self.0]
    }

    pub fn rule(&self) -> Rule {
        RULES[self.0]
    }

    pub fn minimum(&self) -> Option<Value> {
        MINIMUM_VALUES[self.0]
    }

    pub fn maximum(&self) -> Option<Value> {
        MAXIMUM_VALUES[self.0]
    }

    pub fn description(&self) -> &'static str {
        DESCRIPTIONS[self.0]
    }

    pub fn decode(&self, raw: u16) -> Value {
        self.rule().decode(raw)
    }

    /// Encodes a semantic value for this register, or fails before any wire
    /// traffic can happen.
    pub fn encode(&self, input: &Input) -> Result<u16, Error> {
        if !self.mode().writable() {
            return Err(Error::NotWritable(self.name()));
        }
        let raw = self.rule().encode(input)?;
        self.check_bounds(raw)?;
        Ok(raw)
    }

    /// Applies the per-register documented bounds on top of the rule's own
    /// domain check.
    fn check_bounds(&self, raw: u16) -> Result<(), Error> {
        let word = if self.rule().is_signed() {
            i32::from(raw as i16)
        } else {
            i32::from(raw)
        };
        let below = self.minimum().is_some_and(|min| word < min.bound());
        let above = self.maximum().is_some_and(|max| word > max.bound());
        if below || above {
            return Err(Error::OutOfRange {
                value: self.decode(raw).to_string(),
                min: self.minimum().map(|v| v.to_string()).unwrap_or_default(),
                max: self.maximum().map(|v| v.to_string()).unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// The profile engine's control word.
pub const PROFILE_CONTROL_ADDRESS: u16 = 24;
/// `run/resume` in the control word's enumeration.
pub const PROFILE_CONTROL_RUN: u16 = 4;
/// Step a newly started profile begins at.
pub const PROFILE_START_STEP_ADDRESS: u16 = 37;
/// Status register polled before and after a profile upload.
pub const DOWNLOAD_STATUS_ADDRESS: u16 = 180;
/// The word the download status register reads once the controller is idle.
pub const DOWNLOAD_STATUS_ONLINE: u16 = 0;

static ON_OFF: [(u16, &str); 2] = [(0, "off"), (1, "on")];

static POWER_RECOVERY_MODES: [(u16, &str); 5] = [
    (0, "continue"),
    (1, "hold"),
    (2, "terminate"),
    (4, "reset"),
    (8, "resume"),
];

static DEFROST_MODES: [(u16, &str); 3] = [
    (0, "disabled"),
    (1, "manual mode selected"),
    (3, "auto mode selected"),
];

static DEFROST_STATES: [(u16, &str); 3] =
    [(0, "not in defrost"), (1, "in defrost"), (3, "in prechill")];

static PRODUCT_CONTROL_MODES: [(u16, &str); 5] = [
    (0, "off"),
    (1, "deviation"),
    (2, "process"),
    (5, "deviation using event for enable"),
    (6, "process using event for enable"),
];

static CONDENSATION_MONITOR_MODES: [(u16, &str); 4] = [
    (1, "use single input"),
    (2, "use lowest input"),
    (4, "use highest input"),
    (8, "use average of all inputs"),
];

static PROFILE_CONTROL_STATES: [(u16, &str); 9] = [
    (0, "stop/off"),
    (1, "stop/all off"),
    (2, "hold"),
    (4, "run/resume"),
    (8, "autostart"),
    (16, "wait"),
    (32, "ramp"),
    (64, "soak"),
    (128, "guaranteed soak"),
];

static ADVANCE_STEP_ACTIONS: [(u16, &str); 2] =
    [(1, "advance previous step"), (2, "advance next step")];

static WAIT_FOR_INPUTS: [(u16, &str); 15] = [
    (0, "not waiting"),
    (1, "input 1"),
    (2, "input 2"),
    (4, "input 3"),
    (8, "input 4"),
    (16, "input 5"),
    (32, "input 6"),
    (64, "input 7"),
    (128, "input 8"),
    (256, "input 9"),
    (512, "input 10"),
    (1024, "input 11"),
    (2048, "input 12"),
    (4096, "input 13"),
    (8192, "digital input"),
];

static ALARM_ACKNOWLEDGE_ACTIONS: [(u16, &str); 2] =
    [(1, "alarm silence"), (2, "pumpdown reset")];

static AUTOTUNE_STATES: [(u16, &str); 4] = [
    (0, "autotune off"),
    (1, "start autotune"),
    (2, "autotune in progress"),
    (4, "cancel autotune"),
];

static LOOP_ALARM_TYPES: [(u16, &str); 7] = [
    (0, "alarm off"),
    (3, "process high"),
    (5, "process low"),
    (7, "process both"),
    (24, "deviation high"),
    (40, "deviation low"),
    (56, "deviation both"),
];

static MONITOR_ALARM_TYPES: [(u16, &str); 4] = [
    (0, "alarm off"),
    (3, "process high"),
    (5, "process low"),
    (7, "process both"),
];

static OUTPUT_ASSIGNMENTS: [(u16, &str); 16] = [
    (0, "no output selected"),
    (1, "digital output 1"),
    (2, "digital output 2"),
    (4, "digital output 3"),
    (8, "digital output 4"),
    (16, "digital output 5"),
    (32, "digital output 6"),
    (64, "digital output 7"),
    (128, "digital output 8"),
    (256, "digital output 9"),
    (512, "digital output 10"),
    (1024, "digital output 11"),
    (2048, "digital output 12"),
    (4096, "digital output 13"),
    (8192, "digital output 14"),
    (16384, "digital output 15"),
];

static DOWNLOAD_STATES: [(u16, &str); 2] = [(0, "online"), (1, "offline/downloading profile")];

static EVENT_BITS: [&str; 15] = [
    "event 1", "event 2", "event 3", "event 4", "event 5", "event 6", "event 7", "event 8",
    "event 9", "event 10", "event 11", "event 12", "event 13", "event 14", "event 15",
];

static CONDENSATION_INPUT_BITS: [&str; 8] =
    ["PV1", "PV2", "PV3", "PV4", "PV5", "PV6", "PV7", "PV8"];

static CONTROLLER_ALARM_BITS: [&str; 15] = [
    "input 1 sensor break",
    "input 2 sensor break",
    "input 3 sensor break",
    "input 4 sensor break",
    "input 5 sensor break",
    "input 6 sensor break",
    "input 7 sensor break",
    "input 8 sensor break",
    "input 9 sensor break",
    "input 10 sensor break",
    "input 11 sensor break",
    "input 12 sensor break",
    "input 13 sensor break",
    "(not assigned)",
    "loop communications failure",
];

static INPUT_ALARM_BITS: [&str; 15] = [
    "input 1 alarm",
    "input 2 alarm",
    "input 3 alarm",
    "input 4 alarm",
    "input 5 alarm",
    "input 6 alarm",
    "input 7 alarm",
    "input 8 alarm",
    "input 9 alarm",
    "input 10 alarm",
    "input 11 alarm",
    "input 12 alarm",
    "input 13 alarm",
    "(not assigned 1)",
    "(not assigned 2)",
];

static CHAMBER_ALARM_BITS: [&str; 15] = [
    "heater high limit (plenum A)",
    "external product safety",
    "boiler over-temp (plenum A)",
    "boiler low water (plenum A)",
    "dehumidifier system fault",
    "motor overload (plenum A)",
    "fluid system high limit",
    "fluid system high pressure",
    "fluid system low flow",
    "door open",
    "system B boiler low water",
    "(not assigned)",
    "emergency stop",
    "power failure",
    "transfer error",
];

static REFRIGERATION_ALARM_BITS: [&str; 15] = [
    "system 1(A) high/low pressure",
    "system 1(A) low oil pressure",
    "system 1(A) high discharge temperature",
    "system 1(A) compressor protection module",
    "pumpdown disabled",
    "system 1(A) floodback monitor",
    "(not assigned 1)",
    "(not assigned 2)",
    "system 2(B) high/low pressure",
    "system 2(B) low oil pressure",
    "system 2(B) high discharge temperature",
    "system 2(B) compressor protection module",
    "(not assigned 3)",
    "system B floodback monitor",
    "(not assigned 4)",
];

static SYSTEM_STATUS_BITS: [&str; 15] = [
    "humidity water reservoir low",
    "humidity disabled (temperature out-of-range)",
    "humidity high dewpoint limit",
    "humidity low dewpoint limit",
    "door open",
    "(not assigned 1)",
    "(not assigned 2)",
    "(not assigned 3)",
    "service air circulators",
    "service heating/cooling system",
    "service humidity system",
    "service purge system",
    "service altitude system",
    "service transfer mechanism",
    "(not assigned 4)",
];

static ALARM_MODE_GROUPS: [Group; 4] = [
    (0, "step", ["alarm self clears", "alarm latches"]),
    (1, "door", ["close on alarm", "open on alarm"]),
    (4, "audible", ["audible alarm off", "audible alarm on"]),
    (
        5,
        "profile",
        ["chamber continues on alarm", "chamber shuts down on alarm"],
    ),
];

macro_rules! for_each_register {
    ($m:ident) => {
        $m! {
            0: ONF, R_, "OPERATIONAL_MODE";
            1: PAIR, R_, "CLOCK_YY_MM";
            2: PAIR, R_, "CLOCK_DAY_DOW";
            3: PAIR, R_, "CLOCK_HH_MM";
            4: RAW, R_, "CLOCK_SEC", min = 0, max = 59;
            5: PWR, RW, "POWER_RECOVERY_MODE";
            6: RAW, RW, "POWER_OUT_TIME", min = 0, max = 32767;
            7: DFM, RW, "DEFROST_OPERATING_MODE";
            8: TEN, RW, "AUTO_DEFROST_TEMPERATURE_SETPOINT";
            9: RAW, RW, "AUTO_DEFROST_TIME_INTERVAL", min = 0, max = 32767;
            10: DFS, R_, "DEFROST_STATUS";
            11: RAW, R_, "TIME_REMAINING_UNTIL_NEXT_DEFROST", min = 0, max = 32767;
            12: PRD, RW, "PRODUCT_CONTROL";
            13: TEN, RW, "PRODUCT_CONTROL_UPPER_SETPOINT";
            14: TEN, RW, "PRODUCT_CONTROL_LOWER_SETPOINT";
            15: ONF, RW, "CONDENSATION_CONTROL";
            16: CCM, RW, "CONDENSATION_CONTROL_MONITOR_MODE";
            17: CCI, RW, "CONDENSATION_CONTROL_INPUT_SELECTION";
            18: TEN, RW, "CONDENSATION_CONTROL_TEMPERATURE_RAMP_RATE_LIMIT";
            19: TEN, R_, "CONDENSATION_CONTROL_DEWPOINT_LIMIT";
            20: TEN, R_, "CONDENSATION_CONTROL_DEWPOINT_ACTUAL";
            21: ONF, RW, "CHAMBER_LIGHT_CONTROL";
            22: EVT, RW, "CHAMBER_MANUAL_EVENT_CONTROL";
            23: EVT, RW, "CUSTOMER_MANUAL_EVENT_CONTROL";
            24: PCS, RW, "PROFILE_CONTROL_STATUS";
            25: ADV, W_, "PROFILE_ADVANCE_STEP";
            26: CHR, R_, "PROFILE_NAME_CH_1_2";
            27: CHR, R_, "PROFILE_NAME_CH_3_4";
            28: CHR, R_, "PROFILE_NAME_CH_5_6";
            29: CHR, R_, "PROFILE_NAME_CH_7_8";
            30: CHR, R_, "PROFILE_NAME_CH_9_10";
            31: PAIR, R_, "PROFILE_START_DATE_YY_MM";
            32: PAIR, R_, "PROFILE_START_DATE_DAY_DOW";
            33: PAIR, R_, "PROFILE_START_DATE_HH_MM";
            34: PAIR, R_, "PROFILE_STOP_DATE_YY_MM";
            35: PAIR, R_, "PROFILE_STOP_DATE_DAY_DOW";
            36: PAIR, R_, "PROFILE_STOP_DATE_HH_MM";
            37: RAW, RW, "PROFILE_START_STEP", min = 1, max = 99;
            38: RAW, R_, "PROFILE_CURRENT_STEP", min = 0, max = 99;
            39: RAW, R_, "PROFILE_LAST_STEP", min = 0, max = 99;
            40: RAW, R_, "PROFILE_TIME_LEFT_IN_CURRENT_STEP_HHH", min = 0, max = 999;
            41: PAIR, R_, "PROFILE_TIME_LEFT_IN_CURRENT_STEP_MM_SS";
            42: WFS, R_, "PROFILE_WAIT_FOR_STATUS";
            43: TEN, R_, "PROFILE_WAIT_FOR_SETPOINT";
            44: RAW, R_, "PROFILE_CURRENT_JUMP_STEP", min = 0, max = 99;
            45: RAW, R_, "PROFILE_JUMPS_REMAINING_IN_CURRENT_STEP", min = 0, max = 99;
            46: TEN, R_, "PROFILE_LOOP_1_TARGET_SETPOINT";
            47: TEN, R_, "PROFILE_LOOP_2_TARGET_SETPOINT";
            48: TEN, R_, "PROFILE_LOOP_3_TARGET_SETPOINT";
            49: TEN, R_, "PROFILE_LOOP_4_TARGET_SETPOINT";
            50: TEN, R_, "PROFILE_LOOP_5_TARGET_SETPOINT";
            51: RAW, R_, "PROFILE_LAST_JUMP_FROM_STEP", min = 0, max = 99;
            52: RAW, R_, "PROFILE_LAST_JUMP_TO_STEP", min = 0, max = 99;
            53: RAW, R_, "PROFILE_TOTAL_JUMPS_MADE", min = 0, max = 32767;
            54: ACK, W_, "ALARM_ACKNOWLEDGE";
            55: EZA, R_, "EZT570I_ALARM_STATUS";
            56: INA, R_, "INPUT_ALARM_STATUS";
            57: CHA, R_, "CHAMBER_ALARM_STATUS";
            58: RFA, R_, "REFRIGERATION_ALARM_STATUS";
            59: SYS, R_, "SYSTEM_STATUS_MONITOR";
            60: TEN, RW, "LOOP_1_SETPOINT";
            61: TEN, R_, "LOOP_1_PROCESS_VALUE";
            62: HUN, R_, "LOOP_1_PERCENT_OUTPUT", min = -10000, max = 10000;
            63: ATN, RW, "LOOP_1_AUTOTUNE_STATUS";
            64: TEN, RW, "LOOP_1_UPPER_SETPOINT_LIMIT";
            65: TEN, RW, "LOOP_1_LOWER_SETPOINT_LIMIT";
            66: LAT, RW, "LOOP_1_ALARM_TYPE";
            67: ALM, RW, "LOOP_1_ALARM_MODE";
            68: OAS, RW, "LOOP_1_ALARM_OUTPUT_ASSIGNMENT";
            69: TEN, RW, "LOOP_1_HIGH_ALARM_SETPOINT";
            70: TEN, RW, "LOOP_1_LOW_ALARM_SETPOINT";
            71: TEN, RW, "LOOP_1_ALARM_HYSTERESIS";
            72: TEN, RW, "LOOP_2_SETPOINT";
            73: TEN, R_, "LOOP_2_PROCESS_VALUE";
            74: HUN, R_, "LOOP_2_PERCENT_OUTPUT", min = -10000, max = 10000;
            75: ATN, RW, "LOOP_2_AUTOTUNE_STATUS";
            76: TEN, RW, "LOOP_2_UPPER_SETPOINT_LIMIT";
            77: TEN, RW, "LOOP_2_LOWER_SETPOINT_LIMIT";
            78: LAT, RW, "LOOP_2_ALARM_TYPE";
            79: ALM, RW, "LOOP_2_ALARM_MODE";
            80: OAS, RW, "LOOP_2_ALARM_OUTPUT_ASSIGNMENT";
            81: TEN, RW, "LOOP_2_HIGH_ALARM_SETPOINT";
            82: TEN, RW, "LOOP_2_LOW_ALARM_SETPOINT";
            83: TEN, RW, "LOOP_2_ALARM_HYSTERESIS";
            84: TEN, RW, "LOOP_3_SETPOINT";
            85: TEN, R_, "LOOP_3_PROCESS_VALUE";
            86: HUN, R_, "LOOP_3_PERCENT_OUTPUT", min = -10000, max = 10000;
            87: ATN, RW, "LOOP_3_AUTOTUNE_STATUS";
            88: TEN, RW, "LOOP_3_UPPER_SETPOINT_LIMIT";
            89: TEN, RW, "LOOP_3_LOWER_SETPOINT_LIMIT";
            90: LAT, RW, "LOOP_3_ALARM_TYPE";
            91: ALM, RW, "LOOP_3_ALARM_MODE";
            92: OAS, RW, "LOOP_3_ALARM_OUTPUT_ASSIGNMENT";
            93: TEN, RW, "LOOP_3_HIGH_ALARM_SETPOINT";
            94: TEN, RW, "LOOP_3_LOW_ALARM_SETPOINT";
            95: TEN, RW, "LOOP_3_ALARM_HYSTERESIS";
            96: TEN, RW, "LOOP_4_SETPOINT";
            97: TEN, R_, "LOOP_4_PROCESS_VALUE";
            98: HUN, R_, "LOOP_4_PERCENT_OUTPUT", min = -10000, max = 10000;
            99: ATN, RW, "LOOP_4_AUTOTUNE_STATUS";
            100: TEN, RW, "LOOP_4_UPPER_SETPOINT_LIMIT";
            101: TEN, RW, "LOOP_4_LOWER_SETPOINT_LIMIT";
            102: LAT, RW, "LOOP_4_ALARM_TYPE";
            103: ALM, RW, "LOOP_4_ALARM_MODE";
            104: OAS, RW, "LOOP_4_ALARM_OUTPUT_ASSIGNMENT";
            105: TEN, RW, "LOOP_4_HIGH_ALARM_SETPOINT";
            106: TEN, RW, "LOOP_4_LOW_ALARM_SETPOINT";
            107: TEN, RW, "LOOP_4_ALARM_HYSTERESIS";
            108: TEN, RW, "LOOP_5_SETPOINT";
            109: TEN, R_, "LOOP_5_PROCESS_VALUE";
            110: HUN, R_, "LOOP_5_PERCENT_OUTPUT", min = -10000, max = 10000;
            111: ATN, RW, "LOOP_5_AUTOTUNE_STATUS";
            112: TEN, RW, "LOOP_5_UPPER_SETPOINT_LIMIT";
            113: TEN, RW, "LOOP_5_LOWER_SETPOINT_LIMIT";
            114: LAT, RW, "LOOP_5_ALARM_TYPE";
            115: ALM, RW, "LOOP_5_ALARM_MODE";
            116: OAS, RW, "LOOP_5_ALARM_OUTPUT_ASSIGNMENT";
            117: TEN, RW, "LOOP_5_HIGH_ALARM_SETPOINT";
            118: TEN, RW, "LOOP_5_LOW_ALARM_SETPOINT";
            119: TEN, RW, "LOOP_5_ALARM_HYSTERESIS";
            120: TEN, R_, "MONITOR_INPUT_1_PROCESS_VALUE";
            121: MAT, RW, "MONITOR_INPUT_1_ALARM_TYPE";
            122: ALM, RW, "MONITOR_INPUT_1_ALARM_MODE";
            123: OAS, RW, "MONITOR_INPUT_1_ALARM_OUTPUT_ASSIGNMENT";
            124: TEN, RW, "MONITOR_INPUT_1_HIGH_ALARM_SETPOINT";
            125: TEN, RW, "MONITOR_INPUT_1_LOW_ALARM_SETPOINT";
            126: TEN, RW, "MONITOR_INPUT_1_ALARM_HYSTERESIS";
            127: TEN, R_, "MONITOR_INPUT_2_PROCESS_VALUE";
            128: MAT, RW, "MONITOR_INPUT_2_ALARM_TYPE";
            129: ALM, RW, "MONITOR_INPUT_2_ALARM_MODE";
            130: OAS, RW, "MONITOR_INPUT_2_ALARM_OUTPUT_ASSIGNMENT";
            131: TEN, RW, "MONITOR_INPUT_2_HIGH_ALARM_SETPOINT";
            132: TEN, RW, "MONITOR_INPUT_2_LOW_ALARM_SETPOINT";
            133: TEN, RW, "MONITOR_INPUT_2_ALARM_HYSTERESIS";
            134: TEN, R_, "MONITOR_INPUT_3_PROCESS_VALUE";
            135: MAT, RW, "MONITOR_INPUT_3_ALARM_TYPE";
            136: ALM, RW, "MONITOR_INPUT_3_ALARM_MODE";
            137: OAS, RW, "MONITOR_INPUT_3_ALARM_OUTPUT_ASSIGNMENT";
            138: TEN, RW, "MONITOR_INPUT_3_HIGH_ALARM_SETPOINT";
            139: TEN, RW, "MONITOR_INPUT_3_LOW_ALARM_SETPOINT";
            140: TEN, RW, "MONITOR_INPUT_3_ALARM_HYSTERESIS";
            141: TEN, R_, "MONITOR_INPUT_4_PROCESS_VALUE";
            142: MAT, RW, "MONITOR_INPUT_4_ALARM_TYPE";
            143: ALM, RW, "MONITOR_INPUT_4_ALARM_MODE";
            144: OAS, RW, "MONITOR_INPUT_4_ALARM_OUTPUT_ASSIGNMENT";
            145: TEN, RW, "MONITOR_INPUT_4_HIGH_ALARM_SETPOINT";
            146: TEN, RW, "MONITOR_INPUT_4_LOW_ALARM_SETPOINT";
            147: TEN, RW, "MONITOR_INPUT_4_ALARM_HYSTERESIS";
            148: TEN, R_, "MONITOR_INPUT_5_PROCESS_VALUE";
            149: MAT, RW, "MONITOR_INPUT_5_ALARM_TYPE";
            150: ALM, RW, "MONITOR_INPUT_5_ALARM_MODE";
            151: OAS, RW, "MONITOR_INPUT_5_ALARM_OUTPUT_ASSIGNMENT";
            152: TEN, RW, "MONITOR_INPUT_5_HIGH_ALARM_SETPOINT";
            153: TEN, RW, "MONITOR_INPUT_5_LOW_ALARM_SETPOINT";
            154: TEN, RW, "MONITOR_INPUT_5_ALARM_HYSTERESIS";
            155: TEN, R_, "MONITOR_INPUT_6_PROCESS_VALUE";
            156: MAT, RW, "MONITOR_INPUT_6_ALARM_TYPE";
            157: ALM, RW, "MONITOR_INPUT_6_ALARM_MODE";
            158: OAS, RW, "MONITOR_INPUT_6_ALARM_OUTPUT_ASSIGNMENT";
            159: TEN, RW, "MONITOR_INPUT_6_HIGH_ALARM_SETPOINT";
            160: TEN, RW, "MONITOR_INPUT_6_LOW_ALARM_SETPOINT";
            161: TEN, RW, "MONITOR_INPUT_6_ALARM_HYSTERESIS";
            162: TEN, R_, "MONITOR_INPUT_7_PROCESS_VALUE";
            163: MAT, RW, "MONITOR_INPUT_7_ALARM_TYPE";
            164: ALM, RW, "MONITOR_INPUT_7_ALARM_MODE";
            165: OAS, RW, "MONITOR_INPUT_7_ALARM_OUTPUT_ASSIGNMENT";
            166: TEN, RW, "MONITOR_INPUT_7_HIGH_ALARM_SETPOINT";
            167: TEN, RW, "MONITOR_INPUT_7_LOW_ALARM_SETPOINT";
            168: TEN, RW, "MONITOR_INPUT_7_ALARM_HYSTERESIS";
            169: TEN, R_, "MONITOR_INPUT_8_PROCESS_VALUE";
            170: MAT, RW, "MONITOR_INPUT_8_ALARM_TYPE";
            171: ALM, RW, "MONITOR_INPUT_8_ALARM_MODE";
            172: OAS, RW, "MONITOR_INPUT_8_ALARM_OUTPUT_ASSIGNMENT";
            173: TEN, RW, "MONITOR_INPUT_8_HIGH_ALARM_SETPOINT";
            174: TEN, RW, "MONITOR_INPUT_8_LOW_ALARM_SETPOINT";
            175: TEN, RW, "MONITOR_INPUT_8_ALARM_HYSTERESIS";
            179: RAW, W_, "PROFILE_STEP_TIME_ADJUSTMENT", min = 0, max = 32767;
            180: OFL, R_, "EZT570I_OFFLINE_DOWNLOAD_PROFILE";
            200: RAW, W_, "AUTOSTART", min = 0, max = 1;
            201: PAIR, W_, "AUTOSTART_TIME_YY_MM";
            202: PAIR, W_, "AUTOSTART_TIME_DAY_DOW";
            203: PAIR, W_, "AUTOSTART_TIME_HH_MM";
            204: CHR, W_, "PROFILE_HEADER_NAME_CH_1_2";
            205: CHR, W_, "PROFILE_HEADER_NAME_CH_3_4";
            206: CHR, W_, "PROFILE_HEADER_NAME_CH_5_6";
            207: CHR, W_, "PROFILE_HEADER_NAME_CH_7_8";
            208: CHR, W_, "PROFILE_HEADER_NAME_CH_9_10";
            209: RAW, W_, "TOTAL_NUMBER_OF_STEPS_IN_PROFILE", min = 0, max = 99;
            210: TEN, W_, "GUARANTEED_SOAK_BAND_LOOP_1";
            211: TEN, W_, "GUARANTEED_SOAK_BAND_LOOP_2";
            212: TEN, W_, "GUARANTEED_SOAK_BAND_LOOP_3";
            213: TEN, W_, "GUARANTEED_SOAK_BAND_LOOP_4";
            214: TEN, W_, "GUARANTEED_SOAK_BAND_LOOP_5";
        }
    };
}

macro_rules! optional {
    () => {
        None
    };
    ($($lit: tt)+) => {
        Some($($lit)*)
    };
}

macro_rules! make_lists {
    ($($regnum: literal: $rule: ident, $mode: ident, $name: literal
       $(, min = $min: literal)? $(, max = $max: literal)?;)+) => {
        pub static ADDRESSES: &[u16] = &[$($regnum),*];
        pub static NAMES: &[&str] = &[$($name),*];
        pub static MODES: &[Mode] = &[$(Mode::$mode),*];
        pub static RULES: &[Rule] = &[$(Rule::$rule),*];
        pub static MINIMUM_VALUES: &[Option<Value>] =
            &[$(optional!($(Value::$rule($min))?)),*];
        pub static MAXIMUM_VALUES: &[Option<Value>] =
            &[$(optional!($(Value::$rule($max))?)),*];
    };
}

for_each_register!(make_lists);

pub static DESCRIPTIONS: &[&str] = &const {
    let mut result = [""; ADDRESSES.len()];
    let mut index = 0;
    let mut previous_address = 0;
    while index < result.len() {
        let address = ADDRESSES[index];
        if index != 0 && address <= previous_address {
            panic!("ADDRESSES is not sorted (or has duplicate values)!");
        }
        previous_address = address;
        result[index] = match address {
            0 => "Whether the chamber is currently operating",
            1 => "Controller clock: year (high byte, 20xx) and month (low byte)",
            2 => "Controller clock: day of month (high) and day of week (low)",
            3 => "Controller clock: hours (high) and minutes (low)",
            4 => "Controller clock: seconds",
            5 => "What the chamber does when power returns after an outage",
            6 => "How long power must be out before the recovery mode applies, in seconds",
            7 => "Auto/manual defrost selection",
            8 => "Chamber temperature below which auto defrost may engage",
            9 => "Time between automatic defrost cycles, in minutes",
            10 => "Whether the chamber is currently defrosting or prechilling",
            11 => "Minutes until the next automatic defrost",
            12 => "Product (cascade) control mode",
            13 | 14 => "Bound on the air temperature that product control may command",
            15 => "Whether condensation control is active",
            16 => "How the selected monitor inputs feed the dewpoint calculation",
            17 => "Monitor inputs selected for condensation control, one bit each",
            18 => "Maximum temperature ramp rate while condensation control is active",
            19 => "Dewpoint limit currently enforced by condensation control",
            20 => "Dewpoint calculated from the selected inputs",
            21 => "Chamber workspace light",
            22 => "Chamber event outputs under manual control, one bit each",
            23 => "Customer event outputs under manual control, one bit each",
            24 => {
                "Profile engine state; writing `run/resume` starts the loaded profile \
                 at PROFILE_START_STEP, `stop/off` and `stop/all off` end it"
            }
            25 => "Skips the running profile backward or forward one step",
            26 | 27 | 28 | 29 | 30 => "Name of the loaded profile, two characters each",
            31 | 34 => "Profile start/stop date: year (high, 20xx) and month (low)",
            32 | 35 => "Profile start/stop date: day of month (high) and day of week (low)",
            33 | 36 => "Profile start/stop time: hours (high) and minutes (low)",
            37 => "Step at which a newly started profile begins",
            38 => "Step the running profile is currently executing",
            39 => "Last step number of the loaded profile",
            40 => "Whole hours left in the current step",
            41 => "Minutes (high) and seconds (low) left in the current step",
            42 => "Input the running profile is waiting on, if any",
            43 => "Setpoint the running profile is waiting to reach",
            44 | 51 | 52 => "Bookkeeping for the profile's jump-loop execution",
            45 => "Jump iterations left in the current step",
            46 | 47 | 48 | 49 | 50 => "Setpoint the profile is ramping this loop towards",
            53 => "Total jumps executed since the profile started",
            54 => "Silences the audible alarm or resets pumpdown",
            55 => "Sensor-break and communication faults detected by the controller",
            56 => "Process alarm state of each analog input",
            57 => "Chamber safety circuit states",
            58 => "Refrigeration system fault states",
            59 => "Service counters and humidity system status",
            60 | 72 | 84 | 96 | 108 => "Static setpoint for this control loop",
            61 | 73 | 85 | 97 | 109 => "Current process value measured by this loop",
            62 | 74 | 86 | 98 | 110 => "Output power of this loop in percent",
            63 | 75 | 87 | 99 | 111 => "Autotune state of this loop",
            64 | 76 | 88 | 100 | 112 => "Highest setpoint an operator may enter for this loop",
            65 | 77 | 89 | 101 | 113 => "Lowest setpoint an operator may enter for this loop",
            66 | 78 | 90 | 102 | 114 => "Process/deviation alarm selection for this loop",
            67 | 79 | 91 | 103 | 115 => {
                "Alarm behavior for this loop: latching, door, audible and shutdown \
                 selections as independent bit groups"
            }
            68 | 80 | 92 | 104 | 116 => "Digital output pulsed when this loop alarms",
            69 | 81 | 93 | 105 | 117 => "Process value above which this loop alarms",
            70 | 82 | 94 | 106 | 118 => "Process value below which this loop alarms",
            71 | 83 | 95 | 107 | 119 => "Hysteresis applied when this loop's alarm clears",
            120 | 127 | 134 | 141 | 148 | 155 | 162 | 169 => {
                "Current reading of this monitor input"
            }
            121 | 128 | 135 | 142 | 149 | 156 | 163 | 170 => {
                "Process alarm selection for this monitor input"
            }
            122 | 129 | 136 | 143 | 150 | 157 | 164 | 171 => {
                "Alarm behavior for this monitor input, as independent bit groups"
            }
            123 | 130 | 137 | 144 | 151 | 158 | 165 | 172 => {
                "Digital output pulsed when this monitor input alarms"
            }
            124 | 131 | 138 | 145 | 152 | 159 | 166 | 173 => {
                "Reading above which this monitor input alarms"
            }
            125 | 132 | 139 | 146 | 153 | 160 | 167 | 174 => {
                "Reading below which this monitor input alarms"
            }
            126 | 133 | 140 | 147 | 154 | 161 | 168 | 175 => {
                "Hysteresis applied when this monitor input's alarm clears"
            }
            179 => "Adds or removes minutes from the running profile step",
            180 => {
                "Whether the controller is ingesting an uploaded profile (offline) \
                 or ready to run one (online)"
            }
            200 => "Profile header: delayed-start selection",
            201 | 202 | 203 => "Profile header: autostart date and time, packed byte pairs",
            204 | 205 | 206 | 207 | 208 => "Profile header: profile name, two characters each",
            209 => "Profile header: number of steps that follow the header",
            210 | 211 | 212 | 213 | 214 => "Profile header: guaranteed soak band for this loop",
            _ => "",
        };
        index += 1;
    }
    result
};

#[cfg(test)]
mod tests {
    use super::*;

    fn register(name: &str) -> RegisterIndex {
        RegisterIndex::from_name(name).unwrap()
    }

    #[test]
    fn lookup_by_address_and_name() {
        let setpoint = RegisterIndex::from_address(60).unwrap();
        assert_eq!(setpoint.name(), "LOOP_1_SETPOINT");
        assert_eq!(register("LOOP_1_SETPOINT").address(), 60);
        assert_eq!(register("loop_1_setpoint").address(), 60);
        assert!(RegisterIndex::from_address(176).is_none());
        assert!(RegisterIndex::from_address(60000).is_none());
        assert!(RegisterIndex::from_name("FLUX_CAPACITOR").is_none());
        assert_eq!(
            RegisterIndex::lookup("61").unwrap().name(),
            "LOOP_1_PROCESS_VALUE"
        );
        assert!(matches!(
            RegisterIndex::lookup("176"),
            Err(Error::UnknownRegister(_))
        ));
    }

    #[test]
    fn tenths_round_trip() {
        let setpoint = register("LOOP_1_SETPOINT");
        // Step through the domain; fractional degrees must survive the trip.
        let mut raw = i16::MIN;
        loop {
            let value = f64::from(raw) / 10.0;
            let encoded = setpoint.encode(&Input::Number(value)).unwrap();
            assert_eq!(encoded, raw as u16, "{value}");
            assert_eq!(setpoint.decode(encoded), Value::Tenths(raw));
            raw = match raw.checked_add(997) {
                Some(next) => next,
                None => break,
            };
        }
        assert_eq!(setpoint.encode(&Input::Number(20.0)).unwrap(), 200);
        assert_eq!(setpoint.decode(200).to_string(), "20.0");
        assert_eq!(setpoint.decode((-125i16) as u16).to_string(), "-12.5");
    }

    #[test]
    fn tenths_domain_is_enforced() {
        let setpoint = register("LOOP_1_SETPOINT");
        assert!(matches!(
            setpoint.encode(&Input::Number(3276.8)),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(
            setpoint.encode(&Input::Number(-3276.9)),
            Err(Error::OutOfRange { .. })
        ));
        assert_eq!(setpoint.encode(&Input::Number(3276.7)).unwrap(), 32767);
    }

    #[test]
    fn hundredths_decode() {
        let output = register("LOOP_1_PERCENT_OUTPUT");
        assert_eq!(output.decode(10000).to_string(), "100.00");
        assert_eq!(output.decode((-150i16) as u16).to_string(), "-1.50");
        // Read-only; encoding must not be possible.
        assert!(matches!(
            output.encode(&Input::Number(1.0)),
            Err(Error::NotWritable("LOOP_1_PERCENT_OUTPUT"))
        ));
    }

    #[test]
    fn byte_pairs_are_lossless() {
        for high in [0u8, 1, 23, 59, 99, 128, 255] {
            for low in [0u8, 1, 12, 31, 59, 200, 255] {
                let raw = Rule::BytePair.encode(&Input::Pair(high, low)).unwrap();
                assert_eq!(Rule::BytePair.decode(raw), Value::Pair(high, low));
            }
        }
        assert_eq!(register("CLOCK_HH_MM").decode(0x0B2D), Value::Pair(11, 45));
    }

    #[test]
    fn character_pairs() {
        let name = register("PROFILE_HEADER_NAME_CH_1_2");
        assert_eq!(name.encode(&Input::Text("GA".to_string())).unwrap(), 0x4741);
        assert_eq!(name.decode(0x4741).to_string(), "GA");
        assert!(matches!(
            name.encode(&Input::Text("G\n".to_string())),
            Err(Error::WrongShape { .. })
        ));
    }

    #[test]
    fn enumeration_round_trip() {
        let control = register("PROFILE_CONTROL_STATUS");
        assert_eq!(
            control.encode(&Input::Text("run/resume".to_string())).unwrap(),
            4
        );
        assert_eq!(
            control
                .encode(&Input::Text("STOP/ALL OFF".to_string()))
                .unwrap(),
            1
        );
        assert_eq!(control.decode(4), Value::Name("run/resume"));
    }

    #[test]
    fn enumeration_degrades_instead_of_failing() {
        let control = register("PROFILE_CONTROL_STATUS");
        let decoded = control.decode(3);
        assert_eq!(decoded, Value::Unspecified(3));
        assert!(decoded.to_string().contains('3'));
        assert!(matches!(
            control.encode(&Input::Text("warp speed".to_string())),
            Err(Error::NoMatch { name }) if name == "warp speed"
        ));
    }

    #[test]
    fn bitfield_decode() {
        let status = register("CHAMBER_ALARM_STATUS");
        let Value::Flags { labels, raw } = status.decode(0) else {
            panic!("chamber alarm status must decode as flags");
        };
        assert_eq!(raw, 0);
        assert_eq!(labels.len(), 15);
        for bit in 0..15 {
            let decoded = status.decode(1 << bit).to_string();
            assert_eq!(decoded.matches(": alarm").count(), 1, "bit {bit}: {decoded}");
        }
        assert!(status.decode(1 << 9).to_string().contains("door open: alarm"));
    }

    #[test]
    fn grouped_bits_decode() {
        let mode = register("LOOP_1_ALARM_MODE");
        let all_clear = mode.decode(0).to_string();
        assert!(all_clear.contains("alarm self clears"));
        assert!(all_clear.contains("close on alarm"));
        assert!(all_clear.contains("audible alarm off"));
        assert!(all_clear.contains("chamber continues on alarm"));
        let audible = mode.decode(1 << 4).to_string();
        assert!(audible.contains("audible alarm on"));
        assert!(audible.contains("alarm self clears"));
    }

    #[test]
    fn per_register_bounds() {
        let start = register("PROFILE_START_STEP");
        assert_eq!(start.encode(&Input::Number(99.0)).unwrap(), 99);
        assert!(matches!(
            start.encode(&Input::Number(100.0)),
            Err(Error::OutOfRange { .. })
        ));
        let steps = register("TOTAL_NUMBER_OF_STEPS_IN_PROFILE");
        assert!(matches!(
            steps.encode(&Input::Number(150.0)),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn input_parsing() {
        assert_eq!("20.5".parse(), Ok(Input::Number(20.5)));
        assert_eq!("-7".parse(), Ok(Input::Number(-7.0)));
        assert_eq!("11:45".parse(), Ok(Input::Pair(11, 45)));
        assert_eq!(
            "run/resume".parse(),
            Ok(Input::Text("run/resume".to_string()))
        );
        // Out-of-byte-range pairs fall through to text and then fail to match.
        assert_eq!("300:1".parse(), Ok(Input::Text("300:1".to_string())));
    }

    #[test]
    fn tables_are_consistent() {
        assert_eq!(ADDRESSES.len(), NAMES.len());
        assert_eq!(ADDRESSES.len(), MODES.len());
        assert_eq!(ADDRESSES.len(), RULES.len());
        assert_eq!(ADDRESSES.len(), MINIMUM_VALUES.len());
        assert_eq!(ADDRESSES.len(), MAXIMUM_VALUES.len());
        assert_eq!(ADDRESSES.len(), DESCRIPTIONS.len());
        for (name, description) in std::iter::zip(NAMES, DESCRIPTIONS) {
            assert!(!description.is_empty(), "{name} lacks a description");
        }
    }
}
