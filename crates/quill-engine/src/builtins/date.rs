//! `Date`, as a host object wrapping a millisecond timestamp.
//!
//! Dates are immutable handles: the getters are members of the binding
//! table, so they dispatch like any other host method. Component getters
//! use the local time zone, `toISOString` uses UTC. Arithmetic works
//! through the numeric value (`b - a` gives milliseconds).

use super::{Builtin, arg, constructor};
use crate::error::Result;
use crate::interop::{HostArg, HostMember, HostObject};
use crate::interpreter::Interpreter;
use crate::runtime::{Scope, Value};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike, Utc};
use std::any::Any;
use std::rc::Rc;

/// Largest representable distance from the epoch, in milliseconds.
const MAX_TIME: f64 = 8.64e15;

const DATE_MEMBERS: &[HostMember] = &[
    HostMember::new("getTime", &[]),
    HostMember::new("valueOf", &[]),
    HostMember::new("getFullYear", &[]),
    HostMember::new("getMonth", &[]),
    HostMember::new("getDate", &[]),
    HostMember::new("getDay", &[]),
    HostMember::new("getHours", &[]),
    HostMember::new("getMinutes", &[]),
    HostMember::new("getSeconds", &[]),
    HostMember::new("getMilliseconds", &[]),
    HostMember::new("getTimezoneOffset", &[]),
    HostMember::new("toISOString", &[]),
    HostMember::new("toJSON", &[]),
    HostMember::new("toString", &[]),
];

/// A point in time. NaN marks an invalid date.
#[derive(Debug, Clone, Copy)]
pub struct DateValue(f64);

impl DateValue {
    /// Wraps a millisecond timestamp, clipping out-of-range values to NaN.
    pub fn new(millis: f64) -> Self {
        if millis.is_finite() && millis.abs() <= MAX_TIME {
            Self(millis.trunc())
        } else {
            Self(f64::NAN)
        }
    }

    /// The current time.
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis() as f64)
    }

    /// Milliseconds since the epoch.
    pub fn millis(&self) -> f64 {
        self.0
    }

    fn local(&self) -> Option<DateTime<Local>> {
        if self.0.is_nan() {
            return None;
        }
        Local.timestamp_millis_opt(self.0 as i64).single()
    }

    fn utc(&self) -> Option<DateTime<Utc>> {
        if self.0.is_nan() {
            return None;
        }
        Utc.timestamp_millis_opt(self.0 as i64).single()
    }

    fn component(&self, get: impl Fn(&DateTime<Local>) -> i64) -> Value {
        Value::Number(self.local().map_or(f64::NAN, |dt| get(&dt) as f64))
    }

    fn iso_string(&self) -> std::result::Result<String, String> {
        self.utc()
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
            .ok_or_else(|| "Invalid time value".to_string())
    }
}

impl HostObject for DateValue {
    fn type_name(&self) -> &str {
        "Date"
    }

    fn members(&self) -> &'static [HostMember] {
        DATE_MEMBERS
    }

    fn invoke(&self, index: usize, _args: Vec<HostArg>) -> std::result::Result<Value, String> {
        let Some(member) = DATE_MEMBERS.get(index) else {
            return Err(format!("no member at {index}"));
        };
        Ok(match member.name {
            "getTime" | "valueOf" => Value::Number(self.0),
            "getFullYear" => self.component(|dt| dt.year().into()),
            "getMonth" => self.component(|dt| dt.month0().into()),
            "getDate" => self.component(|dt| dt.day().into()),
            "getDay" => self.component(|dt| dt.weekday().num_days_from_sunday().into()),
            "getHours" => self.component(|dt| dt.hour().into()),
            "getMinutes" => self.component(|dt| dt.minute().into()),
            "getSeconds" => self.component(|dt| dt.second().into()),
            "getMilliseconds" => self.component(|dt| (dt.nanosecond() / 1_000_000).into()),
            "getTimezoneOffset" => self.component(|dt| (-dt.offset().local_minus_utc() / 60).into()),
            "toISOString" => Value::String(self.iso_string()?),
            "toJSON" => self.iso_string().map_or(Value::Null, Value::String),
            _ => Value::String(self.display()),
        })
    }

    fn display(&self) -> String {
        self.local().map_or_else(
            || "Invalid Date".to_string(),
            |dt| dt.format("%a %b %d %Y %H:%M:%S GMT%z").to_string(),
        )
    }

    fn as_number(&self) -> Option<f64> {
        Some(self.0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn register(global: &Scope) {
    const STATICS: &[(&str, usize, Builtin)] = &[("now", 0, now), ("parse", 1, parse), ("UTC", 7, utc)];
    global.define("Date", constructor("Date", 7, date_constructor, STATICS));
}

/// `new Date()`, `new Date(millis)`, `new Date(text)`, `new Date(date)` or
/// `new Date(year, month, day?, hours?, minutes?, seconds?, millis?)` in
/// local time.
fn date_constructor(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let date = match args {
        [] => DateValue::now(),
        [Value::String(text)] => DateValue::new(parse_date(text)),
        [Value::Host(host)] => DateValue::new(host.as_number().unwrap_or(f64::NAN)),
        [single] => DateValue::new(single.to_number()),
        parts => DateValue::new(from_components(&numbers(parts), false)),
    };
    Ok(Value::host(Rc::new(date)))
}

fn now(_: &mut Interpreter, _this: Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::Number(DateValue::now().millis()))
}

fn parse(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(DateValue::new(parse_date(&arg(args, 0).to_js_string())).millis()))
}

fn utc(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(DateValue::new(from_components(&numbers(args), true)).millis()))
}

fn numbers(args: &[Value]) -> Vec<f64> {
    args.iter().map(Value::to_number).collect()
}

/// Builds a timestamp from calendar components. Months and days outside
/// their ranges roll over into the neighbouring units.
fn from_components(parts: &[f64], utc: bool) -> f64 {
    if parts.is_empty() || parts.iter().any(|part| !part.is_finite()) {
        return f64::NAN;
    }
    let part = |index: usize, default: f64| parts.get(index).copied().unwrap_or(default).trunc() as i64;

    let mut year = part(0, f64::NAN);
    if (0..=99).contains(&year) {
        year += 1900;
    }
    let month = part(1, 0.0);
    let year = year + month.div_euclid(12);
    let month = month.rem_euclid(12) as u32;
    let Some(first) = i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, month + 1, 1))
    else {
        return f64::NAN;
    };

    let offset = (part(2, 1.0) - 1) * 86_400_000
        + part(3, 0.0) * 3_600_000
        + part(4, 0.0) * 60_000
        + part(5, 0.0) * 1_000
        + part(6, 0.0);
    let Some(naive) = TimeDelta::try_milliseconds(offset)
        .and_then(|delta| first.and_time(NaiveTime::MIN).checked_add_signed(delta))
    else {
        return f64::NAN;
    };
    to_millis(naive, utc)
}

fn to_millis(naive: NaiveDateTime, utc: bool) -> f64 {
    if utc {
        return naive.and_utc().timestamp_millis() as f64;
    }
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map_or(f64::NAN, |dt| dt.timestamp_millis() as f64)
}

/// Parses RFC 3339 and RFC 2822 timestamps, `YYYY-MM-DD` (as UTC) and
/// `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DDTHH:MM:SS` (as local time).
fn parse_date(text: &str) -> f64 {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return dt.timestamp_millis() as f64;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return dt.timestamp_millis() as f64;
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return to_millis(naive, false);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return to_millis(date.and_time(NaiveTime::MIN), true);
    }
    f64::NAN
}

#[cfg(test)]
mod tests {
    use super::super::tests::run;
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-03-05T10:20:30Z"), 1_709_634_030_000.0);
        assert_eq!(parse_date("2024-03-05T10:20:30.500+00:00"), 1_709_634_030_500.0);
        assert_eq!(parse_date("1970-01-02"), 86_400_000.0);
        assert!(parse_date("yesterday").is_nan());
    }

    #[test]
    fn test_utc_components() {
        assert_eq!(from_components(&[2020.0, 0.0, 1.0], true), 1_577_836_800_000.0);
        assert_eq!(from_components(&[2019.0, 12.0, 1.0], true), 1_577_836_800_000.0);
        assert_eq!(from_components(&[2020.0, 0.0, 1.0, 0.0, 0.0, 1.0], true), 1_577_836_801_000.0);
        assert!(from_components(&[f64::NAN], true).is_nan());
    }

    #[test]
    fn test_date_object() {
        assert_eq!(run("new Date(0).toISOString()"), Value::from("1970-01-01T00:00:00.000Z"));
        assert_eq!(run("new Date(86400000).getTime()"), Value::from(86_400_000));
        assert_eq!(run("new Date(5000) - new Date(2000)"), Value::from(3000));
        assert_eq!(run("new Date(2024, 1, 30).getMonth()"), Value::from(2));
        assert_eq!(run("new Date(2024, 0, 31).getDate()"), Value::from(31));
        assert_eq!(run("new Date(2024, 0, 31).getFullYear()"), Value::from(2024));
        assert_eq!(run("new Date() instanceof Date"), Value::from(true));
        assert_eq!(run("typeof Date.now()"), Value::from("number"));
        assert_eq!(run("Date.UTC(2020, 0, 1)"), Value::from(1_577_836_800_000i64));
        assert_eq!(run("const d = new Date(1000); new Date(d).getTime()"), Value::from(1000));
    }

    #[test]
    fn test_invalid_date() {
        assert_eq!(run("String(new Date('nope'))"), Value::from("Invalid Date"));
        assert_eq!(run("isNaN(new Date('nope').getTime())"), Value::from(true));
        assert_eq!(run("JSON.stringify({ d: new Date(0) })"), Value::from(r#"{"d":"1970-01-01T00:00:00.000Z"}"#));
    }
}
