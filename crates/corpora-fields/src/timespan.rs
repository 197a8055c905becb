//! Timespan fields: a start, an optional end, an uncertainty flag and the
//! granularity the dates were entered at.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use corpora_core::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    #[default]
    Day,
    Month,
    Year,
    Time,
}

impl Granularity {
    fn display_format(&self) -> &'static str {
        match self {
            Granularity::Year => "%Y",
            Granularity::Month => "%Y-%m",
            Granularity::Day => "%Y-%m-%d",
            Granularity::Time => "%Y-%m-%d %H:%M",
        }
    }

    /// Parse a date entered at this granularity.
    pub fn parse(&self, raw: &str) -> Result<NaiveDateTime> {
        let raw = raw.trim();
        let parsed = match self {
            Granularity::Year => raw
                .parse::<i32>()
                .ok()
                .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
                .map(|d| d.and_time(NaiveTime::MIN)),
            Granularity::Month => NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN)),
            Granularity::Day => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN)),
            Granularity::Time => ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok()),
        };
        parsed.ok_or_else(|| {
            Error::Validation(format!("{} is not a valid {} date", raw, self))
        })
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Granularity::Day => "Day",
            Granularity::Month => "Month",
            Granularity::Year => "Year",
            Granularity::Time => "Time",
        };
        f.write_str(s)
    }
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "month" => Ok(Granularity::Month),
            "year" => Ok(Granularity::Year),
            "time" => Ok(Granularity::Time),
            other => Err(Error::InvalidInput(format!("unknown granularity: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timespan {
    pub start: NaiveDateTime,
    #[serde(default)]
    pub end: Option<NaiveDateTime>,
    #[serde(default)]
    pub uncertain: bool,
    #[serde(default)]
    pub granularity: Granularity,
}

impl Timespan {
    /// Build a timespan; `end` may not precede `start`.
    pub fn new(
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
        uncertain: bool,
        granularity: Granularity,
    ) -> Result<Self> {
        if let Some(end) = end {
            if end < start {
                return Err(Error::Validation(format!(
                    "timespan ends ({}) before it starts ({})",
                    end, start
                )));
            }
        }
        Ok(Self {
            start,
            end,
            uncertain,
            granularity,
        })
    }

    /// Editor parts: `[start, end, granularity, uncertain]`, dates rendered
    /// at the span's granularity.
    pub fn to_form_parts(&self) -> Vec<String> {
        let fmt = match self.granularity {
            Granularity::Time => "%Y-%m-%dT%H:%M",
            g => g.display_format(),
        };
        vec![
            self.start.format(fmt).to_string(),
            self.end
                .map(|e| e.format(fmt).to_string())
                .unwrap_or_default(),
            self.granularity.to_string(),
            self.uncertain.to_string(),
        ]
    }

    /// Inverse of [`Timespan::to_form_parts`]. Missing trailing parts default
    /// to no end, day granularity and certain.
    pub fn from_form_parts(parts: &[String]) -> Result<Self> {
        let part = |i: usize| parts.get(i).map(|s| s.trim()).filter(|s| !s.is_empty());
        let granularity = part(2)
            .map(str::parse::<Granularity>)
            .transpose()?
            .unwrap_or_default();
        let start = part(0)
            .ok_or_else(|| Error::Validation("timespan needs a start date".into()))?;
        let start = granularity.parse(start)?;
        let end = part(1).map(|e| granularity.parse(e)).transpose()?;
        let uncertain = part(3).map(|u| u == "true" || u == "on").unwrap_or(false);
        Self::new(start, end, uncertain, granularity)
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_str = self.granularity.display_format();
        if self.uncertain {
            f.write_str("c. ")?;
        }
        write!(f, "{}", self.start.format(fmt_str))?;
        if let Some(end) = self.end.filter(|e| *e != self.start) {
            write!(f, " – {}", end.format(fmt_str))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_granularity_parsing() {
        assert_eq!(
            Granularity::Year.parse("1815").unwrap().to_string(),
            "1815-01-01 00:00:00"
        );
        assert_eq!(
            Granularity::Month.parse("1815-06").unwrap().to_string(),
            "1815-06-01 00:00:00"
        );
        assert!(Granularity::Day.parse("1815-06").is_err());
        assert_eq!(
            Granularity::Time.parse("1815-06-18 11:30").unwrap().to_string(),
            "1815-06-18 11:30:00"
        );
    }

    #[test]
    fn test_end_before_start_rejected() {
        let err = Timespan::from_form_parts(&parts(&["1816", "1815", "Year"]));
        assert!(matches!(err, Err(Error::Validation(_))));
        assert!(Timespan::from_form_parts(&parts(&["", "1815", "Year"])).is_err());
    }

    #[test]
    fn test_form_parts_round_trip() {
        let span = Timespan::from_form_parts(&parts(&["1811-02", "1820-01", "Month", "true"]))
            .unwrap();
        assert!(span.uncertain);
        assert_eq!(span.to_string(), "c. 1811-02 – 1820-01");
        assert_eq!(
            span.to_form_parts(),
            parts(&["1811-02", "1820-01", "Month", "true"])
        );

        let day = Timespan::from_form_parts(&parts(&["1815-12-23"])).unwrap();
        assert_eq!(day.granularity, Granularity::Day);
        assert_eq!(day.end, None);
        assert_eq!(day.to_string(), "1815-12-23");
    }

    #[test]
    fn test_wire_shape() {
        let value = json!({
            "start": "1815-06-18T11:30:00",
            "end": "1815-06-18T21:00:00",
            "uncertain": false,
            "granularity": "Time"
        });
        let span: Timespan = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(span.to_string(), "1815-06-18 11:30 – 1815-06-18 21:00");
        assert_eq!(serde_json::to_value(&span).unwrap(), value);
    }
}
