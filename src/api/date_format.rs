//! Wire format for publication dates: `dd/mm/yyyy`.
//!
//! Applied with `#[serde_as(as = "DayMonthYear")]` on request/response DTOs only; the
//! `Book` entity keeps a plain `NaiveDate`.

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serializer};
use serde_with::{DeserializeAs, SerializeAs};

pub const WIRE_DATE_FORMAT: &str = "%d/%m/%Y";

pub struct DayMonthYear;

impl SerializeAs<NaiveDate> for DayMonthYear {
    fn serialize_as<S>(source: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&source.format(WIRE_DATE_FORMAT))
    }
}

impl<'de> DeserializeAs<'de, NaiveDate> for DayMonthYear {
    fn deserialize_as<D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(raw.trim(), WIRE_DATE_FORMAT).map_err(|_| {
            de::Error::custom(format!(
                "invalid date format for publication_date '{}', expected dd/mm/yyyy",
                raw
            ))
        })
    }
}
