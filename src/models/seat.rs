use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::geometry::Geometry;

/// Статус места. Сервер - единственный источник истины для `Booked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    Booked,
}

impl SeatStatus {
    pub fn is_booked(self) -> bool {
        self == SeatStatus::Booked
    }
}

/// Составной ключ места: (секция, ряд, номер). Стабилен и не переиспользуется.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatKey {
    pub section_id: String,
    pub row_number: String,
    pub seat_number: String,
}

impl SeatKey {
    pub fn new(
        section_id: impl Into<String>,
        row_number: impl Into<String>,
        seat_number: impl Into<String>,
    ) -> Self {
        Self {
            section_id: section_id.into(),
            row_number: row_number.into(),
            seat_number: seat_number.into(),
        }
    }

    /// Идентификатор ряда и места в формате `"<row>_<seat>"` для запроса покупки.
    pub fn row_and_seat(&self) -> String {
        format!("{}_{}", self.row_number, self.seat_number)
    }
}

impl fmt::Display for SeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.section_id, self.row_number, self.seat_number)
    }
}

// Место в снимке зала
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    #[serde(deserialize_with = "string_or_number")]
    pub seat_number: String,
    #[serde(default, serialize_with = "serialize_price")]
    pub price: f64,
    pub status: SeatStatus,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    #[serde(deserialize_with = "string_or_number")]
    pub row_number: String,
    #[serde(default)]
    pub seats: Vec<Seat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(deserialize_with = "string_or_number")]
    pub section_id: String,
    #[serde(default)]
    pub rows: Vec<Row>,
}

/// Номера рядов и мест приходят то строкой, то числом - храним строкой.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) if f.fract() == 0.0 => format!("{}", f as i64),
        Raw::Float(f) => f.to_string(),
    })
}

/// Целая цена уходит на сервер как `150`, а не `150.0`.
pub(crate) fn serialize_price<S>(price: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if price.fract() == 0.0 && price.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*price as i64)
    } else {
        serializer.serialize_f64(*price)
    }
}
