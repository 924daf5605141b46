use serde::{Deserialize, Serialize};

use super::geometry::Geometry;
use super::seat::Section;

/// Декоративная или служебная зона (сцена, проход). Не выбирается.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonSeatArea {
    pub geometry: Geometry,
    #[serde(default, alias = "label")]
    pub name: Option<String>,
}

/// Снимок зала: загружается один раз при старте и целиком заменяется при обновлении.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    #[serde(rename = "venueName", default)]
    pub name: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(rename = "nonSeats", alias = "nonSeatingAreas", default)]
    pub non_seats: Vec<NonSeatArea>,
}

impl Venue {
    pub fn seat_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| s.rows.iter())
            .map(|r| r.seats.len())
            .sum()
    }
}

/// Вид карты для `GET /api/map?type=...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MapKind {
    SectionMap,
    SeatMap,
}

impl MapKind {
    pub fn as_query(self) -> &'static str {
        match self {
            MapKind::SectionMap => "sectionMap",
            MapKind::SeatMap => "seatMap",
        }
    }

    pub fn from_query(value: &str) -> Option<Self> {
        match value.trim() {
            "sectionMap" => Some(MapKind::SectionMap),
            "seatMap" => Some(MapKind::SeatMap),
            _ => None,
        }
    }
}
