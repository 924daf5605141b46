use serde::{Deserialize, Serialize};

use super::seat::{serialize_price, string_or_number, SeatKey, SeatStatus};

/// Изменение статуса одного места: из push-канала или из подтверждения покупки.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatPatch {
    #[serde(deserialize_with = "string_or_number")]
    pub section_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub row_number: String,
    #[serde(deserialize_with = "string_or_number")]
    pub seat_number: String,
    pub status: SeatStatus,
}

impl SeatPatch {
    pub fn new(key: &SeatKey, status: SeatStatus) -> Self {
        Self {
            section_id: key.section_id.clone(),
            row_number: key.row_number.clone(),
            seat_number: key.seat_number.clone(),
            status,
        }
    }

    pub fn booked(key: &SeatKey) -> Self {
        Self::new(key, SeatStatus::Booked)
    }

    pub fn key(&self) -> SeatKey {
        SeatKey::new(&self.section_id, &self.row_number, &self.seat_number)
    }

    /// Разбирает одно сообщение push-канала.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Элемент тела `POST /api/seat/update`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatUpdateRequest {
    pub section_id: String,
    pub row_number_seat_number: String,
    pub status: SeatStatus,
    #[serde(serialize_with = "serialize_price")]
    pub price: f64,
}

impl SeatUpdateRequest {
    pub fn booking(key: &SeatKey, price: f64) -> Self {
        Self {
            section_id: key.section_id.clone(),
            row_number_seat_number: key.row_and_seat(),
            status: SeatStatus::Booked,
            price,
        }
    }
}
