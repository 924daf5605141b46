//! api.rs
//!
//! HTTP-клиент бэкенда карты зала.
//!
//! Два вызова:
//! 1.  **Снимок зала**: `GET /api/seatmap` или `GET /api/map?type=sectionMap|seatMap`.
//!     Любой сбой превращается в `SeatMapError::FetchFailure`.
//! 2.  **Покупка**: `POST /api/seat/update` с массивом мест. Успех - только 2xx,
//!     всё остальное - `SeatMapError::PurchaseFailure`.

use reqwest::StatusCode;
use tracing::{error, info};

use crate::config::BackendConfig;
use crate::error::SeatMapError;
use crate::models::{MapKind, SeatUpdateRequest, Venue};

/// Клиент для HTTP API карты.
#[derive(Clone)]
pub struct SeatMapApi {
    /// Базовый URL бэкенда, без завершающего слэша.
    base_url: String,
    /// Асинхронный HTTP-клиент.
    http_client: reqwest::Client,
}

impl SeatMapApi {
    /// Создаёт клиент на основе настроек бэкенда.
    pub fn from_config(config: &BackendConfig) -> Result<Self, SeatMapError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout()) // Таймаут для HTTP-запросов.
            .build()
            .map_err(|e| SeatMapError::FetchFailure(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            base_url: config.base_url(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Загружает снимок зала.
    pub async fn fetch_venue(&self, kind: Option<MapKind>) -> Result<Venue, SeatMapError> {
        let request = match kind {
            None => self.http_client.get(format!("{}/api/seatmap", self.base_url)),
            Some(kind) => self
                .http_client
                .get(format!("{}/api/map", self.base_url))
                .query(&[("type", kind.as_query())]),
        };

        let response = request.send().await.map_err(|e| {
            error!("Seat map request failed: {:?}", e);
            SeatMapError::FetchFailure(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("Seat map request rejected with status {}", status);
            return Err(SeatMapError::FetchFailure(unexpected_status(status)));
        }

        let venue = response.json::<Venue>().await.map_err(|e| {
            error!("Seat map payload could not be decoded: {:?}", e);
            SeatMapError::FetchFailure(e.to_string())
        })?;

        info!(
            "Loaded venue '{}': {} sections, {} seats, {} non-seat areas",
            venue.name,
            venue.sections.len(),
            venue.seat_count(),
            venue.non_seats.len()
        );
        Ok(venue)
    }

    /// Отправляет пакет изменений статуса. Тело ответа не разбирается.
    pub async fn update_seats(&self, seats: &[SeatUpdateRequest]) -> Result<(), SeatMapError> {
        info!("Submitting seat update for {} seats", seats.len());

        let response = self
            .http_client
            .post(format!("{}/api/seat/update", self.base_url))
            .json(seats)
            .send()
            .await
            .map_err(|e| {
                error!("Seat update request failed: {:?}", e);
                SeatMapError::PurchaseFailure(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            error!("Seat update rejected with status {}", status);
            Err(SeatMapError::PurchaseFailure(unexpected_status(status)))
        }
    }
}

fn unexpected_status(status: StatusCode) -> String {
    format!("unexpected status {}", status)
}
