//! purchase.rs
//!
//! Покупка выбранных мест.
//!
//! Порядок работы:
//! 1.  `prepare` - проверяет, что выбор не пуст, и собирает пакет запроса:
//!     по одной записи на место, статус `booked`, цена из снимка.
//! 2.  `submit` - отправляет пакет. Сервер либо принимает его целиком (2xx),
//!     либо покупка считается неудавшейся.
//! 3.  Результат применяет сессия: при успехе патчи `confirmation_patches`
//!     проходят через тот же шлюз, что и push-сообщения, и выбор очищается.
//!     При ошибке выбор не трогается, чтобы пользователь мог повторить.
//!
//! Частичный успех не отслеживается: если сервер забронирует только часть
//! мест, клиент об этом не узнает до следующего push-сообщения или обновления.

use tracing::{info, warn};

use super::api::SeatMapApi;
use crate::error::SeatMapError;
use crate::models::{SeatKey, SeatPatch, SeatUpdateRequest};
use crate::selection::SelectionSet;
use crate::store::SeatStore;

/// Подготовленный пакет покупки.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseOrder {
    seats: Vec<SeatKey>,
    request: Vec<SeatUpdateRequest>,
}

impl PurchaseOrder {
    pub fn seats(&self) -> &[SeatKey] {
        &self.seats
    }

    pub fn request(&self) -> &[SeatUpdateRequest] {
        &self.request
    }

    pub fn total(&self) -> f64 {
        self.request.iter().map(|r| r.price).sum()
    }

    /// Патчи, которые применяются после подтверждения сервером.
    pub fn confirmation_patches(&self) -> Vec<SeatPatch> {
        self.seats.iter().map(SeatPatch::booked).collect()
    }
}

#[derive(Clone)]
pub struct PurchaseCoordinator {
    api: SeatMapApi,
}

impl PurchaseCoordinator {
    pub fn new(api: SeatMapApi) -> Self {
        Self { api }
    }

    /// Собирает пакет из текущего выбора. Пустой выбор - `EmptySelection`,
    /// сетевой запрос при этом не делается.
    pub fn prepare(selection: &SelectionSet, store: &SeatStore) -> Result<PurchaseOrder, SeatMapError> {
        let mut seats = Vec::with_capacity(selection.len());
        let mut request = Vec::with_capacity(selection.len());

        for key in selection.iter() {
            let Some(record) = store.get(key) else {
                warn!("Selected seat {} is missing from the seat map, skipping", key);
                continue;
            };
            seats.push(key.clone());
            request.push(SeatUpdateRequest::booking(key, record.price));
        }

        if request.is_empty() {
            return Err(SeatMapError::EmptySelection);
        }
        Ok(PurchaseOrder { seats, request })
    }

    pub async fn submit(&self, order: &PurchaseOrder) -> Result<(), SeatMapError> {
        info!("Purchasing {} seats, total {}", order.seats.len(), order.total());
        self.api.update_seats(&order.request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::models::{SeatStatus, Venue};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store() -> SeatStore {
        let venue: Venue = serde_json::from_value(serde_json::json!({
            "venueName": "Hall",
            "sections": [{"sectionId": "A", "rows": [{"rowNumber": "1", "seats": [
                {"seatNumber": "1", "price": 150, "status": "available",
                 "geometry": {"x": 0, "y": 0, "width": 10, "height": 10}},
                {"seatNumber": "2", "price": 120.5, "status": "available",
                 "geometry": {"x": 20, "y": 0, "width": 10, "height": 10}}
            ]}]}]
        }))
        .unwrap();
        SeatStore::from_venue(venue)
    }

    #[test]
    fn empty_selection_is_rejected() {
        let err = PurchaseCoordinator::prepare(&SelectionSet::new(), &store()).unwrap_err();
        assert_eq!(err, SeatMapError::EmptySelection);
    }

    #[test]
    fn order_follows_selection_and_prices() {
        let store = store();
        let mut selection = SelectionSet::new();
        selection.toggle(&SeatKey::new("A", "1", "2"), SeatStatus::Available);
        selection.toggle(&SeatKey::new("A", "1", "1"), SeatStatus::Available);

        let order = PurchaseCoordinator::prepare(&selection, &store).unwrap();
        let ids: Vec<&str> = order.request().iter().map(|r| r.row_number_seat_number.as_str()).collect();
        assert_eq!(ids, vec!["1_2", "1_1"]);
        assert_eq!(order.total(), 270.5);
    }

    #[test]
    fn confirmation_patches_book_every_seat() {
        let store = store();
        let mut selection = SelectionSet::new();
        selection.toggle(&SeatKey::new("A", "1", "1"), SeatStatus::Available);
        selection.toggle(&SeatKey::new("A", "1", "2"), SeatStatus::Available);

        let order = PurchaseCoordinator::prepare(&selection, &store).unwrap();
        let patches = order.confirmation_patches();
        assert_eq!(patches.len(), 2);
        assert!(patches.iter().all(|p| p.status == SeatStatus::Booked));
        assert_eq!(patches[0].key(), SeatKey::new("A", "1", "1"));
    }

    fn coordinator(server: &MockServer) -> PurchaseCoordinator {
        let config = BackendConfig {
            address: server.uri(),
            http_timeout_seconds: 5,
            map_kind: None,
        };
        PurchaseCoordinator::new(SeatMapApi::from_config(&config).unwrap())
    }

    #[tokio::test]
    async fn submit_posts_order_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/seat/update"))
            .and(body_json(serde_json::json!([
                {"sectionId": "A", "rowNumberSeatNumber": "1_1", "status": "booked", "price": 150}
            ])))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let mut selection = SelectionSet::new();
        selection.toggle(&SeatKey::new("A", "1", "1"), SeatStatus::Available);
        let order = PurchaseCoordinator::prepare(&selection, &store()).unwrap();

        coordinator(&server).submit(&order).await.unwrap();
    }

    #[tokio::test]
    async fn submit_maps_rejection_to_purchase_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/seat/update"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut selection = SelectionSet::new();
        selection.toggle(&SeatKey::new("A", "1", "2"), SeatStatus::Available);
        let order = PurchaseCoordinator::prepare(&selection, &store()).unwrap();

        let err = coordinator(&server).submit(&order).await.unwrap_err();
        assert!(matches!(err, SeatMapError::PurchaseFailure(_)));
    }
}
