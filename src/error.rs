//! Ошибки, которые видит пользователь карты.
//!
//! Все сетевые сбои ловятся на границе (HTTP-клиент, push-канал) и
//! превращаются в один из вариантов `SeatMapError`; дальше сессии
//! `reqwest::Error` и ошибки WebSocket не выходят.

/// Сообщение баннера при потере push-соединения.
pub const CONNECTION_LOST_MESSAGE: &str = "Connection lost. Reconnecting…";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeatMapError {
    /// Не удалось загрузить или обновить снимок зала. Блокирующее сообщение.
    #[error("Failed to load seat map: {0}")]
    FetchFailure(String),
    /// Push-канал закрылся аварийно. Неблокирующий баннер, восстанавливается сам.
    #[error("Connection lost. Reconnecting…")]
    ConnectionLost,
    /// Покупка без выбранных мест. Сетевой запрос не отправляется.
    #[error("Please select a seat.")]
    EmptySelection,
    /// Сервер отклонил покупку или запрос не дошёл. Выбор сохраняется.
    #[error("Failed to book seats: {0}")]
    PurchaseFailure(String),
}

impl SeatMapError {
    /// Блокирует ли ошибка показ карты.
    pub fn is_blocking(&self) -> bool {
        matches!(self, SeatMapError::FetchFailure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_lost_uses_banner_text() {
        assert_eq!(SeatMapError::ConnectionLost.to_string(), CONNECTION_LOST_MESSAGE);
    }

    #[test]
    fn only_fetch_failure_blocks() {
        assert!(SeatMapError::FetchFailure("503".into()).is_blocking());
        assert!(!SeatMapError::PurchaseFailure("503".into()).is_blocking());
        assert!(!SeatMapError::EmptySelection.is_blocking());
    }
}
