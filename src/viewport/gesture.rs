use tokio::sync::mpsc;

use crate::models::Point;

/// Сырые события жестов от распознавателя.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    PinchStart,
    /// Отношение текущего расстояния между пальцами к начальному.
    PinchUpdate { ratio: f64 },
    PinchEnd,
    PanStart,
    /// Смещение от начала жеста.
    PanUpdate { dx: f64, dy: f64 },
    PanEnd,
    /// Вернуть масштаб, сдвиг и режим к значениям по умолчанию.
    Reset,
    /// Явный возврат к обзорной карте секций.
    ReturnToOverview,
}

/// Отправитель жестов для потока ввода. Никогда не блокирует:
/// если обработчик уже остановлен, событие просто теряется.
#[derive(Debug, Clone)]
pub struct GestureSender {
    tx: mpsc::UnboundedSender<GestureEvent>,
}

impl GestureSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<GestureEvent>) -> Self {
        Self { tx }
    }

    pub fn send(&self, event: GestureEvent) {
        let _ = self.tx.send(event);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Отличает тап от перетаскивания: касание считается тапом, если палец
/// сместился меньше чем на `threshold` пикселей.
#[derive(Debug, Clone)]
pub struct TapTracker {
    threshold: f64,
    start: Option<Point>,
}

impl TapTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            start: None,
        }
    }

    pub fn touch_start(&mut self, at: Point) {
        self.start = Some(at);
    }

    /// Возвращает точку тапа или `None`, если это был жест.
    pub fn touch_end(&mut self, at: Point) -> Option<Point> {
        let start = self.start.take()?;
        (start.distance_to(at) < self.threshold).then_some(at)
    }

    pub fn cancel(&mut self) {
        self.start = None;
    }
}
