//! session.rs
//!
//! Сессия карты зала: собирает хранилище, выбор, дерево отрисовки,
//! обработчик жестов и push-клиент в одно целое.
//!
//! Все источники изменений (push-канал, завершение покупки, обновление
//! снимка, события вьюпорта) складываются в одну очередь `SessionEvent`.
//! Состояние мест меняет только `handle_event`, и только через
//! `apply_patches`, поэтому блокировки не нужны.

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{SeatMapError, CONNECTION_LOST_MESSAGE};
use crate::models::{Point, SeatKey, SeatPatch, SeatStatus, Venue};
use crate::render::{RenderFrame, SeatMapTree};
use crate::selection::SelectionSet;
use crate::services::api::SeatMapApi;
use crate::services::purchase::{PurchaseCoordinator, PurchaseOrder};
use crate::services::realtime::{
    ConnectionState, PushTransport, RealtimeSyncClient, SyncEvent, WebSocketTransport,
};
use crate::store::SeatStore;
use crate::viewport::{
    GestureEvent, GestureSender, TapTracker, ViewMode, ViewportEvent, ViewportFrame, ViewportHandle,
};

/// Событие очереди сессии.
#[derive(Debug)]
pub enum SessionEvent {
    Sync(SyncEvent),
    Viewport(ViewportEvent),
    PurchaseFinished {
        order: PurchaseOrder,
        result: Result<(), SeatMapError>,
    },
    VenueLoaded(Result<Venue, SeatMapError>),
}

impl From<SyncEvent> for SessionEvent {
    fn from(event: SyncEvent) -> Self {
        SessionEvent::Sync(event)
    }
}

impl From<ViewportEvent> for SessionEvent {
    fn from(event: ViewportEvent) -> Self {
        SessionEvent::Viewport(event)
    }
}

/// Сообщение для пользователя.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Alert { title: String, message: String },
    /// Карта не может быть показана, пока пользователь не обновит её.
    Blocking(String),
}

impl Notice {
    fn alert(title: &str, message: &str) -> Self {
        Notice::Alert {
            title: title.to_string(),
            message: message.to_string(),
        }
    }
}

/// Что изменилось после обработки события.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    SeatUpdated { key: SeatKey, status: SeatStatus },
    Unchanged,
    ConnectionRestored,
    ConnectionLost,
    TransportFailed(String),
    DetailViewEntered,
    PurchaseConfirmed { seats: usize },
    PurchaseRejected(SeatMapError),
    VenueReplaced,
    RefreshFailed(SeatMapError),
}

pub struct SeatMapSession {
    config: Config,
    purchases: PurchaseCoordinator,
    api: SeatMapApi,
    store: SeatStore,
    selection: SelectionSet,
    tree: SeatMapTree,
    taps: TapTracker,
    viewport: ViewportHandle,
    realtime: RealtimeSyncClient,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    notices: Vec<Notice>,
    connection_error: Option<SeatMapError>,
    purchase_in_flight: bool,
    refresh_in_flight: bool,
    background: CancellationToken,
}

impl SeatMapSession {
    /// Загружает снимок зала и подключается к push-каналу по WebSocket.
    pub async fn load(config: Config) -> Result<Self, SeatMapError> {
        Self::load_with_transport(config, WebSocketTransport).await
    }

    pub async fn load_with_transport<T: PushTransport>(
        config: Config,
        transport: T,
    ) -> Result<Self, SeatMapError> {
        let api = SeatMapApi::from_config(&config.backend)?;
        info!("🗺️ Loading seat map from {}", api.base_url());
        let venue = api
            .fetch_venue(config.backend.map_kind)
            .await
            .inspect_err(|e| error!("Initial seat map load failed: {}", e))?;
        Ok(Self::from_venue(config, api, venue, transport))
    }

    /// Собирает сессию из уже загруженного снимка. Запускает фоновые задачи,
    /// поэтому вызывается внутри рантайма tokio.
    pub fn from_venue<T: PushTransport>(config: Config, api: SeatMapApi, venue: Venue, transport: T) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let store = SeatStore::from_venue(venue);
        let selection = SelectionSet::new();
        let window = (config.viewport.window_width, config.viewport.window_height);
        let tree = SeatMapTree::build(&store, &selection, window);
        info!(
            "✅ Seat map {:?} ready: {} sections, {} seats, {} booked",
            store.venue_name(),
            store.sections().len(),
            store.len(),
            store.count_with_status(SeatStatus::Booked)
        );

        let viewport = ViewportHandle::spawn(&config.viewport, events_tx.clone());
        let realtime = RealtimeSyncClient::spawn(
            transport,
            config.backend.websocket_url(),
            config.realtime.reconnect_delay(),
            events_tx.clone(),
        );

        Self {
            taps: TapTracker::new(config.viewport.touch_threshold),
            purchases: PurchaseCoordinator::new(api.clone()),
            api,
            store,
            selection,
            tree,
            viewport,
            realtime,
            events_tx,
            events_rx,
            notices: Vec::new(),
            connection_error: None,
            purchase_in_flight: false,
            refresh_in_flight: false,
            background: CancellationToken::new(),
            config,
        }
    }

    /// Отправитель жестов для потока ввода.
    pub fn gesture_sender(&self) -> GestureSender {
        self.viewport.gesture_sender()
    }

    pub fn viewport_frame(&self) -> ViewportFrame {
        self.viewport.current()
    }

    /// Поток кадров вьюпорта (последнее значение побеждает).
    pub fn viewport_frames(&self) -> watch::Receiver<ViewportFrame> {
        self.viewport.frames()
    }

    pub fn return_to_overview(&self) {
        self.viewport.send(GestureEvent::ReturnToOverview);
    }

    pub fn touch_start(&mut self, at: Point) {
        self.taps.touch_start(at);
    }

    /// Конец касания. Если это тап по месту в детальном режиме, место
    /// переключается; возвращается его ключ.
    pub fn touch_end(&mut self, at: Point) -> Option<SeatKey> {
        let point = self.taps.touch_end(at)?;
        let frame = self.viewport.current();
        if frame.mode != ViewMode::Detail {
            return None;
        }
        let key = self.tree.hit_test(point, &frame.transform)?.clone();
        self.toggle_seat(&key).then_some(key)
    }

    pub fn tap(&mut self, start: Point, end: Point) -> Option<SeatKey> {
        self.touch_start(start);
        self.touch_end(end)
    }

    /// Переключает место в выборе. Занятые места не выбираются.
    pub fn toggle_seat(&mut self, key: &SeatKey) -> bool {
        let Some(status) = self.store.status(key) else {
            debug!("Toggle ignored for unknown seat {}", key);
            return false;
        };
        if !self.selection.toggle(key, status) {
            return false;
        }
        self.tree.refresh_seat(key, &self.store, &self.selection);
        debug!(
            "Seat {} {}, {} selected",
            key,
            if self.selection.contains(key) { "selected" } else { "deselected" },
            self.selection.len()
        );
        true
    }

    /// Начинает покупку выбранных мест. Результат придёт в очередь событий
    /// как `PurchaseFinished`. Пустой выбор отклоняется сразу, без запроса.
    pub fn purchase(&mut self) -> Result<(), SeatMapError> {
        if self.purchase_in_flight {
            debug!("Purchase already in flight, ignoring");
            return Ok(());
        }

        let order = match PurchaseCoordinator::prepare(&self.selection, &self.store) {
            Ok(order) => order,
            Err(e) => {
                self.notices.push(Notice::alert(&e.to_string(), ""));
                return Err(e);
            }
        };

        self.purchase_in_flight = true;
        let coordinator = self.purchases.clone();
        let events = self.events_tx.clone();
        let cancel = self.background.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = coordinator.submit(&order) => result,
            };
            let _ = events.send(SessionEvent::PurchaseFinished { order, result });
        });
        Ok(())
    }

    /// Запрашивает снимок зала заново. Результат придёт как `VenueLoaded`.
    pub fn refresh(&mut self) {
        if self.refresh_in_flight {
            debug!("Refresh already in flight, ignoring");
            return;
        }
        self.refresh_in_flight = true;
        info!("🔄 Refreshing seat map");

        let api = self.api.clone();
        let kind = self.config.backend.map_kind;
        let events = self.events_tx.clone();
        let cancel = self.background.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = api.fetch_venue(kind) => result,
            };
            let _ = events.send(SessionEvent::VenueLoaded(result));
        });
    }

    /// Ждёт следующее событие очереди.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// Обрабатывает всё, что уже лежит в очереди.
    pub fn drain_events(&mut self) -> Vec<EventOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            outcomes.push(self.handle_event(event));
        }
        outcomes
    }

    pub fn handle_event(&mut self, event: SessionEvent) -> EventOutcome {
        match event {
            SessionEvent::Sync(SyncEvent::Patch(patch)) => {
                let key = patch.key();
                let status = patch.status;
                if self.apply_patches([patch]).is_empty() {
                    EventOutcome::Unchanged
                } else {
                    EventOutcome::SeatUpdated { key, status }
                }
            }
            SessionEvent::Sync(SyncEvent::Connected) => {
                if self.connection_error.take().is_some() {
                    info!("🔌 Push channel restored");
                }
                EventOutcome::ConnectionRestored
            }
            SessionEvent::Sync(SyncEvent::ConnectionLost) => {
                self.connection_error = Some(SeatMapError::ConnectionLost);
                EventOutcome::ConnectionLost
            }
            SessionEvent::Sync(SyncEvent::TransportError(reason)) => {
                warn!("Push channel transport error: {}", reason);
                self.connection_error = Some(SeatMapError::ConnectionLost);
                EventOutcome::TransportFailed(reason)
            }
            SessionEvent::Viewport(ViewportEvent::EnteredDetailView) => {
                info!("Switching to seat-level rendering");
                EventOutcome::DetailViewEntered
            }
            SessionEvent::PurchaseFinished { order, result } => self.finish_purchase(order, result),
            SessionEvent::VenueLoaded(result) => self.finish_refresh(result),
        }
    }

    /// Единственная точка изменения статусов мест. Возвращает ключи, вид
    /// которых изменился.
    fn apply_patches(&mut self, patches: impl IntoIterator<Item = SeatPatch>) -> Vec<SeatKey> {
        let mut touched = Vec::new();
        for patch in patches {
            let key = patch.key();
            let outcome = self.store.apply_patch(&patch);
            // Выбор никогда не содержит занятых мест
            let deselected = patch.status.is_booked() && self.selection.remove(&key);
            if deselected {
                info!("Selected seat {} was booked elsewhere, deselecting", key);
            }
            if outcome.changed() || deselected {
                self.tree.refresh_seat(&key, &self.store, &self.selection);
                touched.push(key);
            }
        }
        touched
    }

    fn finish_purchase(&mut self, order: PurchaseOrder, result: Result<(), SeatMapError>) -> EventOutcome {
        self.purchase_in_flight = false;

        if let Err(e) = result {
            warn!("Purchase failed: {}", e);
            self.notices.push(Notice::alert(
                "Purchase Failed",
                "Failed to book seats. Please try again later.",
            ));
            return EventOutcome::PurchaseRejected(e);
        }

        // Выбор мог измениться, пока шёл запрос; снимается целиком
        let selected: Vec<SeatKey> = self.selection.iter().cloned().collect();
        self.apply_patches(order.confirmation_patches());
        self.selection.clear();
        for key in &selected {
            self.tree.refresh_seat(key, &self.store, &self.selection);
        }

        info!("🎫 Purchase confirmed for {} seats", order.seats().len());
        self.notices.push(Notice::alert(
            "Purchase Successful",
            "Seats have been booked successfully.",
        ));
        EventOutcome::PurchaseConfirmed {
            seats: order.seats().len(),
        }
    }

    fn finish_refresh(&mut self, result: Result<Venue, SeatMapError>) -> EventOutcome {
        self.refresh_in_flight = false;
        match result {
            Ok(venue) => {
                self.store = SeatStore::from_venue(venue);
                self.selection.clear();
                let window = (self.config.viewport.window_width, self.config.viewport.window_height);
                self.tree = SeatMapTree::build(&self.store, &self.selection, window);
                self.taps.cancel();
                self.viewport.send(GestureEvent::Reset);
                info!("🔄 Seat map replaced: {} seats", self.store.len());
                EventOutcome::VenueReplaced
            }
            Err(e) => {
                error!("❌ Seat map refresh failed: {}", e);
                let notice = if e.is_blocking() {
                    Notice::Blocking(e.to_string())
                } else {
                    Notice::alert("Refresh Failed", &e.to_string())
                };
                self.notices.push(notice);
                EventOutcome::RefreshFailed(e)
            }
        }
    }

    /// Кадр для отрисовки с текущим состоянием вьюпорта.
    pub fn render(&self) -> RenderFrame<'_> {
        self.tree.compose(&self.viewport.current())
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Текст неблокирующего баннера, пока push-канал переподключается.
    pub fn connection_banner(&self) -> Option<&'static str> {
        self.connection_error.as_ref().map(|_| CONNECTION_LOST_MESSAGE)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.realtime.state()
    }

    pub fn selection_total(&self) -> f64 {
        self.selection
            .iter()
            .filter_map(|key| self.store.get(key))
            .map(|record| record.price)
            .sum()
    }

    pub fn is_purchase_in_flight(&self) -> bool {
        self.purchase_in_flight
    }

    pub fn store(&self) -> &SeatStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn tree(&self) -> &SeatMapTree {
        &self.tree
    }

    /// Останавливает анимации, push-клиент и незавершённые запросы.
    pub async fn shutdown(self) {
        self.background.cancel();
        self.viewport.shutdown().await;
        self.realtime.shutdown().await;
        info!("✅ Seat map session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{SeatVisual, SELECTED_FILL};
    use crate::services::realtime::{PushConnection, TransportError, TransportEvent};
    use futures::future::BoxFuture;

    /// Соединение, которое открывается и молчит.
    struct IdleTransport;

    struct IdleConnection;

    impl PushConnection for IdleConnection {
        fn next_event(&mut self) -> BoxFuture<'_, TransportEvent> {
            Box::pin(std::future::pending())
        }

        fn close(&mut self) -> BoxFuture<'_, ()> {
            Box::pin(async {})
        }
    }

    impl PushTransport for IdleTransport {
        fn connect(&self, _url: String) -> BoxFuture<'_, Result<Box<dyn PushConnection>, TransportError>> {
            Box::pin(async { Ok(Box::new(IdleConnection) as Box<dyn PushConnection>) })
        }
    }

    fn venue() -> Venue {
        serde_json::from_value(serde_json::json!({
            "venueName": "Hall",
            "sections": [{"sectionId": "A", "rows": [{"rowNumber": "1", "seats": [
                {"seatNumber": "1", "price": 150, "status": "available",
                 "geometry": {"x": 0, "y": 0, "width": 20, "height": 20}},
                {"seatNumber": "2", "price": 100, "status": "available",
                 "geometry": {"x": 40, "y": 0, "width": 20, "height": 20}},
                {"seatNumber": "3", "price": 100, "status": "booked",
                 "geometry": {"x": 80, "y": 0, "width": 20, "height": 20}}
            ]}]}]
        }))
        .unwrap()
    }

    fn session() -> SeatMapSession {
        let config = Config::default();
        let api = SeatMapApi::from_config(&config.backend).unwrap();
        SeatMapSession::from_venue(config, api, venue(), IdleTransport)
    }

    fn key(seat: &str) -> SeatKey {
        SeatKey::new("A", "1", seat)
    }

    #[tokio::test]
    async fn toggle_skips_booked_seats() {
        let mut session = session();

        assert!(session.toggle_seat(&key("1")));
        assert_eq!(session.tree().seat(&key("1")).unwrap().style.background, SELECTED_FILL);
        assert!(!session.toggle_seat(&key("3")));
        assert!(!session.selection().contains(&key("3")));
        assert_eq!(session.selection_total(), 150.0);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn booked_push_deselects_seat() {
        let mut session = session();
        session.toggle_seat(&key("2"));

        let patch = SeatPatch::booked(&key("2"));
        let outcome = session.handle_event(SyncEvent::Patch(patch.clone()).into());
        assert_eq!(
            outcome,
            EventOutcome::SeatUpdated {
                key: key("2"),
                status: SeatStatus::Booked
            }
        );
        assert!(!session.selection().contains(&key("2")));
        assert_eq!(session.tree().seat(&key("2")).unwrap().visual, SeatVisual::Booked);

        // Повтор того же патча ничего не меняет, переключение тоже
        assert_eq!(session.handle_event(SyncEvent::Patch(patch).into()), EventOutcome::Unchanged);
        assert!(!session.toggle_seat(&key("2")));

        session.shutdown().await;
    }

    #[tokio::test]
    async fn banner_follows_connection_events() {
        let mut session = session();
        assert_eq!(session.connection_banner(), None);

        session.handle_event(SyncEvent::ConnectionLost.into());
        assert_eq!(session.connection_banner(), Some(CONNECTION_LOST_MESSAGE));

        session.handle_event(SyncEvent::Connected.into());
        assert_eq!(session.connection_banner(), None);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn empty_purchase_alerts_without_request() {
        let mut session = session();

        assert_eq!(session.purchase(), Err(SeatMapError::EmptySelection));
        assert!(!session.is_purchase_in_flight());
        assert_eq!(
            session.take_notices(),
            vec![Notice::alert("Please select a seat.", "")]
        );

        session.shutdown().await;
    }

    #[tokio::test]
    async fn purchase_completion_books_or_keeps_selection() {
        let mut session = session();
        session.toggle_seat(&key("1"));
        let order = PurchaseCoordinator::prepare(session.selection(), session.store()).unwrap();

        let outcome = session.handle_event(SessionEvent::PurchaseFinished {
            order: order.clone(),
            result: Err(SeatMapError::PurchaseFailure("HTTP 500".into())),
        });
        assert!(matches!(outcome, EventOutcome::PurchaseRejected(_)));
        assert!(session.selection().contains(&key("1")));
        assert_eq!(
            session.take_notices(),
            vec![Notice::alert("Purchase Failed", "Failed to book seats. Please try again later.")]
        );

        let outcome = session.handle_event(SessionEvent::PurchaseFinished { order, result: Ok(()) });
        assert_eq!(outcome, EventOutcome::PurchaseConfirmed { seats: 1 });
        assert!(session.selection().is_empty());
        assert_eq!(session.store().status(&key("1")), Some(SeatStatus::Booked));
        assert_eq!(session.tree().seat(&key("1")).unwrap().visual, SeatVisual::Booked);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn confirmation_clears_seats_selected_during_request() {
        let mut session = session();
        session.toggle_seat(&key("1"));
        let order = PurchaseCoordinator::prepare(session.selection(), session.store()).unwrap();
        // Пока запрос в пути, пользователь выбрал ещё одно место
        session.toggle_seat(&key("2"));

        session.handle_event(SessionEvent::PurchaseFinished { order, result: Ok(()) });
        assert!(session.selection().is_empty());
        assert_eq!(session.store().status(&key("1")), Some(SeatStatus::Booked));
        assert_eq!(session.store().status(&key("2")), Some(SeatStatus::Available));
        assert_eq!(session.tree().seat(&key("1")).unwrap().visual, SeatVisual::Booked);
        assert_eq!(session.tree().seat(&key("2")).unwrap().visual, SeatVisual::Available);

        // Push-подтверждение той же покупки приходит следом и ничего не меняет
        let echo = session.handle_event(SyncEvent::Patch(SeatPatch::booked(&key("1"))).into());
        assert_eq!(echo, EventOutcome::Unchanged);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn non_blocking_refresh_error_is_an_alert() {
        let mut session = session();

        session.handle_event(SessionEvent::VenueLoaded(Err(SeatMapError::ConnectionLost)));
        assert!(matches!(
            session.take_notices().as_slice(),
            [Notice::Alert { title, .. }] if title == "Refresh Failed"
        ));

        session.shutdown().await;
    }

    #[tokio::test]
    async fn failed_refresh_keeps_current_map() {
        let mut session = session();
        session.toggle_seat(&key("1"));

        let outcome = session.handle_event(SessionEvent::VenueLoaded(Err(SeatMapError::FetchFailure(
            "HTTP 503".into(),
        ))));
        assert!(matches!(outcome, EventOutcome::RefreshFailed(_)));
        assert_eq!(session.store().len(), 3);
        assert!(session.selection().contains(&key("1")));
        assert!(matches!(session.take_notices().as_slice(), [Notice::Blocking(_)]));

        let outcome = session.handle_event(SessionEvent::VenueLoaded(Ok(venue())));
        assert_eq!(outcome, EventOutcome::VenueReplaced);
        assert!(session.selection().is_empty());

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn taps_toggle_only_in_detail_view() {
        let mut session = session();

        // Обзорный режим: тап по месту ничего не выбирает
        assert_eq!(session.tap(Point::new(10.0, 10.0), Point::new(12.0, 10.0)), None);

        let input = session.gesture_sender();
        input.send(GestureEvent::PinchStart);
        input.send(GestureEvent::PinchUpdate { ratio: 1.6 });
        input.send(GestureEvent::PinchEnd);

        let mut frames = session.viewport.frames();
        frames
            .wait_for(|f| f.mode == ViewMode::Detail && !f.animating)
            .await
            .unwrap();
        assert!(session.drain_events().contains(&EventOutcome::DetailViewEntered));

        // При масштабе 1.6 место A-1-2 (x 40..60) на экране занимает 64..96
        assert_eq!(session.tap(Point::new(80.0, 16.0), Point::new(80.0, 16.0)), Some(key("2")));
        // Перетаскивание не считается тапом
        assert_eq!(session.tap(Point::new(80.0, 16.0), Point::new(120.0, 16.0)), None);
        assert!(session.selection().contains(&key("2")));

        session.shutdown().await;
    }
}
