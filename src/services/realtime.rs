//! realtime.rs
//!
//! Клиент push-канала: жизненный цикл соединения, переподключение и разбор
//! входящих сообщений.
//!
//! Состояния соединения:
//!
//! ```text
//! Connecting → Open → ClosedClean            (без переподключения)
//!                   → ClosedDirty → Connecting   (через reconnect_delay, без ограничения попыток)
//! любое состояние → Disconnected             (только при явном shutdown)
//! ```
//!
//! Клиент сам ничего не меняет в хранилище мест. Каждое сообщение
//! разбирается в `SeatPatch` и отправляется в очередь сессии; применяет его
//! поток отрисовки той же функцией, что и подтверждение покупки.
//!
//! Сообщения не несут ни номера последовательности, ни времени, поэтому две
//! гонки за одно место упорядочиваются только порядком прихода.

use futures::future::BoxFuture;
use futures::StreamExt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::models::SeatPatch;

/// Состояние push-соединения.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    /// Штатное закрытие сервером. Переподключения нет.
    ClosedClean,
    /// Аварийное закрытие. Переподключение запланировано.
    ClosedDirty,
    /// Клиент остановлен явно.
    Disconnected,
}

/// Что клиент сообщает сессии.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Статус одного места изменился на сервере.
    Patch(SeatPatch),
    /// Соединение открыто, ошибку можно убрать.
    Connected,
    /// Ошибка транспорта; за ней всегда следует `ConnectionLost`.
    TransportError(String),
    /// Соединение потеряно, идёт переподключение.
    ConnectionLost,
}

/// Событие транспорта для одного соединения.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(String),
    Closed { clean: bool },
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("WebSocket connect to {url} failed: {reason}")]
    Connect { url: String, reason: String },
}

/// Одно открытое соединение push-канала.
pub trait PushConnection: Send {
    /// Следующее событие. После `Closed` или `Error` больше не вызывается.
    fn next_event(&mut self) -> BoxFuture<'_, TransportEvent>;

    fn close(&mut self) -> BoxFuture<'_, ()>;
}

/// Фабрика соединений.
pub trait PushTransport: Send + Sync + 'static {
    fn connect(&self, url: String) -> BoxFuture<'_, Result<Box<dyn PushConnection>, TransportError>>;
}

/// Транспорт поверх tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl PushTransport for WebSocketTransport {
    fn connect(&self, url: String) -> BoxFuture<'_, Result<Box<dyn PushConnection>, TransportError>> {
        Box::pin(async move {
            let (stream, _) = connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::Connect {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
            Ok(Box::new(WebSocketConnection { stream }) as Box<dyn PushConnection>)
        })
    }
}

struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl PushConnection for WebSocketConnection {
    fn next_event(&mut self) -> BoxFuture<'_, TransportEvent> {
        Box::pin(async move {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Text(text))) => return TransportEvent::Message(text),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => return TransportEvent::Message(text),
                        Err(_) => warn!("Dropping non UTF-8 binary push message"),
                    },
                    // Штатным считаем только закрытие с кодом 1000 (или без кода)
                    Some(Ok(Message::Close(frame))) => {
                        let clean = frame.map_or(true, |f| f.code == CloseCode::Normal);
                        return TransportEvent::Closed { clean };
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return TransportEvent::Error(e.to_string()),
                    None => return TransportEvent::Closed { clean: false },
                }
            }
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Err(e) = self.stream.close(None).await {
                debug!("WebSocket close failed: {}", e);
            }
        })
    }
}

/// Клиент push-канала. Работает в отдельной задаче до `shutdown`.
pub struct RealtimeSyncClient {
    state: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RealtimeSyncClient {
    pub fn spawn<T, E>(
        transport: T,
        url: String,
        reconnect_delay: Duration,
        events: mpsc::UnboundedSender<E>,
    ) -> Self
    where
        T: PushTransport,
        E: From<SyncEvent> + Send + 'static,
    {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(
            SyncLoop {
                transport,
                url,
                reconnect_delay,
                events,
                state: state_tx,
                cancel: cancel.clone(),
            }
            .run(),
        );

        Self {
            state: state_rx,
            cancel,
            task,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Закрывает соединение и отменяет запланированное переподключение.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!("Realtime sync task failed: {:?}", e);
        }
    }
}

/// Чем закончилось одно соединение.
enum Closure {
    Clean,
    Dirty,
    Teardown,
}

struct SyncLoop<T, E> {
    transport: T,
    url: String,
    reconnect_delay: Duration,
    events: mpsc::UnboundedSender<E>,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl<T, E> SyncLoop<T, E>
where
    T: PushTransport,
    E: From<SyncEvent> + Send + 'static,
{
    async fn run(self) {
        loop {
            self.set_state(ConnectionState::Connecting);
            info!("🔌 Connecting to push channel {}", self.url);

            let connected = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                res = self.transport.connect(self.url.clone()) => res,
            };

            let closure = match connected {
                Ok(connection) => self.serve(connection).await,
                Err(e) => {
                    error!("Push channel connect failed: {}", e);
                    self.emit(SyncEvent::TransportError(e.to_string()));
                    Closure::Dirty
                }
            };

            match closure {
                Closure::Teardown => break,
                Closure::Clean => {
                    info!("🔌 Push channel closed cleanly, not reconnecting");
                    self.set_state(ConnectionState::ClosedClean);
                    // Ждём только явного shutdown
                    self.cancel.cancelled().await;
                    break;
                }
                Closure::Dirty => {
                    self.set_state(ConnectionState::ClosedDirty);
                    self.emit(SyncEvent::ConnectionLost);
                    warn!(
                        "Push channel lost, reconnecting in {} ms",
                        self.reconnect_delay.as_millis()
                    );
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!("✅ Push channel client stopped");
    }

    async fn serve(&self, mut connection: Box<dyn PushConnection>) -> Closure {
        self.set_state(ConnectionState::Open);
        self.emit(SyncEvent::Connected);
        info!("✅ Push channel connected");

        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    connection.close().await;
                    return Closure::Teardown;
                }
                event = connection.next_event() => event,
            };

            match event {
                TransportEvent::Message(text) => match SeatPatch::decode(&text) {
                    Ok(patch) => {
                        debug!("Push update for seat {}: {:?}", patch.key(), patch.status);
                        self.emit(SyncEvent::Patch(patch));
                    }
                    Err(e) => warn!("Dropping malformed push message {:?}: {}", text, e),
                },
                TransportEvent::Closed { clean: true } => return Closure::Clean,
                TransportEvent::Closed { clean: false } => return Closure::Dirty,
                TransportEvent::Error(reason) => {
                    error!("Push channel error: {}", reason);
                    self.emit(SyncEvent::TransportError(reason));
                    connection.close().await;
                    return Closure::Dirty;
                }
            }
        }
    }

    fn emit(&self, event: SyncEvent) {
        // Сессия могла уже закрыться - тогда событие никому не нужно
        let _ = self.events.send(E::from(event));
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}
