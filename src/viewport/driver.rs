//! Поток жестов: владеет `ViewportController`, принимает события жестов,
//! крутит пружины с частотой кадров и публикует последний кадр через
//! `watch` (последнее значение побеждает). Поток отрисовки только читает.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::controller::{ViewportController, ViewportEvent, ViewportFrame};
use super::gesture::{GestureEvent, GestureSender};
use crate::config::ViewportConfig;

pub struct ViewportHandle {
    gestures: GestureSender,
    frames: watch::Receiver<ViewportFrame>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ViewportHandle {
    /// Запускает обработчик жестов. Разовые события вьюпорта уходят в `events`.
    pub fn spawn<E>(config: &ViewportConfig, events: mpsc::UnboundedSender<E>) -> Self
    where
        E: From<ViewportEvent> + Send + 'static,
    {
        let controller = ViewportController::new(config);
        let (gesture_tx, gesture_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = watch::channel(controller.frame());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run(
            controller,
            gesture_rx,
            frame_tx,
            events,
            cancel.clone(),
            config.frame_interval(),
        ));

        Self {
            gestures: GestureSender::new(gesture_tx),
            frames: frame_rx,
            cancel,
            task,
        }
    }

    /// Отправитель для потока ввода.
    pub fn gesture_sender(&self) -> GestureSender {
        self.gestures.clone()
    }

    pub fn send(&self, event: GestureEvent) {
        self.gestures.send(event);
    }

    pub fn frames(&self) -> watch::Receiver<ViewportFrame> {
        self.frames.clone()
    }

    pub fn current(&self) -> ViewportFrame {
        *self.frames.borrow()
    }

    /// Останавливает анимации. После возврата кадры больше не публикуются.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

async fn run<E>(
    mut controller: ViewportController,
    mut gestures: mpsc::UnboundedReceiver<GestureEvent>,
    frames: watch::Sender<ViewportFrame>,
    events: mpsc::UnboundedSender<E>,
    cancel: CancellationToken,
    frame_interval: Duration,
) where
    E: From<ViewportEvent> + Send + 'static,
{
    let mut ticker = time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();
    // Кадр после простоя не должен получить весь простой как dt
    let max_step = frame_interval * 4;

    loop {
        let animating = controller.is_animating();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            gesture = gestures.recv() => {
                let Some(gesture) = gesture else { break };
                if !animating {
                    last_tick = Instant::now();
                }
                if let Some(event) = controller.handle(gesture) {
                    let _ = events.send(E::from(event));
                }
                frames.send_replace(controller.frame());
            }
            _ = ticker.tick(), if animating => {
                let now = Instant::now();
                let dt = now.saturating_duration_since(last_tick).min(max_step);
                last_tick = now;
                controller.advance(dt);
                frames.send_replace(controller.frame());
                if !controller.is_animating() {
                    debug!("Viewport animation settled");
                }
            }
        }
    }

    info!("Viewport driver stopped");
}
