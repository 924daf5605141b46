use std::time::Duration;
use tracing::{debug, info};

use super::gesture::GestureEvent;
use super::spring::Spring;
use crate::config::ViewportConfig;
use crate::models::Point;

/// Масштаб и сдвиг, применяемые ко всему холсту.
///
/// Экранная точка = точка холста * scale + translate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

impl ViewportTransform {
    pub fn to_screen(&self, canvas: Point) -> Point {
        Point::new(
            canvas.x * self.scale + self.translate_x,
            canvas.y * self.scale + self.translate_y,
        )
    }

    pub fn to_canvas(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.translate_x) / self.scale,
            (screen.y - self.translate_y) / self.scale,
        )
    }
}

/// Какой слой карты сейчас основной.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Карта секций.
    Overview,
    /// Карта отдельных мест.
    Detail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEvent {
    /// Масштаб пересёк порог в режиме обзора. Срабатывает один раз на пересечение.
    EnteredDetailView,
}

/// Снимок состояния вьюпорта для слоя отрисовки.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportFrame {
    pub transform: ViewportTransform,
    pub overview_opacity: f64,
    pub detail_opacity: f64,
    pub mode: ViewMode,
    /// Масштаб после окончания последнего pinch, по нему считается размер контейнера.
    pub settled_scale: f64,
    pub animating: bool,
}

impl Default for ViewportFrame {
    fn default() -> Self {
        Self {
            transform: ViewportTransform::default(),
            overview_opacity: 1.0,
            detail_opacity: 0.0,
            mode: ViewMode::Overview,
            settled_scale: 1.0,
            animating: false,
        }
    }
}

/// Превращает pinch/pan жесты в ограниченное преобразование с пружинной анимацией.
///
/// Цели жестов (`target`) меняются мгновенно; отображаемые значения
/// догоняют их через пружины. Чистая математика, без I/O.
#[derive(Debug, Clone)]
pub struct ViewportController {
    min_scale: f64,
    max_scale: f64,
    zoom_threshold: f64,
    target: ViewportTransform,
    scale: Spring,
    translate_x: Spring,
    translate_y: Spring,
    overview_opacity: Spring,
    detail_opacity: Spring,
    pinch_baseline: Option<f64>,
    pan_baseline: Option<(f64, f64)>,
    settled_scale: f64,
    above_threshold: bool,
    mode: ViewMode,
}

impl ViewportController {
    pub fn new(config: &ViewportConfig) -> Self {
        let spring = |value: f64| {
            Spring::new(value, value)
                .with_stiffness(config.spring_stiffness)
                .with_damping(config.spring_damping)
        };

        Self {
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            zoom_threshold: config.zoom_threshold,
            target: ViewportTransform::default(),
            scale: spring(1.0),
            translate_x: spring(0.0),
            translate_y: spring(0.0),
            overview_opacity: spring(1.0),
            detail_opacity: spring(0.0),
            pinch_baseline: None,
            pan_baseline: None,
            settled_scale: 1.0,
            above_threshold: false,
            mode: ViewMode::Overview,
        }
    }

    pub fn handle(&mut self, event: GestureEvent) -> Option<ViewportEvent> {
        match event {
            GestureEvent::PinchStart => self.pinch_start(),
            GestureEvent::PinchUpdate { ratio } => return self.pinch_update(ratio),
            GestureEvent::PinchEnd => self.pinch_end(),
            GestureEvent::PanStart => self.pan_start(),
            GestureEvent::PanUpdate { dx, dy } => self.pan_update(dx, dy),
            GestureEvent::PanEnd => self.pan_end(),
            GestureEvent::Reset => self.reset(),
            GestureEvent::ReturnToOverview => self.return_to_overview(),
        }
        None
    }

    pub fn pinch_start(&mut self) {
        debug!("Pinch gesture started at scale {}", self.target.scale);
        self.pinch_baseline = Some(self.target.scale);
    }

    pub fn pinch_update(&mut self, ratio: f64) -> Option<ViewportEvent> {
        let baseline = *self.pinch_baseline.get_or_insert(self.target.scale);
        // Мусорные значения зажимаются, а не отбрасываются
        let ratio = if ratio.is_nan() { 1.0 } else { ratio.max(0.0) };
        let scale = (baseline * ratio).clamp(self.min_scale, self.max_scale);

        self.target.scale = scale;
        self.scale.set_target(scale);
        self.update_threshold(scale)
    }

    pub fn pinch_end(&mut self) {
        self.pinch_baseline = None;
        if self.target.scale < 1.0 {
            self.target.scale = 1.0;
            self.scale.set_target(1.0);
            self.update_threshold(1.0);
        }
        self.settled_scale = self.target.scale;
        debug!("Pinch gesture ended, settling at scale {}", self.settled_scale);
    }

    pub fn pan_start(&mut self) {
        self.pan_baseline = Some((self.target.translate_x, self.target.translate_y));
    }

    /// Сдвиг от начала жеста. Границами контента не ограничивается.
    pub fn pan_update(&mut self, dx: f64, dy: f64) {
        let (start_x, start_y) = *self
            .pan_baseline
            .get_or_insert((self.target.translate_x, self.target.translate_y));
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };

        self.target.translate_x = start_x + finite(dx);
        self.target.translate_y = start_y + finite(dy);
        self.translate_x.set_target(self.target.translate_x);
        self.translate_y.set_target(self.target.translate_y);
    }

    pub fn pan_end(&mut self) {
        self.pan_baseline = None;
    }

    /// Сбрасывает всё к значениям по умолчанию (новый снимок зала).
    pub fn reset(&mut self) {
        self.target = ViewportTransform::default();
        self.scale.snap_to(1.0);
        self.translate_x.snap_to(0.0);
        self.translate_y.snap_to(0.0);
        self.overview_opacity.snap_to(1.0);
        self.detail_opacity.snap_to(0.0);
        self.pinch_baseline = None;
        self.pan_baseline = None;
        self.settled_scale = 1.0;
        self.above_threshold = false;
        self.mode = ViewMode::Overview;
    }

    /// Возвращает обзорный режим. Следующий переход в детальный режим
    /// требует нового пересечения порога снизу вверх.
    pub fn return_to_overview(&mut self) {
        self.mode = ViewMode::Overview;
        self.above_threshold = self.target.scale > self.zoom_threshold;
        self.set_layer_targets(self.above_threshold);
    }

    /// Продвигает пружины на `dt`. Возвращает `true`, пока что-то ещё движется.
    pub fn advance(&mut self, dt: Duration) -> bool {
        for spring in self.springs_mut() {
            spring.tick(dt);
        }
        self.is_animating()
    }

    pub fn is_animating(&self) -> bool {
        [
            &self.scale,
            &self.translate_x,
            &self.translate_y,
            &self.overview_opacity,
            &self.detail_opacity,
        ]
        .iter()
        .any(|s| !s.is_at_rest())
    }

    /// Отображаемое преобразование. Масштаб всегда в [min_scale, max_scale],
    /// даже когда пружина проскакивает цель.
    pub fn transform(&self) -> ViewportTransform {
        ViewportTransform {
            scale: self.scale.value().clamp(self.min_scale, self.max_scale),
            translate_x: self.translate_x.value(),
            translate_y: self.translate_y.value(),
        }
    }

    pub fn target(&self) -> ViewportTransform {
        self.target
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn settled_scale(&self) -> f64 {
        self.settled_scale
    }

    pub fn frame(&self) -> ViewportFrame {
        ViewportFrame {
            transform: self.transform(),
            overview_opacity: self.overview_opacity.value().clamp(0.0, 1.0),
            detail_opacity: self.detail_opacity.value().clamp(0.0, 1.0),
            mode: self.mode,
            settled_scale: self.settled_scale,
            animating: self.is_animating(),
        }
    }

    fn update_threshold(&mut self, scale: f64) -> Option<ViewportEvent> {
        let above = scale > self.zoom_threshold;
        let crossed_up = above && !self.above_threshold;
        self.above_threshold = above;

        // Обратно в обзор сам не возвращается
        if crossed_up && self.mode == ViewMode::Overview {
            self.mode = ViewMode::Detail;
            self.set_layer_targets(true);
            info!("Zoom threshold {} crossed, switching to seat map", self.zoom_threshold);
            return Some(ViewportEvent::EnteredDetailView);
        }

        if self.mode == ViewMode::Overview {
            self.set_layer_targets(above);
        }
        None
    }

    fn set_layer_targets(&mut self, show_detail: bool) {
        let (overview, detail) = if show_detail { (0.0, 1.0) } else { (1.0, 0.0) };
        self.overview_opacity.set_target(overview);
        self.detail_opacity.set_target(detail);
    }

    fn springs_mut(&mut self) -> [&mut Spring; 5] {
        [
            &mut self.scale,
            &mut self.translate_x,
            &mut self.translate_y,
            &mut self.overview_opacity,
            &mut self.detail_opacity,
        ]
    }
}
