use serde::{Deserialize, Serialize};

/// Точка в координатах холста (или экрана, в зависимости от контекста).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Default for Color {
    // Без цвета в геометрии место рисуется белым
    fn default() -> Self {
        Self { r: 255.0, g: 255.0, b: 255.0 }
    }
}

impl Color {
    /// Компоненты, округлённые до байта.
    pub fn to_rgb8(&self) -> (u8, u8, u8) {
        let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        (channel(self.r), channel(self.g), channel(self.b))
    }
}

/// Абсолютная геометрия элемента на общем холсте зала.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Поворот в радианах вокруг центра прямоугольника.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub color: Color,
}

impl Geometry {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Попадает ли точка холста в повёрнутый прямоугольник.
    pub fn contains(&self, point: Point) -> bool {
        let c = self.center();
        let (sin, cos) = (-self.rotation).sin_cos();
        let dx = point.x - c.x;
        let dy = point.y - c.y;
        let local_x = dx * cos - dy * sin;
        let local_y = dx * sin + dy * cos;
        local_x.abs() <= self.width / 2.0 && local_y.abs() <= self.height / 2.0
    }
}
