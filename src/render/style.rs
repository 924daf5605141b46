use std::fmt;

use crate::models::{Geometry, SeatStatus};

/// Цвет заливки узла.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const BOOKED_FILL: Rgb = Rgb(255, 0, 0);
pub const SELECTED_FILL: Rgb = Rgb(0, 0, 255);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Визуальное состояние места. Занятость важнее выбора.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeatVisual {
    Available,
    Selected,
    Booked,
}

impl SeatVisual {
    pub fn resolve(status: SeatStatus, selected: bool) -> Self {
        match (status, selected) {
            (SeatStatus::Booked, _) => SeatVisual::Booked,
            (SeatStatus::Available, true) => SeatVisual::Selected,
            (SeatStatus::Available, false) => SeatVisual::Available,
        }
    }

    pub fn fill(self, geometry: &Geometry) -> Rgb {
        match self {
            SeatVisual::Booked => BOOKED_FILL,
            SeatVisual::Selected => SELECTED_FILL,
            SeatVisual::Available => {
                let (r, g, b) = geometry.color.to_rgb8();
                Rgb(r, g, b)
            }
        }
    }
}

/// Абсолютное позиционирование узла на холсте.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStyle {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub background: Rgb,
}

impl NodeStyle {
    pub fn new(geometry: &Geometry, background: Rgb) -> Self {
        Self {
            left: geometry.x,
            top: geometry.y,
            width: geometry.width,
            height: geometry.height,
            rotation: geometry.rotation,
            background,
        }
    }

    /// Стиль зоны без мест: всегда собственный цвет.
    pub fn area(geometry: &Geometry) -> Self {
        let (r, g, b) = geometry.color.to_rgb8();
        Self::new(geometry, Rgb(r, g, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Color;

    fn geometry() -> Geometry {
        Geometry {
            x: 4.0,
            y: 8.0,
            width: 10.0,
            height: 12.0,
            rotation: 0.5,
            color: Color { r: 10.2, g: 200.0, b: 30.7 },
        }
    }

    #[test]
    fn booked_wins_over_selected() {
        assert_eq!(SeatVisual::resolve(SeatStatus::Booked, true), SeatVisual::Booked);
        assert_eq!(SeatVisual::resolve(SeatStatus::Available, true), SeatVisual::Selected);
        assert_eq!(SeatVisual::resolve(SeatStatus::Available, false), SeatVisual::Available);
    }

    #[test]
    fn fills() {
        let g = geometry();
        assert_eq!(SeatVisual::Booked.fill(&g), BOOKED_FILL);
        assert_eq!(SeatVisual::Selected.fill(&g), SELECTED_FILL);
        assert_eq!(SeatVisual::Available.fill(&g).to_string(), "rgb(10, 200, 31)");
    }

    #[test]
    fn node_style_copies_geometry() {
        let style = NodeStyle::area(&geometry());
        assert_eq!((style.left, style.top, style.width, style.height), (4.0, 8.0, 10.0, 12.0));
        assert_eq!(style.rotation, 0.5);
    }
}
