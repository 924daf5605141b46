pub mod geometry;
pub mod seat;
pub mod venue;
pub mod patch;

pub use geometry::{Color, Geometry, Point};
pub use patch::{SeatPatch, SeatUpdateRequest};
pub use seat::{Row, Seat, SeatKey, SeatStatus, Section};
pub use venue::{MapKind, NonSeatArea, Venue};
