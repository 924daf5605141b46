pub mod controller;
pub mod driver;
pub mod gesture;
pub mod spring;

pub use controller::{ViewMode, ViewportController, ViewportEvent, ViewportFrame, ViewportTransform};
pub use driver::ViewportHandle;
pub use gesture::{GestureEvent, GestureSender, TapTracker};
pub use spring::Spring;
