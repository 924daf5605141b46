pub mod style;
pub mod tree;

pub use style::{NodeStyle, Rgb, SeatVisual, BOOKED_FILL, SELECTED_FILL};
pub use tree::{
    ContainerStyle, DetailLayer, NonSeatNode, OverviewLayer, RenderFrame, RowNode, SeatMapTree,
    SeatNode, SectionNode,
};
