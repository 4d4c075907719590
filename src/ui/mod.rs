pub mod chart;
pub mod dashboard;
pub mod events;
pub mod graphics;

pub use dashboard::{chart_area, render};
pub use events::{Event, EventHandler};
