pub mod app;
pub mod render;
pub mod view_state;

pub use app::{App, Tab};
pub use view_state::{HomeViewState, StatsViewState};
