//! Charts module - Chart data alignment and PNG rendering

mod plotter;
mod renderer;

pub use plotter::ChartData;
pub use renderer::StaticChartRenderer;
