//! Comparison charts.
//!
//! [`prepare`] reshapes aggregate tables into plottable series; [`charts`]
//! draws them with `plotters` into PNG or SVG files.

pub mod charts;
pub mod prepare;

pub use charts::{ChartFormat, ChartKind, render_charts};
