//! Chart rendering.
//!
//! - `ascii`: terminal charts (per-city facets, p-value/R² strips, ROAS bars)
//! - `svg`: the same charts as SVG files via `plotters`
//!
//! All renderers take an explicit `RenderConfig`; there is no global theme.

pub mod ascii;
pub mod svg;

pub use ascii::{render_city_facets, render_p_value_strip, render_r2_strip, render_roas_bars};
pub use svg::{SvgInput, write_svg_charts};
