//! Report Rendering
//!
//! Charts, markdown text, and the HTML/PDF documents derived from it.

pub mod chart;
pub mod html;
pub mod markdown;
pub mod pdf;

pub use chart::{chart_file_name, render_chart, ChartData, ChartSeries};
pub use html::markdown_to_html;
pub use markdown::{assemble_report, format_pct, format_usd, insufficient_section, symbol_section};
pub use pdf::{render_pdf, RenderedPdf};
