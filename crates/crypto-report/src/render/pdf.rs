//! Markdown to PDF
//!
//! Lays out the report markdown on A4 pages with the builtin Helvetica
//! fonts. Headings, paragraphs with bold runs, pipe tables, rules and images
//! are supported; an image whose file name has a registered [`ChartData`] is
//! drawn as a vector chart, any other image falls back to its alt text.

use std::collections::HashMap;
use std::path::Path;

use chrono::Duration;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, LineDashPattern, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Rgb,
};
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

use super::chart::ChartData;
use super::html::markdown_options;
use crate::error::{ReportError, Result};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const PT_TO_MM: f32 = 0.3528;
const BODY_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 8.0;
const CHART_HEIGHT: f32 = 95.0;

const TEXT_COLOR: (u8, u8, u8) = (51, 51, 51);
const BORDER_COLOR: (u8, u8, u8) = (200, 200, 200);
const AXIS_COLOR: (u8, u8, u8) = (90, 90, 90);

/// A finished PDF document
#[derive(Debug)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Render `markdown` to PDF. `figures` maps image file names to chart data.
pub fn render_pdf(
    markdown: &str,
    title: &str,
    figures: &HashMap<String, ChartData>,
) -> Result<RenderedPdf> {
    let mut writer = PageWriter::new(title)?;
    let mut para = Paragraph::default();
    let mut table: Option<TableState> = None;
    let mut image: Option<ImageState> = None;
    let mut list_depth = 0usize;

    for event in Parser::new_ext(markdown, markdown_options()) {
        match event {
            Event::Start(Tag::Heading { .. } | Tag::Paragraph) => para.clear(),
            Event::End(TagEnd::Heading(level)) => writer.heading(&para.take_lines(), level),
            Event::End(TagEnd::Paragraph) => writer.paragraph(&para.take_lines(), list_depth),

            Event::Start(Tag::Strong) => para.bold = true,
            Event::End(TagEnd::Strong) => para.bold = false,

            Event::Start(Tag::List(_)) => list_depth += 1,
            Event::End(TagEnd::List(_)) => list_depth = list_depth.saturating_sub(1),
            Event::Start(Tag::Item) => {
                para.clear();
                para.push_text("-");
            }
            Event::End(TagEnd::Item) => writer.paragraph(&para.take_lines(), list_depth),

            Event::Start(Tag::Table(_)) => table = Some(TableState::default()),
            Event::Start(Tag::TableHead | Tag::TableRow) => {
                if let Some(t) = table.as_mut() {
                    t.row.clear();
                }
            }
            Event::End(TagEnd::TableHead) => {
                if let Some(t) = table.as_mut() {
                    t.finish_row();
                    t.header_rows = t.rows.len();
                }
            }
            Event::End(TagEnd::TableRow) => {
                if let Some(t) = table.as_mut() {
                    t.finish_row();
                }
            }
            Event::Start(Tag::TableCell) => {
                if let Some(t) = table.as_mut() {
                    t.cell.clear();
                }
            }
            Event::End(TagEnd::TableCell) => {
                if let Some(t) = table.as_mut() {
                    let cell = std::mem::take(&mut t.cell);
                    t.row.push(cell.trim().to_string());
                }
            }
            Event::End(TagEnd::Table) => {
                if let Some(t) = table.take() {
                    writer.table(&t.rows, t.header_rows);
                }
            }

            Event::Start(Tag::Image { dest_url, .. }) => {
                // Text before the image in the same paragraph goes first
                writer.paragraph(&para.take_lines(), list_depth);
                image = Some(ImageState { dest: dest_url.to_string(), alt: String::new() });
            }
            Event::End(TagEnd::Image) => {
                if let Some(img) = image.take() {
                    let key = Path::new(&img.dest)
                        .file_name()
                        .map(|f| f.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    match figures.get(&key) {
                        Some(chart) => writer.chart(chart),
                        None => writer.paragraph(&[vec![Word::plain(format!("[{}]", img.alt))]], 0),
                    }
                }
            }

            Event::Text(text) | Event::Code(text) => {
                if let Some(img) = image.as_mut() {
                    img.alt.push_str(&text);
                } else if let Some(t) = table.as_mut() {
                    t.cell.push_str(&text);
                } else {
                    para.push_text(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(t) = table.as_mut() {
                    t.cell.push(' ');
                } else if image.is_none() {
                    para.break_line();
                }
            }
            Event::Rule => writer.rule(),
            _ => {}
        }
    }

    writer.finish()
}

// ============================================================================
// Collected Content
// ============================================================================

#[derive(Clone, Debug)]
struct Word {
    text: String,
    bold: bool,
}

impl Word {
    fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), bold: false }
    }
}

/// Words of the block being read, split at line breaks
#[derive(Default)]
struct Paragraph {
    lines: Vec<Vec<Word>>,
    bold: bool,
}

impl Paragraph {
    fn clear(&mut self) {
        self.lines.clear();
        self.bold = false;
    }

    fn push_text(&mut self, text: &str) {
        if self.lines.is_empty() {
            self.lines.push(Vec::new());
        }
        if let Some(line) = self.lines.last_mut() {
            line.extend(text.split_whitespace().map(|w| Word { text: w.to_string(), bold: self.bold }));
        }
    }

    fn break_line(&mut self) {
        self.lines.push(Vec::new());
    }

    fn take_lines(&mut self) -> Vec<Vec<Word>> {
        std::mem::take(&mut self.lines)
            .into_iter()
            .filter(|line| !line.is_empty())
            .collect()
    }
}

#[derive(Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
    header_rows: usize,
}

impl TableState {
    fn finish_row(&mut self) {
        let row = std::mem::take(&mut self.row);
        if !row.is_empty() {
            self.rows.push(row);
        }
    }
}

struct ImageState {
    dest: String,
    alt: String,
}

// ============================================================================
// Page Layout
// ============================================================================

/// Approximate Helvetica advance width in mm
fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let em = if bold { 0.56 } else { 0.52 };
    text.chars().count() as f32 * size * em * PT_TO_MM
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.45
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

fn pdf_err<E: std::fmt::Display>(e: E) -> ReportError {
    ReportError::Pdf(e.to_string())
}

struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Baseline cursor, mm from the bottom edge
    y: f32,
    page_count: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            page_count: 1,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.page_count += 1;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.new_page();
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn text_at(&self, text: &str, size: f32, x: f32, y: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.set_fill_color(rgb(TEXT_COLOR));
        self.layer.use_text(text, size, Mm(x), Mm(y), font);
    }

    fn polyline(&self, points: &[(f32, f32)], color: (u8, u8, u8), thickness: f32, dashed: bool) {
        if points.len() < 2 {
            return;
        }
        self.layer.set_outline_color(rgb(color));
        self.layer.set_outline_thickness(thickness);
        if dashed {
            self.layer.set_line_dash_pattern(LineDashPattern {
                dash_1: Some(4),
                gap_1: Some(3),
                ..LineDashPattern::default()
            });
        }

        self.layer.add_line(Line {
            points: points.iter().map(|&(x, y)| (Point::new(Mm(x), Mm(y)), false)).collect(),
            is_closed: false,
        });

        if dashed {
            self.layer.set_line_dash_pattern(LineDashPattern::default());
        }
    }

    /// Greedy word wrap of one logical line
    fn write_line(&mut self, words: &[Word], size: f32, indent: f32) {
        let height = line_height(size);
        let max_width = CONTENT_WIDTH - indent;
        let space = text_width(" ", size, false);

        let mut current: Vec<&Word> = Vec::new();
        let mut width = 0.0;
        for word in words {
            let w = text_width(&word.text, size, word.bold);
            if !current.is_empty() && width + space + w > max_width {
                self.emit_line(&current, size, indent, height);
                current.clear();
                width = 0.0;
            }
            if !current.is_empty() {
                width += space;
            }
            width += w;
            current.push(word);
        }
        if !current.is_empty() {
            self.emit_line(&current, size, indent, height);
        }
    }

    fn emit_line(&mut self, words: &[&Word], size: f32, indent: f32, height: f32) {
        self.ensure_space(height);
        self.y -= height;

        let space = text_width(" ", size, false);
        let mut x = MARGIN + indent;
        for word in words {
            self.text_at(&word.text, size, x, self.y, word.bold);
            x += text_width(&word.text, size, word.bold) + space;
        }
    }

    fn heading(&mut self, lines: &[Vec<Word>], level: HeadingLevel) {
        let size = match level {
            HeadingLevel::H1 => 18.0,
            HeadingLevel::H2 => 14.0,
            HeadingLevel::H3 => 12.0,
            _ => 11.0,
        };
        let words: Vec<Word> = lines
            .iter()
            .flatten()
            .map(|w| Word { text: w.text.clone(), bold: true })
            .collect();
        if words.is_empty() {
            return;
        }

        self.gap(3.0);
        // Keep a heading on the same page as at least a few lines of body
        self.ensure_space(line_height(size) + 4.0 * line_height(BODY_SIZE));
        self.write_line(&words, size, 0.0);
        self.gap(2.0);
    }

    fn paragraph(&mut self, lines: &[Vec<Word>], list_depth: usize) {
        if lines.is_empty() {
            return;
        }
        let indent = list_depth as f32 * 5.0;
        for line in lines {
            self.write_line(line, BODY_SIZE, indent);
        }
        self.gap(2.5);
    }

    fn rule(&mut self) {
        self.ensure_space(6.0);
        self.gap(3.0);
        self.polyline(
            &[(MARGIN, self.y), (MARGIN + CONTENT_WIDTH, self.y)],
            BORDER_COLOR,
            0.8,
            false,
        );
        self.gap(3.0);
    }

    fn table(&mut self, rows: &[Vec<String>], header_rows: usize) {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return;
        }

        let pad = 1.5;
        let natural: Vec<f32> = (0..columns)
            .map(|c| {
                rows.iter()
                    .enumerate()
                    .filter_map(|(i, row)| {
                        row.get(c).map(|cell| text_width(cell, TABLE_SIZE, i < header_rows))
                    })
                    .fold(0.0f32, f32::max)
                    + 2.0 * pad
            })
            .collect();
        let total: f32 = natural.iter().sum();
        let scale = if total > 0.0 { CONTENT_WIDTH / total } else { 1.0 };
        let widths: Vec<f32> = natural.iter().map(|w| w * scale).collect();
        let row_height = TABLE_SIZE * PT_TO_MM * 2.0;

        for (i, row) in rows.iter().enumerate() {
            self.ensure_space(row_height);
            let top = self.y;
            let bottom = top - row_height;

            self.polyline(&[(MARGIN, top), (MARGIN + CONTENT_WIDTH, top)], BORDER_COLOR, 0.3, false);
            self.polyline(&[(MARGIN, bottom), (MARGIN + CONTENT_WIDTH, bottom)], BORDER_COLOR, 0.3, false);

            let mut x = MARGIN;
            for (c, width) in widths.iter().enumerate() {
                self.polyline(&[(x, top), (x, bottom)], BORDER_COLOR, 0.3, false);
                if let Some(cell) = row.get(c) {
                    self.text_at(cell, TABLE_SIZE, x + pad, bottom + row_height * 0.32, i < header_rows);
                }
                x += width;
            }
            self.polyline(&[(x, top), (x, bottom)], BORDER_COLOR, 0.3, false);

            self.y = bottom;
        }
        self.gap(4.0);
    }

    fn chart(&mut self, data: &ChartData) {
        let (Some((first, last)), Some((y_min, y_max))) = (data.date_bounds(), data.value_bounds())
        else {
            self.paragraph(&[vec![Word::plain(format!("[{}]", data.title))]], 0);
            return;
        };

        self.ensure_space(CHART_HEIGHT + 4.0);
        let top = self.y - 2.0;
        self.text_at(&data.title, 11.0, MARGIN, top - 5.0, true);

        let left = MARGIN + 20.0;
        let right = MARGIN + CONTENT_WIDTH - 2.0;
        let plot_top = top - 10.0;
        let plot_bottom = top - CHART_HEIGHT + 20.0;
        let span_days = (last - first).num_days().max(1) as f32;
        let y_span = (y_max - y_min).max(f64::EPSILON);

        let to_page = |date: chrono::NaiveDate, value: f64| -> (f32, f32) {
            let x = left + (date - first).num_days() as f32 / span_days * (right - left);
            let y = plot_bottom + ((value - y_min) / y_span) as f32 * (plot_top - plot_bottom);
            (x, y)
        };

        // Frame and horizontal grid with price labels
        self.polyline(
            &[(left, plot_bottom), (right, plot_bottom), (right, plot_top), (left, plot_top), (left, plot_bottom)],
            AXIS_COLOR,
            0.4,
            false,
        );
        for step in 0..=4 {
            let value = y_min + y_span * f64::from(step) / 4.0;
            let (_, y) = to_page(first, value);
            if step > 0 && step < 4 {
                self.polyline(&[(left, y), (right, y)], BORDER_COLOR, 0.2, false);
            }
            self.text_at(&format!("{value:.2}"), 6.5, MARGIN, y - 1.0, false);
        }

        // Date labels, at most one per day
        let label_every = ((span_days / 7.0).ceil() as i64).max(1);
        let mut day = 0;
        while day <= span_days as i64 {
            let date = first + Duration::days(day);
            let (x, _) = to_page(date, y_min);
            self.polyline(&[(x, plot_bottom), (x, plot_bottom - 1.2)], AXIS_COLOR, 0.3, false);
            self.text_at(&date.format("%Y-%m-%d").to_string(), 6.0, x - 6.5, plot_bottom - 4.5, false);
            day += label_every;
        }
        self.text_at("Date", 8.0, (left + right) / 2.0 - 3.0, plot_bottom - 9.0, false);
        self.text_at("Price (USD)", 8.0, MARGIN, plot_top + 2.0, false);

        for series in &data.series {
            let points: Vec<(f32, f32)> = series.points.iter().map(|(d, v)| to_page(*d, *v)).collect();
            self.polyline(&points, series.color, 0.8, series.dashed);
            if series.dashed {
                for &(x, y) in &points {
                    self.polyline(&[(x - 1.0, y - 1.0), (x + 1.0, y + 1.0)], series.color, 0.5, false);
                    self.polyline(&[(x - 1.0, y + 1.0), (x + 1.0, y - 1.0)], series.color, 0.5, false);
                }
            }
        }

        // Legend row under the axis
        let mut x = left;
        let legend_y = plot_bottom - 14.0;
        for series in data.series.iter().filter(|s| !s.points.is_empty()) {
            self.polyline(&[(x, legend_y + 1.0), (x + 6.0, legend_y + 1.0)], series.color, 0.8, series.dashed);
            self.text_at(&series.label, 7.0, x + 7.5, legend_y, false);
            x += 12.0 + text_width(&series.label, 7.0, false);
        }

        self.y = top - CHART_HEIGHT;
        self.gap(3.0);
    }

    fn finish(self) -> Result<RenderedPdf> {
        let page_count = self.page_count;
        let bytes = self.doc.save_to_bytes().map_err(pdf_err)?;
        Ok(RenderedPdf { bytes, page_count })
    }
}
