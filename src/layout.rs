//! Cursor-based page layout.
//!
//! [`LayoutCursor`] places [`LayoutBlock`]s top to bottom and breaks pages on
//! vertical overflow. Blocks are atomic: a block that does not fit on the
//! current page moves to the next one whole. The only exception is a block
//! taller than an empty page, which is cut at row, item or wrapped-line
//! boundaries.
//!
//! Every page, the first included, gets the same header and (when requested)
//! the same diagonal watermark. The output is a list of [`Page`]s holding
//! positioned [`DrawOp`]s with a top-left origin; the PDF adapter turns them
//! into content streams.

use crate::blocks::{LayoutBlock, ListItem, Priority};
use crate::error::{ExportError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(33, 37, 41);
    pub const GRAY: Color = Color::rgb(108, 117, 125);
    pub const LIGHT_GRAY: Color = Color::rgb(241, 243, 245);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const WATERMARK: Color = Color::rgb(215, 215, 215);
    pub const PRIMARY: Color = Color::rgb(37, 99, 235);
    pub const SECONDARY: Color = Color::rgb(219, 234, 254);
    pub const GREEN: Color = Color::rgb(22, 163, 74);
    pub const AMBER: Color = Color::rgb(217, 119, 6);
    pub const RED: Color = Color::rgb(220, 38, 38);
    pub const NOTICE: Color = Color::rgb(254, 243, 199);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` or `rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

/// Page size and margin in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    pub const A4: PageGeometry = PageGeometry {
        width: 595.0,
        height: 842.0,
        margin: 40.0,
    };
    pub const LETTER: PageGeometry = PageGeometry {
        width: 612.0,
        height: 792.0,
        margin: 40.0,
    };

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "a4" => Some(Self::A4),
            "letter" => Some(Self::LETTER),
            _ => None,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn content_top(&self) -> f32 {
        self.margin + HEADER_HEIGHT
    }

    pub fn content_bottom(&self) -> f32 {
        self.height - self.margin
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

/// What gets repeated on every page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDecoration {
    pub title: String,
    pub generated_at: String,
    pub tier_label: String,
    pub watermark: Option<String>,
    pub company_name: Option<String>,
    pub primary: Color,
    pub secondary: Color,
}

impl PageDecoration {
    pub fn new(title: impl Into<String>, generated_at: impl Into<String>, tier_label: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            generated_at: generated_at.into(),
            tier_label: tier_label.into(),
            watermark: None,
            company_name: None,
            primary: Color::PRIMARY,
            secondary: Color::SECONDARY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// `y` is the text baseline.
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        color: Color,
        text: String,
    },
    /// Centered on (`x`, `y`), rotated counter-clockwise by `angle` degrees.
    RotatedText {
        x: f32,
        y: f32,
        size: f32,
        angle: f32,
        color: Color,
        text: String,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
        color: Color,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub index: usize,
    pub ops: Vec<DrawOp>,
}

impl Page {
    /// All text drawn on the page, rotated text included.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } | DrawOp::RotatedText { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn has_watermark(&self, text: &str) -> bool {
        self.ops.iter().any(|op| {
            matches!(op, DrawOp::RotatedText { text: t, angle, .. } if t == text && (*angle - 45.0).abs() < f32::EPSILON)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutState {
    Fresh,
    Writing,
    PageFull,
    Finalized,
}

const HEADER_HEIGHT: f32 = 52.0;
const REGULAR_ADVANCE: f32 = 0.5;
const BOLD_ADVANCE: f32 = 0.55;
const WATERMARK_SIZE: f32 = 96.0;
const TABLE_HEADER_HEIGHT: f32 = 18.0;
const ROW_HEIGHT: f32 = 16.0;
const BLOCK_GAP: f32 = 8.0;
const GAUGE_HEIGHT: f32 = 40.0;

/// Approximate Helvetica advance; no font files are consulted.
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let advance = if bold { BOLD_ADVANCE } else { REGULAR_ADVANCE };
    text.chars().count() as f32 * size * advance
}

fn max_chars(size: f32, bold: bool, max_width: f32) -> usize {
    let advance = if bold { BOLD_ADVANCE } else { REGULAR_ADVANCE };
    ((max_width / (size * advance)).floor() as usize).max(1)
}

/// Greedy word wrap. Always returns at least one line.
pub fn wrap_text(text: &str, size: f32, bold: bool, max_width: f32) -> Vec<String> {
    let limit = max_chars(size, bold, max_width);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();

        if current_len > 0 && current_len + 1 + word_len <= limit {
            current.push(' ');
            current.push_str(word);
            continue;
        }
        if current_len > 0 {
            lines.push(std::mem::take(&mut current));
        }
        if word_len <= limit {
            current.push_str(word);
        } else {
            let chars: Vec<char> = word.chars().collect();
            let mut chunks = chars.chunks(limit).peekable();
            while let Some(chunk) = chunks.next() {
                let piece: String = chunk.iter().collect();
                if chunks.peek().is_some() {
                    lines.push(piece);
                } else {
                    current = piece;
                }
            }
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Cuts `text` to one line, ending in `...` when shortened.
pub fn clip_text(text: &str, size: f32, bold: bool, max_width: f32) -> String {
    let limit = max_chars(size, bold, max_width);
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

fn score_color(score: Option<f64>) -> Color {
    match score {
        Some(s) if s >= 80.0 => Color::GREEN,
        Some(s) if s >= 50.0 => Color::AMBER,
        Some(_) => Color::RED,
        None => Color::GRAY,
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::RED,
        Priority::Medium => Color::AMBER,
        Priority::Low => Color::GREEN,
    }
}

/// Single-owner layout state for one PDF export.
#[derive(Debug)]
pub struct LayoutCursor {
    state: LayoutState,
    geometry: PageGeometry,
    decoration: PageDecoration,
    pages: Vec<Page>,
    y: f32,
}

impl LayoutCursor {
    pub fn new(geometry: PageGeometry, decoration: PageDecoration) -> Self {
        Self {
            state: LayoutState::Fresh,
            geometry,
            decoration,
            pages: Vec::new(),
            y: geometry.content_top(),
        }
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    pub fn current_page_index(&self) -> usize {
        self.pages.len().saturating_sub(1)
    }

    pub fn vertical_position(&self) -> f32 {
        self.y
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Places one block, breaking the page first when it would overflow.
    pub fn write_block(&mut self, block: &LayoutBlock) -> Result<()> {
        if self.state == LayoutState::Finalized {
            return Err(ExportError::InvalidState(
                "write after the document was finalized".to_string(),
            ));
        }
        if self.state == LayoutState::Fresh {
            self.start_page();
        }

        let writable = self.geometry.content_bottom() - self.geometry.content_top();
        if self.measure(block) > writable {
            let pieces = self.split(block, writable);
            if pieces.len() > 1 {
                for piece in &pieces {
                    self.place(piece);
                }
                return Ok(());
            }
        }
        self.place(block);
        Ok(())
    }

    /// Writes the footer and seals the document.
    pub fn finish(&mut self, footer: &str) -> Result<()> {
        self.write_block(&LayoutBlock::Footer {
            text: footer.to_string(),
        })?;
        self.state = LayoutState::Finalized;
        Ok(())
    }

    /// Returns the laid-out pages with "Página i de N" stamped on each.
    pub fn into_pages(self) -> Result<Vec<Page>> {
        if self.state != LayoutState::Finalized {
            return Err(ExportError::InvalidState(
                "pages requested before the document was finalized".to_string(),
            ));
        }
        let total = self.pages.len();
        let geometry = self.geometry;
        let mut pages = self.pages;
        for page in &mut pages {
            let label = format!("Página {} de {}", page.index + 1, total);
            page.ops.push(DrawOp::Text {
                x: (geometry.width - text_width(&label, 8.0, false)) / 2.0,
                y: geometry.height - geometry.margin / 2.0,
                size: 8.0,
                bold: false,
                color: Color::GRAY,
                text: label,
            });
        }
        Ok(pages)
    }

    fn place(&mut self, block: &LayoutBlock) {
        let height = self.measure(block);
        let at_top = (self.y - self.geometry.content_top()).abs() < f32::EPSILON;
        if self.y + height > self.geometry.content_bottom() && !at_top {
            self.state = LayoutState::PageFull;
            self.start_page();
        }
        let (ops, height) = self.compose(block, self.y);
        if let Some(page) = self.pages.last_mut() {
            page.ops.extend(ops);
        }
        self.y += height;
        self.state = LayoutState::Writing;
    }

    fn start_page(&mut self) {
        let index = self.pages.len();
        let mut ops = Vec::new();
        let g = self.geometry;
        let d = &self.decoration;

        if let Some(text) = &d.watermark {
            ops.push(DrawOp::RotatedText {
                x: g.width / 2.0,
                y: g.height / 2.0,
                size: WATERMARK_SIZE,
                angle: 45.0,
                color: Color::WATERMARK,
                text: text.clone(),
            });
        }

        let badge_width = text_width(&d.tier_label, 8.0, true) + 12.0;
        let badge_x = g.width - g.margin - badge_width;
        ops.push(DrawOp::Rect {
            x: badge_x,
            y: g.margin,
            width: badge_width,
            height: 14.0,
            color: d.primary,
        });
        ops.push(DrawOp::Text {
            x: badge_x + 6.0,
            y: g.margin + 10.0,
            size: 8.0,
            bold: true,
            color: Color::WHITE,
            text: d.tier_label.clone(),
        });
        ops.push(DrawOp::Text {
            x: g.margin,
            y: g.margin + 14.0,
            size: 14.0,
            bold: true,
            color: d.primary,
            text: clip_text(&d.title, 14.0, true, g.content_width() - badge_width - 10.0),
        });
        ops.push(DrawOp::Text {
            x: g.margin,
            y: g.margin + 30.0,
            size: 9.0,
            bold: false,
            color: Color::GRAY,
            text: format!("Generado: {}", d.generated_at),
        });
        if let Some(company) = &d.company_name {
            ops.push(DrawOp::Text {
                x: g.width - g.margin - text_width(company, 9.0, false),
                y: g.margin + 30.0,
                size: 9.0,
                bold: false,
                color: Color::GRAY,
                text: company.clone(),
            });
        }
        ops.push(DrawOp::Line {
            x1: g.margin,
            y1: g.margin + 38.0,
            x2: g.width - g.margin,
            y2: g.margin + 38.0,
            width: 1.0,
            color: d.primary,
        });

        self.pages.push(Page { index, ops });
        self.y = g.content_top();
        self.state = LayoutState::Writing;
    }

    fn measure(&self, block: &LayoutBlock) -> f32 {
        self.compose(block, 0.0).1
    }

    /// Cuts a row-shaped block into pieces that each fit `available`.
    fn split(&self, block: &LayoutBlock, available: f32) -> Vec<LayoutBlock> {
        match block {
            LayoutBlock::Table { headers, rows } => {
                let fixed = TABLE_HEADER_HEIGHT + BLOCK_GAP;
                let per_piece = (((available - fixed) / ROW_HEIGHT).floor() as usize).max(1);
                rows.chunks(per_piece)
                    .map(|chunk| LayoutBlock::Table {
                        headers: headers.clone(),
                        rows: chunk.to_vec(),
                    })
                    .collect()
            }
            LayoutBlock::KeyValueTable { title, rows } => {
                let title_height = if title.is_some() { 18.0 } else { 0.0 };
                let first = (((available - title_height - BLOCK_GAP) / ROW_HEIGHT).floor() as usize).max(1);
                let rest = (((available - BLOCK_GAP) / ROW_HEIGHT).floor() as usize).max(1);
                let mut pieces = Vec::new();
                let mut remaining = rows.as_slice();
                while !remaining.is_empty() {
                    let take = if pieces.is_empty() { first } else { rest }.min(remaining.len());
                    pieces.push(LayoutBlock::KeyValueTable {
                        title: if pieces.is_empty() { title.clone() } else { None },
                        rows: remaining[..take].to_vec(),
                    });
                    remaining = &remaining[take..];
                }
                pieces
            }
            LayoutBlock::ItemizedList { items } => {
                let budget = available - BLOCK_GAP;
                let mut pieces = Vec::new();
                let mut current: Vec<ListItem> = Vec::new();
                let mut used = BLOCK_GAP;
                for item in items {
                    let fragments = if self.item_height(item) > budget {
                        self.split_item(item, budget)
                    } else {
                        vec![item.clone()]
                    };
                    for fragment in fragments {
                        let height = self.item_height(&fragment);
                        if !current.is_empty() && used + height > available {
                            pieces.push(LayoutBlock::ItemizedList {
                                items: std::mem::take(&mut current),
                            });
                            used = BLOCK_GAP;
                        }
                        used += height;
                        current.push(fragment);
                    }
                }
                if !current.is_empty() {
                    pieces.push(LayoutBlock::ItemizedList { items: current });
                }
                pieces
            }
            LayoutBlock::Paragraph { text } => {
                let lines = wrap_text(text, 10.0, false, self.geometry.content_width());
                let per_piece = (((available - 6.0) / 13.0).floor() as usize).max(1);
                lines
                    .chunks(per_piece)
                    .map(|chunk| LayoutBlock::Paragraph { text: chunk.join(" ") })
                    .collect()
            }
            LayoutBlock::Heading { text, level } => {
                let (size, fixed) = if *level <= 1 { (15.0, 16.0) } else { (12.0, 12.0) };
                let lines = wrap_text(text, size, true, self.geometry.content_width());
                let per_piece = (((available - fixed) / (size * 1.3)).floor() as usize).max(1);
                lines
                    .chunks(per_piece)
                    .map(|chunk| LayoutBlock::Heading {
                        text: chunk.join(" "),
                        level: *level,
                    })
                    .collect()
            }
            other => vec![other.clone()],
        }
    }

    /// Cuts one item taller than `budget` into a head (marker, title and the
    /// first detail lines) and untitled continuations carrying the rest.
    /// A title that alone overflows `budget` is clipped.
    fn split_item(&self, item: &ListItem, budget: f32) -> Vec<ListItem> {
        let width = self.geometry.content_width() - 48.0;
        let mut title_lines = wrap_text(&item.title, 10.0, true, width);
        let max_title = (((budget - 6.0) / 13.0).floor() as usize).max(1);
        if title_lines.len() > max_title {
            let rest = title_lines[max_title - 1..].join(" ");
            title_lines.truncate(max_title - 1);
            title_lines.push(clip_text(&format!("{rest}..."), 10.0, true, width));
        }
        let detail_lines = item
            .detail
            .as_deref()
            .map(|d| wrap_text(d, 9.0, false, width))
            .unwrap_or_default();

        let head_room = budget - 6.0 - title_lines.len() as f32 * 13.0;
        let head_take = ((head_room / 12.0).floor().max(0.0) as usize).min(detail_lines.len());
        let per_piece = (((budget - 6.0) / 12.0).floor() as usize).max(1);

        let mut head = ListItem::new(title_lines.join(" "));
        head.priority = item.priority;
        if head_take > 0 {
            head.detail = Some(detail_lines[..head_take].join(" "));
        }
        let mut fragments = vec![head];
        fragments.extend(detail_lines[head_take..].chunks(per_piece).map(|chunk| ListItem {
            title: String::new(),
            detail: Some(chunk.join(" ")),
            priority: None,
        }));
        fragments
    }

    fn item_height(&self, item: &ListItem) -> f32 {
        let width = self.geometry.content_width() - 48.0;
        let title_lines = if item.title.is_empty() {
            0.0
        } else {
            wrap_text(&item.title, 10.0, true, width).len() as f32
        };
        let detail_lines = item
            .detail
            .as_deref()
            .map_or(0.0, |d| wrap_text(d, 9.0, false, width).len() as f32);
        title_lines * 13.0 + detail_lines * 12.0 + 6.0
    }

    /// Draw ops for `block` with its top edge at `top`, plus the height consumed.
    fn compose(&self, block: &LayoutBlock, top: f32) -> (Vec<DrawOp>, f32) {
        let g = self.geometry;
        let d = &self.decoration;
        let x0 = g.margin;
        let width = g.content_width();
        let mut ops = Vec::new();

        let height = match block {
            LayoutBlock::Heading { text, level } => {
                let (size, color) = if *level <= 1 {
                    (15.0, d.primary)
                } else {
                    (12.0, Color::BLACK)
                };
                let line_height = size * 1.3;
                let mut y = top + 6.0;
                for line in wrap_text(text, size, true, width) {
                    ops.push(DrawOp::Text {
                        x: x0,
                        y: y + size,
                        size,
                        bold: true,
                        color,
                        text: line,
                    });
                    y += line_height;
                }
                if *level <= 1 {
                    ops.push(DrawOp::Line {
                        x1: x0,
                        y1: y + 2.0,
                        x2: x0 + width,
                        y2: y + 2.0,
                        width: 0.5,
                        color: d.secondary,
                    });
                    y += 4.0;
                }
                y + 6.0 - top
            }
            LayoutBlock::Paragraph { text } => {
                let mut y = top;
                for line in wrap_text(text, 10.0, false, width) {
                    ops.push(DrawOp::Text {
                        x: x0,
                        y: y + 10.0,
                        size: 10.0,
                        bold: false,
                        color: Color::BLACK,
                        text: line,
                    });
                    y += 13.0;
                }
                y + 6.0 - top
            }
            LayoutBlock::KeyValueTable { title, rows } => {
                let mut y = top;
                if let Some(title) = title {
                    ops.push(DrawOp::Text {
                        x: x0,
                        y: y + 12.0,
                        size: 10.5,
                        bold: true,
                        color: Color::BLACK,
                        text: clip_text(title, 10.5, true, width),
                    });
                    y += 18.0;
                }
                let key_width = width * 0.6;
                for (i, (key, value)) in rows.iter().enumerate() {
                    if i % 2 == 0 {
                        ops.push(DrawOp::Rect {
                            x: x0,
                            y,
                            width,
                            height: ROW_HEIGHT,
                            color: Color::LIGHT_GRAY,
                        });
                    }
                    ops.push(DrawOp::Text {
                        x: x0 + 4.0,
                        y: y + 11.5,
                        size: 9.5,
                        bold: false,
                        color: Color::GRAY,
                        text: clip_text(key, 9.5, false, key_width - 8.0),
                    });
                    ops.push(DrawOp::Text {
                        x: x0 + key_width,
                        y: y + 11.5,
                        size: 9.5,
                        bold: true,
                        color: Color::BLACK,
                        text: clip_text(value, 9.5, true, width - key_width - 4.0),
                    });
                    y += ROW_HEIGHT;
                }
                y + BLOCK_GAP - top
            }
            LayoutBlock::Table { headers, rows } => {
                let widths = column_widths(headers, rows, width);
                ops.push(DrawOp::Rect {
                    x: x0,
                    y: top,
                    width,
                    height: TABLE_HEADER_HEIGHT,
                    color: d.secondary,
                });
                let mut x = x0;
                for (header, w) in headers.iter().zip(&widths) {
                    ops.push(DrawOp::Text {
                        x: x + 4.0,
                        y: top + 12.5,
                        size: 9.0,
                        bold: true,
                        color: Color::BLACK,
                        text: clip_text(header, 9.0, true, w - 8.0),
                    });
                    x += w;
                }
                let mut y = top + TABLE_HEADER_HEIGHT;
                for row in rows {
                    let mut x = x0;
                    for (cell, w) in row.iter().zip(&widths) {
                        ops.push(DrawOp::Text {
                            x: x + 4.0,
                            y: y + 11.5,
                            size: 9.0,
                            bold: false,
                            color: Color::BLACK,
                            text: clip_text(cell, 9.0, false, w - 8.0),
                        });
                        x += w;
                    }
                    ops.push(DrawOp::Line {
                        x1: x0,
                        y1: y + ROW_HEIGHT,
                        x2: x0 + width,
                        y2: y + ROW_HEIGHT,
                        width: 0.25,
                        color: Color::LIGHT_GRAY,
                    });
                    y += ROW_HEIGHT;
                }
                y + BLOCK_GAP - top
            }
            LayoutBlock::ScoreGauge { label, score } => {
                let bar_width = width * 0.6;
                let color = score_color(*score);
                ops.push(DrawOp::Text {
                    x: x0,
                    y: top + 11.0,
                    size: 10.0,
                    bold: true,
                    color: Color::BLACK,
                    text: label.clone(),
                });
                ops.push(DrawOp::Rect {
                    x: x0,
                    y: top + 17.0,
                    width: bar_width,
                    height: 12.0,
                    color: Color::LIGHT_GRAY,
                });
                if let Some(score) = score {
                    let ratio = (*score as f32 / 100.0).clamp(0.0, 1.0);
                    if ratio > 0.0 {
                        ops.push(DrawOp::Rect {
                            x: x0,
                            y: top + 17.0,
                            width: bar_width * ratio,
                            height: 12.0,
                            color,
                        });
                    }
                }
                ops.push(DrawOp::Text {
                    x: x0 + bar_width + 10.0,
                    y: top + 27.0,
                    size: 12.0,
                    bold: true,
                    color,
                    text: match score {
                        Some(s) => format!("{}/100", s.round() as i64),
                        None => crate::payload::NOT_AVAILABLE.to_string(),
                    },
                });
                GAUGE_HEIGHT
            }
            LayoutBlock::ItemizedList { items } => {
                let text_x = x0 + 44.0;
                let text_width_max = width - 48.0;
                let mut y = top;
                for item in items {
                    let continuation = item.title.is_empty();
                    match item.priority {
                        _ if continuation => {}
                        Some(priority) => {
                            ops.push(DrawOp::Rect {
                                x: x0,
                                y: y + 2.0,
                                width: 36.0,
                                height: 11.0,
                                color: priority_color(priority),
                            });
                            ops.push(DrawOp::Text {
                                x: x0 + 4.0,
                                y: y + 10.5,
                                size: 7.0,
                                bold: true,
                                color: Color::WHITE,
                                text: priority.label().to_string(),
                            });
                        }
                        None => ops.push(DrawOp::Text {
                            x: x0 + 30.0,
                            y: y + 10.0,
                            size: 10.0,
                            bold: true,
                            color: d.primary,
                            text: "-".to_string(),
                        }),
                    }
                    let mut line_y = y;
                    let title_lines = if continuation {
                        Vec::new()
                    } else {
                        wrap_text(&item.title, 10.0, true, text_width_max)
                    };
                    for line in title_lines {
                        ops.push(DrawOp::Text {
                            x: text_x,
                            y: line_y + 10.0,
                            size: 10.0,
                            bold: true,
                            color: Color::BLACK,
                            text: line,
                        });
                        line_y += 13.0;
                    }
                    if let Some(detail) = &item.detail {
                        for line in wrap_text(detail, 9.0, false, text_width_max) {
                            ops.push(DrawOp::Text {
                                x: text_x,
                                y: line_y + 9.0,
                                size: 9.0,
                                bold: false,
                                color: Color::GRAY,
                                text: line,
                            });
                            line_y += 12.0;
                        }
                    }
                    y += self.item_height(item);
                }
                y + BLOCK_GAP - top
            }
            LayoutBlock::UpgradeNotice { remaining } => {
                let lines = wrap_text(&LayoutBlock::upgrade_text(*remaining), 9.5, true, width - 16.0);
                let box_height = lines.len() as f32 * 13.0 + 12.0;
                ops.push(DrawOp::Rect {
                    x: x0,
                    y: top,
                    width,
                    height: box_height,
                    color: Color::NOTICE,
                });
                for (i, line) in lines.into_iter().enumerate() {
                    ops.push(DrawOp::Text {
                        x: x0 + 8.0,
                        y: top + 6.0 + 10.0 + i as f32 * 13.0,
                        size: 9.5,
                        bold: true,
                        color: Color::AMBER,
                        text: line,
                    });
                }
                box_height + BLOCK_GAP
            }
            LayoutBlock::Footer { text } => {
                ops.push(DrawOp::Line {
                    x1: x0,
                    y1: top + 6.0,
                    x2: x0 + width,
                    y2: top + 6.0,
                    width: 0.5,
                    color: Color::GRAY,
                });
                ops.push(DrawOp::Text {
                    x: x0,
                    y: top + 18.0,
                    size: 8.0,
                    bold: false,
                    color: Color::GRAY,
                    text: clip_text(text, 8.0, false, width),
                });
                22.0
            }
        };
        (ops, height)
    }
}

/// Column widths proportional to the longest cell, each between 4 and 40 characters.
fn column_widths(headers: &[String], rows: &[Vec<String>], total: f32) -> Vec<f32> {
    let weights: Vec<f32> = (0..headers.len())
        .map(|col| {
            let longest = std::iter::once(&headers[col])
                .chain(rows.iter().filter_map(|row| row.get(col)))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            longest.clamp(4, 40) as f32
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    if sum <= 0.0 {
        return vec![total / headers.len().max(1) as f32; headers.len()];
    }
    weights.iter().map(|w| total * w / sum).collect()
}
