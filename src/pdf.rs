//! PDF adapter: section renderers, then the layout engine, then `lopdf`.

use crate::error::{ExportError, Result};
use crate::layout::{text_width, Color, DrawOp, LayoutCursor, Page, PageDecoration, PageGeometry};
use crate::sections;
use crate::service::ExportContext;
use encoding_rs::WINDOWS_1252;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use tracing::debug;

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";

/// Renders tool results into paginated PDF documents.
///
/// Stateless apart from the page geometry; every call owns its own
/// [`LayoutCursor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer {
    geometry: PageGeometry,
}

impl PdfRenderer {
    pub fn new(geometry: PageGeometry) -> Self {
        Self { geometry }
    }

    pub fn render(&self, ctx: &ExportContext<'_>) -> Result<Vec<u8>> {
        let blocks = sections::render(ctx.tool, &ctx.request.result_payload, &ctx.limits);
        debug!(tool = %ctx.tool, blocks = blocks.len(), "Rendered PDF sections");

        let mut cursor = LayoutCursor::new(self.geometry, decoration(ctx));
        for block in &blocks {
            cursor.write_block(block)?;
        }
        cursor.finish(&format!(
            "Generado el {} · Plan {}",
            ctx.generated_at(),
            ctx.tier.label()
        ))?;
        let pages = cursor.into_pages()?;
        debug!(pages = pages.len(), "Laid out PDF pages");

        write_document(&pages, self.geometry, &ctx.request.title)
    }
}

fn decoration(ctx: &ExportContext<'_>) -> PageDecoration {
    let mut decoration = PageDecoration::new(
        ctx.request.title.clone(),
        ctx.generated_at(),
        ctx.tier.label(),
    );
    if ctx.limits.include_watermark {
        decoration.watermark = Some("TRIAL".to_string());
    }
    if ctx.limits.include_custom_branding {
        if let Some(branding) = &ctx.request.branding_options {
            decoration.company_name = branding.company_name.clone();
            if let Some(color) = branding.primary_color.as_deref().and_then(Color::from_hex) {
                decoration.primary = color;
            }
            if let Some(color) = branding.secondary_color.as_deref().and_then(Color::from_hex) {
                decoration.secondary = color;
            }
        }
    }
    decoration
}

/// Assembles laid-out pages into a PDF 1.7 file using the base-14 Helvetica fonts.
pub fn write_document(pages: &[Page], geometry: PageGeometry, title: &str) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR_FONT => regular_id,
            BOLD_FONT => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let encoded = page_content(page, geometry)
            .encode()
            .map_err(|e| ExportError::Encoding(format!("page {}: {}", page.index + 1, e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let media_box: Vec<Object> = vec![
            0.into(),
            0.into(),
            geometry.width.into(),
            geometry.height.into(),
        ];
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(to_win_ansi(title), StringFormat::Literal),
        "Producer" => Object::string_literal(concat!("tiered-export ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ExportError::Encoding(e.to_string()))?;
    Ok(buffer)
}

fn page_content(page: &Page, geometry: PageGeometry) -> Content {
    let height = geometry.height;
    let mut operations = Vec::new();

    for op in &page.ops {
        match op {
            DrawOp::Text {
                x,
                y,
                size,
                bold,
                color,
                text,
            } => {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec![font(*bold).into(), (*size).into()]));
                operations.push(fill(*color));
                operations.push(Operation::new("Td", vec![(*x).into(), (height - y).into()]));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(to_win_ansi(text), StringFormat::Literal)],
                ));
                operations.push(Operation::new("ET", vec![]));
            }
            DrawOp::RotatedText {
                x,
                y,
                size,
                angle,
                color,
                text,
            } => {
                let (sin, cos) = angle.to_radians().sin_cos();
                let half_width = text_width(text, *size, true) / 2.0;
                // Shift the baseline so the glyphs' middle, not their bottom, crosses the center.
                let half_cap = size * 0.35;
                let start_x = x - half_width * cos + half_cap * sin;
                let start_y = (height - y) - half_width * sin - half_cap * cos;
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec![BOLD_FONT.into(), (*size).into()]));
                operations.push(fill(*color));
                operations.push(Operation::new(
                    "Tm",
                    vec![
                        cos.into(),
                        sin.into(),
                        (-sin).into(),
                        cos.into(),
                        start_x.into(),
                        start_y.into(),
                    ],
                ));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(to_win_ansi(text), StringFormat::Literal)],
                ));
                operations.push(Operation::new("ET", vec![]));
            }
            DrawOp::Rect {
                x,
                y,
                width,
                height: h,
                color,
            } => {
                operations.push(fill(*color));
                operations.push(Operation::new(
                    "re",
                    vec![(*x).into(), (height - y - h).into(), (*width).into(), (*h).into()],
                ));
                operations.push(Operation::new("f", vec![]));
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                width,
                color,
            } => {
                let (r, g, b) = color.to_unit();
                operations.push(Operation::new("RG", vec![r.into(), g.into(), b.into()]));
                operations.push(Operation::new("w", vec![(*width).into()]));
                operations.push(Operation::new("m", vec![(*x1).into(), (height - y1).into()]));
                operations.push(Operation::new("l", vec![(*x2).into(), (height - y2).into()]));
                operations.push(Operation::new("S", vec![]));
            }
        }
    }

    Content { operations }
}

fn font(bold: bool) -> &'static str {
    if bold {
        BOLD_FONT
    } else {
        REGULAR_FONT
    }
}

fn fill(color: Color) -> Operation {
    let (r, g, b) = color.to_unit();
    Operation::new("rg", vec![r.into(), g.into(), b.into()])
}

/// Encodes `s` as WinAnsi (cp1252). C1 controls and characters outside the
/// code page become `?`.
fn to_win_ansi(s: &str) -> Vec<u8> {
    let mut scratch = [0u8; 4];
    s.chars()
        .map(|c| {
            if ('\u{80}'..='\u{9f}').contains(&c) {
                return b'?';
            }
            let (bytes, _, unmappable) = WINDOWS_1252.encode(c.encode_utf8(&mut scratch));
            match bytes.as_ref() {
                [byte] if !unmappable => *byte,
                _ => b'?',
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::LayoutBlock;

    fn laid_out(paragraphs: usize, watermark: bool) -> Vec<Page> {
        let mut decoration = PageDecoration::new("Informe", "01/03/2024 10:00 UTC", "TRIAL");
        if watermark {
            decoration.watermark = Some("TRIAL".to_string());
        }
        let mut cursor = LayoutCursor::new(PageGeometry::A4, decoration);
        for i in 0..paragraphs {
            cursor
                .write_block(&LayoutBlock::paragraph(format!("Línea {i}")))
                .unwrap();
        }
        cursor.finish("pie").unwrap();
        cursor.into_pages().unwrap()
    }

    fn decoded_pages(bytes: &[u8]) -> Vec<Content> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .values()
            .map(|id| Content::decode(&doc.get_page_content(*id).unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn test_win_ansi_conversion() {
        assert_eq!(to_win_ansi("Página"), b"P\xe1gina".to_vec());
        assert_eq!(to_win_ansi("a\u{2014}b"), b"a\x97b".to_vec());
        assert_eq!(
            to_win_ansi("€ “hola” ‘sí’ – …"),
            b"\x80 \x93hola\x94 \x91s\xed\x92 \x96 \x85".to_vec()
        );
        assert_eq!(to_win_ansi("\u{81}\u{9d}x"), b"??x".to_vec());
        assert_eq!(to_win_ansi("日本"), b"??".to_vec());
    }

    #[test]
    fn test_document_has_one_pdf_page_per_layout_page() {
        let pages = laid_out(120, false);
        let bytes = write_document(&pages, PageGeometry::A4, "Informe").unwrap();

        assert!(bytes.starts_with(b"%PDF-1.7"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), pages.len());
    }

    #[test]
    fn test_watermark_rotated_on_every_page() {
        let pages = laid_out(120, true);
        let bytes = write_document(&pages, PageGeometry::A4, "Informe").unwrap();
        let contents = decoded_pages(&bytes);
        assert!(contents.len() > 1);

        for content in contents {
            let ops = &content.operations;
            let found = ops.windows(2).any(|w| {
                w[0].operator == "Tm"
                    && w[1].operator == "Tj"
                    && matches!(&w[1].operands[0], Object::String(s, _) if s.as_slice() == b"TRIAL")
                    && (w[0].operands[0].as_float().unwrap() - 0.70710677).abs() < 1e-4
                    && (w[0].operands[1].as_float().unwrap() - 0.70710677).abs() < 1e-4
            });
            assert!(found, "missing rotated watermark");
        }
    }

    #[test]
    fn test_no_rotation_without_watermark() {
        let pages = laid_out(3, false);
        let bytes = write_document(&pages, PageGeometry::A4, "Informe").unwrap();
        for content in decoded_pages(&bytes) {
            assert!(!content.operations.iter().any(|op| op.operator == "Tm"));
        }
    }
}
