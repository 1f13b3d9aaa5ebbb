//! Minimal PDF assembly for the DANFE.
//!
//! A page is a content stream of text and line operators; this module
//! wraps the operator syntax and the lopdf object wiring (fonts, page
//! tree, catalog) so the layout code only talks in points.

use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use crate::core::NfeError;

/// A4 in points.
pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;

/// Fonts registered on every page.
#[derive(Debug, Clone, Copy)]
pub enum Font {
    Regular,
    Bold,
    /// Fixed pitch, used for the access key and barcode-adjacent fields.
    Mono,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
            Self::Mono => "F3",
        }
    }
}

/// One page's content stream under construction. Coordinates are PDF
/// points with the origin at the bottom-left corner.
#[derive(Default)]
pub struct PageCanvas {
    ops: String,
}

impl PageCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, x: f32, y: f32, font: Font, size: f32, content: &str) {
        self.ops.push_str(&format!(
            "BT /{} {size} Tf {x:.1} {y:.1} Td ({}) Tj ET\n",
            font.resource_name(),
            escape_pdf_text(content),
        ));
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.ops
            .push_str(&format!("0.5 w {x1:.1} {y1:.1} m {x2:.1} {y2:.1} l S\n"));
    }

    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.ops
            .push_str(&format!("0.5 w {x:.1} {y:.1} {width:.1} {height:.1} re S\n"));
    }

    pub fn filled_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.ops
            .push_str(&format!("{x:.1} {y:.1} {width:.1} {height:.1} re f\n"));
    }

    /// Splice pre-built operators (QR modules).
    pub fn raw_ops(&mut self, ops: &str) {
        self.ops.push_str(ops);
    }

    fn into_stream(self) -> Stream {
        Stream::new(dictionary! {}, self.ops.into_bytes())
    }
}

fn escape_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\\' => out.push_str("\\\\"),
            // Literal strings are Latin-1; fold anything outside.
            c if (c as u32) < 256 => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Assembles finished pages into a PDF file.
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    font_ids: [(ObjectId, &'static str); 3],
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular = doc.add_object(dictionary! {
            "Type" => Object::Name(b"Font".to_vec()),
            "Subtype" => Object::Name(b"Type1".to_vec()),
            "BaseFont" => Object::Name(b"Helvetica".to_vec()),
        });
        let bold = doc.add_object(dictionary! {
            "Type" => Object::Name(b"Font".to_vec()),
            "Subtype" => Object::Name(b"Type1".to_vec()),
            "BaseFont" => Object::Name(b"Helvetica-Bold".to_vec()),
        });
        let mono = doc.add_object(dictionary! {
            "Type" => Object::Name(b"Font".to_vec()),
            "Subtype" => Object::Name(b"Type1".to_vec()),
            "BaseFont" => Object::Name(b"Courier".to_vec()),
        });

        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            font_ids: [(regular, "F1"), (bold, "F2"), (mono, "F3")],
        }
    }

    pub fn add_page(&mut self, canvas: PageCanvas) {
        let content_id = self.doc.add_object(canvas.into_stream());

        let mut fonts = lopdf::Dictionary::new();
        for (id, name) in self.font_ids {
            fonts.set(name, Object::Reference(id));
        }
        let resources = dictionary! { "Font" => Object::Dictionary(fonts) };

        let page_id = self.doc.add_object(dictionary! {
            "Type" => Object::Name(b"Page".to_vec()),
            "Parent" => Object::Reference(self.pages_id),
            "MediaBox" => Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH),
                Object::Real(PAGE_HEIGHT),
            ]),
            "Resources" => Object::Dictionary(resources),
            "Contents" => Object::Reference(content_id),
        });
        self.page_ids.push(page_id);
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn finish(mut self) -> Result<Vec<u8>, NfeError> {
        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => Object::Name(b"Pages".to_vec()),
                "Kids" => Object::Array(kids),
                "Count" => Object::Integer(count),
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => Object::Name(b"Catalog".to_vec()),
            "Pages" => Object::Reference(self.pages_id),
        });
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| NfeError::Xml(format!("PDF serialization error: {e}")))?;
        Ok(buf)
    }
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}
