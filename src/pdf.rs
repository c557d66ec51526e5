use crate::canvas::{Command, Document, Page};
use crate::error::Result;
use crate::types::{Color, Pt};
use fixed::types::I32F32;
use lopdf::{Document as LoDocument, Object as LoObject, Stream as LoStream, dictionary};
use std::collections::BTreeMap;

const BASE14: [&str; 14] = [
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Symbol",
    "ZapfDingbats",
];

const DEFAULT_FACE: &str = "Helvetica";

/// Serializes a recorded document. Text is set in the standard 14 fonts with
/// WinAnsi encoding; any other face name is drawn as Helvetica.
pub fn document_to_pdf(document: &Document) -> Result<Vec<u8>> {
    let fonts = FontMap::collect(document);
    let mut doc = LoDocument::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut font_resources = lopdf::Dictionary::new();
    for (base_font, resource) in fonts.resources() {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base_font,
            "Encoding" => "WinAnsiEncoding",
        });
        font_resources.set(resource.as_bytes().to_vec(), LoObject::Reference(font_id));
    }
    let resources_id = doc.add_object(dictionary! {
        "Font" => font_resources,
    });

    let width = document.page_size.width;
    let height = document.page_size.height;
    let media_box: Vec<LoObject> = vec![
        LoObject::Integer(0),
        LoObject::Integer(0),
        width.to_f32().into(),
        height.to_f32().into(),
    ];

    let mut kids = Vec::with_capacity(document.pages.len());
    for page in &document.pages {
        let content = render_page(page, height, &fonts);
        let content_id = doc.add_object(LoStream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => media_box.clone(),
        });
        kids.push(LoObject::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
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

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    log::debug!(
        "wrote pdf: {} pages, {} fonts, {} bytes",
        document.pages.len(),
        fonts.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Face names used by the document mapped to `/F<n>` resources.
struct FontMap {
    by_face: BTreeMap<String, String>,
    resources: BTreeMap<&'static str, String>,
}

impl FontMap {
    fn collect(document: &Document) -> Self {
        let mut map = Self {
            by_face: BTreeMap::new(),
            resources: BTreeMap::new(),
        };
        map.insert(DEFAULT_FACE);
        for command in document.pages.iter().flat_map(|p| p.commands.iter()) {
            if let Command::SetFontName(name) = command {
                map.insert(name);
            }
        }
        map
    }

    fn insert(&mut self, face: &str) {
        if self.by_face.contains_key(face) {
            return;
        }
        let base = base14_name(face).unwrap_or_else(|| {
            log::warn!("font {face} is not a standard PDF font; drawing it as {DEFAULT_FACE}");
            DEFAULT_FACE
        });
        let next = self.resources.len() + 1;
        let resource = self
            .resources
            .entry(base)
            .or_insert_with(|| format!("F{next}"))
            .clone();
        self.by_face.insert(face.to_string(), resource);
    }

    fn resource(&self, face: &str) -> &str {
        self.by_face
            .get(face)
            .or_else(|| self.by_face.get(DEFAULT_FACE))
            .map(String::as_str)
            .unwrap_or("F1")
    }

    fn resources(&self) -> impl Iterator<Item = (&'static str, &String)> {
        self.resources.iter().map(|(base, resource)| (*base, resource))
    }

    fn len(&self) -> usize {
        self.resources.len()
    }
}

fn base14_name(face: &str) -> Option<&'static str> {
    let wanted = face.trim().trim_matches('"').trim_matches('\'');
    BASE14
        .iter()
        .copied()
        .find(|name| name.eq_ignore_ascii_case(wanted))
}

fn render_page(page: &Page, page_height: Pt, fonts: &FontMap) -> Vec<u8> {
    let mut out = Vec::new();
    let mut font_name = DEFAULT_FACE.to_string();
    let mut font_size = Pt::from_f32(12.0);

    for command in &page.commands {
        match command {
            Command::SaveState => push(&mut out, "q\n"),
            Command::RestoreState => push(&mut out, "Q\n"),
            Command::SetFillColor(color) => push(&mut out, color_op(*color, "rg")),
            Command::SetStrokeColor(color) => push(&mut out, color_op(*color, "RG")),
            Command::SetLineWidth(width) => push(&mut out, format!("{} w\n", fmt_pt(*width))),
            Command::SetFontName(name) => font_name = name.clone(),
            Command::SetFontSize(size) => font_size = *size,
            Command::MoveTo { x, y } => push(
                &mut out,
                format!("{} {} m\n", fmt_pt(*x), fmt_pt(page_height - *y)),
            ),
            Command::LineTo { x, y } => push(
                &mut out,
                format!("{} {} l\n", fmt_pt(*x), fmt_pt(page_height - *y)),
            ),
            Command::ClosePath => push(&mut out, "h\n"),
            Command::Stroke => push(&mut out, "S\n"),
            Command::DrawRect {
                x,
                y,
                width,
                height,
            } => push(
                &mut out,
                format!(
                    "{} {} {} {} re\nf\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ),
            ),
            Command::DrawString { x, y, text } => {
                push(
                    &mut out,
                    format!(
                        "BT\n/{} {} Tf\n{} {} Td\n",
                        fonts.resource(&font_name),
                        fmt_pt(font_size),
                        fmt_pt(*x),
                        fmt_pt(page_height - *y - font_size)
                    ),
                );
                out.push(b'(');
                out.extend(encode_winansi(text));
                push(&mut out, ") Tj\nET\n");
            }
        }
    }
    out
}

fn push(out: &mut Vec<u8>, op: impl AsRef<str>) {
    out.extend_from_slice(op.as_ref().as_bytes());
}

// Latin-1 maps straight onto WinAnsi outside 0x80..=0x9F; everything else
// becomes '?'.
fn encode_winansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let byte = match ch as u32 {
            code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
            _ => b'?',
        };
        if matches!(byte, b'\\' | b'(' | b')') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out
}

fn color_op(color: Color, op: &str) -> String {
    format!(
        "{} {} {} {}\n",
        fmt(color.r),
        fmt(color.g),
        fmt(color.b),
        op
    )
}

fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let scaled = (I32F32::from_num(value) * I32F32::from_num(1000)).round();
    format_milli(scaled.to_num())
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn format_milli(milli: i64) -> String {
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let (int_part, frac_part) = (abs / 1000, abs % 1000);
    if frac_part == 0 {
        return format!("{sign}{int_part}");
    }
    let frac = format!("{frac_part:03}");
    format!("{sign}{int_part}.{}", frac.trim_end_matches('0'))
}
