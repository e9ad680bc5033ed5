//! Minimal PDF 1.4 writer: Helvetica text, word-wrapped and paginated.
//!
//! Text is written with the standard Type1 fonts in WinAnsi encoding, so
//! characters outside Latin-1 are replaced with `?`.

use gptexport_protocol::ExportFormat;

use crate::conversation::Conversation;
use crate::encoder::{EncodeError, Encoder};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 56.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

struct Line {
    font: Font,
    size: f32,
    text: String,
    /// Extra space before the line.
    gap: f32,
}

pub struct PdfEncoder {
    body_size: f32,
    /// Wrap column for body text.
    columns: usize,
}

impl Default for PdfEncoder {
    fn default() -> Self {
        // Helvetica averages roughly half an em per glyph.
        let body_size = 11.0;
        let columns = ((PAGE_WIDTH - 2.0 * MARGIN) / (body_size * 0.5)) as usize;
        Self { body_size, columns }
    }
}

impl Encoder for PdfEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn encode(&self, conversation: &Conversation) -> Result<Vec<u8>, EncodeError> {
        let lines = self.layout(conversation);
        let pages = paginate(&lines);
        Ok(write_document(&conversation.title, &pages))
    }
}

impl PdfEncoder {
    fn layout(&self, conversation: &Conversation) -> Vec<Line> {
        let mut lines = Vec::new();
        let title_columns = self.columns * 11 / 16;
        for (i, chunk) in wrap(&conversation.title, title_columns).into_iter().enumerate() {
            lines.push(Line {
                font: Font::Bold,
                size: 16.0,
                text: chunk,
                gap: if i == 0 { 0.0 } else { 2.0 },
            });
        }

        for message in &conversation.messages {
            lines.push(Line {
                font: Font::Bold,
                size: 12.0,
                text: message.role.label().to_string(),
                gap: 14.0,
            });
            for paragraph in message.content.lines() {
                let wrapped = wrap(paragraph, self.columns);
                if wrapped.is_empty() {
                    lines.push(Line {
                        font: Font::Regular,
                        size: self.body_size,
                        text: String::new(),
                        gap: 0.0,
                    });
                }
                for chunk in wrapped {
                    lines.push(Line {
                        font: Font::Regular,
                        size: self.body_size,
                        text: chunk,
                        gap: 0.0,
                    });
                }
            }
        }
        lines
    }
}

/// Greedy word wrap by character count; overlong words are hard-split.
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > columns {
            if current_len > 0 {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            out.push(word.drain(..columns).collect());
        }
        let word_len = word.len();
        if word_len == 0 {
            continue;
        }
        if current_len > 0 && current_len + 1 + word_len > columns {
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word);
        current_len += word_len;
    }
    if current_len > 0 {
        out.push(current);
    }
    out
}

/// Positioned text: (font, size, x, y, text).
type Placed<'a> = (Font, f32, f32, f32, &'a str);

fn paginate(lines: &[Line]) -> Vec<Vec<Placed<'_>>> {
    let mut pages = vec![Vec::new()];
    let mut y = PAGE_HEIGHT - MARGIN;

    for line in lines {
        let advance = line.gap + line.size * 1.3;
        if y - advance < MARGIN && pages.last().map_or(false, |p| !p.is_empty()) {
            pages.push(Vec::new());
            y = PAGE_HEIGHT - MARGIN;
        } else {
            y -= line.gap;
        }
        y -= line.size * 1.3;
        if let Some(page) = pages.last_mut() {
            page.push((line.font, line.size, MARGIN, y, line.text.as_str()));
        }
    }
    pages
}

/// Encode as a WinAnsi literal string body, escaping delimiters.
fn pdf_string(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            '\t' => out.push(b' '),
            c if (' '..='~').contains(&c) => out.push(c as u8),
            c if ('\u{a0}'..='\u{ff}').contains(&c) => out.push(c as u32 as u8),
            '\u{2018}' | '\u{2019}' => out.push(b'\''),
            '\u{201c}' | '\u{201d}' => out.push(b'"'),
            '\u{2013}' | '\u{2014}' => out.push(b'-'),
            _ => out.push(b'?'),
        }
    }
    out
}

fn page_content(placed: &[Placed<'_>]) -> Vec<u8> {
    let mut content = Vec::new();
    for (font, size, x, y, text) in placed {
        if text.is_empty() {
            continue;
        }
        content.extend_from_slice(
            format!("BT /{} {} Tf {:.2} {:.2} Td (", font.resource(), size, x, y).as_bytes(),
        );
        content.extend_from_slice(&pdf_string(text));
        content.extend_from_slice(b") Tj ET\n");
    }
    content
}

/// Object layout: 1 catalog, 2 page tree, 3/4 fonts, 5 info, then a
/// (page, content) pair per page.
fn write_document(title: &str, pages: &[Vec<Placed<'_>>]) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");

    let page_ids: Vec<usize> = (0..pages.len()).map(|i| 6 + i * 2).collect();

    let mut objects: Vec<Vec<u8>> = Vec::new();
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    let kids: Vec<String> = page_ids.iter().map(|id| format!("{} 0 R", id)).collect();
    objects.push(
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        )
        .into_bytes(),
    );
    objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec(),
    );
    objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    );
    let mut info = b"<< /Title (".to_vec();
    info.extend_from_slice(&pdf_string(title));
    info.extend_from_slice(b") /Producer (ChatGPT Exporter) >>");
    objects.push(info);

    for (page, page_id) in pages.iter().zip(&page_ids) {
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                PAGE_WIDTH,
                PAGE_HEIGHT,
                page_id + 1
            )
            .into_bytes(),
        );
        let content = page_content(page);
        let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        stream.extend_from_slice(&content);
        stream.extend_from_slice(b"\nendstream");
        objects.push(stream);
    }

    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R /Info 5 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}
