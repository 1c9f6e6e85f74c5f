//! Invoice PDF rendering.
//!
//! Layout is a pure function from [`InvoiceDocument`] to positioned text
//! lines; rendering writes those lines into a PDF with `lopdf`. The built-in
//! Courier font keeps columns aligned without font metrics.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{InvoiceDocument, InvoiceLine, InvoiceParty};

/// A4 in points.
pub const PAGE_WIDTH: i64 = 595;
pub const PAGE_HEIGHT: i64 = 842;
pub const MARGIN: i64 = 50;
pub const LINE_HEIGHT: i64 = 14;
/// Lowest baseline used by body text; the footer sits below it.
pub const BODY_BOTTOM: i64 = 70;
pub const FOOTER_Y: i64 = 36;

const TITLE_SIZE: i64 = 18;
const HEADING_SIZE: i64 = 12;
const BODY_SIZE: i64 = 10;
const FOOTER_SIZE: i64 = 8;
const RIGHT_COLUMN_X: i64 = 330;
const DESCRIPTION_WIDTH: usize = 30;
const SKU_WIDTH: usize = 18;

/// Errors that can occur while producing the PDF bytes.
#[derive(Debug, Error)]
pub enum InvoiceRenderError {
    #[error("PDF encoding failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("PDF write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One line of text at a fixed position (PDF coordinates, origin bottom-left).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub x: i64,
    pub y: i64,
    pub size: i64,
    pub text: String,
}

/// The text of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub lines: Vec<TextLine>,
}

struct Cursor {
    pages: Vec<Page>,
    y: i64,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn put(&mut self, x: i64, size: i64, text: impl Into<String>) {
        let line = TextLine {
            x,
            y: self.y,
            size,
            text: pdf_safe(&text.into()),
        };
        if let Some(page) = self.pages.last_mut() {
            page.lines.push(line);
        }
    }

    fn line(&mut self, x: i64, size: i64, text: impl Into<String>) {
        self.put(x, size, text);
        self.skip(1);
    }

    fn skip(&mut self, lines: i64) {
        self.y -= lines * LINE_HEIGHT;
    }

    fn has_room(&self, lines: i64) -> bool {
        self.y - (lines - 1) * LINE_HEIGHT >= BODY_BOTTOM
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Print two blocks side by side, advancing past the longer one.
    fn columns(&mut self, left: &[String], right: &[String]) {
        let rows = left.len().max(right.len());
        for i in 0..rows {
            if let Some(text) = left.get(i) {
                self.put(MARGIN, BODY_SIZE, text.clone());
            }
            if let Some(text) = right.get(i) {
                self.put(RIGHT_COLUMN_X, BODY_SIZE, text.clone());
            }
            self.skip(1);
        }
    }
}

/// Courier in the standard encoding only covers ASCII.
fn pdf_safe(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn party_block(label: &str, party: &InvoiceParty) -> Vec<String> {
    let mut block = vec![label.to_string(), party.name.clone()];
    block.extend(party.lines.iter().cloned());
    if let Some(email) = &party.email {
        block.push(email.clone());
    }
    if let Some(phone) = &party.phone {
        block.push(format!("Tel: {phone}"));
    }
    block
}

fn describe(line: &InvoiceLine) -> String {
    let mut variant = format!("{}/{}", line.color, line.size);
    if let Some(fit) = &line.fit {
        variant.push('/');
        variant.push_str(fit);
    }
    format!("{} {}", line.style_name, variant)
}

fn table_header() -> String {
    format!(
        "{:<sku$} {:<desc$} {:>5} {:>10} {:>11}",
        "SKU",
        "Description",
        "Qty",
        "Unit",
        "Amount",
        sku = SKU_WIDTH,
        desc = DESCRIPTION_WIDTH
    )
}

fn table_row(line: &InvoiceLine) -> String {
    format!(
        "{:<sku$} {:<desc$} {:>5} {:>10} {:>11}",
        truncate(&line.sku, SKU_WIDTH),
        truncate(&describe(line), DESCRIPTION_WIDTH),
        line.quantity,
        money(line.unit_price),
        money(line.total_price),
        sku = SKU_WIDTH,
        desc = DESCRIPTION_WIDTH
    )
}

fn total_row(label: &str, value: Decimal) -> String {
    let width = SKU_WIDTH + DESCRIPTION_WIDTH + 5 + 10 + 3;
    format!("{label:>width$} {:>11}", money(value))
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&truncate(word, width));
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Lay the invoice out into pages.
///
/// Page 1 carries the title, the company, invoice and order references and
/// the bill-to/ship-to blocks. Item rows follow and continue onto further
/// pages under a repeated table header. The totals block comes after the
/// last row and every page gets a "Page i of n" footer.
#[must_use]
pub fn layout_pages(doc: &InvoiceDocument) -> Vec<Page> {
    let mut cursor = Cursor::new();

    cursor.line(MARGIN, TITLE_SIZE, "INVOICE");
    cursor.skip(1);

    let mut company = vec![doc.company.name.clone()];
    company.extend(doc.company.lines.iter().cloned());
    if let Some(email) = &doc.company.email {
        company.push(email.clone());
    }
    if let Some(phone) = &doc.company.phone {
        company.push(format!("Tel: {phone}"));
    }
    let references = vec![
        format!("Invoice No: {}", doc.invoice_number),
        format!("Invoice Date: {}", doc.invoice_date.format("%Y-%m-%d")),
        format!("Order No: {}", doc.order_number),
        format!("Order Date: {}", doc.order_date.format("%Y-%m-%d")),
        format!("Payment: {}", doc.payment_method),
    ];
    cursor.columns(&company, &references);
    cursor.skip(1);

    cursor.columns(
        &party_block("Bill To:", &doc.bill_to),
        &party_block("Ship To:", &doc.ship_to),
    );
    cursor.skip(1);

    cursor.line(MARGIN, BODY_SIZE, table_header());
    cursor.line(MARGIN, BODY_SIZE, "-".repeat(table_header().len()));

    for item in &doc.items {
        if !cursor.has_room(1) {
            cursor.new_page();
            cursor.line(
                MARGIN,
                HEADING_SIZE,
                format!("Invoice {} (continued)", doc.invoice_number),
            );
            cursor.skip(1);
            cursor.line(MARGIN, BODY_SIZE, table_header());
            cursor.line(MARGIN, BODY_SIZE, "-".repeat(table_header().len()));
        }
        cursor.line(MARGIN, BODY_SIZE, table_row(item));
    }

    let notes = doc
        .order_notes
        .as_deref()
        .map(|n| wrap(n, 80))
        .unwrap_or_default();
    let totals_lines = 6;
    if !cursor.has_room(totals_lines) {
        cursor.new_page();
        cursor.line(
            MARGIN,
            HEADING_SIZE,
            format!("Invoice {} (continued)", doc.invoice_number),
        );
        cursor.skip(1);
    }
    cursor.skip(1);
    cursor.line(MARGIN, BODY_SIZE, total_row("Subtotal", doc.amounts.subtotal));
    cursor.line(MARGIN, BODY_SIZE, total_row("Shipping", doc.amounts.shipping_fee));
    cursor.line(MARGIN, BODY_SIZE, total_row("Tax", doc.amounts.tax_amount));
    cursor.line(MARGIN, BODY_SIZE, total_row("Total", doc.amounts.total_amount));

    if !notes.is_empty() {
        cursor.skip(1);
        if !cursor.has_room(2) {
            cursor.new_page();
        }
        cursor.line(MARGIN, BODY_SIZE, "Notes:");
        for note in notes {
            if !cursor.has_room(1) {
                cursor.new_page();
            }
            cursor.line(MARGIN, BODY_SIZE, note);
        }
    }

    let mut pages = cursor.pages;
    let count = pages.len();
    for (index, page) in pages.iter_mut().enumerate() {
        page.lines.push(TextLine {
            x: MARGIN,
            y: FOOTER_Y,
            size: FOOTER_SIZE,
            text: pdf_safe(&doc.invoice_number),
        });
        page.lines.push(TextLine {
            x: PAGE_WIDTH - MARGIN - 70,
            y: FOOTER_Y,
            size: FOOTER_SIZE,
            text: format!("Page {} of {count}", index + 1),
        });
    }
    pages
}

fn page_content(page: &Page) -> Content {
    let mut operations = Vec::with_capacity(page.lines.len() * 5);
    for line in &page.lines {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![Object::Name(b"F1".to_vec()), Object::Integer(line.size)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Integer(line.x), Object::Integer(line.y)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(line.text.as_bytes().to_vec())],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
}

/// Render the invoice to PDF bytes.
///
/// # Errors
///
/// Returns `InvoiceRenderError` if a content stream cannot be encoded or the
/// document cannot be written.
pub fn render_pdf(doc: &InvoiceDocument) -> Result<Vec<u8>, InvoiceRenderError> {
    let pages = layout_pages(doc);

    let mut pdf = Document::with_version("1.5");
    let pages_id = pdf.new_object_id();
    let font_id = pdf.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = pdf.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for page in &pages {
        let content_id = pdf.add_object(Stream::new(Dictionary::new(), page_content(page).encode()?));
        let page_id = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    pdf.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    pdf.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    pdf.save_to(&mut bytes)?;
    Ok(bytes)
}
