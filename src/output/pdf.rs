//! Paged PDF output: one full-width image per page.

use log::debug;
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::paginate::{Page, PagedDocument};

/// How page slices are embedded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageImageEncoding {
    /// Baseline JPEG (`DCTDecode`)
    Jpeg { quality: u8 },
    /// Lossless zlib-compressed RGB (`FlateDecode`)
    Flate,
}

impl Default for PageImageEncoding {
    fn default() -> Self {
        PageImageEncoding::Jpeg { quality: 100 }
    }
}

const IMAGE_NAME: &[u8] = b"Im1";

/// Write every page of `doc` into a PDF.
///
/// Each slice is drawn at full page width from the top edge of its page;
/// a short final slice leaves the rest of the page blank.
pub fn write_pdf(doc: &PagedDocument, encoding: PageImageEncoding) -> Result<Vec<u8>> {
    if doc.is_empty() {
        return Err(Error::Encode("document has no pages".into()));
    }
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let page_ids: Vec<Ref> = doc.pages.iter().map(|_| alloc()).collect();

    for (page, page_id) in doc.pages.iter().zip(&page_ids) {
        let image_id = alloc();
        let content_id = alloc();
        embed_page_image(&mut pdf, image_id, page, encoding)?;

        let page_w = doc.unit.to_points(page.width_units) as f32;
        let page_h = doc.unit.to_points(page.height_units) as f32;
        let slice_h = doc.unit.to_points(page.content_height_units) as f32;

        let mut content = Content::new();
        content.save_state();
        content.transform([page_w, 0.0, 0.0, slice_h, 0.0, page_h - slice_h]);
        content.x_object(Name(IMAGE_NAME));
        content.restore_state();
        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&raw, 6);
        pdf.stream(content_id, &compressed).filter(Filter::FlateDecode);

        let mut pdf_page = pdf.page(*page_id);
        pdf_page
            .media_box(Rect::new(0.0, 0.0, page_w, page_h))
            .parent(pages_id)
            .contents(content_id);
        pdf_page
            .resources()
            .x_objects()
            .pair(Name(IMAGE_NAME), image_id);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    let bytes = pdf.finish();
    debug!("Wrote {} page PDF ({} bytes)", doc.len(), bytes.len());
    Ok(bytes)
}

fn embed_page_image(
    pdf: &mut Pdf,
    id: Ref,
    page: &Page,
    encoding: PageImageEncoding,
) -> Result<()> {
    let width = page.image.width() as i32;
    let height = page.image.height() as i32;
    let (data, filter) = match encoding {
        PageImageEncoding::Jpeg { quality } => (page.image.to_jpeg(quality)?, Filter::DctDecode),
        PageImageEncoding::Flate => (
            miniz_oxide::deflate::compress_to_vec_zlib(&page.image.to_rgb(), 6),
            Filter::FlateDecode,
        ),
    };
    let mut xobj = pdf.image_xobject(id, &data);
    xobj.filter(filter);
    xobj.width(width);
    xobj.height(height);
    xobj.color_space().device_rgb();
    xobj.bits_per_component(8);
    Ok(())
}
