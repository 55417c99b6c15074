use std::collections::HashMap;
use std::path::Path;

use pdfium_render::prelude::*;

use crate::error::{CoreError, CoreResult};

/// Rectangle in PDF page-space (points, origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PageRect {
    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).abs()
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        !self.width().is_finite() || !self.height().is_finite() || self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Expand this rectangle by `by` on every side.
    pub fn expanded(&self, by: f64) -> PageRect {
        PageRect {
            x0: self.x0 - by,
            y0: self.y0 - by,
            x1: self.x1 + by,
            y1: self.y1 + by,
        }
    }

    pub fn intersects(&self, other: &PageRect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    pub fn union(&self, other: &PageRect) -> PageRect {
        PageRect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn intersection_area(&self, other: &PageRect) -> f64 {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);
        if x1 <= x0 || y1 <= y0 {
            0.0
        } else {
            (x1 - x0) * (y1 - y0)
        }
    }

    pub fn clip_to(&self, bounds: &PageRect) -> PageRect {
        PageRect {
            x0: self.x0.max(bounds.x0),
            y0: self.y0.max(bounds.y0),
            x1: self.x1.min(bounds.x1),
            y1: self.y1.min(bounds.y1),
        }
    }
}

/// A raster image object found on a page.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub xref: u32,
    pub resource_name: String,
    pub bytes: Vec<u8>,
    pub ext: String,
    pub width: u32,
    pub height: u32,
    pub rect: PageRect,
}

/// A vector path draw item found on a page (one `re`/`m`/`l`/`c` run).
#[derive(Debug, Clone)]
pub struct VectorDrawItem {
    pub rect: PageRect,
    pub segment_count: u32,
}

/// Everything [`PdfReader`] extracts from one page.
pub struct PageRecord {
    pub page_number: u32,
    pub rect: PageRect,
    pub text: String,
    pub raster_images: Vec<RasterImage>,
    pub vector_items: Vec<VectorDrawItem>,
}

/// Wraps pdfium for page enumeration, text, and vector/raster discovery.
///
/// Raster image bytes/xref/resource-name are read via `lopdf` against the
/// same file (`read_raster_via_lopdf`) because pdfium's object model does
/// not expose the underlying PDF cross-reference number, which the tagged
/// writer needs to re-locate the image later.
pub struct PdfReader {
    pdfium: Pdfium,
}

impl PdfReader {
    pub fn new() -> CoreResult<Self> {
        let bindings = Pdfium::bind_to_system_library().or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("."))
        });
        let bindings = bindings.map_err(|e| {
            CoreError::Pdfium(format!(
                "failed to load pdfium library: {e}. Install pdfium and place libpdfium.{{so,dylib}} \
                 next to the binary or on the system library path."
            ))
        })?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Read every page of `path` into [`PageRecord`]s.
    pub fn read(&self, path: &Path) -> CoreResult<Vec<PageRecord>> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| CoreError::SourceCorrupt(format!("{}: {e}", path.display())))?;

        let raster_by_page = read_raster_via_lopdf(path)?;

        let mut pages = Vec::new();
        for (idx, page) in document.pages().iter().enumerate() {
            let page_number = idx as u32 + 1;
            let rect = PageRect {
                x0: 0.0,
                y0: 0.0,
                x1: page.width().value as f64,
                y1: page.height().value as f64,
            };
            let text = page.text().map(|t| t.all()).unwrap_or_default();

            let mut vector_items = Vec::new();
            let mut image_bounds = Vec::new();
            for object in page.objects().iter() {
                let Ok(bounds) = object.bounds() else {
                    continue;
                };
                let rect = PageRect {
                    x0: bounds.left().value as f64,
                    y0: bounds.bottom().value as f64,
                    x1: bounds.right().value as f64,
                    y1: bounds.top().value as f64,
                };
                match object.object_type() {
                    PdfPageObjectType::Path => {
                        // pdfium-render does not expose a per-path segment
                        // count directly; each path object is counted as a
                        // minimal 1-segment item — the clusterer relies on
                        // how many *items* a cluster absorbs, not on any one
                        // object's internal complexity.
                        vector_items.push(VectorDrawItem {
                            rect,
                            segment_count: 1,
                        });
                    }
                    PdfPageObjectType::Image => image_bounds.push(rect),
                    _ => {}
                }
            }

            let mut raster_images = raster_by_page.get(&page_number).cloned().unwrap_or_default();
            // pdfium gives on-page placement rects in drawing order; lopdf
            // gives true xrefs/bytes from the resource dictionary. Merge the
            // two by position since both are walked in page order.
            for (img, rect) in raster_images.iter_mut().zip(image_bounds.iter()) {
                img.rect = *rect;
            }

            pages.push(PageRecord {
                page_number,
                rect,
                text,
                raster_images,
                vector_items,
            });
        }

        Ok(pages)
    }
}

/// Render a page, clipped to `clip` (in page-space), at scale `scale`
/// (pixels per point), returning PNG bytes.
pub fn render_page_clip(
    reader: &PdfReader,
    path: &Path,
    page_number: u32,
    clip: &PageRect,
    scale: f64,
) -> CoreResult<Vec<u8>> {
    let document = reader
        .pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| CoreError::Pdf(e.to_string()))?;
    let page = document
        .pages()
        .get((page_number - 1) as u16)
        .map_err(|e| CoreError::Pdf(e.to_string()))?;

    let target_w = (page.width().value as f64 * scale).round().max(1.0) as i32;
    let target_h = (page.height().value as f64 * scale).round().max(1.0) as i32;

    let config = PdfRenderConfig::new()
        .set_target_width(target_w)
        .set_target_height(target_h);

    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| CoreError::Image(e.to_string()))?;
    let full: image::DynamicImage = bitmap.as_image();

    let page_h = page.height().value as f64;
    let px0 = (clip.x0 * scale).max(0.0) as u32;
    let px1 = ((clip.x1 * scale).min(full.width() as f64)) as u32;
    // Flip Y: PDF origin is bottom-left, image origin is top-left.
    let py0 = (((page_h - clip.y1) * scale).max(0.0)) as u32;
    let py1 = (((page_h - clip.y0) * scale).min(full.height() as f64)) as u32;

    let (px0, px1) = (px0.min(px1), px0.max(px1));
    let (py0, py1) = (py0.min(py1), py0.max(py1));
    let w = (px1 - px0).max(1);
    let h = (py1 - py0).max(1);

    let cropped = full.crop_imm(px0, py0, w, h);

    let mut out = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut out);
    cropped
        .write_to(&mut cursor, image::ImageFormat::Png)
        .map_err(|e| CoreError::Image(e.to_string()))?;
    Ok(out)
}

/// Use `lopdf` to read every page's `/XObject` image resources, giving us
/// the true PDF xref and resource name pdfium's API does not expose.
fn read_raster_via_lopdf(path: &Path) -> CoreResult<HashMap<u32, Vec<RasterImage>>> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| CoreError::SourceCorrupt(format!("{}: {e}", path.display())))?;

    let mut out: HashMap<u32, Vec<RasterImage>> = HashMap::new();

    for (page_idx, (_page_num_token, page_id)) in doc.get_pages().into_iter().enumerate() {
        let page_number = page_idx as u32 + 1;
        let resources = match doc.get_page_resources(page_id) {
            Ok((Some(dict), _)) => dict,
            _ => continue,
        };
        let Ok(xobjects) = resources.get(b"XObject").and_then(|o| o.as_dict()) else {
            continue;
        };

        for (name, obj_ref) in xobjects.iter() {
            let Ok(obj_id) = obj_ref.as_reference() else {
                continue;
            };
            let Ok(obj) = doc.get_object(obj_id) else {
                continue;
            };
            let Ok(stream) = obj.as_stream() else {
                continue;
            };
            let is_image = stream
                .dict
                .get(b"Subtype")
                .and_then(|s| s.as_name())
                .map(|n| n == b"Image")
                .unwrap_or(false);
            if !is_image {
                continue;
            }

            let width = stream
                .dict
                .get(b"Width")
                .and_then(|v| v.as_i64())
                .unwrap_or(0) as u32;
            let height = stream
                .dict
                .get(b"Height")
                .and_then(|v| v.as_i64())
                .unwrap_or(0) as u32;

            let Ok(bytes) = stream.decompressed_content() else {
                continue;
            };

            out.entry(page_number).or_default().push(RasterImage {
                xref: obj_id.0,
                resource_name: String::from_utf8_lossy(name).to_string(),
                bytes,
                ext: "png".to_string(),
                width,
                height,
                rect: PageRect {
                    x0: 0.0,
                    y0: 0.0,
                    x1: width as f64,
                    y1: height as f64,
                },
            });
        }
    }

    Ok(out)
}
