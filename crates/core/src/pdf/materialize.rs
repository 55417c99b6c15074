use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::entities::{ImageDescriptor, ImageStatus, SYNTHETIC_XREF_BASE};
use crate::error::{CoreError, CoreResult};

use super::cluster::{detect_clusters, Cluster};
use super::reader::{render_page_clip, PageRecord, PdfReader};

/// Minimum pixel dimension a raster image must have to be kept.
const MIN_RASTER_DIM: u32 = 20;
/// Render scale (pixels per point) used when rasterizing an accepted
/// vector cluster.
const CLUSTER_RENDER_SCALE: f64 = 2.0;
/// Upper bound on a materialized cluster image's longest edge in pixels.
const MAX_IMAGE_DIM: f64 = 1024.0;

/// Counter allocating synthetic xrefs for vector-cluster images, starting
/// at [`SYNTHETIC_XREF_BASE`]. One instance is scoped to a single
/// extraction run.
pub struct SyntheticXrefAllocator {
    next: AtomicU32,
}

impl Default for SyntheticXrefAllocator {
    fn default() -> Self {
        Self {
            next: AtomicU32::new(SYNTHETIC_XREF_BASE),
        }
    }
}

impl SyntheticXrefAllocator {
    pub fn allocate(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Writes discovered images to disk and produces [`ImageDescriptor`]s for a
/// whole document. `output_dir` is the project's materialized-image
/// directory.
pub fn materialize_document(
    reader: &PdfReader,
    source_path: &Path,
    output_dir: &Path,
    project_id: &str,
    pages: &[PageRecord],
) -> CoreResult<Vec<ImageDescriptor>> {
    std::fs::create_dir_all(output_dir)
        .map_err(|e| CoreError::StorageFull(format!("{}: {e}", output_dir.display())))?;

    let xrefs = SyntheticXrefAllocator::default();
    let mut descriptors = Vec::new();

    for page in pages {
        let context_text: String = page.text.chars().take(500).collect();
        let mut image_index: u32 = 0;

        for raster in &page.raster_images {
            if raster.width < MIN_RASTER_DIM || raster.height < MIN_RASTER_DIM {
                continue;
            }
            image_index += 1;
            let filename = format!("p{}_img{}.{}", page.page_number, image_index, raster.ext);
            let path = output_dir.join(&filename);
            std::fs::write(&path, &raster.bytes)
                .map_err(|e| CoreError::StorageFull(format!("{}: {e}", path.display())))?;

            descriptors.push(ImageDescriptor {
                id: uuid::Uuid::new_v4().to_string(),
                project_id: project_id.to_string(),
                page_number: page.page_number,
                image_index,
                image_path: path.display().to_string(),
                ext: raster.ext.clone(),
                width: raster.width,
                height: raster.height,
                xref: raster.xref,
                resource_name: raster.resource_name.clone(),
                context_text: context_text.clone(),
                image_type: None,
                alt_text: None,
                alt_text_edited: None,
                konfidenz: None,
                raw_response: None,
                status: ImageStatus::Pending,
            });
        }

        let raster_rects: Vec<_> = page.raster_images.iter().map(|r| r.rect).collect();
        let clusters = detect_clusters(&page.rect, &page.vector_items, &raster_rects);

        for cluster in &clusters {
            image_index += 1;
            let descriptor = materialize_cluster(
                reader,
                source_path,
                output_dir,
                project_id,
                page.page_number,
                image_index,
                cluster,
                &context_text,
                &xrefs,
            )?;
            descriptors.push(descriptor);
        }
    }

    Ok(descriptors)
}

fn materialize_cluster(
    reader: &PdfReader,
    source_path: &Path,
    output_dir: &Path,
    project_id: &str,
    page_number: u32,
    image_index: u32,
    cluster: &Cluster,
    context_text: &str,
    xrefs: &SyntheticXrefAllocator,
) -> CoreResult<ImageDescriptor> {
    let w = cluster.rect.width();
    let h = cluster.rect.height();

    let mut scale = CLUSTER_RENDER_SCALE;
    if scale * w > MAX_IMAGE_DIM || scale * h > MAX_IMAGE_DIM {
        scale = (MAX_IMAGE_DIM / w).min(MAX_IMAGE_DIM / h).max(1.0);
    }

    let png_bytes = render_page_clip(reader, source_path, page_number, &cluster.rect, scale)?;

    let filename = format!("p{page_number}_vec{image_index}.png");
    let path = output_dir.join(&filename);
    std::fs::write(&path, &png_bytes)
        .map_err(|e| CoreError::StorageFull(format!("{}: {e}", path.display())))?;

    // width/height record the cluster's bounding box in page points, per the
    // data model — not the rendered PNG's pixel size, which scales with
    // `scale` and is a rendering artifact.
    let width = w.round().max(1.0) as u32;
    let height = h.round().max(1.0) as u32;

    Ok(ImageDescriptor {
        id: uuid::Uuid::new_v4().to_string(),
        project_id: project_id.to_string(),
        page_number,
        image_index,
        image_path: path.display().to_string(),
        ext: "png".to_string(),
        width,
        height,
        xref: xrefs.allocate(),
        resource_name: String::new(),
        context_text: context_text.to_string(),
        image_type: None,
        alt_text: None,
        alt_text_edited: None,
        konfidenz: None,
        raw_response: None,
        status: ImageStatus::Pending,
    })
}
