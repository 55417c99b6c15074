use super::reader::{PageRect, VectorDrawItem};

/// Gap, in page points, used to expand a cluster's bounding box when
/// absorbing nearby items.
pub const GAP: f64 = 50.0;
/// Minimum width/height a cluster's bounding box must have (before padding)
/// to be accepted as a candidate graphic.
pub const MIN_SIZE: f64 = 50.0;
/// Padding applied to an accepted cluster to capture titles/legends.
pub const PAD: f64 = 60.0;
/// Minimum number of distinct draw items a cluster must absorb.
const MIN_ITEMS: usize = 2;
/// Minimum total segment count across a cluster's items.
const MIN_SEGMENTS: u32 = 5;
/// A cluster overlapping a raster rect by more than this fraction of its
/// own area is discarded as a decorative overlay on an existing image.
const MAX_RASTER_OVERLAP_FRACTION: f64 = 0.5;

/// A candidate graphic region synthesized from clustered vector draw items.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub rect: PageRect,
}

/// Discard draw items that are page-wide/tall rules rather than graphics.
fn is_noise(item: &VectorDrawItem, page: &PageRect) -> bool {
    if item.rect.is_empty() {
        return true;
    }
    let w = item.rect.width();
    let h = item.rect.height();
    let horizontal_sliver = h < 5.0 && w > 0.4 * page.width();
    let vertical_sliver = w < 5.0 && h > 0.4 * page.height();
    horizontal_sliver || vertical_sliver
}

/// Single-link agglomerative clustering of vector draw items on one page,
/// followed by acceptance filtering, padding, and raster-overlap discard.
pub fn detect_clusters(
    page: &PageRect,
    items: &[VectorDrawItem],
    raster_rects: &[PageRect],
) -> Vec<Cluster> {
    let candidates: Vec<&VectorDrawItem> = items.iter().filter(|i| !is_noise(i, page)).collect();

    let mut used = vec![false; candidates.len()];
    let mut clusters: Vec<(PageRect, usize, u32)> = Vec::new(); // (bbox, item_count, segment_sum)

    for seed in 0..candidates.len() {
        if used[seed] {
            continue;
        }
        let mut member_idx = vec![seed];
        used[seed] = true;
        let mut bbox = candidates[seed].rect;

        loop {
            let expanded = bbox.expanded(GAP);
            let mut absorbed_any = false;
            for (i, item) in candidates.iter().enumerate() {
                if used[i] {
                    continue;
                }
                if expanded.intersects(&item.rect) {
                    used[i] = true;
                    bbox = bbox.union(&item.rect);
                    member_idx.push(i);
                    absorbed_any = true;
                }
            }
            if !absorbed_any {
                break;
            }
        }

        let item_count = member_idx.len();
        let segment_sum: u32 = member_idx.iter().map(|&i| candidates[i].segment_count).sum();
        clusters.push((bbox, item_count, segment_sum));
    }

    clusters
        .into_iter()
        .filter(|(bbox, item_count, segment_sum)| {
            *item_count >= MIN_ITEMS
                && *segment_sum >= MIN_SEGMENTS
                && bbox.width() >= MIN_SIZE
                && bbox.height() >= MIN_SIZE
        })
        .map(|(bbox, _, _)| bbox.expanded(PAD).clip_to(page))
        .filter(|bbox| !overlaps_raster(bbox, raster_rects))
        .map(|rect| Cluster { rect })
        .collect()
}

fn overlaps_raster(cluster: &PageRect, raster_rects: &[PageRect]) -> bool {
    let area = cluster.area();
    if area <= 0.0 {
        return false;
    }
    raster_rects
        .iter()
        .any(|r| cluster.intersection_area(r) / area > MAX_RASTER_OVERLAP_FRACTION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PageRect {
        PageRect { x0: 0.0, y0: 0.0, x1: 612.0, y1: 792.0 }
    }

    fn item(x0: f64, y0: f64, x1: f64, y1: f64, segs: u32) -> VectorDrawItem {
        VectorDrawItem {
            rect: PageRect { x0, y0, x1, y1 },
            segment_count: segs,
        }
    }

    #[test]
    fn rejects_lone_rule_line() {
        let page = page();
        let items = vec![item(50.0, 100.0, 550.0, 101.0, 1)]; // thin, page-wide: noise-filtered
        let clusters = detect_clusters(&page, &items, &[]);
        assert!(clusters.is_empty());
    }

    #[test]
    fn accepts_dense_nearby_cluster() {
        let page = page();
        let items = vec![
            item(100.0, 100.0, 200.0, 250.0, 3),
            item(210.0, 100.0, 300.0, 260.0, 3),
            item(120.0, 260.0, 280.0, 280.0, 2),
        ];
        let clusters = detect_clusters(&page, &items, &[]);
        assert_eq!(clusters.len(), 1);
        let c = &clusters[0];
        assert!(c.rect.width() >= MIN_SIZE);
        assert!(c.rect.x0 >= page.x0 && c.rect.x1 <= page.x1);
    }

    #[test]
    fn rejects_sparse_cluster_below_segment_threshold() {
        let page = page();
        let items = vec![
            item(100.0, 100.0, 160.0, 160.0, 1),
            item(165.0, 100.0, 220.0, 160.0, 1),
        ];
        let clusters = detect_clusters(&page, &items, &[]);
        assert!(clusters.is_empty());
    }

    #[test]
    fn drops_cluster_overlapping_raster_image() {
        let page = page();
        let items = vec![
            item(100.0, 100.0, 200.0, 250.0, 3),
            item(210.0, 100.0, 300.0, 260.0, 3),
            item(120.0, 260.0, 280.0, 280.0, 2),
        ];
        let raster = PageRect { x0: 80.0, y0: 80.0, x1: 320.0, y1: 340.0 };
        let clusters = detect_clusters(&page, &items, &[raster]);
        assert!(clusters.is_empty());
    }

    #[test]
    fn gap_bridges_nearby_but_disjoint_shapes() {
        let page = page();
        let items = vec![
            item(100.0, 100.0, 150.0, 150.0, 3),
            item(180.0, 100.0, 230.0, 150.0, 3), // 30pt gap < GAP, should merge
        ];
        let clusters = detect_clusters(&page, &items, &[]);
        assert_eq!(clusters.len(), 1);
    }
}
