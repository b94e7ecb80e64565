//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Dimensions that fit `source` inside a `bound` box, preserving aspect ratio.
///
/// Never upscales: a source already inside the box is returned unchanged.
/// Both output edges are at least 1 pixel.
///
/// # Examples
/// ```
/// # use mets_packager::imaging::calculate_fit_dimensions;
/// // 4000x3000 scan into a 2000px box → 2000x1500
/// assert_eq!(calculate_fit_dimensions((4000, 3000), (2000, 2000)), (2000, 1500));
///
/// // Portrait page into a 250px thumbnail box → 188x250
/// assert_eq!(calculate_fit_dimensions((1500, 2000), (250, 250)), (188, 250));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), bound: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bound;

    if src_w <= max_w && src_h <= max_h {
        return source;
    }

    let ratio = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * ratio).round() as u32).clamp(1, max_w.max(1));
    let h = ((src_h as f64 * ratio).round() as u32).clamp(1, max_h.max(1));
    (w, h)
}

/// Whether an image needs shrinking to keep its longer edge within `max_edge`.
pub fn exceeds_max_edge(source: (u32, u32), max_edge: u32) -> bool {
    source.0.max(source.1) > max_edge
}
