/// Computes the NDC half-extents of the quad that fits a `target_w x target_h`
/// virtual framebuffer into a `window_w x window_h` window while preserving
/// aspect ratio.
///
/// The constrained axis stays at 1.0: a window wider than the target aspect
/// gets pillarbox bars (`quad_w < 1`), a taller one gets letterbox bars
/// (`quad_h < 1`), and a matching aspect fills `[-1, 1] x [-1, 1]`.
/// Degenerate sizes yield the full quad.
pub fn fit_virtual_to_window(
    target_w: u32,
    target_h: u32,
    window_w: u32,
    window_h: u32,
) -> (f32, f32) {
    if target_w == 0 || target_h == 0 || window_w == 0 || window_h == 0 {
        return (1.0, 1.0);
    }

    let target_aspect = target_w as f32 / target_h as f32;
    let window_aspect = window_w as f32 / window_h as f32;

    if window_aspect > target_aspect {
        (target_aspect / window_aspect, 1.0)
    } else {
        (1.0, window_aspect / target_aspect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    #[test]
    fn wide_window_pillarboxes() {
        let (w, h) = fit_virtual_to_window(320, 180, 1920, 900);
        assert_eq!(h, 1.0);
        // (16/9) / (1920/900) = 5/6.
        assert!((w - 5.0 / 6.0).abs() < EPS);
        assert!(w < 1.0);
    }

    #[test]
    fn tall_window_letterboxes() {
        let (w, h) = fit_virtual_to_window(320, 180, 800, 900);
        assert_eq!(w, 1.0);
        // (800/900) / (16/9) = 1/2.
        assert!((h - 0.5).abs() < EPS);
        assert!(h < 1.0);
    }

    #[test]
    fn matching_aspect_fills_the_window() {
        assert_eq!(fit_virtual_to_window(320, 180, 1920, 1080), (1.0, 1.0));
        assert_eq!(fit_virtual_to_window(320, 180, 320, 180), (1.0, 1.0));
    }

    #[test]
    fn degenerate_sizes_fall_back_to_full_quad() {
        assert_eq!(fit_virtual_to_window(320, 180, 0, 900), (1.0, 1.0));
        assert_eq!(fit_virtual_to_window(320, 180, 800, 0), (1.0, 1.0));
        assert_eq!(fit_virtual_to_window(0, 180, 800, 600), (1.0, 1.0));
    }
}
