//! Pure calculation functions for the derivative pipeline.
//!
//! All functions here are pure and testable without any I/O or images.
//! Arithmetic is integer floor throughout, so results are deterministic
//! and never exceed the source dimensions.

/// Image orientation, decided by comparing width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
    Square,
}

/// Classify an image by its natural dimensions.
pub fn orientation(width: u32, height: u32) -> Orientation {
    if width > height {
        Orientation::Horizontal
    } else if width < height {
        Orientation::Vertical
    } else {
        Orientation::Square
    }
}

/// `floor(value * num / den)` without intermediate overflow.
fn scale(value: u32, num: u32, den: u32) -> u32 {
    (value as u64 * num as u64 / den as u64) as u32
}

/// Compute the aspect-corrected crop box for a source image.
///
/// Horizontal images are cropped toward `horizontal` (`n:d`), vertical
/// images toward `vertical`. The box is clamped so it never exceeds the
/// original dimensions: if the ideal height (or width) overshoots, the
/// overshooting edge is pinned to the original and the other edge is
/// recomputed from the same ratio. Square images are left untouched.
///
/// # Examples
/// ```
/// # use media_forge::geometry::crop_box;
/// // 2440x1525 at 8:5 already matches the ratio
/// assert_eq!(crop_box(2440, 1525, (8, 5), (320, 414)), (2440, 1525));
/// // 2000x1000 at 8:5 crops the width
/// assert_eq!(crop_box(2000, 1000, (8, 5), (320, 414)), (1600, 1000));
/// ```
pub fn crop_box(
    width: u32,
    height: u32,
    horizontal: (u32, u32),
    vertical: (u32, u32),
) -> (u32, u32) {
    match orientation(width, height) {
        Orientation::Horizontal => {
            let (n, d) = horizontal;
            let mut crop_w = width;
            let mut crop_h = scale(width, d, n);
            if crop_h > height {
                crop_h = height;
                crop_w = scale(height, n, d);
            }
            (crop_w, crop_h)
        }
        Orientation::Vertical => {
            let (n, d) = vertical;
            let mut crop_h = height;
            let mut crop_w = scale(height, n, d);
            if crop_w > width {
                crop_w = width;
                crop_h = scale(width, d, n);
            }
            (crop_w, crop_h)
        }
        Orientation::Square => (width, height),
    }
}

/// Height of a cropped derivative: `floor(width * d / n)`.
pub fn derivative_height(width: u32, ratio: (u32, u32)) -> u32 {
    let (n, d) = ratio;
    scale(width, d, n)
}

/// Height of a non-cropped derivative, preserving the original aspect.
pub fn scaled_height(original: (u32, u32), target_width: u32) -> u32 {
    let (w, h) = original;
    scale(target_width, h, w)
}

/// Which image a target is rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderSource {
    /// The aspect-corrected `orig_c` image.
    Cropped,
    /// The original, uncropped image.
    Original,
}

/// One derivative the generator should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    /// Size label, e.g. `1220x762`, `610x381@2x`, `160nc`, `200x125.thumbnail`.
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub source: RenderSource,
}

/// Width lists driving the plan. Mirrors the configuration surface.
#[derive(Debug, Clone)]
pub struct PlanWidths<'a> {
    pub horizontal: &'a [u32],
    pub vertical: &'a [u32],
    pub non_cropped: &'a [u32],
    pub retina_2x: &'a [u32],
    pub thumbnail: u32,
}

/// The full derivative family for one source image.
#[derive(Debug, Clone)]
pub struct DerivativePlan {
    pub crop_width: u32,
    pub crop_height: u32,
    /// Width-list targets in configured order, retina sibling directly
    /// after its base size.
    pub targets: Vec<RenderTarget>,
    /// The single thumbnail target. Rendered unconditionally.
    pub thumbnail: RenderTarget,
}

/// Plan the derivative family for a source image.
///
/// Targets are gated by size sufficiency: a width is realized only when
/// both computed dimensions fit within the crop box (cropped targets) or
/// the original image (non-cropped targets). Nothing is ever upscaled.
/// Retina siblings double the width, reapply the height formula, and are
/// gated independently by the same rule.
pub fn plan_derivatives(
    width: u32,
    height: u32,
    horizontal: (u32, u32),
    vertical: (u32, u32),
    widths: &PlanWidths,
) -> DerivativePlan {
    let (crop_w, crop_h) = crop_box(width, height, horizontal, vertical);

    let mut targets = Vec::new();

    // Orientation of the crop box decides which width list applies;
    // square crops get no cropped sizes at all.
    let cropped = match orientation(crop_w, crop_h) {
        Orientation::Horizontal => Some((widths.horizontal, horizontal)),
        Orientation::Vertical => Some((widths.vertical, vertical)),
        Orientation::Square => None,
    };

    if let Some((list, ratio)) = cropped {
        for &w in list {
            let h = derivative_height(w, ratio);
            if crop_w >= w && crop_h >= h {
                targets.push(RenderTarget {
                    label: format!("{w}x{h}"),
                    width: w,
                    height: h,
                    source: RenderSource::Cropped,
                });
            }
            if widths.retina_2x.contains(&w) {
                let rw = 2 * w;
                let rh = derivative_height(rw, ratio);
                if crop_w >= rw && crop_h >= rh {
                    targets.push(RenderTarget {
                        label: format!("{w}x{h}@2x"),
                        width: rw,
                        height: rh,
                        source: RenderSource::Cropped,
                    });
                }
            }
        }
    }

    // Non-cropped sizes keep the original aspect and always get a retina
    // candidate, each gated independently against the original image.
    for &w in widths.non_cropped {
        let h = scaled_height((width, height), w);
        if width >= w && height >= h {
            targets.push(RenderTarget {
                label: format!("{w}nc"),
                width: w,
                height: h,
                source: RenderSource::Original,
            });
        }
        let rw = 2 * w;
        let rh = scaled_height((width, height), rw);
        if width >= rw && height >= rh {
            targets.push(RenderTarget {
                label: format!("{w}nc@2x"),
                width: rw,
                height: rh,
                source: RenderSource::Original,
            });
        }
    }

    let tw = widths.thumbnail;
    let th = scaled_height((width, height), tw);
    let thumbnail = RenderTarget {
        label: format!("{tw}x{th}.thumbnail"),
        width: tw,
        height: th,
        source: RenderSource::Original,
    };

    DerivativePlan {
        crop_width: crop_w,
        crop_height: crop_h,
        targets,
        thumbnail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOCK: PlanWidths = PlanWidths {
        horizontal: &[2440, 1220, 840, 800, 610, 420, 160],
        vertical: &[556, 320, 278, 160],
        non_cropped: &[2440, 1220, 610, 160],
        retina_2x: &[1220, 610, 420, 278, 160],
        thumbnail: 200,
    };

    // =========================================================================
    // orientation tests
    // =========================================================================

    #[test]
    fn orientation_classification() {
        assert_eq!(orientation(200, 100), Orientation::Horizontal);
        assert_eq!(orientation(100, 200), Orientation::Vertical);
        assert_eq!(orientation(100, 100), Orientation::Square);
    }

    // =========================================================================
    // crop_box tests
    // =========================================================================

    #[test]
    fn crop_horizontal_crops_height() {
        // 2000x1500 at 8:5 → ideal height 1250 fits, width untouched
        assert_eq!(crop_box(2000, 1500, (8, 5), (320, 414)), (2000, 1250));
    }

    #[test]
    fn crop_horizontal_clamps_to_height() {
        // 2000x1000 at 8:5 → ideal height 1250 > 1000, so pin height and
        // recompute width: floor(8/5 * 1000) = 1600
        assert_eq!(crop_box(2000, 1000, (8, 5), (320, 414)), (1600, 1000));
    }

    #[test]
    fn crop_vertical_crops_width() {
        // 1500x2070 at 320:414 → ideal width 1600 > 1500, pin width,
        // height = floor(414/320 * 1500) = 1940
        assert_eq!(crop_box(1500, 2070, (8, 5), (320, 414)), (1500, 1940));
    }

    #[test]
    fn crop_vertical_fits_within_width() {
        // 2000x2070 vertical; ideal width floor(320/414*2070) = 1600 fits
        assert_eq!(crop_box(2000, 2070, (8, 5), (320, 414)), (1600, 2070));
    }

    #[test]
    fn crop_square_is_identity() {
        assert_eq!(crop_box(900, 900, (8, 5), (320, 414)), (900, 900));
    }

    #[test]
    fn crop_never_exceeds_original() {
        for (w, h) in [(2440, 1525), (123, 456), (77, 33), (5000, 100)] {
            let (cw, ch) = crop_box(w, h, (8, 5), (320, 414));
            assert!(cw <= w, "{cw} > {w}");
            assert!(ch <= h, "{ch} > {h}");
        }
    }

    #[test]
    fn crop_matches_ratio_within_rounding() {
        let (cw, ch) = crop_box(2000, 1500, (8, 5), (320, 414));
        // cw/ch should be 8/5 within integer rounding
        let ideal = cw as f64 * 5.0 / 8.0;
        assert!((ch as f64 - ideal).abs() < 1.0);
    }

    // =========================================================================
    // height formulas
    // =========================================================================

    #[test]
    fn derivative_height_floors() {
        assert_eq!(derivative_height(1220, (8, 5)), 762); // 1220*5/8 = 762.5
        assert_eq!(derivative_height(840, (8, 5)), 525);
    }

    #[test]
    fn scaled_height_preserves_aspect() {
        assert_eq!(scaled_height((2440, 1525), 610), 381); // 610*1525/2440
    }

    // =========================================================================
    // plan_derivatives tests
    // =========================================================================

    #[test]
    fn plan_8_5_reference_image() {
        // 2440x1525 is exactly 8:5 — crop box equals the original, and the
        // three largest horizontal widths all fit.
        let plan = plan_derivatives(2440, 1525, (8, 5), (320, 414), &STOCK);
        assert_eq!((plan.crop_width, plan.crop_height), (2440, 1525));

        let labels: Vec<&str> = plan.targets.iter().map(|t| t.label.as_str()).collect();
        assert!(labels.contains(&"2440x1525"));
        assert!(labels.contains(&"1220x762"));
        assert!(labels.contains(&"840x525"));
        // 1220 is retina-eligible and 2440 wide still fits
        assert!(labels.contains(&"1220x762@2x"));
        // 2440 is not retina-eligible; 4880 would not fit anyway
        assert!(!labels.iter().any(|l| l.starts_with("2440x1525@2x")));
    }

    #[test]
    fn plan_never_upscales() {
        let plan = plan_derivatives(800, 500, (8, 5), (320, 414), &STOCK);
        for t in &plan.targets {
            match t.source {
                RenderSource::Cropped => {
                    assert!(t.width <= plan.crop_width);
                    assert!(t.height <= plan.crop_height);
                }
                RenderSource::Original => {
                    assert!(t.width <= 800);
                    assert!(t.height <= 500);
                }
            }
        }
    }

    #[test]
    fn plan_width_realized_iff_it_fits() {
        let plan = plan_derivatives(800, 500, (8, 5), (320, 414), &STOCK);
        let cropped: Vec<u32> = plan
            .targets
            .iter()
            .filter(|t| t.source == RenderSource::Cropped && !t.label.ends_with("@2x"))
            .map(|t| t.width)
            .collect();
        // crop box is 800x500; widths 2440, 1220, 840 are out, the rest in
        assert_eq!(cropped, vec![800, 610, 420, 160]);
    }

    #[test]
    fn plan_vertical_uses_vertical_widths() {
        let plan = plan_derivatives(1500, 2070, (8, 5), (320, 414), &STOCK);
        assert!(
            plan.targets
                .iter()
                .filter(|t| t.source == RenderSource::Cropped)
                .all(|t| [556, 320, 278, 160, 1112, 640, 556, 320].contains(&t.width))
        );
        assert!(plan.targets.iter().any(|t| t.label == "556x719"));
    }

    #[test]
    fn plan_square_has_no_cropped_targets() {
        let plan = plan_derivatives(900, 900, (8, 5), (320, 414), &STOCK);
        assert!(
            plan.targets
                .iter()
                .all(|t| t.source == RenderSource::Original)
        );
        // non-cropped sizes still apply to squares
        assert!(plan.targets.iter().any(|t| t.label == "610nc"));
    }

    #[test]
    fn plan_retina_sibling_follows_base() {
        let plan = plan_derivatives(2440, 1525, (8, 5), (320, 414), &STOCK);
        let idx_base = plan
            .targets
            .iter()
            .position(|t| t.label == "610x381")
            .unwrap();
        assert_eq!(plan.targets[idx_base + 1].label, "610x381@2x");
        assert_eq!(plan.targets[idx_base + 1].width, 1220);
    }

    #[test]
    fn plan_non_cropped_retina_gated_independently() {
        // 1300x813: 610nc fits, 610nc@2x (1220 wide) fits, 1220nc fits,
        // 1220nc@2x (2440) does not.
        let plan = plan_derivatives(1300, 813, (8, 5), (320, 414), &STOCK);
        let labels: Vec<&str> = plan.targets.iter().map(|t| t.label.as_str()).collect();
        assert!(labels.contains(&"610nc"));
        assert!(labels.contains(&"610nc@2x"));
        assert!(labels.contains(&"1220nc"));
        assert!(!labels.contains(&"1220nc@2x"));
    }

    #[test]
    fn plan_thumbnail_label_and_dimensions() {
        let plan = plan_derivatives(2440, 1525, (8, 5), (320, 414), &STOCK);
        assert_eq!(plan.thumbnail.width, 200);
        assert_eq!(plan.thumbnail.height, 125);
        assert_eq!(plan.thumbnail.label, "200x125.thumbnail");
    }
}
