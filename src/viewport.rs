//! Mapping between natural image pixels and the fitted on-screen image.

use crate::geometry::{Rect, Size, fit_contain_center};

/// Crop region in natural image pixels, as reported to callers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CroppedRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl CroppedRect {
    pub const EMPTY: CroppedRect = CroppedRect {
        left: 0,
        top: 0,
        width: 0,
        height: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Where an image of `natural` size lands when letterboxed in `container`.
pub fn fit(natural: Size, container: Size) -> Rect {
    fit_contain_center(container, natural.aspect_ratio())
}

/// Convert a crop box local to `fitted` into natural pixels, flooring each
/// component.
pub fn to_natural(crop: &Rect, fitted: &Rect, natural: Size) -> CroppedRect {
    if fitted.width <= 0.0 {
        return CroppedRect::EMPTY;
    }
    // fitting keeps the ratio, so the vertical scale is the same
    let scale = natural.width / fitted.width;
    let floor = |v: f64| (v * scale).floor().max(0.0) as u32;
    CroppedRect {
        left: floor(crop.left),
        top: floor(crop.top),
        width: floor(crop.width),
        height: floor(crop.height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_centers_wide_image_in_tall_container() {
        let fitted = fit(Size::new(800.0, 400.0), Size::new(400.0, 300.0));
        assert_eq!(fitted, Rect::new(0.0, 50.0, 400.0, 200.0));
    }

    #[test]
    fn natural_conversion_scales_and_floors() {
        let fitted = Rect::new(0.0, 50.0, 400.0, 200.0);
        let crop = Rect::new(100.0, 0.0, 200.0, 200.0);
        assert_eq!(
            to_natural(&crop, &fitted, Size::new(800.0, 400.0)),
            CroppedRect {
                left: 200,
                top: 0,
                width: 400,
                height: 400
            }
        );

        let crop = Rect::new(10.3, 0.9, 33.3, 50.7);
        assert_eq!(
            to_natural(&crop, &fitted, Size::new(800.0, 400.0)),
            CroppedRect {
                left: 20,
                top: 1,
                width: 66,
                height: 101
            }
        );
    }

    #[test]
    fn empty_fit_yields_empty_crop() {
        let crop = Rect::new(1.0, 1.0, 5.0, 5.0);
        assert!(to_natural(&crop, &Rect::ZERO, Size::new(10.0, 10.0)).is_empty());
    }
}
