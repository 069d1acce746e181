//! Keeping preview panes in step with the crop box.
//!
//! A preview never copies pixels. It renders the whole fitted image at a
//! scale where the crop box fills the pane, then shifts it so only the
//! cropped part shows through the pane's clip.

use std::cell::RefCell;
use std::rc::Rc;

use log::trace;

use crate::geometry::{Rect, Size, fit_contain_center};

/// Geometry a preview pane should apply to its image and wrapper slots.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewTransform {
    pub scale: f64,
    /// Image placement relative to the wrapper (or the pane without one).
    pub image: Rect,
    /// Letterboxed wrapper placement inside the pane.
    pub wrapper: Option<Rect>,
}

/// A surface owned by the caller that mirrors the crop selection.
pub trait PreviewTarget {
    /// Current size of the pane's own box.
    fn box_size(&self) -> Size;

    /// Panes without an image slot are skipped.
    fn has_image_slot(&self) -> bool {
        true
    }

    /// Whether the pane letterboxes the crop through a wrapper slot.
    fn has_wrapper(&self) -> bool {
        false
    }

    /// A new image was assigned.
    fn set_source(&mut self, _source: &str) {}

    fn apply(&mut self, transform: &PreviewTransform);

    /// The image was removed.
    fn clear(&mut self);
}

pub type SharedPreview = Rc<RefCell<dyn PreviewTarget>>;

/// Transform that shows exactly `crop` (local to `fitted`) inside a pane
/// of `pane` size.
pub fn preview_transform(
    pane: Size,
    with_wrapper: bool,
    crop: &Rect,
    fitted: &Rect,
) -> PreviewTransform {
    let mut scale = pane.width / crop.width;
    let wrapper = with_wrapper.then(|| {
        let wrapper = fit_contain_center(pane, crop.size().aspect_ratio());
        scale = wrapper.width / crop.width;
        wrapper
    });

    PreviewTransform {
        scale,
        image: Rect::new(
            -crop.left * scale,
            -crop.top * scale,
            fitted.width * scale,
            fitted.height * scale,
        ),
        wrapper,
    }
}

/// Ordered list of registered preview panes.
#[derive(Default)]
pub struct PreviewSynchronizer {
    targets: Vec<SharedPreview>,
}

impl PreviewSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duplicates are kept and updated twice.
    pub fn add(&mut self, target: SharedPreview) {
        self.targets.push(target);
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn set_source(&self, source: &str) {
        for target in &self.targets {
            let mut target = target.borrow_mut();
            if target.has_image_slot() {
                target.set_source(source);
            }
        }
    }

    pub fn refresh(&self, crop: &Rect, fitted: &Rect) {
        if crop.width <= 0.0 || crop.height <= 0.0 {
            return;
        }
        for (i, target) in self.targets.iter().enumerate() {
            let mut target = target.borrow_mut();
            if !target.has_image_slot() {
                continue;
            }
            let transform =
                preview_transform(target.box_size(), target.has_wrapper(), crop, fitted);
            trace!("preview {i}: {transform:?}");
            target.apply(&transform);
        }
    }

    pub fn clear(&self) {
        for target in &self.targets {
            let mut target = target.borrow_mut();
            if target.has_image_slot() {
                target.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::assert_close;

    #[derive(Default)]
    struct Pane {
        size: Size,
        wrapper: bool,
        slot: bool,
        applied: Vec<PreviewTransform>,
        cleared: usize,
    }

    impl PreviewTarget for Pane {
        fn box_size(&self) -> Size {
            self.size
        }
        fn has_image_slot(&self) -> bool {
            self.slot
        }
        fn has_wrapper(&self) -> bool {
            self.wrapper
        }
        fn apply(&mut self, transform: &PreviewTransform) {
            self.applied.push(*transform);
        }
        fn clear(&mut self) {
            self.cleared += 1;
        }
    }

    const FITTED: Rect = Rect::new(0.0, 0.0, 400.0, 200.0);

    #[test]
    fn plain_pane_scales_by_width() {
        let crop = Rect::new(100.0, 20.0, 200.0, 100.0);
        let t = preview_transform(Size::new(100.0, 50.0), false, &crop, &FITTED);
        assert_eq!(t.scale, 0.5);
        assert_eq!(t.image, Rect::new(-50.0, -10.0, 200.0, 100.0));
        assert_eq!(t.wrapper, None);
    }

    #[test]
    fn narrower_pane_letterboxes_vertically() {
        // crop is 2:1, pane is 1:1
        let crop = Rect::new(100.0, 20.0, 200.0, 100.0);
        let t = preview_transform(Size::new(100.0, 100.0), true, &crop, &FITTED);
        assert_eq!(t.wrapper, Some(Rect::new(0.0, 25.0, 100.0, 50.0)));
        assert_eq!(t.scale, 0.5);
    }

    #[test]
    fn wider_pane_pillarboxes_and_shrinks_scale() {
        // crop is 1:2, pane is 1:1
        let crop = Rect::new(40.0, 0.0, 100.0, 200.0);
        let t = preview_transform(Size::new(120.0, 120.0), true, &crop, &FITTED);
        let wrapper = t.wrapper.expect("wrapper");
        assert_close(wrapper.width, 60.0);
        assert_close(wrapper.left, 30.0);
        assert_close(t.scale, 0.6);
        assert_close(t.image.left, -24.0);
        assert_close(t.image.height, 120.0);
    }

    #[test]
    fn panes_without_image_slot_are_skipped() {
        let good: Rc<RefCell<Pane>> = Rc::new(RefCell::new(Pane {
            size: Size::new(50.0, 50.0),
            slot: true,
            ..Pane::default()
        }));
        let broken: Rc<RefCell<Pane>> = Rc::new(RefCell::new(Pane::default()));

        let mut sync = PreviewSynchronizer::new();
        sync.add(broken.clone());
        sync.add(good.clone());
        sync.add(good.clone());
        assert_eq!(sync.len(), 3);

        sync.refresh(&Rect::new(0.0, 0.0, 100.0, 100.0), &FITTED);
        assert!(broken.borrow().applied.is_empty());
        assert_eq!(good.borrow().applied.len(), 2);

        sync.clear();
        assert_eq!(broken.borrow().cleared, 0);
        assert_eq!(good.borrow().cleared, 2);
    }
}
