//! The cropper: one image, one crop box, any number of preview panes.
//!
//! The host feeds it pointer events and image sizes; it hands back the
//! crop region in natural pixels through the change callback whenever a
//! drag ends or the box is reset.

use std::rc::Rc;

use log::{debug, info, warn};

use crate::config::CropperConfig;
use crate::crop_box::{CropBoxController, CropBoxEvent, GrabTarget};
use crate::drag::DragCoordinator;
use crate::error::Result;
use crate::geometry::{Point, Rect, Size};
use crate::preview::{PreviewSynchronizer, SharedPreview};
use crate::viewport::{self, CroppedRect};

/// Identifies one `set_image` call so a late answer for a replaced image
/// can be told apart from the current one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

type CroppedRectCallback = Box<dyn FnMut(CroppedRect)>;

pub struct Cropper {
    config: CropperConfig,
    container: Option<Size>,
    source: Option<String>,
    pending: Option<(LoadTicket, String)>,
    next_ticket: u64,
    natural: Size,
    fitted: Rect,
    crop_box: CropBoxController,
    previews: PreviewSynchronizer,
    cropped: CroppedRect,
    visible: bool,
    on_cropped_rect_change: Option<CroppedRectCallback>,
}

impl Cropper {
    pub fn new(config: CropperConfig) -> Self {
        Self::with_coordinator(config, DragCoordinator::new())
    }

    /// Croppers sharing `coordinator` never drag at the same time.
    pub fn with_coordinator(config: CropperConfig, coordinator: Rc<DragCoordinator>) -> Self {
        let crop_box = CropBoxController::new(
            coordinator,
            config.effective_aspect_ratio(),
            config.constraints,
        );
        Self {
            config,
            container: None,
            source: None,
            pending: None,
            next_ticket: 0,
            natural: Size::ZERO,
            fitted: Rect::ZERO,
            crop_box,
            previews: PreviewSynchronizer::new(),
            cropped: CroppedRect::EMPTY,
            visible: false,
            on_cropped_rect_change: None,
        }
    }

    pub fn on_cropped_rect_change(mut self, callback: impl FnMut(CroppedRect) + 'static) -> Self {
        self.on_cropped_rect_change = Some(Box::new(callback));
        self
    }

    /// Attach to a container of `size`. The box stays hidden until an
    /// image resolves.
    pub fn render(&mut self, container: Size) {
        self.container = Some(container);
        if !self.natural.is_empty() {
            self.resize_container(container);
        }
    }

    /// Assign an image, or clear with `None`.
    ///
    /// A new source returns the ticket the host answers through
    /// [`complete_image`](Self::complete_image) once the natural size is
    /// known.
    pub fn set_image(&mut self, source: Option<&str>) -> Option<LoadTicket> {
        let Some(source) = source.filter(|s| !s.is_empty()) else {
            self.clear();
            return None;
        };
        self.next_ticket += 1;
        let ticket = LoadTicket::new(self.next_ticket);
        info!("resolving image {source} ({ticket:?})");
        self.pending = Some((ticket, source.to_owned()));
        Some(ticket)
    }

    /// Deliver the natural size for `ticket`. Answers for replaced images
    /// are ignored and return false. A failed resolution clears the cropper.
    pub fn complete_image(&mut self, ticket: LoadTicket, size: Result<Size>) -> bool {
        let source = match self.pending.take() {
            Some((pending, source)) if pending == ticket => source,
            other => {
                debug!("ignoring stale image answer {ticket:?}");
                self.pending = other;
                return false;
            }
        };

        let natural = match size {
            Ok(size) if !size.is_empty() => size,
            Ok(size) => {
                warn!("image {source} has no area ({size:?}), clearing");
                self.clear();
                return true;
            }
            Err(e) => {
                warn!("image {source} could not be resolved: {e}");
                self.clear();
                return true;
            }
        };

        self.natural = natural;
        self.fitted = match self.container {
            Some(container) => viewport::fit(natural, container),
            None => Rect::from_size(natural),
        };
        self.crop_box.set_bounds(self.fitted.size());
        self.visible = true;
        info!(
            "image {source} is {}x{}, fitted at {:?}",
            natural.width, natural.height, self.fitted
        );

        self.reset_resizer();
        self.previews.set_source(&source);
        self.previews.refresh(&self.crop_box.rect(), &self.fitted);
        self.source = Some(source);
        true
    }

    pub fn add_preview(&mut self, target: SharedPreview) {
        self.previews.add(target);
    }

    /// Re-place the crop box from the configured geometry. An active drag
    /// ends without reporting.
    pub fn reset_resizer(&mut self) {
        for event in self.crop_box.reset(&self.config.initial_geometry()) {
            self.dispatch(event);
        }
    }

    /// Lock the box to `ratio` (or free it) and re-place it. An active
    /// drag ends without reporting.
    pub fn set_aspect_ratio(&mut self, ratio: Option<f64>) {
        self.crop_box.set_aspect_ratio(ratio);
        if self.visible {
            self.reset_resizer();
        }
    }

    /// Follow a resized container, keeping the same natural-pixel crop.
    pub fn resize_container(&mut self, container: Size) {
        self.container = Some(container);
        if self.natural.is_empty() {
            return;
        }
        let fitted = viewport::fit(self.natural, container);
        if fitted == self.fitted {
            return;
        }
        if let Some(event) = self.crop_box.cancel() {
            self.dispatch(event);
        }
        self.fitted = fitted;
        let event = self.crop_box.refit(fitted.size());
        self.dispatch(event);

        let cropped = self.natural_crop();
        if cropped != self.cropped {
            self.commit();
        }
    }

    pub fn pointer_down(&mut self, target: GrabTarget, at: Point) -> bool {
        self.visible && self.crop_box.pointer_down(target, at)
    }

    pub fn pointer_move(&mut self, at: Point) {
        if let Some(event) = self.crop_box.pointer_move(at) {
            self.dispatch(event);
        }
    }

    pub fn pointer_up(&mut self, at: Point) {
        if let Some(event) = self.crop_box.pointer_up(at) {
            self.dispatch(event);
        }
    }

    /// Abandon the active drag, restoring the box.
    pub fn cancel_drag(&mut self) {
        if let Some(event) = self.crop_box.cancel() {
            self.dispatch(event);
        }
    }

    /// What a pointer at `at` (fitted-image local coordinates) would grab.
    pub fn hit_test(&self, at: Point, tolerance: f64) -> Option<GrabTarget> {
        if !self.visible {
            return None;
        }
        self.crop_box.hit_test(at, tolerance)
    }

    pub fn cropped_rect(&self) -> CroppedRect {
        self.cropped
    }

    /// Crop box in fitted-image local coordinates.
    pub fn crop_box(&self) -> Rect {
        self.crop_box.rect()
    }

    /// The image's placement inside the container.
    pub fn fitted_rect(&self) -> Rect {
        self.fitted
    }

    pub fn natural_size(&self) -> Size {
        self.natural
    }

    pub fn aspect_ratio(&self) -> Option<f64> {
        self.crop_box.aspect_ratio()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn pending_ticket(&self) -> Option<LoadTicket> {
        self.pending.as_ref().map(|(ticket, _)| *ticket)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_dragging(&self) -> bool {
        self.crop_box.is_dragging()
    }

    /// True while any cropper sharing this one's coordinator is dragging.
    pub fn selection_suppressed(&self) -> bool {
        self.crop_box.coordinator().selection_suppressed()
    }

    fn dispatch(&mut self, event: CropBoxEvent) {
        match event {
            CropBoxEvent::StateChanged(rect) => self.previews.refresh(&rect, &self.fitted),
            CropBoxEvent::DragEnded(_) => self.commit(),
        }
    }

    fn natural_crop(&self) -> CroppedRect {
        viewport::to_natural(&self.crop_box.rect(), &self.fitted, self.natural)
    }

    fn commit(&mut self) {
        if self.natural.is_empty() {
            return;
        }
        self.cropped = self.natural_crop();
        debug!("cropped rect is now {:?}", self.cropped);
        self.notify();
    }

    fn clear(&mut self) {
        self.crop_box.cancel();
        self.pending = None;
        self.source = None;
        self.natural = Size::ZERO;
        self.fitted = Rect::ZERO;
        self.visible = false;
        self.crop_box.set_bounds(Size::ZERO);
        self.crop_box.reset(&self.config.initial_geometry());
        self.previews.clear();
        self.cropped = CroppedRect::EMPTY;
        info!("image cleared");
        self.notify();
    }

    fn notify(&mut self) {
        let cropped = self.cropped;
        if let Some(callback) = self.on_cropped_rect_change.as_mut() {
            callback(cropped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resize::{Direction, Handle};
    use std::cell::RefCell;

    fn recording(config: CropperConfig) -> (Cropper, Rc<RefCell<Vec<CroppedRect>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let cropper =
            Cropper::new(config).on_cropped_rect_change(move |r| sink.borrow_mut().push(r));
        (cropper, seen)
    }

    fn loaded(config: CropperConfig) -> (Cropper, Rc<RefCell<Vec<CroppedRect>>>) {
        let (mut cropper, seen) = recording(config);
        cropper.render(Size::new(400.0, 300.0));
        let ticket = cropper.set_image(Some("wide.png")).expect("ticket");
        assert!(cropper.complete_image(ticket, Ok(Size::new(800.0, 400.0))));
        (cropper, seen)
    }

    #[test]
    fn hidden_until_an_image_resolves() {
        let (mut cropper, seen) = recording(CropperConfig::default());
        cropper.render(Size::new(400.0, 300.0));
        assert!(!cropper.is_visible());
        let ticket = cropper.set_image(Some("a.png")).expect("ticket");
        assert_eq!(cropper.pending_ticket(), Some(ticket));
        assert!(!cropper.is_visible());
        assert!(!cropper.pointer_down(GrabTarget::Body, Point::default()));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn loading_fits_resets_and_reports() {
        let (cropper, seen) = loaded(CropperConfig::default());
        assert!(cropper.is_visible());
        assert_eq!(cropper.source(), Some("wide.png"));
        assert_eq!(cropper.fitted_rect(), Rect::new(0.0, 50.0, 400.0, 200.0));
        assert_eq!(cropper.crop_box(), Rect::new(100.0, 0.0, 200.0, 200.0));
        let expected = CroppedRect {
            left: 200,
            top: 0,
            width: 400,
            height: 400,
        };
        assert_eq!(cropper.cropped_rect(), expected);
        assert_eq!(*seen.borrow(), vec![expected]);
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let (mut cropper, seen) = recording(CropperConfig::default());
        cropper.render(Size::new(400.0, 300.0));
        let first = cropper.set_image(Some("first.png")).expect("ticket");
        let second = cropper.set_image(Some("second.png")).expect("ticket");
        assert!(!cropper.complete_image(first, Ok(Size::new(10.0, 10.0))));
        assert!(!cropper.is_visible());
        assert!(cropper.complete_image(second, Ok(Size::new(300.0, 300.0))));
        assert_eq!(cropper.source(), Some("second.png"));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn clearing_reports_an_empty_rect_once() {
        let (mut cropper, seen) = loaded(CropperConfig::default());
        seen.borrow_mut().clear();
        assert_eq!(cropper.set_image(None), None);
        assert_eq!(*seen.borrow(), vec![CroppedRect::EMPTY]);
        assert!(!cropper.is_visible());
        assert_eq!(cropper.crop_box(), Rect::ZERO);
        assert_eq!(cropper.fitted_rect(), Rect::ZERO);
    }

    #[test]
    fn failed_resolution_clears() {
        let (mut cropper, seen) = loaded(CropperConfig::default());
        seen.borrow_mut().clear();
        let ticket = cropper.set_image(Some("broken.png")).expect("ticket");
        let err = crate::error::Error::LoaderDisconnected("broken.png".into());
        assert!(cropper.complete_image(ticket, Err(err)));
        assert_eq!(*seen.borrow(), vec![CroppedRect::EMPTY]);
        assert_eq!(cropper.source(), None);
    }

    #[test]
    fn drag_end_reports_natural_pixels() {
        let (mut cropper, seen) = loaded(CropperConfig::default());
        seen.borrow_mut().clear();

        assert!(cropper.pointer_down(GrabTarget::Body, Point::new(200.0, 100.0)));
        cropper.pointer_move(Point::new(150.0, 100.0));
        cropper.pointer_move(Point::new(140.0, 100.0));
        // moves alone don't report
        assert!(seen.borrow().is_empty());
        cropper.pointer_up(Point::new(140.0, 100.0));

        assert_eq!(cropper.crop_box(), Rect::new(40.0, 0.0, 200.0, 200.0));
        assert_eq!(
            *seen.borrow(),
            vec![CroppedRect {
                left: 80,
                top: 0,
                width: 400,
                height: 400
            }]
        );
    }

    #[test]
    fn resize_container_keeps_the_natural_crop() {
        let (mut cropper, seen) = loaded(CropperConfig::default());
        let before = cropper.cropped_rect();
        cropper.resize_container(Size::new(200.0, 150.0));
        assert_eq!(cropper.fitted_rect(), Rect::new(0.0, 25.0, 200.0, 100.0));
        assert_eq!(cropper.crop_box(), Rect::new(50.0, 0.0, 100.0, 100.0));
        assert_eq!(cropper.cropped_rect(), before);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn switching_to_free_ratio_resets_the_box() {
        let (mut cropper, _) = loaded(CropperConfig::default());
        cropper.set_aspect_ratio(None);
        assert_eq!(cropper.aspect_ratio(), None);

        let se = GrabTarget::Handle(Handle::grip(Direction::SE));
        cropper.pointer_down(se, Point::new(300.0, 200.0));
        cropper.pointer_move(Point::new(330.0, 150.0));
        cropper.pointer_up(Point::new(330.0, 150.0));
        assert_eq!(cropper.crop_box(), Rect::new(100.0, 0.0, 230.0, 150.0));
    }

    #[test]
    fn croppers_sharing_a_coordinator_drag_one_at_a_time() {
        let coordinator = DragCoordinator::new();
        let mut a = Cropper::with_coordinator(CropperConfig::default(), Rc::clone(&coordinator));
        let mut b = Cropper::with_coordinator(CropperConfig::default(), Rc::clone(&coordinator));
        for cropper in [&mut a, &mut b] {
            cropper.render(Size::new(100.0, 100.0));
            let ticket = cropper.set_image(Some("x.png")).expect("ticket");
            cropper.complete_image(ticket, Ok(Size::new(100.0, 100.0)));
        }
        assert!(a.pointer_down(GrabTarget::Body, Point::default()));
        assert!(!b.pointer_down(GrabTarget::Body, Point::default()));
        a.pointer_up(Point::default());
        assert!(b.pointer_down(GrabTarget::Body, Point::default()));
    }

    fn assert_contained_in_natural(cropper: &Cropper) {
        let natural = cropper.natural_size();
        let r = cropper.cropped_rect();
        assert!(f64::from(r.left + r.width) <= natural.width, "{r:?} past {natural:?}");
        assert!(f64::from(r.top + r.height) <= natural.height, "{r:?} past {natural:?}");
    }

    #[test]
    fn new_image_mid_drag_ends_the_drag() {
        let (mut cropper, seen) = loaded(CropperConfig::default());
        assert!(cropper.pointer_down(GrabTarget::Body, Point::default()));
        assert!(cropper.selection_suppressed());

        let ticket = cropper.set_image(Some("tall.png")).expect("ticket");
        assert!(cropper.complete_image(ticket, Ok(Size::new(100.0, 400.0))));
        assert!(!cropper.is_dragging());
        assert!(!cropper.selection_suppressed());
        assert_eq!(cropper.fitted_rect(), Rect::new(162.5, 0.0, 75.0, 300.0));
        let placed = cropper.crop_box();
        let reported = seen.borrow().len();

        cropper.pointer_move(Point::new(1.0, 0.0));
        assert_eq!(cropper.crop_box(), placed);
        cropper.pointer_up(Point::new(1.0, 0.0));
        assert_eq!(seen.borrow().len(), reported);

        let bounds = Rect::from_size(cropper.fitted_rect().size());
        assert!(bounds.contains_rect(&cropper.crop_box(), 1e-9));
        assert_eq!(placed.width, placed.height);
        assert_contained_in_natural(&cropper);
    }

    #[test]
    fn ratio_change_mid_drag_ends_the_drag() {
        let (mut cropper, _) = loaded(CropperConfig::default());
        assert!(cropper.pointer_down(GrabTarget::Body, Point::default()));
        cropper.set_aspect_ratio(Some(2.0));
        assert!(!cropper.is_dragging());
        assert_eq!(cropper.crop_box(), Rect::new(100.0, 50.0, 200.0, 100.0));

        cropper.pointer_move(Point::new(1.0, 0.0));
        cropper.pointer_up(Point::new(1.0, 0.0));
        let r = cropper.crop_box();
        assert_eq!(r.width / r.height, 2.0);
        assert_contained_in_natural(&cropper);

        // the flag was released, so a fresh drag starts from the new box
        let se = GrabTarget::Handle(Handle::grip(Direction::SE));
        assert!(cropper.pointer_down(se, Point::default()));
        cropper.pointer_move(Point::new(500.0, 500.0));
        let r = cropper.crop_box();
        assert_eq!(r.width / r.height, 2.0);
        assert!(Rect::new(0.0, 0.0, 400.0, 200.0).contains_rect(&r, 1e-9));
    }

    #[test]
    fn reset_resizer_mid_drag_ends_the_drag() {
        let (mut cropper, seen) = loaded(CropperConfig::default());
        let placed = cropper.crop_box();
        let nw = GrabTarget::Handle(Handle::grip(Direction::NW));
        assert!(cropper.pointer_down(nw, Point::default()));
        cropper.pointer_move(Point::new(-30.0, -30.0));
        cropper.reset_resizer();
        assert!(!cropper.is_dragging());
        assert_eq!(cropper.crop_box(), placed);

        let reported = seen.borrow().len();
        cropper.pointer_move(Point::new(-60.0, -60.0));
        cropper.pointer_up(Point::new(-60.0, -60.0));
        assert_eq!(cropper.crop_box(), placed);
        assert_eq!(seen.borrow().len(), reported);
    }
}
