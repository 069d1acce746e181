//! Interactive image cropping: an aspect-locked crop box over a letterboxed
//! image, with preview panes that follow the selection.

pub mod config;
pub mod crop_box;
pub mod cropper;
pub mod drag;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod preview;
pub mod resize;
pub mod viewport;

pub use config::CropperConfig;
pub use crop_box::{CropBoxController, CropBoxEvent, GrabTarget, InitialGeometry};
pub use cropper::{Cropper, LoadTicket};
pub use drag::{DragCoordinator, PointerDragController};
pub use error::{Error, Result};
pub use geometry::{Point, Rect, Size, Vector};
pub use preview::{PreviewTarget, PreviewTransform, SharedPreview};
pub use resize::{Direction, Handle, HandleStyle, SizeConstraints};
pub use viewport::CroppedRect;
