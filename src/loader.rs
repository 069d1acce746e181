//! Off-thread image decoding.
//!
//! The cropper itself only needs an image's natural size; the host also
//! wants the pixels for drawing. Decoding runs on a worker thread and the
//! result is picked up from the host's event loop with [`ImageRequest::poll`].

use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use image::{DynamicImage, GenericImageView};
use log::debug;

use crate::cropper::LoadTicket;
use crate::error::{Error, Result};
use crate::geometry::Size;

#[derive(Debug)]
pub struct LoadedImage {
    pub source: String,
    pub image: DynamicImage,
}

impl LoadedImage {
    pub fn natural_size(&self) -> Size {
        let (width, height) = self.image.dimensions();
        Size::new(width as f64, height as f64)
    }
}

/// A decode in flight, answered exactly once.
#[derive(Debug)]
pub struct ImageRequest {
    ticket: LoadTicket,
    source: String,
    rx: Receiver<Result<LoadedImage>>,
}

impl ImageRequest {
    pub fn spawn(ticket: LoadTicket, source: impl Into<String>) -> Self {
        let source = source.into();
        let (tx, rx) = mpsc::channel();
        let path = source.clone();
        thread::spawn(move || {
            debug!("decoding {path}");
            let result = image::open(Path::new(&path))
                .map(|image| LoadedImage {
                    source: path.clone(),
                    image,
                })
                .map_err(|error| Error::Image {
                    source_id: path,
                    error,
                });
            // the host may have moved on; nobody to tell
            let _ = tx.send(result);
        });
        Self { ticket, source, rx }
    }

    pub fn ticket(&self) -> LoadTicket {
        self.ticket
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// `None` while the worker is still decoding.
    pub fn poll(&self) -> Option<Result<LoadedImage>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(Err(Error::LoaderDisconnected(self.source.clone())))
            }
        }
    }

    /// Block until the worker answers.
    pub fn wait(self) -> Result<LoadedImage> {
        self.rx
            .recv()
            .map_err(|_| Error::LoaderDisconnected(self.source))?
    }
}

/// Natural size of the image at `path`, read from its header only.
pub fn probe_size(path: &Path) -> Result<Size> {
    let (width, height) = image::image_dimensions(path).map_err(|error| Error::Image {
        source_id: path.display().to_string(),
        error,
    })?;
    Ok(Size::new(width as f64, height as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn decodes_on_a_worker() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("wide.png");
        RgbaImage::from_pixel(8, 4, Rgba([0, 0, 0, 255]))
            .save(&path)
            .expect("write png");

        let source = path.to_string_lossy().into_owned();
        assert_eq!(probe_size(&path).expect("probe"), Size::new(8.0, 4.0));

        let request = ImageRequest::spawn(LoadTicket::new(1), source.clone());
        assert_eq!(request.ticket(), LoadTicket::new(1));
        let loaded = request.wait().expect("decode");
        assert_eq!(loaded.source, source);
        assert_eq!(loaded.natural_size(), Size::new(8.0, 4.0));
    }

    #[test]
    fn missing_file_reports_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nope.png");
        let request = ImageRequest::spawn(LoadTicket::new(7), path.to_string_lossy());
        assert!(matches!(request.wait(), Err(Error::Image { .. })));
    }
}
