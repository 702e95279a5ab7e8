use std::path::Path;

use ndarray::Array2;
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio,
};
use tracing::info;

use crate::error::Error;
use crate::frame::Frame;

/// Decodes every frame of a video file to grayscale.
pub fn read_video<P: AsRef<Path>>(path: P) -> Result<Vec<Frame>, Error> {
    let path = path.as_ref();
    let mut cam = videoio::VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)?;

    if !videoio::VideoCapture::is_opened(&cam)? {
        return Err(Error::InvalidFrame(format!("unable to open {}", path.display())));
    }

    let total = cam.get(videoio::CAP_PROP_FRAME_COUNT)? as usize;
    let mut frames = Vec::with_capacity(total);
    let mut bgr = Mat::default();

    loop {
        if !cam.read(&mut bgr)? {
            break;
        }

        if bgr.cols() == 0 || bgr.rows() == 0 {
            break;
        }

        frames.push(to_gray(&bgr)?);
    }

    info!(path = %path.display(), frames = frames.len(), "video decoded");
    Ok(frames)
}

fn to_gray(bgr: &Mat) -> Result<Frame, Error> {
    let mut gray = Mat::default();
    imgproc::cvt_color(bgr, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;

    let (h, w) = (gray.rows() as usize, gray.cols() as usize);
    // single channel after conversion, so one byte per pixel
    let pixels = Array2::from_shape_vec((h, w), gray.data_bytes()?.to_vec())
        .map_err(|e| Error::InvalidFrame(e.to_string()))?;

    Ok(Frame::from_gray(pixels))
}
