use serde::{Deserialize, Serialize};
use spinespy::detection::{Frame, FrameSource};
use spinespy::error::{PipelineError, PipelineResult};
use spinespy_types::image::imageops;
use std::time::Duration;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CameraOptions {
    pub index: u32,
    /// Frames thrown away so exposure can settle
    pub warmup_frames: u32,
    /// Pause between opening the stream and reading the first frame
    pub settle_delay: Duration,
    /// Flip horizontally so the image matches what the user sees in a mirror
    pub mirror: bool,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            index: 0,
            warmup_frames: 5,
            settle_delay: Duration::from_millis(500),
            mirror: true,
        }
    }
}

/// Post-capture step shared by every frame source
pub fn finish_frame(mut frame: Frame, options: &CameraOptions) -> Frame {
    if options.mirror {
        imageops::flip_horizontal_in_place(&mut frame);
    }
    frame
}

#[cfg(feature = "camera")]
pub use webcam::{WebcamFrameSource, request_camera_access};

#[cfg(feature = "camera")]
mod webcam {
    use super::{CameraOptions, finish_frame};
    use nokhwa::Camera;
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
    use spinespy::detection::{Frame, FrameSource};
    use spinespy::error::{PipelineError, PipelineResult};

    /// Opens the webcam for every capture and closes it again before returning
    pub struct WebcamFrameSource {
        options: CameraOptions,
    }

    impl WebcamFrameSource {
        pub fn new(options: CameraOptions) -> Self {
            Self { options }
        }

        fn read(&self, camera: &mut Camera) -> PipelineResult<Frame> {
            std::thread::sleep(self.options.settle_delay);
            for _ in 0..self.options.warmup_frames {
                camera
                    .frame()
                    .map_err(|e| PipelineError::CaptureFailed(e.to_string()))?;
            }

            let decoded = camera
                .frame()
                .and_then(|buffer| buffer.decode_image::<RgbFormat>())
                .map_err(|e| PipelineError::CaptureFailed(e.to_string()))?;
            let (width, height) = (decoded.width(), decoded.height());
            Frame::from_raw(width, height, decoded.into_raw()).ok_or_else(|| {
                PipelineError::CaptureFailed(format!("bad frame buffer {width}x{height}"))
            })
        }
    }

    impl FrameSource for WebcamFrameSource {
        fn capture(&mut self) -> PipelineResult<Frame> {
            let format =
                RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
            let mut camera = Camera::new(CameraIndex::Index(self.options.index), format)
                .map_err(|e| PipelineError::CameraUnavailable(e.to_string()))?;
            camera
                .open_stream()
                .map_err(|e| PipelineError::CameraUnavailable(e.to_string()))?;

            let frame = self.read(&mut camera);
            if let Err(error) = camera.stop_stream() {
                tracing::warn!(%error, "failed to close camera stream");
            }

            let frame = finish_frame(frame?, &self.options);
            tracing::debug!(
                width = frame.width(),
                height = frame.height(),
                "frame captured"
            );
            Ok(frame)
        }
    }

    /// Ask macOS for camera permission. Other platforms need nothing.
    pub fn request_camera_access() {
        #[cfg(target_os = "macos")]
        nokhwa::nokhwa_initialize(|granted| {
            if granted {
                tracing::info!("camera access granted");
            } else {
                tracing::error!("camera access denied");
            }
        });
    }
}

/// Replays a fixed image, for running without a webcam
pub struct StillFrameSource {
    frame: Frame,
    options: CameraOptions,
}

impl StillFrameSource {
    pub fn new(frame: Frame, options: CameraOptions) -> Self {
        Self { frame, options }
    }

    pub fn open(path: &std::path::Path, options: CameraOptions) -> PipelineResult<Self> {
        let frame = spinespy_types::image::open(path)
            .map_err(|e| PipelineError::CameraUnavailable(format!("{}: {e}", path.display())))?
            .into_rgb8();
        Ok(Self::new(frame, options))
    }
}

impl FrameSource for StillFrameSource {
    fn capture(&mut self) -> PipelineResult<Frame> {
        Ok(finish_frame(self.frame.clone(), &self.options))
    }
}
