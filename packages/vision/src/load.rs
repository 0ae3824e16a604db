use ort::session::{Session, builder::GraphOptimizationLevel};
use spinespy_types::{Result, anyhow};
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[N, C, H, W]`
    Nchw,
    /// `[N, H, W, C]`
    Nhwc,
}

/// Open an ONNX model with the globally configured execution providers
pub fn load_session(path: &Path) -> Result<Session> {
    crate::execution_providers::initialize_ort();
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .commit_from_file(path)?;
    Ok(session)
}

/// Read `(width, height)` of an image input. Fails on dynamic dimensions.
pub fn determine_input_shape(
    session: &Session,
    input_name: &str,
    layout: TensorLayout,
) -> Result<(u32, u32)> {
    for input in &session.inputs {
        if input.name == input_name
            && let Some(dims) = input.input_type.tensor_shape()
            && dims.len() == 4
        {
            let (h, w) = match layout {
                TensorLayout::Nchw => (dims[2], dims[3]),
                TensorLayout::Nhwc => (dims[1], dims[2]),
            };
            if w > 0 && h > 0 {
                return Ok((w as u32, h as u32));
            }
        }
    }
    Err(anyhow!("Failed to determine input shape for {input_name}!"))
}
