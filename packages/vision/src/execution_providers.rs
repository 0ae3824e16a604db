//! Execution provider setup for ONNX Runtime
//!
//! Call `initialize_ort()` once before creating sessions; loading a model calls it too,
//! so an explicit call only matters for logging what got picked. CoreML is registered
//! when the `coreml` feature is compiled in and the runtime reports it available,
//! CPU is always the fallback.

use std::sync::OnceLock;

/// Which execution providers ended up active
#[derive(Debug, Clone, Default)]
pub struct ExecutionProviderInfo {
    /// Active execution providers in priority order
    pub active_providers: Vec<String>,
    /// Whether any GPU/NPU acceleration is active
    pub accelerated: bool,
    pub warnings: Vec<String>,
}

static EP_INFO: OnceLock<ExecutionProviderInfo> = OnceLock::new();

/// Initialize ONNX Runtime with the best available execution providers.
///
/// Safe to call multiple times and from several threads, later calls return the cached info.
pub fn initialize_ort() -> ExecutionProviderInfo {
    EP_INFO.get_or_init(do_initialize_ort).clone()
}

pub fn is_initialized() -> bool {
    EP_INFO.get().is_some()
}

#[cfg(feature = "execute")]
fn do_initialize_ort() -> ExecutionProviderInfo {
    use tracing::info;

    #[allow(unused_mut)]
    let mut active_providers = Vec::new();
    #[allow(unused_mut)]
    let mut warnings = Vec::new();
    #[allow(unused_mut)]
    let mut eps: Vec<ort::execution_providers::ExecutionProviderDispatch> = Vec::new();

    #[cfg(feature = "coreml")]
    {
        use ort::execution_providers::{CoreMLExecutionProvider, ExecutionProvider};

        let coreml = CoreMLExecutionProvider::default();
        if coreml.is_available().unwrap_or(false) {
            info!("CoreML execution provider available");
            eps.push(coreml.build());
            active_providers.push("CoreML".to_string());
        } else {
            let msg = "CoreML execution provider unavailable at runtime, falling back to CPU";
            tracing::warn!("{}", msg);
            warnings.push(msg.to_string());
        }
    }

    active_providers.push("CPU".to_string());
    let accelerated = active_providers.iter().any(|p| p != "CPU");

    let committed = if eps.is_empty() {
        info!("No GPU/NPU acceleration available, using CPU");
        ort::init().commit()
    } else {
        info!(
            "Initializing ORT with execution providers: {:?}",
            active_providers
        );
        ort::init().with_execution_providers(eps).commit()
    };
    tracing::debug!(?committed, "ORT environment committed");

    ExecutionProviderInfo {
        active_providers,
        accelerated,
        warnings,
    }
}

#[cfg(not(feature = "execute"))]
fn do_initialize_ort() -> ExecutionProviderInfo {
    ExecutionProviderInfo {
        active_providers: vec!["CPU (execute feature disabled)".to_string()],
        accelerated: false,
        warnings: vec!["Execute feature not enabled".to_string()],
    }
}
