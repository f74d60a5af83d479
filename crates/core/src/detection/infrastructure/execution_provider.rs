/// Execution backend preference forwarded from the CLI to the detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionBackend {
    /// Use an accelerated provider when the platform offers one.
    Auto,
    /// Require the platform's accelerated provider.
    Accelerated,
    /// CPU-only reference execution.
    Reference,
}

/// Resolve a backend preference to ONNX execution providers.
///
/// Falls back to CPU (empty list) if the platform has no accelerated
/// provider.
pub fn execution_providers(
    backend: ExecutionBackend,
) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    match backend {
        ExecutionBackend::Reference => Vec::new(),
        ExecutionBackend::Auto | ExecutionBackend::Accelerated => platform_providers(backend),
    }
}

fn platform_providers(
    backend: ExecutionBackend,
) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        let _ = backend;
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        let _ = backend;
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        if backend == ExecutionBackend::Accelerated {
            log::warn!("No accelerated execution provider on this platform; using CPU");
        }
        Vec::new()
    }
}
