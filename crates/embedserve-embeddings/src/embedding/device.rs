//! Execution device selection.
//!
//! Backends are probed in a fixed preference order (Metal, then CUDA, then
//! CPU). Each backend also carries the largest batch size the service will
//! hand to the model when running on it.

use crate::{EmbeddingError, EmbeddingResult};
use candle_core::Device;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Compute backend a model can run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Apple Metal Performance Shaders
    Mps,
    /// NVIDIA CUDA
    Cuda,
    /// Always-available fallback
    Cpu,
}

/// Probe order and batch ceiling per backend
const BACKEND_POLICY: [(Backend, usize); 3] =
    [(Backend::Mps, 64), (Backend::Cuda, 32), (Backend::Cpu, 16)];

/// Upper bound on CUDA ordinals probed when counting devices
const MAX_CUDA_DEVICES: usize = 8;

impl Backend {
    /// Device id reported to clients
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mps => "mps",
            Self::Cuda => "cuda",
            Self::Cpu => "cpu",
        }
    }

    /// Largest batch size handed to the encoder on this backend
    pub fn max_batch_size(self) -> usize {
        BACKEND_POLICY
            .iter()
            .find(|(backend, _)| *backend == self)
            .map_or(16, |(_, ceiling)| *ceiling)
    }

    /// Apply this backend's ceiling to a requested batch size
    pub fn clamp_batch_size(self, requested: usize) -> usize {
        requested.min(self.max_batch_size())
    }

    /// Whether support for this backend was compiled in
    pub fn is_available(self) -> bool {
        match self {
            Self::Mps => candle_core::utils::metal_is_available(),
            Self::Cuda => candle_core::utils::cuda_is_available(),
            Self::Cpu => true,
        }
    }

    fn open(self) -> EmbeddingResult<Device> {
        let device = match self {
            Self::Mps => Device::new_metal(0),
            Self::Cuda => Device::new_cuda(0),
            Self::Cpu => Ok(Device::Cpu),
        };
        device.map_err(|e| EmbeddingError::Device(format!("{self}: {e}")))
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = EmbeddingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mps" | "metal" => Ok(Self::Mps),
            "cuda" => Ok(Self::Cuda),
            "cpu" => Ok(Self::Cpu),
            other => Err(EmbeddingError::Config(format!(
                "Unknown device '{other}' (expected mps, metal, cuda or cpu)"
            ))),
        }
    }
}

/// The device a model was placed on
#[derive(Debug, Clone)]
pub struct SelectedDevice {
    pub backend: Backend,
    pub device: Device,
}

impl SelectedDevice {
    pub fn cpu() -> Self {
        Self {
            backend: Backend::Cpu,
            device: Device::Cpu,
        }
    }
}

/// Pick the first backend in probe order that opens successfully
///
/// With `use_gpu` off only the CPU is considered. `preferred` moves one
/// backend to the front of the probe order. CPU always succeeds, so this
/// never fails.
pub fn select_device(use_gpu: bool, preferred: Option<Backend>) -> SelectedDevice {
    if !use_gpu {
        tracing::info!("GPU disabled by configuration, using CPU");
        return SelectedDevice::cpu();
    }

    let mut order: Vec<Backend> = BACKEND_POLICY.iter().map(|(backend, _)| *backend).collect();
    if let Some(preferred) = preferred {
        order.retain(|backend| *backend != preferred);
        order.insert(0, preferred);
    }

    for backend in order {
        if !backend.is_available() {
            tracing::debug!(backend = %backend, "Backend not compiled in, skipping");
            continue;
        }
        match backend.open() {
            Ok(device) => {
                match backend {
                    Backend::Mps => tracing::info!("Using Apple Silicon GPU (MPS)"),
                    Backend::Cuda => tracing::info!("Using NVIDIA GPU (CUDA)"),
                    Backend::Cpu => tracing::info!("Using CPU"),
                }
                return SelectedDevice { backend, device };
            }
            Err(e) => {
                tracing::warn!(backend = %backend, error = %e, "Failed to open device, trying next backend");
            }
        }
    }

    SelectedDevice::cpu()
}

/// Which accelerators this process can see
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendAvailability {
    pub cuda_available: bool,
    pub mps_available: bool,
    /// Number of CUDA devices (0 when CUDA is unavailable)
    pub device_count: usize,
}

impl BackendAvailability {
    /// Probe the compiled-in backends
    pub fn probe() -> Self {
        let mps_available = Backend::Mps.is_available() && Backend::Mps.open().is_ok();
        let cuda_available = Backend::Cuda.is_available() && Backend::Cuda.open().is_ok();
        let device_count = if cuda_available {
            (0..MAX_CUDA_DEVICES)
                .take_while(|&ordinal| Device::new_cuda(ordinal).is_ok())
                .count()
        } else {
            0
        };

        Self {
            cuda_available,
            mps_available,
            device_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceilings_follow_backend_policy() {
        assert_eq!(Backend::Mps.max_batch_size(), 64);
        assert_eq!(Backend::Cuda.max_batch_size(), 32);
        assert_eq!(Backend::Cpu.max_batch_size(), 16);
    }

    #[test]
    fn clamp_never_exceeds_ceiling() {
        assert_eq!(Backend::Cpu.clamp_batch_size(128), 16);
        assert_eq!(Backend::Cpu.clamp_batch_size(4), 4);
        assert_eq!(Backend::Cuda.clamp_batch_size(32), 32);
        assert_eq!(Backend::Mps.clamp_batch_size(100), 64);
    }

    #[test]
    fn parses_device_names() {
        assert_eq!("metal".parse::<Backend>().unwrap(), Backend::Mps);
        assert_eq!("MPS".parse::<Backend>().unwrap(), Backend::Mps);
        assert_eq!("cuda".parse::<Backend>().unwrap(), Backend::Cuda);
        assert_eq!(" cpu ".parse::<Backend>().unwrap(), Backend::Cpu);
        assert!("tpu".parse::<Backend>().is_err());
    }

    #[test]
    fn gpu_disabled_selects_cpu() {
        let selected = select_device(false, Some(Backend::Cuda));
        assert_eq!(selected.backend, Backend::Cpu);
        assert!(selected.device.is_cpu());
    }

    #[test]
    fn preferring_cpu_selects_cpu() {
        let selected = select_device(true, Some(Backend::Cpu));
        assert_eq!(selected.backend, Backend::Cpu);
    }

    #[test]
    fn selection_only_returns_usable_backends() {
        let selected = select_device(true, None);
        assert!(selected.backend.is_available());
    }

    #[test]
    fn backends_not_compiled_in_fail_to_open_with_device_error() {
        assert!(Backend::Cpu.open().is_ok());
        for backend in [Backend::Mps, Backend::Cuda] {
            if !backend.is_available() {
                let err = backend.open().unwrap_err();
                assert!(matches!(err, EmbeddingError::Device(_)), "{backend}: {err}");
                assert!(err.to_string().starts_with(&format!("Device error: {backend}")));
            }
        }
    }

    #[test]
    fn device_count_is_zero_without_cuda() {
        let availability = BackendAvailability::probe();
        if !availability.cuda_available {
            assert_eq!(availability.device_count, 0);
        }
    }

    #[test]
    fn backend_serializes_as_device_id() {
        let json = serde_json::to_string(&Backend::Mps).unwrap();
        assert_eq!(json, "\"mps\"");
    }
}
