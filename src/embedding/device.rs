use std::fmt;
use std::str::FromStr;

use candle_core::{DType, Device};
use tracing::{debug, info};

use super::error::EngineError;

/// Device selector accepted in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    #[default]
    Cpu,
    Cuda,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Cpu => "cpu",
            DeviceKind::Cuda => "cuda",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a device string is neither `cpu` nor `cuda`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDevice(pub String);

impl FromStr for DeviceKind {
    type Err = UnknownDevice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(DeviceKind::Cpu),
            "cuda" => Ok(DeviceKind::Cuda),
            _ => Err(UnknownDevice(s.to_string())),
        }
    }
}

/// Device and precision used to construct every engine of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub device: DeviceKind,
    /// Half precision weights; only enabled on CUDA.
    pub use_fp16: bool,
}

impl RuntimeSettings {
    pub fn new(device: DeviceKind) -> Self {
        Self {
            device,
            use_fp16: device == DeviceKind::Cuda,
        }
    }

    /// Weight dtype matching [`use_fp16`](Self::use_fp16).
    pub fn dtype(&self) -> DType {
        if self.use_fp16 { DType::F16 } else { DType::F32 }
    }
}

/// Opens the requested compute device.
///
/// A CUDA request never falls back to CPU: an unavailable GPU is a load error.
pub fn select_device(kind: DeviceKind) -> Result<Device, EngineError> {
    match kind {
        DeviceKind::Cpu => {
            debug!("Using CPU device");
            Ok(Device::Cpu)
        }
        DeviceKind::Cuda => open_cuda(),
    }
}

#[cfg(feature = "cuda")]
fn open_cuda() -> Result<Device, EngineError> {
    let device = Device::new_cuda(0).map_err(|e| EngineError::DeviceUnavailable {
        device: DeviceKind::Cuda.to_string(),
        reason: e.to_string(),
    })?;
    info!("Using CUDA GPU acceleration");
    Ok(device)
}

#[cfg(not(feature = "cuda"))]
fn open_cuda() -> Result<Device, EngineError> {
    info!("CUDA requested but this build has no CUDA backend");
    Err(EngineError::DeviceUnavailable {
        device: DeviceKind::Cuda.to_string(),
        reason: "no CUDA backend compiled (enable the `cuda` feature)".to_string(),
    })
}
