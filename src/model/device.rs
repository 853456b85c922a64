use std::fmt;
use std::str::FromStr;

use candle_core::Device;
use tracing::{debug, info, warn};

use super::error::ModelError;

/// Which compute device the caller asks for.
///
/// Passed explicitly into every entry point that allocates tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// First compiled GPU backend that initializes, otherwise CPU.
    #[default]
    Auto,
    Cpu,
    Cuda(usize),
    Metal(usize),
}

impl FromStr for DevicePreference {
    type Err = ModelError;

    /// Parses `auto`, `cpu`, `cuda`, `cuda:N`, `metal` or `metal:N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        let (kind, ordinal) = match value.split_once(':') {
            Some((kind, ordinal)) => {
                let ordinal = ordinal
                    .parse::<usize>()
                    .map_err(|_| ModelError::InvalidConfig {
                        reason: format!("invalid device ordinal in '{s}'"),
                    })?;
                (kind.to_string(), ordinal)
            }
            None => (value, 0),
        };

        match kind.as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(ordinal)),
            "metal" => Ok(Self::Metal(ordinal)),
            _ => Err(ModelError::InvalidConfig {
                reason: format!("unknown device '{s}' (expected auto, cpu, cuda[:N] or metal[:N])"),
            }),
        }
    }
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
            Self::Metal(ordinal) => write!(f, "metal:{ordinal}"),
        }
    }
}

/// Resolves a preference to a device.
///
/// An explicit GPU request fails when the backend is unavailable; `Auto` falls
/// back to CPU with a warning.
pub fn select_device(preference: DevicePreference) -> Result<Device, ModelError> {
    match preference {
        DevicePreference::Cpu => {
            debug!("Using CPU device");
            Ok(Device::Cpu)
        }
        DevicePreference::Cuda(ordinal) => {
            let device = Device::new_cuda(ordinal).map_err(|e| ModelError::DeviceUnavailable {
                device: format!("cuda:{ordinal}"),
                reason: e.to_string(),
            })?;
            info!(ordinal, "Using CUDA GPU acceleration");
            Ok(device)
        }
        DevicePreference::Metal(ordinal) => {
            let device =
                Device::new_metal(ordinal).map_err(|e| ModelError::DeviceUnavailable {
                    device: format!("metal:{ordinal}"),
                    reason: e.to_string(),
                })?;
            info!(ordinal, "Using Metal GPU acceleration");
            Ok(device)
        }
        DevicePreference::Auto => Ok(select_auto()),
    }
}

fn select_auto() -> Device {
    let mut failures: Vec<String> = Vec::new();

    if cfg!(feature = "metal") {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Using Metal GPU acceleration");
                return device;
            }
            Err(e) => {
                warn!(error = %e, "Metal device unavailable");
                failures.push(format!("metal failed: {e}"));
            }
        }
    }

    if cfg!(feature = "cuda") {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("Using CUDA GPU acceleration");
                return device;
            }
            Err(e) => {
                warn!(error = %e, "CUDA device unavailable");
                failures.push(format!("cuda failed: {e}"));
            }
        }
    }

    let reason = if !cfg!(any(feature = "metal", feature = "cuda")) {
        "no GPU backend compiled".to_string()
    } else {
        failures.join("; ")
    };

    warn!(reason = %reason, "Falling back to CPU device");
    Device::Cpu
}
