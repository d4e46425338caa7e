//! Resource envelope for sandboxed execution

use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory tiers a cell may request, ordered by size
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MemoryTier {
    #[serde(rename = "256m")]
    Mb256,
    #[serde(rename = "512m")]
    Mb512,
    #[serde(rename = "1g")]
    Gb1,
    #[serde(rename = "2g")]
    Gb2,
}

impl MemoryTier {
    pub const ALL: [MemoryTier; 4] = [
        MemoryTier::Mb256,
        MemoryTier::Mb512,
        MemoryTier::Gb1,
        MemoryTier::Gb2,
    ];

    /// Parse a tier name, case-insensitive and trimmed
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_docker_arg() == value)
    }

    /// Value passed to `docker run --memory`
    pub fn as_docker_arg(self) -> &'static str {
        match self {
            MemoryTier::Mb256 => "256m",
            MemoryTier::Mb512 => "512m",
            MemoryTier::Gb1 => "1g",
            MemoryTier::Gb2 => "2g",
        }
    }
}

impl fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_docker_arg())
    }
}

/// CPU shares a cell may request; compared by core count, not by position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpuShare {
    #[serde(rename = "0.25")]
    Quarter,
    #[serde(rename = "0.5")]
    Half,
    #[serde(rename = "1.0")]
    One,
    #[serde(rename = "2.0")]
    Two,
}

impl CpuShare {
    pub const ALL: [CpuShare; 4] = [CpuShare::Quarter, CpuShare::Half, CpuShare::One, CpuShare::Two];

    /// Parse a share, trimmed; only the exact listed spellings are accepted
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|share| share.as_docker_arg() == value)
    }

    /// Value passed to `docker run --cpus`
    pub fn as_docker_arg(self) -> &'static str {
        match self {
            CpuShare::Quarter => "0.25",
            CpuShare::Half => "0.5",
            CpuShare::One => "1.0",
            CpuShare::Two => "2.0",
        }
    }

    pub fn cores(self) -> f64 {
        match self {
            CpuShare::Quarter => 0.25,
            CpuShare::Half => 0.5,
            CpuShare::One => 1.0,
            CpuShare::Two => 2.0,
        }
    }
}

impl fmt::Display for CpuShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_docker_arg())
    }
}

/// Resolved memory/CPU pair applied to one sandbox run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEnvelope {
    pub memory: MemoryTier,
    pub cpu: CpuShare,
}

impl Default for ResourceEnvelope {
    fn default() -> Self {
        Self {
            memory: MemoryTier::Mb512,
            cpu: CpuShare::Half,
        }
    }
}

impl ResourceEnvelope {
    /// Largest envelope an operator may allow by default
    pub fn ceiling() -> Self {
        Self {
            memory: MemoryTier::Gb2,
            cpu: CpuShare::Two,
        }
    }

    /// Clamp each dimension to `ceiling`: memory by tier order, CPU by core count
    pub fn capped_to(self, ceiling: ResourceEnvelope) -> Self {
        let memory = self.memory.min(ceiling.memory);
        let cpu = if self.cpu.cores() > ceiling.cpu.cores() {
            ceiling.cpu
        } else {
            self.cpu
        };
        Self { memory, cpu }
    }
}
