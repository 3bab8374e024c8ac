//! Local physical memory statistics.

use sysinfo::System;

const GIB: u64 = 1024 * 1024 * 1024;

/// Physical memory figures in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub used_bytes: u64,
    pub available_bytes: u64,
}

impl MemoryStats {
    /// Used memory in whole GiB, truncated.
    pub fn used_gib(&self) -> i64 {
        (self.used_bytes / GIB) as i64
    }

    /// Available memory in whole GiB, truncated.
    pub fn available_gib(&self) -> i64 {
        (self.available_bytes / GIB) as i64
    }
}

/// Something that can report current memory usage.
pub trait MemoryProbe {
    fn sample(&mut self) -> MemoryStats;
}

/// Reads memory usage from the OS through `sysinfo`.
pub struct SysinfoMemory {
    system: System,
}

impl SysinfoMemory {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SysinfoMemory {
    fn sample(&mut self) -> MemoryStats {
        self.system.refresh_memory();
        MemoryStats {
            used_bytes: self.system.used_memory(),
            available_bytes: self.system.available_memory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gib_truncates() {
        let stats = MemoryStats {
            used_bytes: 11 * GIB + GIB - 1,
            available_bytes: GIB - 1,
        };
        assert_eq!(stats.used_gib(), 11);
        assert_eq!(stats.available_gib(), 0);
    }

    #[test]
    fn test_sysinfo_sample_is_plausible() {
        let mut probe = SysinfoMemory::new();
        let stats = probe.sample();
        assert!(stats.used_bytes > 0 || stats.available_bytes > 0);
    }
}
