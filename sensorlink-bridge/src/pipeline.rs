//! Metric extraction and wire formatting.
//!
//! Readings are looked up by exact sensor name, first match wins. GPU
//! metrics can additionally be restricted to one GPU instance by class
//! prefix so that readings from several installed GPUs are never mixed.

use crate::config::{GpuStrategy, MetricsConfig, Profile};
use crate::memory::MemoryStats;
use sensorlink_common::SensorReading;
use std::fmt;

/// Value of the first reading named `name`, or 0.0 when absent.
pub fn value_of(readings: &[SensorReading], name: &str) -> f64 {
    readings
        .iter()
        .find(|r| r.name == name)
        .map(|r| r.value)
        .unwrap_or(0.0)
}

/// Value of the first reading named `name` whose class starts with `label`.
pub fn value_of_in_class(readings: &[SensorReading], name: &str, label: &str) -> f64 {
    readings
        .iter()
        .find(|r| r.class.starts_with(label) && r.name == name)
        .map(|r| r.value)
        .unwrap_or(0.0)
}

/// Choose which GPU instance label to read from.
///
/// Instance 1 wins over instance 0; `None` when neither label shows up in
/// any reading's class.
pub fn select_gpu<'a>(
    readings: &[SensorReading],
    primary: &'a str,
    secondary: &'a str,
) -> Option<&'a str> {
    let present = |label: &str| readings.iter().any(|r| r.class.contains(label));

    if present(secondary) {
        Some(secondary)
    } else if present(primary) {
        Some(primary)
    } else {
        None
    }
}

/// Resolved sensor names and GPU handling for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRules {
    pub cpu_usage: String,
    pub cpu_temp: String,
    pub gpu_usage: String,
    pub gpu_temp: String,
    pub tx: String,
    pub rx: String,
    pub gpu_strategy: GpuStrategy,
    pub gpu_primary: String,
    pub gpu_secondary: String,
}

impl MetricRules {
    /// Built-in names for a profile.
    pub fn for_profile(profile: Profile) -> Self {
        let (cpu_temp, gpu_strategy) = match profile {
            Profile::Full => ("CPU Package", GpuStrategy::PreferSecondary),
            Profile::Oled => ("P-core 0", GpuStrategy::FirstMatch),
        };

        Self {
            cpu_usage: "Total CPU Usage".to_string(),
            cpu_temp: cpu_temp.to_string(),
            gpu_usage: "GPU Utilization".to_string(),
            gpu_temp: "GPU Temperature".to_string(),
            tx: "Current UP rate".to_string(),
            rx: "Current DL rate".to_string(),
            gpu_strategy,
            gpu_primary: "GPU [#0]:".to_string(),
            gpu_secondary: "GPU [#1]:".to_string(),
        }
    }

    /// Profile defaults with the configured overrides applied.
    pub fn from_config(config: &MetricsConfig) -> Self {
        let mut rules = Self::for_profile(config.profile);
        let names = &config.sensors;

        let overrides = [
            (&mut rules.cpu_usage, &names.cpu_usage),
            (&mut rules.cpu_temp, &names.cpu_temp),
            (&mut rules.gpu_usage, &names.gpu_usage),
            (&mut rules.gpu_temp, &names.gpu_temp),
            (&mut rules.tx, &names.tx),
            (&mut rules.rx, &names.rx),
        ];
        for (slot, name) in overrides {
            if let Some(name) = name {
                *slot = name.clone();
            }
        }

        if let Some(strategy) = config.gpu_strategy {
            rules.gpu_strategy = strategy;
        }
        if let [primary, secondary] = config.gpu_labels.as_slice() {
            rules.gpu_primary = primary.clone();
            rules.gpu_secondary = secondary.clone();
        }

        rules
    }

    /// Extract a snapshot from one cycle's readings.
    ///
    /// Never fails: every metric without a usable reading is 0.
    pub fn snapshot(&self, readings: &[SensorReading], memory: MemoryStats) -> MetricSnapshot {
        let (gpu_usage, gpu_temp) = match self.gpu_strategy {
            GpuStrategy::FirstMatch => (
                value_of(readings, &self.gpu_usage),
                value_of(readings, &self.gpu_temp),
            ),
            GpuStrategy::PreferSecondary => {
                match select_gpu(readings, &self.gpu_primary, &self.gpu_secondary) {
                    Some(label) => (
                        value_of_in_class(readings, &self.gpu_usage, label),
                        value_of_in_class(readings, &self.gpu_temp, label),
                    ),
                    None => (0.0, 0.0),
                }
            }
        };

        MetricSnapshot {
            cpu_usage_pct: truncate(value_of(readings, &self.cpu_usage)),
            cpu_temp_c: truncate(value_of(readings, &self.cpu_temp)),
            gpu_usage_pct: truncate(gpu_usage),
            gpu_temp_c: truncate(gpu_temp),
            ram_used_gb: memory.used_gib(),
            ram_avail_gb: memory.available_gib(),
            tx_kbps: truncate(value_of(readings, &self.tx)),
            rx_kbps: truncate(value_of(readings, &self.rx)),
        }
    }
}

impl Default for MetricRules {
    fn default() -> Self {
        Self::for_profile(Profile::default())
    }
}

/// Truncate toward zero; out-of-range values saturate.
fn truncate(value: f64) -> i64 {
    value as i64
}

/// The fixed set of values shown on the peripheral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub cpu_usage_pct: i64,
    pub cpu_temp_c: i64,
    pub gpu_usage_pct: i64,
    pub gpu_temp_c: i64,
    pub ram_used_gb: i64,
    pub ram_avail_gb: i64,
    pub tx_kbps: i64,
    pub rx_kbps: i64,
}

impl MetricSnapshot {
    /// Render the four-line block sent to the peripheral (no trailing newline).
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MetricSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "CPU:{:>3}%  TEMP:{} C",
            self.cpu_usage_pct, self.cpu_temp_c
        )?;
        writeln!(
            f,
            "GPU:{:>3}%  TEMP:{} C",
            self.gpu_usage_pct, self.gpu_temp_c
        )?;
        writeln!(
            f,
            "RAM:{} GB  AVL:{} GB",
            self.ram_used_gb, self.ram_avail_gb
        )?;
        write!(f, "TX:{}KB/s  RX:{}KB/s", self.tx_kbps, self.rx_kbps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpu(class: &str, name: &str, value: f64) -> SensorReading {
        SensorReading::new(name, class, value)
    }

    #[test]
    fn test_value_of_missing_is_zero() {
        assert_eq!(value_of(&[], "Total CPU Usage"), 0.0);
        let readings = vec![SensorReading::new("CPU Package", "CPU", 55.0)];
        assert_eq!(value_of(&readings, "Total CPU Usage"), 0.0);
    }

    #[test]
    fn test_value_of_exact_name_first_match() {
        let readings = vec![
            SensorReading::new("Total CPU Usage (avg)", "CPU", 99.0),
            SensorReading::new("Total CPU Usage", "CPU", 12.5),
            SensorReading::new("Total CPU Usage", "CPU", 80.0),
        ];
        assert_eq!(value_of(&readings, "Total CPU Usage"), 12.5);
    }

    #[test]
    fn test_select_gpu_prefers_instance_one() {
        let readings = vec![
            gpu("GPU [#0]: Intel UHD 770", "GPU Temperature", 40.0),
            gpu("GPU [#1]: NVIDIA RTX 4070", "GPU Temperature", 65.0),
        ];
        assert_eq!(
            select_gpu(&readings, "GPU [#0]:", "GPU [#1]:"),
            Some("GPU [#1]:")
        );
    }

    #[test]
    fn test_select_gpu_falls_back_to_instance_zero() {
        let readings = vec![gpu("GPU [#0]: RTX 3070", "GPU Temperature", 50.0)];
        assert_eq!(
            select_gpu(&readings, "GPU [#0]:", "GPU [#1]:"),
            Some("GPU [#0]:")
        );
    }

    #[test]
    fn test_select_gpu_none() {
        let readings = vec![SensorReading::new("Total CPU Usage", "CPU [#0]: Ryzen", 5.0)];
        assert_eq!(select_gpu(&readings, "GPU [#0]:", "GPU [#1]:"), None);
    }

    #[test]
    fn test_snapshot_uses_secondary_gpu_exclusively() {
        let readings = vec![
            gpu("GPU [#0]: Intel UHD 770", "GPU Utilization", 3.0),
            gpu("GPU [#0]: Intel UHD 770", "GPU Temperature", 40.0),
            gpu("GPU [#1]: NVIDIA RTX 4070", "GPU Utilization", 87.9),
            gpu("GPU [#1]: NVIDIA RTX 4070", "GPU Temperature", 66.6),
        ];

        let snapshot = MetricRules::default().snapshot(&readings, MemoryStats::default());

        assert_eq!(snapshot.gpu_usage_pct, 87);
        assert_eq!(snapshot.gpu_temp_c, 66);
    }

    #[test]
    fn test_snapshot_primary_gpu_only() {
        let readings = vec![
            gpu("GPU [#0]: RTX 3070", "GPU Utilization", 45.2),
            gpu("GPU [#0]: RTX 3070", "GPU Temperature", 58.9),
        ];

        let snapshot = MetricRules::default().snapshot(&readings, MemoryStats::default());

        assert_eq!(snapshot.gpu_usage_pct, 45);
        assert_eq!(snapshot.gpu_temp_c, 58);
    }

    #[test]
    fn test_snapshot_without_gpu_label_is_zero() {
        // A matching name alone is not enough when disambiguating.
        let readings = vec![gpu("Display Adapter", "GPU Temperature", 70.0)];

        let snapshot = MetricRules::default().snapshot(&readings, MemoryStats::default());

        assert_eq!(snapshot.gpu_temp_c, 0);
        assert_eq!(snapshot.gpu_usage_pct, 0);
    }

    #[test]
    fn test_oled_profile_ignores_class() {
        let readings = vec![
            SensorReading::new("P-core 0", "CPU [#0]: Intel i7-12700K", 41.0),
            gpu("Display Adapter", "GPU Temperature", 70.0),
        ];

        let rules = MetricRules::for_profile(Profile::Oled);
        let snapshot = rules.snapshot(&readings, MemoryStats::default());

        assert_eq!(snapshot.cpu_temp_c, 41);
        assert_eq!(snapshot.gpu_temp_c, 70);
    }

    #[test]
    fn test_rules_from_config_overrides() {
        let mut config = MetricsConfig::default();
        config.sensors.cpu_temp = Some("CPU (Tctl/Tdie)".to_string());
        config.gpu_strategy = Some(GpuStrategy::FirstMatch);
        config.gpu_labels = vec!["GPU [#2]:".to_string(), "GPU [#3]:".to_string()];

        let rules = MetricRules::from_config(&config);

        assert_eq!(rules.cpu_temp, "CPU (Tctl/Tdie)");
        assert_eq!(rules.cpu_usage, "Total CPU Usage");
        assert_eq!(rules.gpu_strategy, GpuStrategy::FirstMatch);
        assert_eq!(rules.gpu_primary, "GPU [#2]:");
        assert_eq!(rules.gpu_secondary, "GPU [#3]:");
    }

    #[test]
    fn test_snapshot_truncates() {
        let readings = vec![
            SensorReading::new("Total CPU Usage", "CPU", 99.99),
            SensorReading::new("Current UP rate", "Network", 1.9),
            SensorReading::new("Current DL rate", "Network", -0.5),
        ];

        let snapshot = MetricRules::default().snapshot(&readings, MemoryStats::default());

        assert_eq!(snapshot.cpu_usage_pct, 99);
        assert_eq!(snapshot.tx_kbps, 1);
        assert_eq!(snapshot.rx_kbps, 0);
    }

    #[test]
    fn test_render_cpu_only_scenario() {
        let readings = vec![SensorReading::new("Total CPU Usage", "", 42.7)];

        let snapshot = MetricRules::default().snapshot(&readings, MemoryStats::default());
        let block = snapshot.render();

        assert_eq!(block.lines().next(), Some("CPU: 42%  TEMP:0 C"));
    }

    #[test]
    fn test_render_layout() {
        let snapshot = MetricSnapshot {
            cpu_usage_pct: 7,
            cpu_temp_c: 48,
            gpu_usage_pct: 100,
            gpu_temp_c: 61,
            ram_used_gb: 11,
            ram_avail_gb: 20,
            tx_kbps: 12,
            rx_kbps: 1024,
        };

        assert_eq!(
            snapshot.render(),
            "CPU:  7%  TEMP:48 C\n\
             GPU:100%  TEMP:61 C\n\
             RAM:11 GB  AVL:20 GB\n\
             TX:12KB/s  RX:1024KB/s"
        );
    }

    #[test]
    fn test_render_is_stable() {
        let snapshot = MetricSnapshot {
            cpu_usage_pct: 42,
            ..Default::default()
        };
        assert_eq!(snapshot.render().as_bytes(), snapshot.render().as_bytes());
    }
}
