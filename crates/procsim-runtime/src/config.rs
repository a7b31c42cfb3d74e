//! Machine configuration: totals are fixed once at startup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::kernel::error::KernelError;
use crate::kernel::ledger::ResourceLedger;
use crate::kernel::runtime::{CommandLauncher, Dispatcher, Launcher, SchedulerConfig};

pub const DEFAULT_RAM_MB: u64 = 2048;
pub const DEFAULT_DISK_MB: u64 = 102_400;
pub const DEFAULT_CORES: u32 = 4;

pub const ENV_RAM_MB: &str = "PROCSIM_RAM_MB";
pub const ENV_DISK_MB: &str = "PROCSIM_DISK_MB";
pub const ENV_CORES: &str = "PROCSIM_CORES";
pub const ENV_PROGRAM_DIR: &str = "PROCSIM_PROGRAM_DIR";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub total_ram_mb: u64,
    pub total_disk_mb: u64,
    pub total_cores: u32,
    /// Directory holding the task executables. `./build` when unset.
    pub program_dir: Option<PathBuf>,
    pub scheduler: SchedulerConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            total_ram_mb: DEFAULT_RAM_MB,
            total_disk_mb: DEFAULT_DISK_MB,
            total_cores: DEFAULT_CORES,
            program_dir: None,
            scheduler: SchedulerConfig::default(),
        }
    }
}

fn parse_field<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, KernelError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| KernelError::InvalidConfig(format!("{key}={raw:?}: {e}")))
}

impl SystemConfig {
    /// Command-line form: RAM in MB, disk in GB (stored as MB), core count.
    pub fn from_args(ram_mb: u64, disk_gb: u64, cores: u32) -> Result<Self, KernelError> {
        let disk_mb = disk_gb
            .checked_mul(1024)
            .ok_or_else(|| KernelError::InvalidConfig(format!("disk {disk_gb} GB overflows")))?;
        let config = Self {
            total_ram_mb: ram_mb,
            total_disk_mb: disk_mb,
            total_cores: cores,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse `[ram_mb, disk_gb, cores]` positional arguments.
    pub fn from_arg_strings(args: &[String]) -> Result<Self, KernelError> {
        match args {
            [ram, disk, cores] => Self::from_args(
                parse_field("ram", ram)?,
                parse_field("disk", disk)?,
                parse_field("cores", cores)?,
            ),
            _ => Err(KernelError::InvalidConfig(format!(
                "expected <ram_mb> <disk_gb> <cores>, got {} arguments",
                args.len()
            ))),
        }
    }

    /// Defaults overridden by `PROCSIM_*` environment variables.
    pub fn from_env() -> Result<Self, KernelError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, KernelError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_RAM_MB) {
            config.total_ram_mb = parse_field(ENV_RAM_MB, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DISK_MB) {
            config.total_disk_mb = parse_field(ENV_DISK_MB, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CORES) {
            config.total_cores = parse_field(ENV_CORES, &raw)?;
        }
        if let Some(dir) = lookup(ENV_PROGRAM_DIR) {
            config.program_dir = Some(PathBuf::from(dir));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, KernelError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| KernelError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), KernelError> {
        if self.total_ram_mb == 0 {
            return Err(KernelError::InvalidConfig("total RAM must be positive".into()));
        }
        if self.total_disk_mb == 0 {
            return Err(KernelError::InvalidConfig("total disk must be positive".into()));
        }
        if self.total_cores == 0 {
            return Err(KernelError::InvalidConfig("core count must be positive".into()));
        }
        Ok(())
    }

    pub fn ledger(&self) -> ResourceLedger {
        ResourceLedger::new(self.total_ram_mb, self.total_disk_mb, self.total_cores)
    }

    /// The process-spawning launcher for [program_dir](Self::program_dir).
    pub fn command_launcher(&self) -> Result<CommandLauncher, KernelError> {
        match &self.program_dir {
            Some(dir) => Ok(CommandLauncher::new(dir)),
            None => CommandLauncher::from_current_dir(),
        }
    }

    /// A dispatcher over this machine's ledger. The scheduler is not started.
    pub fn build_dispatcher(&self, launcher: Box<dyn Launcher>) -> Result<Dispatcher, KernelError> {
        self.validate()?;
        Ok(Dispatcher::new(self.ledger(), self.scheduler.clone(), launcher))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::kernel::stubs::AlwaysLaunch;

    #[test]
    fn defaults_match_documented_machine() {
        let config = SystemConfig::default();
        assert_eq!(config.total_ram_mb, 2048);
        assert_eq!(config.total_disk_mb, 102_400);
        assert_eq!(config.total_cores, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn args_take_disk_in_gigabytes() {
        let config = SystemConfig::from_args(4096, 50, 8).unwrap();
        assert_eq!(config.total_disk_mb, 50 * 1024);
        assert_eq!(config.total_cores, 8);

        let args: Vec<String> = ["512", "2", "2"].iter().map(|s| s.to_string()).collect();
        let config = SystemConfig::from_arg_strings(&args).unwrap();
        assert_eq!(config.total_ram_mb, 512);
        assert_eq!(config.total_disk_mb, 2048);
    }

    #[test]
    fn bad_args_are_rejected() {
        let args: Vec<String> = ["lots", "2", "2"].iter().map(|s| s.to_string()).collect();
        assert!(matches!(
            SystemConfig::from_arg_strings(&args),
            Err(KernelError::InvalidConfig(_))
        ));
        assert!(SystemConfig::from_arg_strings(&[]).is_err());
        assert!(SystemConfig::from_args(0, 1, 1).is_err());
        assert!(SystemConfig::from_args(1, u64::MAX, 1).is_err());
    }

    #[test]
    fn env_overrides_defaults() {
        let vars: HashMap<&str, &str> = [(ENV_RAM_MB, "100"), (ENV_PROGRAM_DIR, "/tmp/tasks")]
            .into_iter()
            .collect();
        let config =
            SystemConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.total_ram_mb, 100);
        assert_eq!(config.total_disk_mb, DEFAULT_DISK_MB);
        assert_eq!(config.program_dir, Some(PathBuf::from("/tmp/tasks")));

        let bad = SystemConfig::from_lookup(|k| (k == ENV_CORES).then(|| "-1".to_string()));
        assert!(bad.is_err());
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config =
            SystemConfig::from_json(r#"{"total_ram_mb": 100, "scheduler": {"drain_pause_ms": 1}}"#)
                .unwrap();
        assert_eq!(config.total_ram_mb, 100);
        assert_eq!(config.total_cores, DEFAULT_CORES);
        assert_eq!(config.scheduler.drain_pause_ms, 1);
        assert!(SystemConfig::from_json(r#"{"total_disk_mb": 0}"#).is_err());
    }

    #[test]
    fn built_dispatcher_uses_configured_totals() {
        let config = SystemConfig::from_args(100, 1, 2).unwrap();
        let d = config.build_dispatcher(Box::new(AlwaysLaunch)).unwrap();
        let c = d.ledger().counters();
        assert_eq!(c.total_ram, 100);
        assert_eq!(c.total_disk, 1024);
        assert_eq!(c.total_cores, 2);
        assert!(!d.is_running());
    }
}
