//! Service configuration.
//!
//! Values come from `HEPATICA_*` environment variables, and a few can be
//! overridden by command-line flags. Malformed values are collected in
//! `warnings` and replaced by defaults. The decision threshold and probe
//! batch are the exception: they change predictions, so bad values are
//! refused outright.
//!
//! Supported:
//! - `HEPATICA_BIND`, `HEPATICA_PORT` / `--port`, `-p`
//! - `HEPATICA_MODEL_PATH` / `--model`, `HEPATICA_SCALER_PATH` / `--scaler`
//! - `HEPATICA_REQUIRE_MANIFEST`
//! - `HEPATICA_POSITIVE_THRESHOLD`
//! - `HEPATICA_PROBE_SEED` / `--seed`, `HEPATICA_PROBE_BATCH`
//! - `HEPATICA_LOG_MODE` (`auto` | `file` | `stdout`), `HEPATICA_LOG_FILE`

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::adapters::ArtifactOptions;
use crate::application::{
    DegeneracyDiagnostic, ProbeSettings, DEFAULT_PROBE_BATCH, DEFAULT_PROBE_SEED,
};
use crate::domain::{DecisionPolicy, DEFAULT_POSITIVE_THRESHOLD};
use crate::HepaticaError;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MODEL_PATH: &str = "models/model.json";
pub const DEFAULT_SCALER_PATH: &str = "models/scaler.json";
pub const DEFAULT_LOG_FILE: &str = "hepatica.log";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// File when attached to a terminal, stdout otherwise.
    Auto,
    File,
    Stdout,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    pub artifacts: ArtifactOptions,
    pub positive_threshold: f64,
    pub probe_seed: u64,
    pub probe_batch: usize,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    /// Values that were ignored while reading, for logging once logging is up.
    pub warnings: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            scaler_path: PathBuf::from(DEFAULT_SCALER_PATH),
            artifacts: ArtifactOptions::default(),
            positive_threshold: DEFAULT_POSITIVE_THRESHOLD,
            probe_seed: DEFAULT_PROBE_SEED,
            probe_batch: DEFAULT_PROBE_BATCH,
            log_mode: LogMode::Auto,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            warnings: Vec::new(),
        }
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}

fn flag_value<'a>(args: &'a [String], names: &[&str]) -> Option<&'a str> {
    args.iter()
        .position(|a| names.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

impl AppConfig {
    /// Read configuration from the process environment and arguments.
    ///
    /// # Errors
    /// Returns `HepaticaError::Config` for an invalid threshold or batch size.
    pub fn from_env_and_args(args: &[String]) -> Result<Self, HepaticaError> {
        Self::from_sources(args, |key| std::env::var(key).ok())
    }

    /// Read configuration from an explicit environment lookup.
    ///
    /// # Errors
    /// Returns `HepaticaError::Config` for an invalid threshold or batch size.
    pub fn from_sources<E>(args: &[String], env: E) -> Result<Self, HepaticaError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = env("HEPATICA_BIND") {
            match v.trim().parse::<IpAddr>() {
                Ok(ip) => cfg.bind.set_ip(ip),
                Err(_) => cfg.warnings.push(format!("Ignoring invalid HEPATICA_BIND={v:?}")),
            }
        }

        let port = flag_value(args, &["--port", "-p"])
            .map(str::to_string)
            .or_else(|| env("HEPATICA_PORT"));
        if let Some(v) = port {
            match v.trim().parse::<u16>() {
                Ok(p) => cfg.bind.set_port(p),
                Err(_) => cfg.warnings.push(format!("Ignoring invalid port {v:?}")),
            }
        }

        if let Some(p) = flag_value(args, &["--model"])
            .map(str::to_string)
            .or_else(|| env("HEPATICA_MODEL_PATH"))
        {
            cfg.model_path = PathBuf::from(p);
        }
        if let Some(p) = flag_value(args, &["--scaler"])
            .map(str::to_string)
            .or_else(|| env("HEPATICA_SCALER_PATH"))
        {
            cfg.scaler_path = PathBuf::from(p);
        }

        if let Some(v) = env("HEPATICA_REQUIRE_MANIFEST") {
            cfg.artifacts.require_manifest = parse_bool(&v);
        }

        if let Some(v) = env("HEPATICA_POSITIVE_THRESHOLD") {
            cfg.positive_threshold = v.trim().parse::<f64>().map_err(|_| {
                HepaticaError::Config(format!("HEPATICA_POSITIVE_THRESHOLD={v:?} is not a number"))
            })?;
        }

        let seed = flag_value(args, &["--seed"])
            .map(str::to_string)
            .or_else(|| env("HEPATICA_PROBE_SEED"));
        if let Some(v) = seed {
            match v.trim().parse::<u64>() {
                Ok(s) => cfg.probe_seed = s,
                Err(_) => cfg.warnings.push(format!(
                    "Ignoring invalid probe seed {v:?}; using {}",
                    cfg.probe_seed
                )),
            }
        }

        if let Some(v) = env("HEPATICA_PROBE_BATCH") {
            cfg.probe_batch = v.trim().parse::<usize>().map_err(|_| {
                HepaticaError::Config(format!("HEPATICA_PROBE_BATCH={v:?} is not a count"))
            })?;
        }

        if let Some(v) = env("HEPATICA_LOG_MODE") {
            cfg.log_mode = match v.trim() {
                "file" => LogMode::File,
                "stdout" => LogMode::Stdout,
                "auto" => LogMode::Auto,
                other => {
                    cfg.warnings
                        .push(format!("Unknown HEPATICA_LOG_MODE={other:?}; using auto"));
                    LogMode::Auto
                }
            };
        }
        if let Some(v) = env("HEPATICA_LOG_FILE") {
            cfg.log_file = PathBuf::from(v);
        }

        // Surface policy errors at startup rather than on first request.
        cfg.policy()?;
        cfg.probe_settings()?;
        Ok(cfg)
    }

    /// Decision policy described by this configuration.
    ///
    /// # Errors
    /// Returns `HepaticaError::Config` for an out-of-range threshold.
    pub fn policy(&self) -> Result<DecisionPolicy, HepaticaError> {
        DecisionPolicy::with_threshold(self.positive_threshold).map_err(HepaticaError::Config)
    }

    /// Degeneracy probe described by this configuration.
    ///
    /// # Errors
    /// Returns `HepaticaError::Config` for a batch smaller than 2.
    pub fn probe_settings(&self) -> Result<ProbeSettings, HepaticaError> {
        Ok(ProbeSettings {
            diagnostic: DegeneracyDiagnostic::with_batch_size(self.probe_batch)
                .map_err(HepaticaError::Config)?,
            seed: self.probe_seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::from_sources(&[], env_of(&[])).expect("config");
        assert_eq!(cfg.bind.port(), 5000);
        assert_eq!(cfg.positive_threshold, 0.3);
        assert_eq!(cfg.probe_seed, 42);
        assert_eq!(cfg.probe_batch, 10);
        assert_eq!(cfg.log_mode, LogMode::Auto);
        assert!(!cfg.artifacts.require_manifest);
        assert_eq!(cfg.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert!(cfg.warnings.is_empty());
    }

    #[test]
    fn test_env_values() {
        let cfg = AppConfig::from_sources(
            &[],
            env_of(&[
                ("HEPATICA_BIND", "127.0.0.1"),
                ("HEPATICA_PORT", "8080"),
                ("HEPATICA_MODEL_PATH", "/srv/model.json"),
                ("HEPATICA_REQUIRE_MANIFEST", "yes"),
                ("HEPATICA_POSITIVE_THRESHOLD", "0.25"),
                ("HEPATICA_PROBE_SEED", "7"),
                ("HEPATICA_PROBE_BATCH", "32"),
                ("HEPATICA_LOG_MODE", "stdout"),
            ]),
        )
        .expect("config");

        assert_eq!(cfg.bind, "127.0.0.1:8080".parse::<SocketAddr>().expect("addr"));
        assert_eq!(cfg.model_path, PathBuf::from("/srv/model.json"));
        assert!(cfg.artifacts.require_manifest);
        assert_eq!(cfg.positive_threshold, 0.25);
        assert_eq!(cfg.probe_seed, 7);
        assert_eq!(cfg.probe_batch, 32);
        assert_eq!(cfg.log_mode, LogMode::Stdout);
    }

    #[test]
    fn test_flags_override_env() {
        let cfg = AppConfig::from_sources(
            &args(&["hepatica", "-p", "9000", "--seed", "3", "--scaler", "s.json"]),
            env_of(&[("HEPATICA_PORT", "8080"), ("HEPATICA_PROBE_SEED", "7")]),
        )
        .expect("config");

        assert_eq!(cfg.bind.port(), 9000);
        assert_eq!(cfg.probe_seed, 3);
        assert_eq!(cfg.scaler_path, PathBuf::from("s.json"));
    }

    #[test]
    fn test_bad_port_and_seed_fall_back() {
        let cfg = AppConfig::from_sources(
            &[],
            env_of(&[("HEPATICA_PORT", "http"), ("HEPATICA_PROBE_SEED", "-1")]),
        )
        .expect("config");
        assert_eq!(cfg.bind.port(), DEFAULT_PORT);
        assert_eq!(cfg.probe_seed, DEFAULT_PROBE_SEED);
        assert_eq!(cfg.warnings.len(), 2);
    }

    #[test]
    fn test_policy_parameters_are_strict() {
        assert!(matches!(
            AppConfig::from_sources(&[], env_of(&[("HEPATICA_POSITIVE_THRESHOLD", "1.5")])),
            Err(HepaticaError::Config(_))
        ));
        assert!(matches!(
            AppConfig::from_sources(&[], env_of(&[("HEPATICA_POSITIVE_THRESHOLD", "abc")])),
            Err(HepaticaError::Config(_))
        ));
        assert!(matches!(
            AppConfig::from_sources(&[], env_of(&[("HEPATICA_PROBE_BATCH", "1")])),
            Err(HepaticaError::Config(_))
        ));
    }
}
