use std::ffi::{OsStr, OsString};
use std::fs;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig as _;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use piscsi_config::{Config, ControlEndpoint, LogFormat, default_log_filter, default_log_format};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct Harness {
    temp_dir: TempDir,
    cli_args: Vec<OsString>,
    env_overrides: Vec<(&'static str, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl Harness {
    fn new() -> Self {
        let guard = ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let temp_dir = TempDir::new().expect("create temp dir");
        let mut harness = Self {
            temp_dir,
            cli_args: vec![OsString::from("scsictl")],
            env_overrides: Vec::new(),
            _guard: guard,
        };
        // Stray variables from the invoking shell would mask the defaults.
        for key in ["PISCSI_HOST", "PISCSI_PORT", "PISCSI_CONFIG_PATH"] {
            harness.remove_env(key);
        }
        harness
    }

    fn write_config(&mut self, contents: &str) {
        let path = self.temp_dir.path().join("piscsi.toml");
        fs::write(&path, contents).expect("write configuration");
        self.cli_args.push(OsString::from("--config-path"));
        self.cli_args.push(path.into_os_string());
    }

    fn set_env(&mut self, key: &'static str, value: &str) {
        let previous = std::env::var_os(key);
        // Environment mutation is `unsafe` on the 2024 edition; the mutex
        // keeps these tests from racing each other.
        unsafe { std::env::set_var(key, OsStr::new(value)) };
        self.env_overrides.push((key, previous));
    }

    fn remove_env(&mut self, key: &'static str) {
        let previous = std::env::var_os(key);
        unsafe { std::env::remove_var(key) };
        self.env_overrides.push((key, previous));
    }

    fn push_cli_arg(&mut self, arg: &str) {
        self.cli_args.push(OsString::from(arg));
    }

    fn load(&self) -> Config {
        match Config::load_from_iter(self.cli_args.clone()) {
            Ok(config) => config,
            Err(error) => panic!("configuration failed to load: {error}"),
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        while let Some((key, value)) = self.env_overrides.pop() {
            match value {
                Some(os_value) => unsafe { std::env::set_var(key, os_value) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

#[rstest]
fn built_in_defaults_apply(harness: Harness) {
    let config = harness.load();
    assert_eq!(
        config.endpoint().expect("endpoint"),
        ControlEndpoint::new("localhost", 6868)
    );
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), default_log_format());
    assert_eq!(config.timeout_secs, 10);
}

#[rstest]
fn file_overrides_defaults(mut harness: Harness) {
    harness.write_config("host = \"raspberrypi\"\nport = 7000\nlog_format = \"json\"\n");
    let config = harness.load();
    assert_eq!(
        config.endpoint().expect("endpoint"),
        ControlEndpoint::new("raspberrypi", 7000)
    );
    assert_eq!(config.log_format(), LogFormat::Json);
}

#[rstest]
fn environment_overrides_file(mut harness: Harness) {
    harness.write_config("port = 7000\n");
    harness.set_env("PISCSI_PORT", "7100");
    assert_eq!(harness.load().port(), 7100);
}

#[rstest]
fn cli_overrides_environment(mut harness: Harness) {
    harness.write_config("port = 7000\n");
    harness.set_env("PISCSI_PORT", "7100");
    harness.push_cli_arg("--port");
    harness.push_cli_arg("7200");
    assert_eq!(harness.load().port(), 7200);
}

#[rstest]
fn malformed_file_is_reported(mut harness: Harness) {
    harness.write_config("port = not_a_number\n");
    let error = Config::load_from_iter(harness.cli_args.clone()).expect_err("loading must fail");
    assert!(!error.to_string().is_empty());
}
