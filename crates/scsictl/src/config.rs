//! Configuration loading helpers for `scsictl`.
//!
//! Leading configuration flags are handed to `ortho_config`; everything from
//! the first other token onwards is parsed as the subcommand.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig as _;
use piscsi_config::Config;

use crate::AppError;

/// CLI flags recognised by the configuration loader.
///
/// Must list every field of [`Config`] plus `--config-path`.
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--host",
    "--port",
    "--timeout-secs",
    "--log-filter",
    "--log-format",
];

pub(crate) trait ConfigLoader {
    /// Loads configuration for the client.
    ///
    /// Configuration flags must appear before the subcommand; later
    /// occurrences are parsed as subcommand arguments.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

#[derive(Debug, Clone, Copy)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

impl OrthoConfigLoader {
    fn process_config_flag(argument: &OsStr) -> FlagAction {
        let argument_text = argument.to_string_lossy();
        if !argument_text.starts_with("--") {
            return FlagAction::Skip;
        }

        let (flag, has_inline_value) = argument_text
            .split_once('=')
            .map_or((argument_text.as_ref(), false), |(flag, _)| (flag, true));

        if CONFIG_CLI_FLAGS.contains(&flag) {
            return FlagAction::Include {
                needs_value: !has_inline_value,
            };
        }

        FlagAction::Skip
    }
}

pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut filtered: Vec<OsString> = vec![program.clone()];
    let mut command_start = 1_usize;
    let mut expecting_value = false;

    for argument in rest {
        if expecting_value {
            filtered.push(argument.clone());
            expecting_value = false;
            command_start += 1;
            continue;
        }

        match OrthoConfigLoader::process_config_flag(argument.as_os_str()) {
            FlagAction::Include { needs_value } => {
                filtered.push(argument.clone());
                command_start += 1;
                expecting_value = needs_value;
            }
            FlagAction::Skip => break,
        }
    }

    ConfigArgumentSplit {
        config_arguments: filtered,
        command_start,
    }
}

/// Program name followed by the tokens after the configuration flags.
pub(crate) fn prepare_cli_arguments(
    args: &[OsString],
    split: &ConfigArgumentSplit,
) -> Vec<OsString> {
    args.first()
        .into_iter()
        .chain(args.iter().skip(split.command_start))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn inline_value_flags_do_not_need_follow_up_value() {
        let result = OrthoConfigLoader::process_config_flag(OsStr::new("--port=6869"));
        assert!(matches!(
            result,
            FlagAction::Include { needs_value: false }
        ));
    }

    #[test]
    fn separate_value_flags_consume_following_argument() {
        let result = OrthoConfigLoader::process_config_flag(OsStr::new("--host"));
        assert!(matches!(result, FlagAction::Include { needs_value: true }));
    }

    #[rstest]
    #[case("server-info")]
    #[case("--unknown")]
    #[case("-h")]
    fn other_tokens_stop_the_split(#[case] token: &str) {
        let result = OrthoConfigLoader::process_config_flag(OsStr::new(token));
        assert!(matches!(result, FlagAction::Skip), "should skip {token}");
    }

    #[test]
    fn split_separates_leading_config_flags() {
        let args = os_args(&[
            "scsictl",
            "--host",
            "pi.local",
            "--timeout-secs=3",
            "attach",
            "--id",
            "1",
        ]);
        let split = split_config_arguments(&args);
        assert_eq!(
            split.config_arguments,
            os_args(&["scsictl", "--host", "pi.local", "--timeout-secs=3"])
        );
        assert_eq!(split.command_start, 4);
        assert_eq!(
            prepare_cli_arguments(&args, &split),
            os_args(&["scsictl", "attach", "--id", "1"])
        );
    }

    #[test]
    fn config_flags_after_the_command_stay_with_the_command() {
        let args = os_args(&["scsictl", "version-info", "--port", "1"]);
        let split = split_config_arguments(&args);
        assert_eq!(split.config_arguments, os_args(&["scsictl"]));
        assert_eq!(
            prepare_cli_arguments(&args, &split),
            os_args(&["scsictl", "version-info", "--port", "1"])
        );
    }

    #[test]
    fn empty_arguments_split_cleanly() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert_eq!(split.command_start, 0);
        assert!(prepare_cli_arguments(&[], &split).is_empty());
    }
}
