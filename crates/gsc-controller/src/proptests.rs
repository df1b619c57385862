//! Property-based tests for gsc-controller
//!
//! These tests verify correctness properties using proptest.

use proptest::prelude::*;

use gsc_core::AppInfo;

use crate::config::{CliOverrides, Config};
use crate::context::find_app;
use crate::output::{OutputFormat, OutputFormatter};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Anything written by `save` loads back unchanged.
    #[test]
    fn test_config_toml_round_trip(
        device_name in "[a-zA-Z0-9-]{1,24}",
        timeout in 1u64..600,
        pair_timeout in 1u64..3600,
        allow in any::<bool>(),
        format in prop::sample::select(vec!["table", "json", "quiet"]),
    ) {
        let mut config = Config::default();
        config.client.device_name = device_name.clone();
        config.transport.timeout_seconds = timeout;
        config.transport.pair_timeout_seconds = pair_timeout;
        config.server.allow_unsupported = allow;
        config.output.format = format.to_string();

        let text = toml::to_string_pretty(&config).unwrap();
        let loaded: Config = toml::from_str(&text).unwrap();

        prop_assert!(loaded.validate().is_ok());
        prop_assert_eq!(loaded.client.device_name, device_name);
        prop_assert_eq!(loaded.transport.timeout_seconds, timeout);
        prop_assert_eq!(loaded.transport.pair_timeout_seconds, pair_timeout);
        prop_assert_eq!(loaded.server.allow_unsupported, allow);
        prop_assert_eq!(loaded.output.format, format);
    }

    // Overrides win when present and leave the config alone when absent.
    #[test]
    fn test_overrides_precedence(
        timeout in proptest::option::of(1u64..600),
        allow in proptest::option::of(any::<bool>()),
        name in proptest::option::of("[a-z]{1,12}"),
    ) {
        let overrides = CliOverrides {
            timeout_seconds: timeout,
            allow_unsupported: allow,
            device_name: name.clone(),
            ..Default::default()
        };
        let base = Config::default();
        let config = base.clone().with_overrides(&overrides);

        prop_assert_eq!(
            config.transport.timeout_seconds,
            timeout.unwrap_or(base.transport.timeout_seconds)
        );
        prop_assert_eq!(
            config.server.allow_unsupported,
            allow.unwrap_or(base.server.allow_unsupported)
        );
        prop_assert_eq!(
            config.client.device_name,
            name.unwrap_or(base.client.device_name)
        );
    }

    // Any listed app is found by its id.
    #[test]
    fn test_find_app_by_listed_id(
        ids in prop::collection::hash_set(any::<u32>(), 1..20),
        pick in any::<prop::sample::Index>(),
    ) {
        let apps: Vec<AppInfo> = ids
            .iter()
            .map(|id| AppInfo { id: *id, title: format!("app-{id}") })
            .collect();
        let target = &apps[pick.index(apps.len())];

        let found = find_app(&apps, &target.id.to_string());
        prop_assert_eq!(found, Some(target));
    }

    // JSON output always parses and echoes the app count.
    #[test]
    fn test_apps_json_is_valid(
        titles in prop::collection::vec("[ -~]{0,32}", 0..10),
    ) {
        let apps: Vec<AppInfo> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| AppInfo { id: i as u32, title: title.clone() })
            .collect();

        let output = OutputFormatter::new(OutputFormat::Json, false).format_apps(&apps);
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        prop_assert_eq!(json["data"]["count"].as_u64(), Some(apps.len() as u64));
    }
}
