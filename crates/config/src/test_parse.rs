#[cfg(test)]
mod tests {
    use std::{env, fs, path::PathBuf, process, time::Duration};

    use serde_json::json;

    use crate::*;

    #[test]
    fn empty_file_gives_defaults() {
        let s = Settings::parse("").unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.general.clock_tick(), Some(Duration::from_secs(2)));
        assert_eq!(s.streamdeck.device_index, Some(0));
        assert_eq!(s.commands.port, DEFAULT_COMMAND_PORT);
        assert_eq!(s.simulator.devices.len(), 4);
        assert_eq!(s.simulator.devices[0].serial.as_deref(), Some("SIM-ORIGINAL-001"));
    }

    #[test]
    fn full_file_parses() {
        let text = r#"
[general]
clock_tick_interval = 0.5
hidden_clock_tick_interval = 0

[streamdeck]
brightness = 80
serial_number = "SIM-XL"

[simulator]
devices = [{ type = "original" }, { type = "xl", serial = "SIM-XL" }]

[assets]
icons_directory = "icons"

[plugins]
directory = "/opt/deckpilot/plugins"

[commands]
enabled = false
port = 4000

[obs]
obs_host = "studio"
obs_port = 4455
"#;
        let s = Settings::parse(text).unwrap();
        assert_eq!(s.general.clock_tick(), Some(Duration::from_millis(500)));
        assert_eq!(s.general.hidden_clock_tick(), None);
        assert_eq!(s.streamdeck.brightness, 80);
        assert_eq!(s.streamdeck.device_index, None);
        assert_eq!(s.simulator.devices[1].serial.as_deref(), Some("SIM-XL"));
        assert_eq!(s.assets.icons_directory, PathBuf::from("icons"));
        assert!(!s.commands.enabled);
        assert_eq!(s.commands.host, "127.0.0.1");
        assert_eq!(s.extra["obs"], json!({"obs_host": "studio", "obs_port": 4455}));
        assert_eq!(s.plugin_config()["obs"]["obs_port"], json!(4455));
    }

    #[test]
    fn dotted_lookup() {
        let s = Settings::parse("[simulator]\ndevices = [{ type = \"mini\" }]\n[obs]\nport = 1\n")
            .unwrap();
        assert_eq!(s.get("streamdeck.brightness"), Some(json!(30)));
        assert_eq!(s.get("simulator.devices.0.type"), Some(json!("mini")));
        assert_eq!(s.get("obs.port"), Some(json!(1)));
        assert_eq!(s.get("obs.missing"), None);
        assert_eq!(s.get("simulator.devices.x"), None);
        assert!(s.get("").is_some_and(|v| v.is_object()));
    }

    #[test]
    fn streamdeck_section_must_select_a_device() {
        let err = Settings::parse("[streamdeck]\nbrightness = 10\n").unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.pretty().contains("device_index or serial_number"));
    }

    #[test]
    fn brightness_is_bounded() {
        let err = Settings::parse("[streamdeck]\ndevice_index = 0\nbrightness = 101\n").unwrap_err();
        assert!(err.to_string().contains("above 100"), "{err}");
    }

    #[test]
    fn negative_tick_rejected() {
        assert!(Settings::parse("[general]\nclock_tick_interval = -1\n").is_err());
    }

    #[test]
    fn parse_error_is_reported() {
        let err = Settings::parse("[general]\nclock_tick_interval = \"fast\"\n").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }), "{err:?}");
        assert!(err.pretty().starts_with("Config parse error"));
    }

    #[test]
    fn load_from_path_attaches_path() {
        let dir = env::temp_dir().join(format!("deckpilot-config-{}", process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        fs::write(&path, "[streamdeck]\n").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert_eq!(err.path(), Some(path.as_path()));

        fs::write(&path, "[commands]\nport = 1234\n").unwrap();
        assert_eq!(load_from_path(&path).unwrap().commands.port, 1234);

        let missing = load_from_path(&dir.join("nope.toml")).unwrap_err();
        assert!(matches!(missing, Error::Read { .. }));
        assert!(load_or_default(Some(&dir.join("nope.toml"))).is_err());
        let _ = fs::remove_dir_all(&dir);
    }
}
