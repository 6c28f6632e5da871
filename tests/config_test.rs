use std::env;
use std::fs;
use tempfile::tempdir;

#[cfg(test)]
mod config_tests {
    use super::*;
    use usage_ledger::config::{Config, FileLabel};
    use usage_ledger::parser::SourceFormat;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        // Logging defaults
        assert_eq!(config.logging.level, "WARN");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.logging.output, "console");

        // Scan defaults
        assert_eq!(config.scan.max_depth, 6);
        assert!(config.scan.skip_dirs.contains(&".git".to_string()));
        assert!(config.scan.skip_dirs.contains(&"node_modules".to_string()));
        assert_eq!(config.scan.utc_offset, None);

        // Paths
        assert!(config.paths.ledger_file.ends_with("usage-ledger/sessions.json"));
        assert!(config.paths.dashboard_data.ends_with("dashboard/data.js"));

        assert_eq!(config.dashboard.primary_sources, vec!["claude-code".to_string()]);
        assert!(config.pricing.is_empty());
    }

    #[test]
    fn test_env_variable_override() {
        env::set_var("USAGE_LEDGER_MAX_DEPTH", "12");
        env::set_var("USAGE_LEDGER_UTC_OFFSET", "+05:30");
        env::set_var("USAGE_LEDGER_FILE", "/tmp/elsewhere/sessions.json");

        let mut config = Config::default();
        config
            .apply_env_overrides()
            .expect("Failed to apply env overrides");

        assert_eq!(config.scan.max_depth, 12);
        assert_eq!(config.scan.utc_offset.as_deref(), Some("+05:30"));
        assert_eq!(
            config.paths.ledger_file,
            std::path::PathBuf::from("/tmp/elsewhere/sessions.json")
        );

        env::remove_var("USAGE_LEDGER_MAX_DEPTH");
        env::remove_var("USAGE_LEDGER_UTC_OFFSET");
        env::remove_var("USAGE_LEDGER_FILE");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.scan.max_depth = 33;
        assert!(config.validate().is_err());

        config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.sources[0].dirs.clear();
        assert!(config.validate().is_err());

        config = Config::default();
        config.sources[0].name = " ".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.version = 99;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_loading() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test-config.toml");

        let test_config = r#"
version = 1

[logging]
level = "DEBUG"
format = "json"

[paths]
ledger_file = "/custom/sessions.json"

[scan]
max_depth = 4
utc_offset = "+09:00"

[dashboard]
primary_sources = ["claude-code", "claude-vm"]

[[sources]]
name = "claude-vm"
format = "token-count"
dirs = ["~/.claude/vms"]

[[sources]]
name = "roo"
format = "history-document"
dirs = ["/data/roo/tasks"]
patterns = ["ui_messages.json"]
file_label = "parent-dir"

[[pricing]]
pattern = "my-model"
input = 1.0
output = 2.0
cacheWrite = 0.0
cacheRead = 0.1
        "#;

        fs::write(&config_path, test_config).expect("Failed to write test config");

        let config = Config::load_from_file(&config_path).expect("Failed to load config");
        config.validate().expect("Loaded config should validate");

        assert_eq!(config.logging.level, "DEBUG");
        assert_eq!(config.logging.format, "json");
        // Unset fields keep their defaults
        assert_eq!(config.logging.output, "console");
        assert_eq!(config.scan.max_depth, 4);
        assert!(config.scan.skip_dirs.contains(&".git".to_string()));

        // Supplied sources replace the built-in table
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].patterns, vec!["*.jsonl".to_string()]);
        assert_eq!(config.sources[0].file_label, FileLabel::Basename);
        assert_eq!(config.sources[1].format, SourceFormat::HistoryDocument);
        assert_eq!(config.sources[1].file_label, FileLabel::ParentDir);

        let pricing = config.pricing_resolver();
        assert_eq!(pricing.resolve("My_Model-v2").output, 2.0);
        assert_eq!(pricing.resolve("claude-sonnet-4-5").output, 15.0);

        let clock = config.clock().unwrap();
        assert_eq!(clock.to_local_time(1_736_503_200_000).as_deref(), Some("19:00"));
    }

    #[test]
    fn test_file_without_sources_keeps_builtin_table() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("minimal.toml");
        fs::write(&config_path, "[scan]\nmax_depth = 3\n").unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.scan.max_depth, 3);
        assert_eq!(config.sources.len(), Config::default().sources.len());
    }

    #[test]
    fn test_explicit_missing_config_fails() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        assert!(Config::load(Some(&temp_dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();

        let toml_string = toml::to_string_pretty(&config).expect("Failed to serialize to TOML");
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("[scan]"));
        assert!(toml_string.contains("[[sources]]"));
        assert!(toml_string.contains("history-document"));

        let deserialized: Config =
            toml::from_str(&toml_string).expect("Failed to deserialize TOML");
        assert_eq!(config.logging.level, deserialized.logging.level);
        assert_eq!(config.scan.max_depth, deserialized.scan.max_depth);
        assert_eq!(config.sources, deserialized.sources);
    }
}
