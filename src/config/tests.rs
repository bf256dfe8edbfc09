use super::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn config_file_persistence() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let config_path = temp_dir.path().join(DEFAULT_CONFIG_FILE);

        let original_config = Config {
            server: ServerConfig {
                name: "team-notes".to_string(),
                instructions: Some("Use search, then fetch.".to_string()),
            },
            corpus: CorpusConfig {
                path: PathBuf::from("notes/corpus.json"),
                cache: true,
            },
        };

        let toml_content = toml::to_string_pretty(&original_config)
            .expect("config should convert to toml string successfully");
        fs::write(&config_path, toml_content).expect("should write to config_path successfully");

        let loaded_config = Config::load(&config_path).expect("should load config successfully");
        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn invalid_toml_handling() {
        let invalid_toml = r#"
            [corpus
            path = "data/corpus.json"
            cache = "sometimes"
        "#;

        let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
        assert!(result.is_err());
    }

    #[test]
    fn wrong_value_type_rejected() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let config_path = temp_dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&config_path, "[corpus]\ncache = \"yes\"\n").expect("should write config");

        let error = Config::load(&config_path).expect_err("cache must be a boolean");
        assert!(format!("{:#}", error).contains("Failed to parse config file"));
    }

    #[test]
    fn empty_file_is_default() {
        let config: Config = toml::from_str("").expect("should parse empty toml");
        assert_eq!(config, Config::default());
        assert_eq!(config.server.name, DEFAULT_SERVER_NAME);
    }

    #[test]
    fn complete_valid_config() {
        let valid_toml = r#"
            [server]
            name = "search-fetch-mcp"
            instructions = "Search the demo corpus"

            [corpus]
            path = "data/corpus.json"
            cache = false
        "#;

        let config: Config = toml::from_str(valid_toml).expect("should parse toml successfully");
        assert_eq!(config.server.name, "search-fetch-mcp");
        assert_eq!(
            config.server.instructions.as_deref(),
            Some("Search the demo corpus")
        );
        assert_eq!(config.corpus.path, PathBuf::from("data/corpus.json"));
        assert!(!config.corpus.cache);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn error_display_messages() {
        let errors = vec![
            ConfigError::InvalidServerName(String::new()),
            ConfigError::EmptyCorpusPath,
        ];

        for error in errors {
            let message = format!("{error}");
            assert!(!message.is_empty());
            assert!(message.len() > 10);
        }
    }
}
