#[cfg(test)]
mod tests {
    use std::fs;

    use crate::config::{AppEnvironment, LogFormat, LogLevel, SettingsError};
    use crate::logging;
    use crate::tests::{isolated_loader, test_settings};
    use tempfile::TempDir;

    const DB: (&str, &str) = ("DATABASE_URL", "sqlite://data/app.db");

    #[test]
    fn test_defaults() {
        let settings = isolated_loader(&[DB]).load().unwrap();

        assert!(!settings.debug);
        assert_eq!(settings.environment, AppEnvironment::Local);
        assert_eq!(settings.log_format, LogFormat::Plaintext);
        assert_eq!(settings.log_level, LogLevel::Info);
        assert_eq!(settings.server_log_level, LogLevel::Info);
        assert_eq!(settings.request_log_level, LogLevel::Info);
        assert_eq!(settings.error_log_level, LogLevel::Error);
        assert_eq!(settings.database_url, "sqlite://data/app.db");
        assert_eq!(settings.database_max_connections, 16);
        assert_eq!(settings.frontend_host, "http://localhost:5173");
        assert!(settings.backend_cors_origins.is_empty());
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 8000);
        // Without a metadata file the binary's own package metadata is used.
        assert_eq!(settings.app_name, env!("CARGO_PKG_NAME"));
        assert_eq!(settings.app_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_missing_database_url_fails() {
        let err = isolated_loader(&[]).load().unwrap_err();
        assert!(matches!(err, SettingsError::Load(_)));
        assert!(err.to_string().contains("database_url"), "unexpected error: {}", err);
    }

    #[test]
    fn test_blank_database_url_fails() {
        let err = isolated_loader(&[("DATABASE_URL", "  ")]).load().unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "database_url", .. }));
    }

    #[test]
    fn test_env_values_are_coerced() {
        let settings = isolated_loader(&[
            DB,
            ("DEBUG", "true"),
            ("ENVIRONMENT", "Production"),
            ("LOG_FORMAT", "JSON"),
            ("LOG_LEVEL", "WARNING"),
            ("REQUEST_LOG_LEVEL", "debug"),
            ("ERROR_LOG_LEVEL", "critical"),
            ("PORT", "9000"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
        ])
        .load()
        .unwrap();

        assert!(settings.debug);
        assert_eq!(settings.environment, AppEnvironment::Production);
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.log_level, LogLevel::Warning);
        assert_eq!(settings.request_log_level, LogLevel::Debug);
        assert_eq!(settings.error_log_level, LogLevel::Critical);
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.database_max_connections, 4);
    }

    #[test]
    fn test_uvicorn_log_level_alias() {
        let settings = isolated_loader(&[DB, ("UVICORN_LOG_LEVEL", "error")]).load().unwrap();
        assert_eq!(settings.server_log_level, LogLevel::Error);

        let settings = isolated_loader(&[DB, ("SERVER_LOG_LEVEL", "trace")]).load().unwrap();
        assert_eq!(settings.server_log_level, LogLevel::Trace);
    }

    #[test]
    fn test_server_log_level_wins_over_uvicorn_log_level() {
        let settings = isolated_loader(&[DB, ("SERVER_LOG_LEVEL", "debug"), ("UVICORN_LOG_LEVEL", "error")])
            .load()
            .unwrap();
        assert_eq!(settings.server_log_level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_uvicorn_log_level_fails() {
        let result = isolated_loader(&[DB, ("UVICORN_LOG_LEVEL", "loud")]).load();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_bool_fails() {
        let result = isolated_loader(&[DB, ("DEBUG", "maybe")]).load();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_log_level_fails() {
        let err = isolated_loader(&[DB, ("LOG_LEVEL", "loud")]).load().unwrap_err();
        assert!(err.to_string().contains("loud"), "unexpected error: {}", err);
    }

    #[test]
    fn test_invalid_port() {
        let result = isolated_loader(&[DB, ("PORT", "abc")]).load();
        assert!(result.is_err());

        let err = isolated_loader(&[DB, ("PORT", "0")]).load().unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "port", .. }));
    }

    #[test]
    fn test_invalid_max_connections() {
        let err = isolated_loader(&[DB, ("DATABASE_MAX_CONNECTIONS", "0")]).load().unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "database_max_connections", .. }));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let settings =
            isolated_loader(&[DB, ("SOME_OTHER_TOOL", "value"), ("PATH", "/usr/bin")]).load().unwrap();
        assert_eq!(settings.port, 8000);
    }

    #[test]
    fn test_cors_origins_comma_separated() {
        let settings = isolated_loader(&[
            DB,
            ("BACKEND_CORS_ORIGINS", "http://a.example/, http://b.example"),
            ("FRONTEND_HOST", "https://app.example/"),
        ])
        .load()
        .unwrap();

        assert_eq!(settings.backend_cors_origins, vec!["http://a.example/", "http://b.example"]);
        assert_eq!(
            settings.all_cors_origins(),
            vec!["http://a.example", "http://b.example", "https://app.example"]
        );
    }

    #[test]
    fn test_cors_origins_json_list() {
        let settings =
            isolated_loader(&[DB, ("BACKEND_CORS_ORIGINS", r#"["http://a.example","http://b.example/"]"#)])
                .load()
                .unwrap();
        assert_eq!(settings.backend_cors_origins, vec!["http://a.example", "http://b.example/"]);
        assert_eq!(
            settings.all_cors_origins(),
            vec!["http://a.example", "http://b.example", "http://localhost:5173"]
        );
    }

    #[test]
    fn test_cors_origins_invalid_json_fails() {
        let result = isolated_loader(&[DB, ("BACKEND_CORS_ORIGINS", "[not json")]).load();
        assert!(result.is_err());
    }

    #[test]
    fn test_dotenv_beats_environment() {
        let dir = TempDir::new().unwrap();
        let dotenv = dir.path().join(".env");
        fs::write(&dotenv, "PORT=7000\nDEBUG=true\n").unwrap();

        let settings =
            isolated_loader(&[DB, ("PORT", "6000"), ("HOST", "0.0.0.0")]).dotenv_file(&dotenv).load().unwrap();

        assert_eq!(settings.port, 7000);
        assert!(settings.debug);
        // Keys the dotenv file does not set still come from the environment.
        assert_eq!(settings.host, "0.0.0.0");
    }

    #[test]
    fn test_missing_dotenv_is_ignored() {
        let dir = TempDir::new().unwrap();
        let settings = isolated_loader(&[DB]).dotenv_file(dir.path().join("nope.env")).load().unwrap();
        assert_eq!(settings.port, 8000);
    }

    #[test]
    fn test_overrides_beat_everything() {
        let dir = TempDir::new().unwrap();
        let dotenv = dir.path().join(".env");
        fs::write(&dotenv, "PORT=7000\n").unwrap();

        let settings = isolated_loader(&[DB, ("PORT", "6000")])
            .dotenv_file(&dotenv)
            .set_override("PORT", 5000_i64)
            .set_override("debug", true)
            .load()
            .unwrap();

        assert_eq!(settings.port, 5000);
        assert!(settings.debug);
    }

    #[test]
    fn test_project_metadata_file() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("Cargo.toml");
        fs::write(
            &manifest,
            r#"
[package]
name = "billing"
version = "2.3.4"
description = "Billing service"
edition = "2021"

[dependencies]
serde = "1"
"#,
        )
        .unwrap();

        let settings = isolated_loader(&[DB]).metadata_file(&manifest).load().unwrap();
        assert_eq!(settings.app_name, "billing");
        assert_eq!(settings.app_version, "2.3.4");
        assert_eq!(settings.app_description, "Billing service");

        // The environment outranks the metadata file.
        let settings = isolated_loader(&[DB, ("APP_NAME", "billing-eu")]).metadata_file(&manifest).load().unwrap();
        assert_eq!(settings.app_name, "billing-eu");
        assert_eq!(settings.app_version, "2.3.4");
    }

    #[test]
    fn test_workspace_inherited_version_is_skipped() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("Cargo.toml");
        fs::write(&manifest, "[package]\nname = \"member\"\nversion.workspace = true\n").unwrap();

        let settings = isolated_loader(&[DB]).metadata_file(&manifest).load().unwrap();
        assert_eq!(settings.app_name, "member");
        assert_eq!(settings.app_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_secrets_dir_is_lowest_source() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("database_url"), "sqlite://secret.db\n").unwrap();
        fs::write(dir.path().join("port"), "8123").unwrap();

        let settings = isolated_loader(&[("PORT", "8456")]).secrets_dir(dir.path()).load().unwrap();
        assert_eq!(settings.database_url, "sqlite://secret.db");
        assert_eq!(settings.port, 8456);
    }

    #[test]
    fn test_missing_secrets_dir_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("not-there");

        let err = isolated_loader(&[DB]).secrets_dir(&missing).load().unwrap_err();
        match err {
            SettingsError::Io { path, source } => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_filter_directives() {
        let mut settings = test_settings();
        settings.log_level = LogLevel::Warning;
        settings.request_log_level = LogLevel::Debug;
        settings.error_log_level = LogLevel::Critical;

        let directives = logging::filter_directives(&settings);
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("api::requests=debug"));
        assert!(directives.contains("api::errors=error"));
        assert!(directives.contains("tower_http=info"));
        assert!(directives.contains("sqlx=warn"));

        settings.debug = true;
        assert!(logging::filter_directives(&settings).contains("sqlx=debug"));
    }
}
