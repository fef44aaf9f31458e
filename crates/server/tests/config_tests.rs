use config::Config;
use oauth_callback_server::config::{
    AppConfig, ConfigError, DEFAULT_TOKEN_ENDPOINT, ProviderConfig, load_config_from,
};
use std::env;
use std::fs;

fn from_yaml(yaml: &str) -> Result<AppConfig, config::ConfigError> {
    Config::builder()
        .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
        .build()?
        .try_deserialize()
}

#[test]
fn test_provider_config_deserialization() {
    let yaml_content = r#"
client_key: "aw1234"
client_secret: "secret123"
redirect_uri: "https://app.example.com/api/tiktok/callback"
token_endpoint: "https://idp.example.com/oauth/token"
"#;

    let config = Config::builder()
        .add_source(config::File::from_str(
            yaml_content,
            config::FileFormat::Yaml,
        ))
        .build()
        .expect("Failed to build config");

    let provider: ProviderConfig = config
        .try_deserialize()
        .expect("Failed to deserialize provider config");
    assert_eq!(provider.client_key, "aw1234");
    assert_eq!(provider.client_secret, "secret123");
    assert_eq!(
        provider.redirect_uri,
        "https://app.example.com/api/tiktok/callback"
    );
    assert_eq!(provider.token_endpoint, "https://idp.example.com/oauth/token");
}

#[test]
fn test_app_config_defaults() {
    let app_config = from_yaml(
        r#"
provider:
  client_key: "aw1234"
  client_secret: "secret123"
  redirect_uri: "https://app.example.com/api/tiktok/callback"
"#,
    )
    .expect("Failed to deserialize app config");

    assert_eq!(app_config.provider.token_endpoint, DEFAULT_TOKEN_ENDPOINT);
    assert_eq!(app_config.server.bind_addr, "0.0.0.0:8080");
    assert_eq!(app_config.server.callback_path, None);
    assert_eq!(app_config.http.timeout_secs, 30);
    assert_eq!(app_config.http.connect_timeout_secs, 10);
    assert!(!app_config.debug.expose_access_token);
    assert_eq!(app_config.callback_path(), "/api/tiktok/callback");
    assert!(app_config.validate().is_ok());
}

#[test]
fn test_app_config_full() {
    let app_config = from_yaml(
        r#"
provider:
  client_key: "aw1234"
  client_secret: "secret123"
  redirect_uri: "https://app.example.com/oauth/callback"
server:
  bind_addr: "127.0.0.1:3000"
  callback_path: "/proxied/callback"
http:
  timeout_secs: 5
  connect_timeout_secs: 2
debug:
  expose_access_token: true
"#,
    )
    .expect("Failed to deserialize app config");

    assert_eq!(app_config.server.bind_addr, "127.0.0.1:3000");
    assert_eq!(app_config.callback_path(), "/proxied/callback");
    assert_eq!(app_config.http.timeout().as_secs(), 5);
    assert_eq!(app_config.http.connect_timeout().as_secs(), 2);
    assert!(app_config.debug.expose_access_token);
    assert!(app_config.validate().is_ok());
}

#[test]
fn test_missing_provider_section_fails() {
    let result = from_yaml(
        r#"
server:
  bind_addr: "127.0.0.1:3000"
"#,
    );
    assert!(result.is_err());
}

#[test]
fn test_validation_rejects_bad_values() {
    let base = r#"
provider:
  client_key: "aw1234"
  client_secret: "secret123"
  redirect_uri: "REDIRECT"
server:
  bind_addr: "BIND"
"#;

    let bad_redirect = from_yaml(
        &base
            .replace("REDIRECT", "not a url")
            .replace("BIND", "0.0.0.0:8080"),
    )
    .unwrap();
    assert!(matches!(
        bad_redirect.validate(),
        Err(ConfigError::Validation(msg)) if msg.contains("redirect_uri")
    ));

    let bad_bind = from_yaml(
        &base
            .replace("REDIRECT", "https://app.example.com/cb")
            .replace("BIND", "localhost"),
    )
    .unwrap();
    assert!(matches!(
        bad_bind.validate(),
        Err(ConfigError::Validation(msg)) if msg.contains("bind_addr")
    ));
}

#[test]
fn test_load_config_file_with_environment_overrides() {
    let temp_dir = env::temp_dir();
    let config_path = temp_dir.join("oauth_callback_test_config.yaml");
    let config_content = r#"
provider:
  client_key: "file_key"
  redirect_uri: "https://file.example.com/api/tiktok/callback"
http:
  timeout_secs: 12
"#;
    fs::write(&config_path, config_content).expect("Failed to write temp config");

    // The file lacks client_secret: the legacy flat variable fills it in, and
    // the prefixed variable beats the file for client_key.
    unsafe {
        env::set_var("TIKTOK_CLIENT_SECRET", "legacy_secret");
        env::set_var("OAUTH__PROVIDER__CLIENT_KEY", "env_key");
        env::set_var("OAUTH__DEBUG__EXPOSE_ACCESS_TOKEN", "true");

        let app_config =
            load_config_from(config_path.to_str().expect("utf-8 path")).expect("load config");

        assert_eq!(app_config.provider.client_key, "env_key");
        assert_eq!(app_config.provider.client_secret, "legacy_secret");
        assert_eq!(
            app_config.provider.redirect_uri,
            "https://file.example.com/api/tiktok/callback"
        );
        assert_eq!(app_config.http.timeout_secs, 12);
        assert!(app_config.debug.expose_access_token);

        env::remove_var("TIKTOK_CLIENT_SECRET");
        env::remove_var("OAUTH__PROVIDER__CLIENT_KEY");
        env::remove_var("OAUTH__DEBUG__EXPOSE_ACCESS_TOKEN");
        let _ = fs::remove_file(config_path);
    }
}
