use aqm_domain::config::Config;

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 3210);
}

#[test]
fn explicit_zero_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 8080
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
}

#[test]
fn default_llm_targets_openai() {
    let config = Config::default();
    assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
    assert_eq!(config.llm.model, "gpt-4o-mini");
    assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
    assert_eq!(config.llm.max_attempts, 3);
}

#[test]
fn chat_caps_default_to_600_chars_and_8_turns() {
    let config = Config::default();
    assert_eq!(config.chat.max_message_chars, 600);
    assert_eq!(config.chat.max_history_turns, 8);
}

#[test]
fn geodata_cache_ttls_default_to_60_and_30_seconds() {
    let config = Config::default();
    assert_eq!(config.geodata.top_cache_ttl_secs, 60);
    assert_eq!(config.geodata.place_cache_ttl_secs, 30);
}

#[test]
fn partial_toml_keeps_other_sections_default() {
    let toml_str = r#"
[llm]
model = "gpt-4o"

[geodata]
top_cache_ttl_secs = 120
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.llm.temperature, 0.7);
    assert_eq!(config.geodata.top_cache_ttl_secs, 120);
    assert_eq!(config.geodata.place_cache_ttl_secs, 30);
    assert_eq!(config.chat.max_history_turns, 8);
}

#[test]
fn cors_config_parses_custom_origins() {
    let toml_str = r#"
[server.cors]
allowed_origins = ["https://aqmap.example.com"]
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(
        config.server.cors.allowed_origins,
        vec!["https://aqmap.example.com".to_string()]
    );
}
