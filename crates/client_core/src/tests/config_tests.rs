use super::{apply_env, apply_file, load_settings_from, normalize_service_url, Settings};

use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

#[test]
fn strips_trailing_slash_from_service_url() {
    assert_eq!(
        normalize_service_url(" https://abc.supabase.co/ ").expect("url"),
        "https://abc.supabase.co"
    );
}

#[test]
fn rejects_non_http_service_url() {
    let err = normalize_service_url("ftp://example.com").expect_err("scheme");
    assert!(err.to_string().contains("http or https"));
    assert!(normalize_service_url("not a url").is_err());
}

#[test]
fn service_url_override_is_normalized() {
    let mut settings = Settings::default();

    settings
        .override_service_url("https://abc.supabase.co/")
        .expect("valid override");

    assert_eq!(settings.service_url, "https://abc.supabase.co");
}

#[test]
fn invalid_service_url_override_keeps_previous_value() {
    let mut settings = Settings::default();

    let err = settings
        .override_service_url("ftp://example.com")
        .expect_err("scheme");
    assert!(err.to_string().contains("http or https"));
    assert!(settings.override_service_url("not a url").is_err());

    assert_eq!(settings.service_url, Settings::default().service_url);
}

#[test]
fn env_overrides_file_values() {
    let mut settings = Settings::default();
    let file_cfg = HashMap::from([
        ("service_url".to_string(), "http://file.local".to_string()),
        ("anon_key".to_string(), "file-key".to_string()),
        ("posts_table".to_string(), "posts".to_string()),
    ]);
    apply_file(&mut settings, &file_cfg);

    let env_vars = HashMap::from([
        ("SUPABASE_URL", "http://supabase.local"),
        ("APP__ANON_KEY", "env-key"),
    ]);
    apply_env(&mut settings, |key| {
        env_vars.get(key).map(|value| value.to_string())
    });

    assert_eq!(settings.service_url, "http://supabase.local");
    assert_eq!(settings.anon_key, "env-key");
    assert_eq!(settings.posts_table, "posts");
    assert_eq!(settings.log_filter, "info");
}

#[test]
fn app_prefixed_url_wins_over_supabase_url() {
    let mut settings = Settings::default();
    let env_vars = HashMap::from([
        ("SUPABASE_URL", "http://one.local"),
        ("APP__SERVICE_URL", "http://two.local"),
    ]);
    apply_env(&mut settings, |key| {
        env_vars.get(key).map(|value| value.to_string())
    });
    assert_eq!(settings.service_url, "http://two.local");
}

#[test]
fn loads_table_from_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("blog_client_config_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("client.toml");
    fs::write(
        &path,
        "service_url = \"http://127.0.0.1:9999/\"\nposts_table = \"articles\"\n",
    )
    .expect("write config");

    let settings = load_settings_from(&path).expect("load");
    assert_eq!(settings.posts_table, "articles");
    if env::var("SUPABASE_URL").is_err() && env::var("APP__SERVICE_URL").is_err() {
        assert_eq!(settings.service_url, "http://127.0.0.1:9999");
    }

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let path = env::temp_dir().join("blog_client_config_does_not_exist.toml");
    let settings = load_settings_from(&path).expect("load");
    if env::var("APP__POSTS_TABLE").is_err() {
        assert_eq!(settings.posts_table, "blogs");
    }
}

#[test]
fn malformed_file_is_reported_with_path() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("blog_client_bad_config_{suffix}.toml"));
    fs::write(&path, "service_url = [1, 2").expect("write config");

    let err = load_settings_from(&path).expect_err("must fail");
    assert!(err.to_string().contains("failed to parse config file"));

    fs::remove_file(path).expect("cleanup");
}
