use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.feeds.cache_ttl = Some("30".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        feeds_cache_ttl: Some("0".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(!settings.cache.ttl.is_enabled());
}

#[test]
fn defaults_match_the_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert!(!settings.feeds.disable);
    assert_eq!(settings.feeds.firehose, "articles");
    assert!(settings.feeds.categories.is_empty());
    assert_eq!(settings.feeds.debug_query_value, "42");
    assert_eq!(settings.feeds.author, "Staff Writer");
    assert_eq!(settings.feeds.high_water, HighWaterSource::Published);
    assert_eq!(settings.cache.ttl.minutes(), Some(10));
    assert_eq!(settings.cache.capacity, 256);
    assert_eq!(settings.content.root, PathBuf::from("content"));
    assert_eq!(settings.site.url, "http://localhost:3000");
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn empty_ttl_disables_caching() {
    let mut raw = RawSettings::default();
    raw.feeds.cache_ttl = Some(String::new());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cache.ttl, CacheTtl::DISABLED);
}

#[test]
fn non_numeric_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.feeds.cache_ttl = Some("ten".to_string());
    let err = Settings::from_raw(raw).expect_err("invalid ttl");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "feeds.cache_ttl",
            ..
        }
    ));
}

#[test]
fn oversized_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.feeds.cache_ttl = Some("4294967295".to_string());
    let err = Settings::from_raw(raw).expect_err("ttl beyond one year");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "feeds.cache_ttl",
            ..
        }
    ));
}

#[test]
fn categories_are_trimmed_and_deduplicated() {
    let mut raw = RawSettings::default();
    raw.feeds.categories = Some(vec![
        " travel ".to_string(),
        String::new(),
        "travel".to_string(),
        "recipes".to_string(),
    ]);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.feeds.categories, vec!["travel", "recipes"]);
}

#[test]
fn nested_category_keys_are_rejected() {
    let mut raw = RawSettings::default();
    raw.feeds.categories = Some(vec!["a/b".to_string()]);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn site_url_must_be_http() {
    let mut raw = RawSettings::default();
    raw.site.url = Some("ftp://files.example".to_string());
    let err = Settings::from_raw(raw).expect_err("ftp rejected");
    assert!(matches!(err, LoadError::Invalid { key: "site.url", .. }));

    let mut raw = RawSettings::default();
    raw.site.url = Some("https://notes.example/blog/".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.site.url, "https://notes.example/blog");
}

#[test]
fn high_water_source_is_configurable() {
    let mut raw = RawSettings::default();
    raw.feeds.high_water = Some("modified".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.feeds.high_water, HighWaterSource::Modified);

    let mut raw = RawSettings::default();
    raw.feeds.high_water = Some("sometimes".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["syndic"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from([
        "syndic",
        "render",
        "--format",
        "rss.xml",
        "--category",
        "travel",
        "--content-root",
        "/srv/content",
    ]);

    match args.command.expect("render command") {
        Command::Render(render) => {
            assert_eq!(render.format, FeedFormat::Rss);
            assert_eq!(render.category.as_deref(), Some("travel"));
            assert!(!render.debug);
            assert_eq!(
                render.content.content_root,
                Some(PathBuf::from("/srv/content"))
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "syndic",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--feeds-disable",
        "yes",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.feeds_disable, Some(true));
        }
        _ => panic!("wrong command parsed"),
    }
}
