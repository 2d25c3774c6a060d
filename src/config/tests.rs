use super::*;

#[test]
fn defaults_match_the_classic_deployment() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.listen_addr.port(), DEFAULT_PORT);
    assert_eq!(settings.server.public_base_url, "http://localhost:8090");
    assert!(settings.tls.is_none());
    assert_eq!(settings.cache.directory, PathBuf::from("./"));
    assert_eq!(settings.cache.ttl, Duration::from_secs(2_592_000));
    assert_eq!(settings.upstream.stylesheet_base, "https://fonts.googleapis.com");
    assert_eq!(settings.upstream.asset_base, "https://fonts.gstatic.com");
    assert_eq!(settings.upstream.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert_eq!(settings.logging.format, LogFormat::Compact);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.cache.ttl_seconds = Some(60);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        port: Some(4321),
        expire: Some(120),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.listen_addr.port(), 4321);
    assert_eq!(settings.cache.ttl, Duration::from_secs(120));
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn public_base_is_derived_from_port_and_tls() {
    let mut raw = RawSettings::default();
    raw.apply_serve_overrides(&ServeOverrides {
        port: Some(8443),
        ssl: Some(true),
        cert: Some(PathBuf::from("/etc/fontproxy/cert.pem")),
        key: Some(PathBuf::from("/etc/fontproxy/key.pem")),
        ..Default::default()
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.server.public_base_url, "https://localhost:8443");
    let tls = settings.tls.expect("tls enabled");
    assert_eq!(tls.cert_path, PathBuf::from("/etc/fontproxy/cert.pem"));
}

#[test]
fn explicit_domain_wins_and_loses_trailing_slash() {
    let mut raw = RawSettings::default();
    raw.server.public_base_url = Some("https://fonts.example.net/".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.server.public_base_url, "https://fonts.example.net");
}

#[test]
fn blank_domain_falls_back_to_derived_value() {
    let mut raw = RawSettings::default();
    raw.server.public_base_url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.server.public_base_url, "http://localhost:8090");
}

#[test]
fn tls_without_certificate_is_rejected() {
    let mut raw = RawSettings::default();
    raw.tls.enabled = Some(true);
    raw.tls.key_path = Some(PathBuf::from("key.pem"));

    let err = Settings::from_raw(raw).expect_err("missing cert must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "tls.cert_path",
            ..
        }
    ));
}

#[test]
fn zero_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.ttl_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ttl must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.ttl_seconds",
            ..
        }
    ));
}

#[test]
fn upstream_bases_must_be_http_urls() {
    let mut raw = RawSettings::default();
    raw.upstream.asset_base = Some("ftp://fonts.gstatic.com".to_string());

    let err = Settings::from_raw(raw).expect_err("ftp base must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "upstream.asset_base",
            ..
        }
    ));
}

#[test]
fn ipv6_hosts_are_bracketed() {
    let mut raw = RawSettings::default();
    raw.server.host = Some("::1".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.server.listen_addr.is_ipv6());
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
    let args = CliArgs::parse_from(["fontproxy"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "fontproxy",
        "serve",
        "--addr",
        "127.0.0.1",
        "--port",
        "9000",
        "--cache",
        "/var/cache/fontproxy",
        "--expire",
        "600",
        "--domain",
        "https://fonts.example.net",
        "--ssl",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            let overrides = serve.overrides;
            assert_eq!(overrides.addr.as_deref(), Some("127.0.0.1"));
            assert_eq!(overrides.port, Some(9000));
            assert_eq!(
                overrides.cache.as_deref(),
                Some(std::path::Path::new("/var/cache/fontproxy"))
            );
            assert_eq!(overrides.expire, Some(600));
            assert_eq!(
                overrides.domain.as_deref(),
                Some("https://fonts.example.net")
            );
            assert_eq!(overrides.ssl, Some(true));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn ssl_flag_accepts_explicit_false() {
    let args = CliArgs::parse_from(["fontproxy", "serve", "--ssl", "false"]);
    let command = args.command.expect("serve command");
    assert_eq!(command.overrides().ssl, Some(false));
}

#[test]
fn parse_check_config_overrides() {
    let args = CliArgs::parse_from(["fontproxy", "check-config", "--port", "8100"]);

    match args.command.expect("check-config command") {
        Command::CheckConfig(check) => assert_eq!(check.overrides.port, Some(8100)),
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn display_lists_resolved_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    let rendered = settings.to_string();

    assert!(rendered.contains("server.public_base_url = http://localhost:8090"));
    assert!(rendered.contains("cache.ttl_seconds = 2592000"));
    assert!(rendered.contains("tls.enabled = false"));
}

#[test]
fn flags_without_subcommand_configure_serve() {
    let args = CliArgs::parse_from([
        "fontproxy",
        "--port",
        "9000",
        "--ssl",
        "--cert",
        "cert.pem",
        "--key",
        "key.pem",
        "--cache",
        "/var/cache/fontproxy",
        "--expire",
        "600",
        "--domain",
        "https://fonts.example.net/",
    ]);
    assert!(args.command.is_none());

    let mut raw = RawSettings::default();
    raw.apply_cli(&args);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.listen_addr.port(), 9000);
    assert!(settings.tls.is_some());
    assert_eq!(
        settings.cache.directory,
        PathBuf::from("/var/cache/fontproxy")
    );
    assert_eq!(settings.cache.ttl, Duration::from_secs(600));
    assert_eq!(settings.server.public_base_url, "https://fonts.example.net");
}

#[test]
fn subcommand_flags_win_over_top_level_flags() {
    let args = CliArgs::parse_from([
        "fontproxy",
        "--port",
        "9000",
        "--expire",
        "600",
        "check-config",
        "--port",
        "9100",
    ]);

    let mut raw = RawSettings::default();
    raw.apply_cli(&args);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.listen_addr.port(), 9100);
    assert_eq!(settings.cache.ttl, Duration::from_secs(600));
}
