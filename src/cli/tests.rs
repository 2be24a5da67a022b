//! Unit tests for CLI commands

use std::io::Write as _;

use crate::cli::{dispatch, load_router, run, Cli, Commands};
use crate::table::RouteTable;
use clap::Parser;

const TABLE: &str = r#"
routes:
  - name: user
    path: /users/{id:int}
    methods: [GET, PUT]
    handler: get_user
  - name: legacy
    path: /old/{id}
    build_only: true
"#;

fn table_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(TABLE.as_bytes()).unwrap();
    file
}

#[test]
fn test_all_commands_parse() {
    let commands = vec![
        vec!["routemux", "check", "--table", "t.yaml"],
        vec!["routemux", "routes", "-t", "t.yaml"],
        vec!["routemux", "match", "-t", "t.yaml", "-X", "POST", "/x"],
        vec!["routemux", "url", "-t", "t.yaml", "user", "--var", "id=1"],
    ];

    for args in commands {
        let cli = Cli::try_parse_from(&args);
        assert!(cli.is_ok(), "Failed to parse command: {:?}", args);
    }
}

#[test]
fn test_url_var_must_be_key_value() {
    let cli = Cli::try_parse_from(["routemux", "url", "-t", "t.yaml", "user", "--var", "id"]);
    assert!(cli.is_err());
}

#[test]
fn test_match_command_parses_headers() {
    let cli = Cli::try_parse_from([
        "routemux", "match", "-t", "t.yaml", "-H", "Accept: text/html", "--tls", "/x",
    ])
    .unwrap();
    match cli.command {
        Commands::Match {
            headers, tls, url, ..
        } => {
            assert_eq!(headers, vec!["Accept: text/html".to_string()]);
            assert!(tls);
            assert_eq!(url, "/x");
        }
        _ => panic!("Expected Match command"),
    }
}

#[test]
fn test_dispatch_reports_match() {
    let router = load_router(&RouteTable::from_yaml_str(TABLE).unwrap()).unwrap();
    let report = dispatch(&router, "get", &[], false, "/users/7").unwrap();
    assert_eq!(report.status, 200);
    assert_eq!(report.handler.as_deref(), Some("get_user"));
    assert_eq!(report.route.as_deref(), Some("user"));
    assert_eq!(report.vars.get("id").map(String::as_str), Some("7"));
}

#[test]
fn test_dispatch_reports_method_not_allowed() {
    let router = load_router(&RouteTable::from_yaml_str(TABLE).unwrap()).unwrap();
    let report = dispatch(&router, "DELETE", &[], false, "/users/7").unwrap();
    assert_eq!(report.status, 405);
    assert_eq!(report.allow.as_deref(), Some("GET, PUT"));
    assert!(report.handler.is_none());
}

#[test]
fn test_build_only_route_is_not_served() {
    let router = load_router(&RouteTable::from_yaml_str(TABLE).unwrap()).unwrap();
    let report = dispatch(&router, "GET", &[], false, "/old/1").unwrap();
    assert_eq!(report.status, 404);
}

#[test]
fn test_url_command_output() {
    let file = table_file();
    let path = file.path().to_string_lossy().to_string();
    let cli = Cli::try_parse_from(["routemux", "url", "-t", &path, "user", "--var", "id=42"]).unwrap();
    let mut out = Vec::new();
    run(&cli, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "/users/42\n");
}

#[test]
fn test_url_command_rejects_invalid_value() {
    let file = table_file();
    let path = file.path().to_string_lossy().to_string();
    let cli =
        Cli::try_parse_from(["routemux", "url", "-t", &path, "user", "--var", "id=abc"]).unwrap();
    let mut out = Vec::new();
    assert!(run(&cli, &mut out).is_err());
}

#[test]
fn test_routes_command_lists_routes() {
    let file = table_file();
    let path = file.path().to_string_lossy().to_string();
    let cli = Cli::try_parse_from(["routemux", "routes", "-t", &path]).unwrap();
    let mut out = Vec::new();
    run(&cli, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(
        text,
        "GET,PUT /users/{id:int} [user]\n* /old/{id} [legacy] (build-only)\n"
    );
}

#[test]
fn test_check_command() {
    let file = table_file();
    let path = file.path().to_string_lossy().to_string();
    let cli = Cli::try_parse_from(["routemux", "check", "-t", &path]).unwrap();
    let mut out = Vec::new();
    run(&cli, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "ok: 2 routes\n");
}
