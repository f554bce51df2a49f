//! End-to-end loads into derived destination structs.

use chrono::{TimeZone, Utc};
use confucius::{Config, Error, FieldError, Format, Loader, StaticTree, TimeLayout};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn no_dirs() -> Vec<PathBuf> {
    Vec::new()
}

#[derive(Config, Default, Debug)]
struct Pod {
    #[conf(required)]
    kind: String,
    metadata: Metadata,
    spec: PodSpec,
}

#[derive(Config, Default, Debug)]
struct Metadata {
    name: String,
    #[conf(required)]
    master: String,
}

#[derive(Config, Default, Debug)]
struct PodSpec {
    containers: Vec<Container>,
}

#[derive(Config, Default, Debug)]
struct Container {
    name: String,
    #[conf(required)]
    image: String,
    #[conf(default = "IfNotPresent")]
    pull_policy: String,
}

#[test]
fn test_pod_required_fields_aggregate() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "pod.yaml",
        "metadata:\n  name: web\nspec:\n  containers:\n    - name: nginx\n      image: nginx:1.25\n    - name: sidecar\n",
    );

    let mut pod = Pod::default();
    let err = Loader::new()
        .file("pod.yaml")
        .dirs([temp.path()])
        .environment(env(&[]))
        .load(&mut pod)
        .unwrap_err();

    let errs = err.field_errors().expect("field errors");
    assert_eq!(
        errs.paths().collect::<Vec<_>>(),
        vec!["kind", "metadata.master", "spec.containers[1].image"]
    );
    assert!(matches!(errs.get("kind"), Some(FieldError::Required)));
    assert!(err.to_string().contains("kind: required validation failed"));

    // Fields that did resolve are still bound.
    assert_eq!(pod.metadata.name, "web");
    assert_eq!(pod.spec.containers.len(), 2);
    assert_eq!(pod.spec.containers[0].image, "nginx:1.25");
    assert_eq!(pod.spec.containers[1].pull_policy, "IfNotPresent");
}

#[test]
fn test_pod_loads_cleanly() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "pod.json",
        r#"{"kind": "Pod", "metadata": {"name": "web", "master": "m1"}, "spec": {"containers": [{"name": "nginx", "image": "nginx", "pull_policy": "Always"}]}}"#,
    );

    let mut pod = Pod::default();
    Loader::new()
        .file("pod.json")
        .dirs([temp.path()])
        .environment(env(&[]))
        .load(&mut pod)
        .unwrap();
    assert_eq!(pod.kind, "Pod");
    assert_eq!(pod.metadata.master, "m1");
    assert_eq!(pod.spec.containers[0].pull_policy, "Always");
}

#[derive(Config, Default, Debug)]
struct Server {
    #[conf(name = "host")]
    host: String,
    #[conf(default = "8080")]
    port: u16,
}

#[test]
fn test_env_overrides_without_files() {
    let temp = TempDir::new().unwrap();
    let mut server = Server::default();
    Loader::new()
        .dirs([temp.path()])
        .use_env("myapp")
        .environment(env(&[("MYAPP_HOST", "127.0.0.1")]))
        .load(&mut server)
        .unwrap();
    assert_eq!(server.host, "127.0.0.1");
    assert_eq!(server.port, 8080);
}

#[test]
fn test_string_seed_without_files_or_env() {
    let temp = TempDir::new().unwrap();
    let mut server = Server::default();
    Loader::new()
        .dirs([temp.path()])
        .string("host: seeded", Format::Yaml)
        .environment(env(&[]))
        .load(&mut server)
        .unwrap();
    assert_eq!(server.host, "seeded");
    assert_eq!(server.port, 8080);
}

#[test]
fn test_env_overrides_file_value() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "config.yaml", "host: 0.0.0.0\nport: 80\n");

    let mut server = Server::default();
    Loader::new()
        .dirs([temp.path()])
        .use_env("myapp")
        .environment(env(&[("MYAPP_PORT", "9090")]))
        .load(&mut server)
        .unwrap();
    assert_eq!(server.host, "0.0.0.0");
    assert_eq!(server.port, 9090);
}

#[test]
fn test_env_ignored_unless_enabled() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "config.yaml", "host: 0.0.0.0\n");

    let mut server = Server::default();
    Loader::new()
        .dirs([temp.path()])
        .environment(env(&[("HOST", "10.0.0.1"), ("MYAPP_HOST", "10.0.0.2")]))
        .load(&mut server)
        .unwrap();
    assert_eq!(server.host, "0.0.0.0");
}

#[test]
fn test_bad_env_value_is_field_error() {
    let mut server = Server::default();
    let err = Loader::new()
        .dirs(no_dirs())
        .use_env("")
        .environment(env(&[("PORT", "eighty")]))
        .load(&mut server)
        .unwrap_err();
    let errs = err.field_errors().unwrap();
    assert!(matches!(errs.get("port"), Some(FieldError::Env { key, .. }) if key == "PORT"));
}

#[derive(Config, Default, Debug)]
struct Listener {
    #[conf(default = "[80,443]")]
    ports: Vec<i64>,
    #[conf(default = "a, b")]
    names: Vec<String>,
}

#[test]
fn test_sequence_default_literal() {
    let mut listener = Listener::default();
    Loader::new()
        .dirs(no_dirs())
        .string("", Format::Yaml)
        .environment(env(&[]))
        .load(&mut listener)
        .unwrap();
    assert_eq!(listener.ports, vec![80, 443]);
    assert_eq!(listener.names, vec!["a", "b"]);
}

#[test]
fn test_sequence_from_file_skips_default() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "config.yaml", "ports: [8443]\nnames: single\n");

    let mut listener = Listener::default();
    Loader::new()
        .dirs([temp.path()])
        .environment(env(&[]))
        .load(&mut listener)
        .unwrap();
    assert_eq!(listener.ports, vec![8443]);
    assert_eq!(listener.names, vec!["single"]);
}

#[test]
fn test_profile_overrides_main_file() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "server.yaml", "host: 0.0.0.0\nport: 80\n");
    write(temp.path(), "server-test.yaml", "host: 192.168.0.256\n");

    let mut server = Server::default();
    Loader::new()
        .file("server.yaml")
        .dirs([temp.path()])
        .profiles(["test"])
        .profile_layout("config-test.yaml")
        .environment(env(&[]))
        .load(&mut server)
        .unwrap();
    assert_eq!(server.host, "192.168.0.256");
    assert_eq!(server.port, 80);
}

#[test]
fn test_later_profiles_win() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "config.yaml", "host: base\nport: 1\n");
    write(temp.path(), "config.a.yaml", "host: a\nport: 2\n");
    write(temp.path(), "config.b.yaml", "port: 3\n");

    let mut server = Server::default();
    Loader::new()
        .dirs([temp.path()])
        .profiles(["a", "b"])
        .environment(env(&[]))
        .load(&mut server)
        .unwrap();
    assert_eq!(server.host, "a");
    assert_eq!(server.port, 3);
}

#[test]
fn test_missing_profile_is_fatal_without_fallback() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "config.yaml", "host: base\n");

    let mut server = Server::default();
    let err = Loader::new()
        .dirs([temp.path()])
        .profiles(["prod"])
        .load(&mut server)
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, Error::FilesNotFound(ref names) if names == &["config.prod.yaml"]));
}

#[derive(Config, Default, Debug)]
struct Paths {
    path: String,
    url: String,
}

#[test]
fn test_interpolation_default_and_set() {
    let seed = "path: \"/x/y/${BAZ:a}\"\nurl: \"${URL:http://localhost:8080}\"";

    let mut unset = Paths::default();
    Loader::new()
        .dirs(no_dirs())
        .string(seed, Format::Yaml)
        .environment(env(&[]))
        .load(&mut unset)
        .unwrap();
    assert_eq!(unset.path, "/x/y/a");
    assert_eq!(unset.url, "http://localhost:8080");

    let mut set = Paths::default();
    Loader::new()
        .dirs(no_dirs())
        .string(seed, Format::Yaml)
        .environment(env(&[("BAZ", "Z")]))
        .load(&mut set)
        .unwrap();
    assert_eq!(set.path, "/x/y/Z");
}

#[test]
fn test_interpolation_in_files() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "config.toml", "path = \"${HOME_DIR}/data\"\n");

    let mut paths = Paths::default();
    Loader::new()
        .file("config.toml")
        .dirs([temp.path()])
        .environment(env(&[("HOME_DIR", "/home/app")]))
        .load(&mut paths)
        .unwrap();
    assert_eq!(paths.path, "/home/app/data");
}

#[test]
fn test_required_with_default_is_field_error() {
    #[derive(Config, Default)]
    struct Conflicted {
        #[conf(required, default = "x")]
        name: String,
        #[conf(required)]
        other: String,
    }

    let mut cfg = Conflicted::default();
    let err = Loader::new()
        .dirs(no_dirs())
        .string("name: set\nother: set", Format::Yaml)
        .environment(env(&[]))
        .load(&mut cfg)
        .unwrap_err();
    let errs = err.field_errors().unwrap();
    assert_eq!(errs.len(), 1);
    assert!(matches!(errs.get("name"), Some(FieldError::RequiredAndDefault)));
}

#[test]
fn test_embedded_under_local() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "config.yaml", "port: 9000\n");
    let tree = StaticTree::new().with_file("assets/config.yaml", "host: embedded\nport: 1\n");

    let mut server = Server::default();
    Loader::new()
        .dirs([temp.path()])
        .embedded(tree)
        .environment(env(&[]))
        .load(&mut server)
        .unwrap();
    // The embedded copy is the first match, so the local file is not used.
    assert_eq!(server.host, "embedded");
    assert_eq!(server.port, 1);
}

#[test]
fn test_embedded_main_with_local_profile() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "config.local.yaml", "port: 9000\n");
    let tree = StaticTree::new().with_file("config.yaml", "host: embedded\nport: 1\n");

    let mut server = Server::default();
    Loader::new()
        .dirs([temp.path()])
        .profiles(["local"])
        .embedded(tree)
        .environment(env(&[]))
        .load(&mut server)
        .unwrap();
    assert_eq!(server.host, "embedded");
    assert_eq!(server.port, 9000);
}

#[test]
fn test_files_override_string_seed() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "config.yaml", "host: from-file\n");

    let mut server = Server::default();
    Loader::new()
        .dirs([temp.path()])
        .string(r#"{"host": "from-seed", "port": 7000}"#, Format::Json)
        .environment(env(&[]))
        .load(&mut server)
        .unwrap();
    assert_eq!(server.host, "from-file");
    assert_eq!(server.port, 7000);
}

#[test]
fn test_custom_tag_key() {
    #[derive(Config, Default)]
    struct Tagged {
        #[conf(name = "host", tag(yaml = "listen_host"))]
        host: String,
    }

    let seed = "host: by-conf\nlisten_host: by-yaml";

    let mut by_yaml = Tagged::default();
    Loader::new()
        .dirs(no_dirs())
        .tag("yaml")
        .string(seed, Format::Yaml)
        .environment(env(&[]))
        .load(&mut by_yaml)
        .unwrap();
    assert_eq!(by_yaml.host, "by-yaml");

    let mut by_conf = Tagged::default();
    Loader::new()
        .dirs(no_dirs())
        .string(seed, Format::Yaml)
        .environment(env(&[]))
        .load(&mut by_conf)
        .unwrap();
    assert_eq!(by_conf.host, "by-conf");
}

#[test]
fn test_custom_tag_drives_env_key() {
    #[derive(Config, Default)]
    struct Tagged {
        #[conf(tag(yaml = "listen_host"))]
        host: String,
    }

    let mut cfg = Tagged::default();
    Loader::new()
        .dirs(no_dirs())
        .tag("yaml")
        .use_env("app")
        .environment(env(&[("APP_LISTEN_HOST", "h")]))
        .load(&mut cfg)
        .unwrap();
    assert_eq!(cfg.host, "h");
}

#[derive(Config, Default, Debug)]
struct Release {
    #[conf(default = "12-25-2012")]
    released: chrono::DateTime<Utc>,
    built: chrono::DateTime<Utc>,
}

#[test]
fn test_custom_time_layout() {
    let mut release = Release::default();
    Loader::new()
        .dirs(no_dirs())
        .time_layout(TimeLayout::custom("%m-%d-%Y"))
        .string("built: 01-02-2006", Format::Yaml)
        .environment(env(&[]))
        .load(&mut release)
        .unwrap();
    assert_eq!(release.released, Utc.with_ymd_and_hms(2012, 12, 25, 0, 0, 0).unwrap());
    assert_eq!(release.built, Utc.with_ymd_and_hms(2006, 1, 2, 0, 0, 0).unwrap());
}

#[test]
fn test_default_time_layout_is_rfc3339() {
    let mut release = Release::default();
    let err = Loader::new()
        .dirs(no_dirs())
        .string("built: 2020-01-01T12:00:00Z", Format::Yaml)
        .environment(env(&[]))
        .load(&mut release)
        .unwrap_err();
    // The default literal does not match RFC 3339.
    assert!(matches!(err.field_errors().unwrap().get("released"), Some(FieldError::Default(_))));
    assert_eq!(release.built, Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap());
}

#[derive(Config, Default, Debug)]
struct Schedule {
    #[conf(default = "2012-12-25T00:00:00Z")]
    starts: Option<chrono::DateTime<Utc>>,
    ratio: f64,
}

#[test]
fn test_explicit_epoch_kept_for_optional_time() {
    let mut schedule = Schedule::default();
    Loader::new()
        .dirs(no_dirs())
        .use_env("")
        .environment(env(&[("STARTS", "1970-01-01T00:00:00Z")]))
        .load(&mut schedule)
        .unwrap();
    assert_eq!(schedule.starts, Some(Utc.timestamp_opt(0, 0).unwrap()));
}

#[test]
fn test_float_overflow_from_env_is_field_error() {
    let mut schedule = Schedule::default();
    let err = Loader::new()
        .dirs(no_dirs())
        .use_env("")
        .environment(env(&[("RATIO", "1e400")]))
        .load(&mut schedule)
        .unwrap_err();
    let errs = err.field_errors().unwrap();
    assert!(matches!(errs.get("ratio"), Some(FieldError::Env { key, .. }) if key == "RATIO"));
    assert_eq!(schedule.ratio, 0.0);
}

#[derive(Config, Default, Debug)]
struct Common {
    #[conf(default = "info")]
    level: String,
}

#[derive(Config, Default, Debug)]
struct App {
    #[conf(flatten)]
    common: Common,
    name: String,
    #[conf(flatten, name = "extra")]
    named: Common,
}

#[test]
fn test_flattened_records() {
    let mut app = App::default();
    Loader::new()
        .dirs(no_dirs())
        .string("level: debug\nname: app\nextra:\n  level: warn", Format::Yaml)
        .use_env("app")
        .environment(env(&[("APP_NAME", "from-env")]))
        .load(&mut app)
        .unwrap();
    assert_eq!(app.common.level, "debug");
    assert_eq!(app.name, "from-env");
    assert_eq!(app.named.level, "warn");
}

#[test]
fn test_flattened_record_paths() {
    let mut app = App::default();
    let ctx = confucius::bind::BindContext::default();
    let paths: Vec<String> = app.fields(&ctx).into_iter().map(|f| f.path).collect();
    assert_eq!(paths, vec!["level", "name", "extra.level"]);
}

#[derive(Config, Default, Debug)]
struct Tls {
    #[conf(default = "443")]
    port: u16,
    cert: Option<PathBuf>,
}

#[derive(Config, Default, Debug)]
struct Frontend {
    tls: Option<Tls>,
    backend: Box<Server>,
}

#[test]
fn test_optional_record_is_allocated() {
    let mut frontend = Frontend::default();
    Loader::new()
        .dirs(no_dirs())
        .string("backend:\n  host: api", Format::Yaml)
        .environment(env(&[]))
        .load(&mut frontend)
        .unwrap();
    let tls = frontend.tls.expect("tls allocated");
    assert_eq!(tls.port, 443);
    assert_eq!(tls.cert, None);
    assert_eq!(frontend.backend.host, "api");
    assert_eq!(frontend.backend.port, 8080);
}

#[test]
fn test_optional_record_from_tree() {
    let mut frontend = Frontend::default();
    Loader::new()
        .dirs(no_dirs())
        .string("tls:\n  cert: /etc/tls.pem", Format::Yaml)
        .environment(env(&[]))
        .load(&mut frontend)
        .unwrap();
    let tls = frontend.tls.unwrap();
    assert_eq!(tls.cert, Some(PathBuf::from("/etc/tls.pem")));
    assert_eq!(tls.port, 443);
}

#[derive(Config, Default, Debug)]
struct Sink {
    name: String,
    #[conf(default = "info")]
    log_level: String,
}

#[derive(Config, Default, Debug)]
struct Logging {
    loggers: Vec<Sink>,
}

#[test]
fn test_record_sequence_env_override() {
    let mut logging = Logging::default();
    Loader::new()
        .dirs(no_dirs())
        .string("loggers:\n  - name: a\n  - name: b\n    log_level: warn", Format::Yaml)
        .use_env("app")
        .environment(env(&[("APP_LOGGERS_0_LOG_LEVEL", "debug"), ("APP_LOGGERS_2_NAME", "c")]))
        .load(&mut logging)
        .unwrap();
    assert_eq!(logging.loggers.len(), 2);
    assert_eq!(logging.loggers[0].log_level, "debug");
    assert_eq!(logging.loggers[1].log_level, "warn");
}

#[derive(Config, Default, Debug)]
struct Flags {
    #[conf(default = "true")]
    enabled: bool,
    #[conf(default = "true")]
    verbose: Option<bool>,
    #[conf(default = "5s")]
    timeout: Duration,
    retry: Duration,
}

#[test]
fn test_bool_rejects_default() {
    let mut flags = Flags::default();
    let err = Loader::new()
        .dirs(no_dirs())
        .string("retry: 1m 30s", Format::Yaml)
        .environment(env(&[]))
        .load(&mut flags)
        .unwrap_err();
    let errs = err.field_errors().unwrap();
    assert_eq!(errs.paths().collect::<Vec<_>>(), vec!["enabled"]);
    assert!(errs.to_string().contains("unable to set default"));

    assert!(!flags.enabled);
    assert_eq!(flags.verbose, Some(true));
    assert_eq!(flags.timeout, Duration::from_secs(5));
    assert_eq!(flags.retry, Duration::from_secs(90));
}

#[test]
fn test_weakly_typed_values() {
    let mut server = Server::default();
    Loader::new()
        .dirs(no_dirs())
        .string("host: 42\nport: \"9000\"", Format::Yaml)
        .environment(env(&[]))
        .load(&mut server)
        .unwrap();
    assert_eq!(server.host, "42");
    assert_eq!(server.port, 9000);
}

#[test]
fn test_case_insensitive_keys() {
    let mut server = Server::default();
    Loader::new()
        .dirs(no_dirs())
        .string(r#"{"HOST": "upper", "Port": 81}"#, Format::Json)
        .environment(env(&[]))
        .load(&mut server)
        .unwrap();
    assert_eq!(server.host, "upper");
    assert_eq!(server.port, 81);
}

#[test]
fn test_decode_error_has_path() {
    let mut frontend = Frontend::default();
    let err = Loader::new()
        .dirs(no_dirs())
        .string("backend:\n  port: 70000", Format::Yaml)
        .environment(env(&[]))
        .load(&mut frontend)
        .unwrap_err();
    assert!(matches!(err, Error::Decode(ref e) if e.path == "backend.port"));
}

#[test]
fn test_existing_values_survive() {
    let mut server = Server {
        host: "preset".to_string(),
        port: 1234,
    };
    Loader::new()
        .dirs(no_dirs())
        .string("", Format::Yaml)
        .environment(env(&[]))
        .load(&mut server)
        .unwrap();
    assert_eq!(server.host, "preset");
    assert_eq!(server.port, 1234);
}

#[test]
fn test_load_is_idempotent() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "config.yaml", "loggers:\n  - name: a\n  - name: b\n");

    let loader = || {
        Loader::new()
            .dirs([temp.path()])
            .use_env("app")
            .environment(env(&[("APP_LOGGERS_1_LOG_LEVEL", "error")]))
    };

    let mut logging = Logging::default();
    loader().load(&mut logging).unwrap();
    loader().load(&mut logging).unwrap();
    assert_eq!(logging.loggers.len(), 2);
    assert_eq!(logging.loggers[0].log_level, "info");
    assert_eq!(logging.loggers[1].log_level, "error");
}

#[derive(Config, Serialize, Default, Debug, PartialEq)]
struct Service {
    host: String,
    port: u16,
    weight: f64,
    tags: Vec<String>,
    limits: Limits,
}

#[derive(Config, Serialize, Default, Debug, PartialEq)]
struct Limits {
    max_conns: u32,
    burst: Option<i32>,
}

#[test]
fn test_serialized_struct_round_trips() {
    let original = Service {
        host: "db.internal".to_string(),
        port: 5432,
        weight: 0.75,
        tags: vec!["primary".to_string(), "eu".to_string()],
        limits: Limits {
            max_conns: 100,
            burst: Some(-1),
        },
    };

    for format in [Format::Json, Format::Yaml] {
        let text = match format {
            Format::Json => serde_json::to_string(&original).unwrap(),
            _ => serde_yaml::to_string(&original).unwrap(),
        };
        let mut loaded = Service::default();
        Loader::new()
            .dirs(no_dirs())
            .string(text, format)
            .environment(env(&[]))
            .load(&mut loaded)
            .unwrap();
        assert_eq!(loaded, original, "{format}");
    }
}

#[test]
fn test_reader_seed() {
    let mut server = Server::default();
    Loader::new()
        .dirs(no_dirs())
        .reader(std::io::Cursor::new(b"host = \"toml\"\n".to_vec()), Format::Toml)
        .environment(env(&[]))
        .load(&mut server)
        .unwrap();
    assert_eq!(server.host, "toml");
}
