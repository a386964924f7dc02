//! Library-level reconciliation tests over real files.

use std::fs;

use extract_env::collection::EnvCollection;
use extract_env::dotfile;
use extract_env::error::Error;
use extract_env::manifest::Manifest;
use extract_env::pipeline::{self, RunOptions};
use extract_env::reconcile::{Mode, ReconcileConfig, Reconciler};
use extract_env::record::{EnvRecord, KeyAffix, Source};
use tempfile::TempDir;

fn reconcile(config: ReconcileConfig, baseline: Option<&str>, compose: &str) -> Result<String, Error> {
    let manifest = Manifest::parse("compose.yaml", compose)?;
    let result = Reconciler::new(config).reconcile(baseline, &[&manifest])?;
    Ok(dotfile::render(&result.collection))
}

#[test]
fn test_agreeing_services_share_one_record() {
    let compose = "\
services:
  api:
    environment:
      - DB_HOST=db1
  worker:
    environment:
      - DB_HOST=db1
";
    let manifest = Manifest::parse("compose.yaml", compose).unwrap();
    let result = Reconciler::default().reconcile(None, &[&manifest]).unwrap();

    assert_eq!(result.collection.len(), 1);
    let record = result.collection.get("DB_HOST").unwrap();
    assert_eq!(record.value, "db1");
    assert!(record.services.contains("api"));
    assert!(record.services.contains("worker"));
}

#[test]
fn test_disagreeing_services_conflict() {
    let compose = "\
services:
  api:
    environment:
      - PORT=8080
  worker:
    environment:
      - PORT=9090
";
    let err = reconcile(ReconcileConfig::default(), None, compose).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("PORT"));
    assert!(message.contains("8080"));
    assert!(message.contains("9090"));
}

#[test]
fn test_split_mode_key() {
    let config = ReconcileConfig {
        mode: Mode::Split,
        ..ReconcileConfig::default()
    };
    let out = reconcile(
        config,
        None,
        "services:\n  web-app:\n    environment:\n      - TOKEN=abc\n",
    )
    .unwrap();
    assert_eq!(out, "WEB_APP_TOKEN=abc\n");
}

#[test]
fn test_comment_line_round_trip() {
    let record = EnvRecord::parse("PORT=8080 # the port", &KeyAffix::none(), Source::DotFile).unwrap();
    assert_eq!(record.key, "PORT");
    assert_eq!(record.value, "8080");
    assert_eq!(record.comment, "the port");
    assert_eq!(record.to_string(), "PORT=8080 # the port");
}

#[test]
fn test_blank_line_kept_in_place() {
    let baseline = "A=1\n\nB=2\n";
    let compose = "services:\n  api:\n    environment:\n      - A=${A}\n      - B=${B}\n";
    let out = reconcile(ReconcileConfig::default(), Some(baseline), compose).unwrap();
    assert_eq!(out, baseline);
}

#[test]
fn test_reference_adds_service_without_new_record() {
    let manifest =
        Manifest::parse("compose.yaml", "services:\n  x:\n    environment:\n      - FOO=${FOO}\n")
            .unwrap();
    let result = Reconciler::default()
        .reconcile(Some("FOO=bar\n"), &[&manifest])
        .unwrap();
    assert_eq!(result.collection.len(), 1);
    assert!(result.collection.get("FOO").unwrap().services.contains("x"));
}

#[test]
fn test_unresolved_reference_is_dropped() {
    let manifest =
        Manifest::parse("compose.yaml", "services:\n  x:\n    environment:\n      - FOO=${NOPE}\n")
            .unwrap();
    let result = Reconciler::default().reconcile(None, &[&manifest]).unwrap();
    assert!(result.collection.is_empty());
    assert_eq!(result.collection.dropped_references().len(), 1);
    assert!(result.rewrites[0].is_empty());
}

#[test]
fn test_collection_dedup_is_idempotent() {
    let mut envs = EnvCollection::from_dotfile("A=1\nB=2\nA=1\n").unwrap();
    envs.dedup().unwrap();
    let once = dotfile::render(&envs);
    envs.dedup().unwrap();
    assert_eq!(dotfile::render(&envs), once);
    assert_eq!(once, "A=1\nB=2\n");
}

#[test]
fn test_pipeline_two_runs_are_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    let compose = "\
# services
services:
  api:
    environment:
      - DB_HOST=db1  # primary
      - 'PORT=8080'
  worker:
    environment:
      - DB_HOST=db1
";
    fs::write(temp_dir.path().join("compose.yaml"), compose).unwrap();
    let options = RunOptions {
        compose_folder: temp_dir.path().to_path_buf(),
        env_folder: temp_dir.path().to_path_buf(),
        ..RunOptions::default()
    };

    let first = pipeline::execute(&options).unwrap();
    assert_eq!(first.staged.commit().unwrap().len(), 2);
    let env = fs::read_to_string(temp_dir.path().join(".env")).unwrap();
    let manifest = fs::read_to_string(temp_dir.path().join("compose.yaml")).unwrap();
    assert_eq!(env, "DB_HOST=db1 # primary\nPORT=8080\n");
    assert!(manifest.contains("- 'PORT=${PORT}'"));

    let second = pipeline::execute(&options).unwrap();
    assert!(second.staged.changed().is_empty());
    assert!(second.staged.commit().unwrap().is_empty());
    assert_eq!(fs::read_to_string(temp_dir.path().join(".env")).unwrap(), env);
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("compose.yaml")).unwrap(),
        manifest
    );
}

#[test]
fn test_conflict_in_pipeline_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let compose = "services:\n  a:\n    environment:\n      - P=1\n  b:\n    environment:\n      - P=2\n";
    fs::write(temp_dir.path().join("compose.yaml"), compose).unwrap();
    let options = RunOptions {
        compose_folder: temp_dir.path().to_path_buf(),
        env_folder: temp_dir.path().to_path_buf(),
        ..RunOptions::default()
    };

    assert!(matches!(pipeline::execute(&options), Err(Error::Conflict { .. })));
    assert!(!temp_dir.path().join(".env").exists());
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("compose.yaml")).unwrap(),
        compose
    );
}

fn options_for(temp_dir: &TempDir) -> RunOptions {
    RunOptions {
        compose_folder: temp_dir.path().to_path_buf(),
        env_folder: temp_dir.path().to_path_buf(),
        ..RunOptions::default()
    }
}

#[test]
fn test_comment_and_blank_entries_do_not_grow_dotfile() {
    let temp_dir = TempDir::new().unwrap();
    let compose = "services:\n  api:\n    environment:\n      - H=1\n      - \"# note\"\n      - \"\"\n";
    fs::write(temp_dir.path().join("compose.yaml"), compose).unwrap();
    let options = options_for(&temp_dir);

    pipeline::execute(&options).unwrap().staged.commit().unwrap();
    assert_eq!(fs::read_to_string(temp_dir.path().join(".env")).unwrap(), "H=1\n");

    let second = pipeline::execute(&options).unwrap();
    assert!(second.staged.commit().unwrap().is_empty());
    assert_eq!(fs::read_to_string(temp_dir.path().join(".env")).unwrap(), "H=1\n");
}

#[test]
fn test_hash_value_moves_intact() {
    let temp_dir = TempDir::new().unwrap();
    let compose = "services:\n  web:\n    environment:\n      - \"COLOR=#ff0000\"\n";
    fs::write(temp_dir.path().join("compose.yaml"), compose).unwrap();

    pipeline::execute(&options_for(&temp_dir)).unwrap().staged.commit().unwrap();

    assert_eq!(fs::read_to_string(temp_dir.path().join(".env")).unwrap(), "COLOR=#ff0000\n");
    let manifest = fs::read_to_string(temp_dir.path().join("compose.yaml")).unwrap();
    assert!(manifest.contains("- \"COLOR=${COLOR}\""));
}

#[test]
fn test_unmarked_comment_lines_leave_dotfile_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let baseline = "#comment\n##heading\nA=1\n";
    fs::write(temp_dir.path().join(".env"), baseline).unwrap();
    fs::write(
        temp_dir.path().join("compose.yaml"),
        "services:\n  api:\n    environment:\n      - A=${A}\n",
    )
    .unwrap();

    let outcome = pipeline::execute(&options_for(&temp_dir)).unwrap();
    assert!(outcome.staged.changed().is_empty());
    assert!(outcome.staged.commit().unwrap().is_empty());
    assert_eq!(fs::read_to_string(temp_dir.path().join(".env")).unwrap(), baseline);
}
