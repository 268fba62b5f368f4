//! Integration tests for checkpoint loading across schema versions.
//!
//! The same two-resource stack is written in every historical format and
//! must load to the same snapshot shape.

use serde_json::{json, Value};
use tempfile::TempDir;

use stackstate::apitype::{ResourceV1, ResourceV2, DEPLOYMENT_SCHEMA_VERSION_CURRENT};
use stackstate::core::edit::{delete_resource, rename_stack};
use stackstate::core::resource::OperationType;
use stackstate::migrate::up_to_resource_v2;
use stackstate::stack::{
    checkpoint_to_latest, deserialize_checkpoint, read_checkpoint_file, to_json,
    write_checkpoint_file, CheckpointError, CheckpointOptions,
};

const A: &str = "urn:pulumi:dev::web::aws:s3:Bucket::a";
const B: &str = "urn:pulumi:dev::web::aws:s3:Bucket::b";

fn manifest() -> Value {
    json!({"time": "2019-01-01T00:00:00Z", "magic": "", "version": "0.17.0"})
}

fn v1_resources() -> Value {
    json!([
        {"urn": A, "custom": true, "id": "a-id", "type": "aws:s3:Bucket",
         "defaults": {"acl": "private"}, "dependencies": null, "initErrors": null},
        {"urn": B, "custom": true, "id": "b-id", "type": "aws:s3:Bucket",
         "dependencies": [A], "initErrors": null}
    ])
}

fn v1_checkpoint() -> Value {
    json!({
        "stack": "dev",
        "config": {"aws:region": "us-west-2"},
        "latest": {"manifest": manifest(), "resources": v1_resources()}
    })
}

fn v2_checkpoint() -> Value {
    json!({
        "stack": "dev",
        "config": {"aws:region": "us-west-2"},
        "latest": {
            "manifest": manifest(),
            "resources": [
                {"urn": A, "custom": true, "id": "a-id", "type": "aws:s3:Bucket"},
                {"urn": B, "custom": true, "id": "b-id", "type": "aws:s3:Bucket",
                 "dependencies": [A]}
            ]
        }
    })
}

fn v3_checkpoint() -> Value {
    let mut v3 = v2_checkpoint();
    v3["latest"]["secrets_providers"] = json!({"type": "passphrase"});
    v3
}

fn bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

#[test]
fn every_version_loads_to_same_shape() {
    let documents = [
        bytes(&v1_checkpoint()),
        bytes(&json!({"version": 1, "checkpoint": v1_checkpoint()})),
        bytes(&json!({"version": 2, "checkpoint": v2_checkpoint()})),
        bytes(&json!({"version": 3, "checkpoint": v3_checkpoint()})),
    ];

    for document in &documents {
        let loaded = deserialize_checkpoint(document, &CheckpointOptions::default()).unwrap();
        assert_eq!(loaded.stack, "dev");
        assert_eq!(loaded.config["aws:region"], json!("us-west-2"));

        let snap = loaded.snapshot.unwrap();
        let names: Vec<_> = snap.resources.iter().map(|r| r.urn.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(snap.resources[1].dependencies[0].as_str(), A);
        assert!(snap.resources.iter().all(|r| !r.external));
        assert!(snap.resources.iter().all(|r| r.provider.is_empty()));
        assert_eq!(snap.manifest.version, "0.17.0");
    }
}

#[test]
fn newer_version_is_rejected() {
    let document = bytes(&json!({
        "version": DEPLOYMENT_SCHEMA_VERSION_CURRENT + 1,
        "checkpoint": v3_checkpoint()
    }));
    let err = checkpoint_to_latest(&document).unwrap_err();
    assert!(matches!(err, CheckpointError::UnsupportedVersion { version: 4 }));
    assert!(err.to_string().contains("newest supported: 3"));
}

#[test]
fn payload_must_match_declared_version() {
    let document = bytes(&json!({"version": 2, "checkpoint": "nope"}));
    assert!(matches!(
        checkpoint_to_latest(&document),
        Err(CheckpointError::Parse(_))
    ));
}

#[test]
fn pending_operations_survive_v2() {
    let mut v2 = v2_checkpoint();
    v2["latest"]["pending_operations"] = json!([
        {"resource": {"urn": "urn:pulumi:dev::web::aws:s3:Bucket::c", "custom": true,
                      "type": "aws:s3:Bucket"},
         "type": "creating"}
    ]);
    let loaded = deserialize_checkpoint(
        &bytes(&json!({"version": 2, "checkpoint": v2})),
        &CheckpointOptions::default(),
    )
    .unwrap();
    let snap = loaded.snapshot.unwrap();
    assert_eq!(snap.pending_operations.len(), 1);
    assert_eq!(snap.pending_operations[0].op_type, OperationType::Creating);
}

#[test]
fn broken_snapshot_needs_integrity_override() {
    let mut v3 = v3_checkpoint();
    v3["latest"]["resources"]
        .as_array_mut()
        .unwrap()
        .reverse();
    let document = bytes(&json!({"version": 3, "checkpoint": v3}));

    let err = deserialize_checkpoint(&document, &CheckpointOptions::default()).unwrap_err();
    assert!(matches!(err, CheckpointError::Integrity(_)));

    let options = CheckpointOptions {
        disable_integrity_checking: true,
        ..Default::default()
    };
    let mut snap = deserialize_checkpoint(&document, &options)
        .unwrap()
        .snapshot
        .unwrap();
    snap.toposort().unwrap();
    snap.verify_integrity().unwrap();
}

#[test]
fn resource_v1_migration_drops_defaults() {
    let v1: ResourceV1 = serde_json::from_value(json!({
        "urn": A, "custom": true, "type": "aws:s3:Bucket",
        "defaults": {"x": 1}, "dependencies": [], "initErrors": []
    }))
    .unwrap();
    assert_eq!(v1.defaults["x"], json!(1));

    let v2: ResourceV2 = up_to_resource_v2(v1);
    assert!(!v2.external);
    assert!(v2.provider.is_empty());
    let wire = serde_json::to_value(&v2).unwrap();
    assert!(wire.get("defaults").is_none());
}

#[test]
fn file_round_trip_with_edits() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stacks/dev.json");

    let options = CheckpointOptions::default();
    let mut loaded = deserialize_checkpoint(&bytes(&v1_checkpoint()), &options).unwrap();
    let snap = loaded.snapshot.as_mut().unwrap();
    delete_resource(snap, 1, None, false).unwrap();
    rename_stack(snap, "prod", None).unwrap();
    loaded.stack = "prod".to_string();

    write_checkpoint_file(&path, &loaded, &options).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("{\n    \"version\": 3,"));

    let reread = read_checkpoint_file(&path, &options).unwrap();
    assert_eq!(reread, loaded);
    let names: Vec<_> = reread
        .snapshot
        .as_ref()
        .unwrap()
        .resources
        .iter()
        .map(|r| r.urn.as_str())
        .collect();
    assert_eq!(names, vec!["urn:pulumi:prod::web::aws:s3:Bucket::a"]);
}

#[test]
fn compact_output_when_not_pretty() {
    let checkpoint = checkpoint_to_latest(&bytes(&v1_checkpoint())).unwrap();
    let out = to_json(&checkpoint, false).unwrap();
    assert!(!out.contains(&b'\n'));
}

#[test]
fn missing_file_reports_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("absent.json");
    let err = read_checkpoint_file(&path, &CheckpointOptions::default()).unwrap_err();
    assert!(format!("{err:#}").contains("absent.json"));
}

#[test]
fn qualified_stack_name_round_trips() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("acme-web-dev.json");

    let mut v3 = v3_checkpoint();
    v3["stack"] = json!("acme/web/dev");
    let options = CheckpointOptions::default();
    let loaded = deserialize_checkpoint(&bytes(&json!({"version": 3, "checkpoint": v3})), &options)
        .unwrap();
    assert_eq!(loaded.stack, "acme/web/dev");

    write_checkpoint_file(&path, &loaded, &options).unwrap();
    let reread = read_checkpoint_file(&path, &options).unwrap();
    assert_eq!(reread, loaded);
}
