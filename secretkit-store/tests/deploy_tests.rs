//! Deployer Tests

use async_trait::async_trait;
use secretkit_store::{
    Base64JsonCodec, DeleteOptions, DeployOutcome, DeployRequest, MemoryStore, Payload,
    RemoteResource, ResourceKind, ResourceStore, SecretDeployer, SecretError, SecretResult,
    TagSet, UpdateMode, ValueType, WriteReceipt, WriteSpec,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn setup(kind: ResourceKind) -> (Arc<MemoryStore>, SecretDeployer) {
    let store = Arc::new(MemoryStore::new(kind).unwrap());
    let deployer = SecretDeployer::with_codec(store.clone(), Arc::new(Base64JsonCodec));
    (store, deployer)
}

fn tags(pairs: &[(&str, &str)]) -> TagSet {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_duplicate_deploy_writes_once() {
    let (store, deployer) = setup(ResourceKind::Parameter);
    let payload = Payload::json(json!({"mydb": {"host": "localhost", "port": 5432}}));

    let first = deployer
        .deploy("/app/config", &payload, &DeployRequest::new())
        .await
        .unwrap();
    assert_eq!(first.receipt().unwrap().version, "1");

    let second = deployer
        .deploy("/app/config", &payload, &DeployRequest::new())
        .await
        .unwrap();
    assert!(second.is_noop());
    assert_eq!(store.write_count(), 1);

    let current = deployer.get_resource("/app/config").await.unwrap();
    assert_eq!(current.version, "1");
}

#[tokio::test]
async fn test_key_order_does_not_defeat_duplicate_skip() {
    let (store, deployer) = setup(ResourceKind::Parameter);
    deployer
        .deploy("cfg", &Payload::json(json!({"a": 1, "b": 2})), &DeployRequest::new())
        .await
        .unwrap();
    let outcome = deployer
        .deploy("cfg", &Payload::json(json!({"b": 2, "a": 1})), &DeployRequest::new())
        .await
        .unwrap();
    assert!(outcome.is_noop());
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_changed_content_is_written() {
    let (_, deployer) = setup(ResourceKind::Parameter);
    deployer.deploy("greeting", &"hello".into(), &DeployRequest::new()).await.unwrap();
    let outcome = deployer
        .deploy("greeting", &"hello world".into(), &DeployRequest::new())
        .await
        .unwrap();

    assert_eq!(outcome.receipt().unwrap().version, "2");
    let current = deployer.get_resource("greeting").await.unwrap();
    assert_eq!(current.string(), Some("hello world"));
}

#[tokio::test]
async fn test_skip_disabled_always_writes() {
    let (store, deployer) = setup(ResourceKind::Parameter);
    let request = DeployRequest::new().skip_duplicate(false);

    deployer.deploy("token", &"abc".into(), &request).await.unwrap();
    let outcome = deployer.deploy("token", &"abc".into(), &request).await.unwrap();

    assert_eq!(outcome.receipt().unwrap().version, "2");
    assert_eq!(store.write_count(), 2);
}

#[tokio::test]
async fn test_create_mode_propagates_collision() {
    let (_, deployer) = setup(ResourceKind::Secret);
    let request = DeployRequest::new().update_mode(UpdateMode::Create);

    deployer.deploy("db", &"pw".into(), &request).await.unwrap();
    let err = deployer.deploy("db", &"pw".into(), &request).await.unwrap_err();
    assert!(matches!(err, SecretError::AlreadyExists(_)));
}

#[tokio::test]
async fn test_try_create_is_noop_on_collision() {
    let (store, deployer) = setup(ResourceKind::Secret);
    let request = DeployRequest::new().update_mode(UpdateMode::TryCreate);

    deployer.deploy("db", &"first".into(), &request).await.unwrap();
    let outcome = deployer.deploy("db", &"second".into(), &request).await.unwrap();

    assert_eq!(outcome, DeployOutcome::NoOp);
    assert_eq!(store.write_count(), 1);
    let current = deployer.get_resource("db").await.unwrap();
    assert_eq!(current.string(), Some("first"));
}

#[tokio::test]
async fn test_conflicting_key_arguments_fail_before_remote_call() {
    let (store, deployer) = setup(ResourceKind::Parameter);
    let request = DeployRequest::new()
        .kms_key_id("alias/app")
        .use_default_kms_key(true);

    let err = deployer.deploy("x", &"v".into(), &request).await.unwrap_err();
    assert!(matches!(err, SecretError::ConflictingArguments(_)));
    assert_eq!(store.write_count(), 0);
    assert!(deployer.find_resource("x").await.unwrap().is_none());
}

#[tokio::test]
async fn test_plain_type_with_key_is_rejected() {
    let (_, deployer) = setup(ResourceKind::Parameter);
    let request = DeployRequest::new()
        .value_type(ValueType::String)
        .kms_key_id("alias/app");

    let err = deployer.deploy("x", &"v".into(), &request).await.unwrap_err();
    assert!(matches!(err, SecretError::InvalidTypeForEncryption(_)));
}

#[tokio::test]
async fn test_secure_parameter_is_decrypted_for_compare() {
    let (store, deployer) = setup(ResourceKind::Parameter);
    let request = DeployRequest::new().use_default_kms_key(true);

    deployer.deploy("db-password", &"hunter2".into(), &request).await.unwrap();
    let outcome = deployer.deploy("db-password", &"hunter2".into(), &request).await.unwrap();
    assert!(outcome.is_noop());
    assert_eq!(store.write_count(), 1);

    let raw = store.get_resource("db-password", false).await.unwrap();
    assert_eq!(raw.value_type, ValueType::SecureString);
    assert_ne!(raw.string(), Some("hunter2"));

    let current = deployer.get_resource("db-password").await.unwrap();
    assert_eq!(current.string(), Some("hunter2"));
}

#[tokio::test]
async fn test_string_list_round_trip() {
    let (_, deployer) = setup(ResourceKind::Parameter);
    let payload: Payload = vec!["s3://a".to_string(), "s3://b".to_string()].into();
    let request = DeployRequest::new().value_type(ValueType::StringList);

    deployer.deploy("buckets", &payload, &request).await.unwrap();
    let current = deployer.get_resource("buckets").await.unwrap();
    assert_eq!(current.value_type, ValueType::StringList);
    assert_eq!(current.string_list().unwrap(), vec!["s3://a", "s3://b"]);

    let bad: Payload = vec!["a,b".to_string()].into();
    let err = deployer.deploy("buckets", &bad, &request).await.unwrap_err();
    assert!(matches!(err, SecretError::EncodingConflict(_)));
}

#[tokio::test]
async fn test_tags_absent_left_untouched() {
    let (store, deployer) = setup(ResourceKind::Secret);
    let request = DeployRequest::new().tags([("Env", "prod"), ("Team", "data")]);
    deployer.deploy("s", &"v1".into(), &request).await.unwrap();

    deployer.deploy("s", &"v2".into(), &DeployRequest::new()).await.unwrap();
    assert_eq!(
        store.list_tags("s").await.unwrap(),
        tags(&[("Env", "prod"), ("Team", "data")])
    );
}

#[tokio::test]
async fn test_empty_tags_remove_all() {
    let (store, deployer) = setup(ResourceKind::Secret);
    let request = DeployRequest::new().tags([("Env", "prod")]);
    deployer.deploy("s", &"v".into(), &request).await.unwrap();

    let clear = DeployRequest {
        tags: Some(TagSet::new()),
        ..DeployRequest::new()
    };
    let outcome = deployer.deploy("s", &"v".into(), &clear).await.unwrap();
    assert!(outcome.is_noop());
    assert!(store.list_tags("s").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_tags_on_untagged_resource_makes_no_tag_calls() {
    let (store, deployer) = setup(ResourceKind::Secret);
    deployer.deploy("s", &"v".into(), &DeployRequest::new()).await.unwrap();

    deployer.reconcile_tags("s", Some(&TagSet::new())).await.unwrap();
    assert_eq!(store.tag_call_count(), 0);
}

#[tokio::test]
async fn test_tags_fully_replaced_without_content_change() {
    let (store, deployer) = setup(ResourceKind::Parameter);
    let request = DeployRequest::new().tags([("Env", "dev"), ("Owner", "alice")]);
    deployer.deploy("p", &"v".into(), &request).await.unwrap();

    let request = DeployRequest::new().tags([("Env", "prod"), ("Project", "x")]);
    let outcome = deployer.deploy("p", &"v".into(), &request).await.unwrap();

    assert!(outcome.is_noop());
    assert_eq!(store.write_count(), 1);
    assert_eq!(
        store.list_tags("p").await.unwrap(),
        tags(&[("Env", "prod"), ("Project", "x")])
    );
}

#[tokio::test]
async fn test_upsert_without_skip_creates_with_tags() {
    let (store, deployer) = setup(ResourceKind::Secret);
    let request = DeployRequest::new()
        .skip_duplicate(false)
        .tags([("Env", "prod")]);

    let outcome = deployer.deploy("fresh", &"v".into(), &request).await.unwrap();
    assert_eq!(outcome.receipt().unwrap().version, "1");
    assert_eq!(store.list_tags("fresh").await.unwrap(), tags(&[("Env", "prod")]));
}

#[tokio::test]
async fn test_binary_secret() {
    let (_, deployer) = setup(ResourceKind::Secret);
    let payload: Payload = vec![0u8, 159, 146, 150].into();

    deployer.deploy("blob", &payload, &DeployRequest::new()).await.unwrap();
    let outcome = deployer.deploy("blob", &payload, &DeployRequest::new()).await.unwrap();
    assert!(outcome.is_noop());

    let current = deployer.get_resource("blob").await.unwrap();
    assert_eq!(current.binary(), Some(&[0u8, 159, 146, 150][..]));

    let (_, params) = setup(ResourceKind::Parameter);
    let err = params.deploy("blob", &payload, &DeployRequest::new()).await.unwrap_err();
    assert!(matches!(err, SecretError::EncodingConflict(_)));
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[tokio::test]
async fn test_object_payload() {
    let (_, deployer) = setup(ResourceKind::Secret);
    let creds = Credentials {
        username: "alice".to_string(),
        password: "secret".to_string(),
    };

    deployer
        .deploy("creds", &Payload::object(&creds).unwrap(), &DeployRequest::new())
        .await
        .unwrap();
    let loaded: Credentials = deployer.get_object("creds").await.unwrap();
    assert_eq!(loaded, creds);
}

#[tokio::test]
async fn test_object_payload_without_codec() {
    let store = Arc::new(MemoryStore::new(ResourceKind::Secret).unwrap());
    let deployer = SecretDeployer::new(store.clone());
    let payload = Payload::object(&json!({"k": "v"})).unwrap();

    let err = deployer.deploy("obj", &payload, &DeployRequest::new()).await.unwrap_err();
    assert!(matches!(err, SecretError::SerializationUnavailable(_)));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_get_value_by_path() {
    let (_, deployer) = setup(ResourceKind::Parameter);
    let payload = Payload::json(json!({"mydb": {"host": "localhost", "port": 5432}}));
    deployer.deploy("cfg", &payload, &DeployRequest::new()).await.unwrap();

    assert_eq!(deployer.get_value("cfg", "mydb.host").await.unwrap(), json!("localhost"));
    assert_eq!(deployer.get_value("cfg", ".mydb.port").await.unwrap(), json!(5432));
    assert!(matches!(
        deployer.get_value("cfg", "mydb.user").await,
        Err(SecretError::KeyNotFound(_))
    ));
    assert_eq!(
        deployer.get_data("cfg").await.unwrap(),
        json!({"mydb": {"host": "localhost", "port": 5432}})
    );
}

#[tokio::test]
async fn test_delete() {
    let (_, deployer) = setup(ResourceKind::Secret);
    deployer.deploy("gone", &"v".into(), &DeployRequest::new()).await.unwrap();

    let options = DeleteOptions {
        force_delete_without_recovery: true,
        ..DeleteOptions::default()
    };
    assert!(deployer.delete("gone", &options).await.unwrap());
    assert!(!deployer.delete("gone", &options).await.unwrap());
    assert!(deployer.find_resource("gone").await.unwrap().is_none());
    assert!(matches!(
        deployer.get_resource("gone").await,
        Err(SecretError::NotFound(_))
    ));
}

/// Memory store that records the key id of every update
struct KeyRecordingStore {
    inner: MemoryStore,
    update_key_ids: Mutex<Vec<Option<String>>>,
}

#[async_trait]
impl ResourceStore for KeyRecordingStore {
    fn kind(&self) -> ResourceKind {
        self.inner.kind()
    }

    async fn get_resource(
        &self,
        name: &str,
        with_decryption: bool,
    ) -> SecretResult<RemoteResource> {
        self.inner.get_resource(name, with_decryption).await
    }

    async fn create_resource(&self, spec: &WriteSpec) -> SecretResult<WriteReceipt> {
        self.inner.create_resource(spec).await
    }

    async fn update_resource(&self, spec: &WriteSpec) -> SecretResult<WriteReceipt> {
        self.update_key_ids.lock().unwrap().push(spec.key_id.clone());
        self.inner.update_resource(spec).await
    }

    async fn delete_resource(&self, name: &str, options: &DeleteOptions) -> SecretResult<()> {
        self.inner.delete_resource(name, options).await
    }

    async fn list_tags(&self, name: &str) -> SecretResult<TagSet> {
        self.inner.list_tags(name).await
    }

    async fn add_tags(&self, name: &str, tags: &TagSet) -> SecretResult<()> {
        self.inner.add_tags(name, tags).await
    }

    async fn remove_tags(&self, name: &str, keys: &[String]) -> SecretResult<()> {
        self.inner.remove_tags(name, keys).await
    }
}

#[tokio::test]
async fn test_secret_update_keeps_customer_key() {
    let store = Arc::new(KeyRecordingStore {
        inner: MemoryStore::new(ResourceKind::Secret).unwrap(),
        update_key_ids: Mutex::new(Vec::new()),
    });
    let deployer = SecretDeployer::new(store.clone());
    let cmk = "arn:aws:kms:us-east-1:123456789012:key/cmk";

    deployer
        .deploy("db", &"v1".into(), &DeployRequest::new().kms_key_id(cmk))
        .await
        .unwrap();
    deployer.deploy("db", &"v2".into(), &DeployRequest::new()).await.unwrap();

    assert_eq!(*store.update_key_ids.lock().unwrap(), vec![None]);
    assert_eq!(store.inner.key_id("db").await.unwrap(), cmk);
    let current = deployer.get_resource("db").await.unwrap();
    assert_eq!(current.string(), Some("v2"));

    deployer
        .deploy("db", &"v3".into(), &DeployRequest::new().use_default_kms_key(true))
        .await
        .unwrap();
    assert_eq!(store.inner.key_id("db").await.unwrap(), "alias/aws/secretsmanager");
}

#[tokio::test]
async fn test_tags_fully_replaced_with_content_change() {
    let (store, deployer) = setup(ResourceKind::Secret);
    let request = DeployRequest::new().tags([("A", "1"), ("B", "1")]);
    deployer.deploy("s", &"v1".into(), &request).await.unwrap();

    let request = DeployRequest::new().tags([("B", "2"), ("C", "1")]);
    let outcome = deployer.deploy("s", &"v2".into(), &request).await.unwrap();

    assert_eq!(outcome.receipt().unwrap().version, "2");
    assert_eq!(store.list_tags("s").await.unwrap(), tags(&[("B", "2"), ("C", "1")]));
}
