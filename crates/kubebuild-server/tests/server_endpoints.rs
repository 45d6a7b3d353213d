use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kubebuild_core::{Deployment, ENABLE_POD_ANNOTATION, ObjectKey, deployment_key};
use kubebuild_server::{AppConfig, ServerBuilder};
use kubebuild_storage::{DynStore, StoreExt};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

async fn start_server() -> (String, DynStore, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let server = ServerBuilder::new().with_config(AppConfig::default()).build();
    let store = server.store();

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = server
            .serve(listener, async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), store, tx, handle)
}

fn admission_review(operation: &str, object: Value) -> Value {
    json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": "e911857d-c318-11e8-bbad-025000000001",
            "operation": operation,
            "name": "web",
            "namespace": "shop",
            "object": object
        }
    })
}

#[tokio::test]
async fn health_endpoints_work() {
    let (base, _store, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "kubebuild");

    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let resp = client.get(format!("{base}/readyz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["store"], "memory");
    assert_eq!(body["preset"], "full");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn admission_webhooks_default_and_validate() {
    let (base, _store, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    // Mutate: unset replicas and image are patched in
    let object = json!({
        "apiVersion": "buildcrd.k8s.example.io/v2",
        "kind": "App",
        "metadata": { "name": "web", "namespace": "shop" },
        "spec": { "enableService": true }
    });
    let resp = client
        .post(format!("{base}/mutate-buildcrd-k8s-example-io-v2-app"))
        .json(&admission_review("CREATE", object))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    let response = &body["response"];
    assert_eq!(response["uid"], "e911857d-c318-11e8-bbad-025000000001");
    assert_eq!(response["allowed"], true);
    assert_eq!(response["patchType"], "JSONPatch");

    let patch_bytes = STANDARD
        .decode(response["patch"].as_str().unwrap())
        .unwrap();
    let patch: Value = serde_json::from_slice(&patch_bytes).unwrap();
    let paths: Vec<&str> = patch
        .as_array()
        .unwrap()
        .iter()
        .map(|op| op["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"/spec/replicas"));
    assert!(paths.contains(&"/spec/image"));

    // Validate: three replicas are denied
    let object = json!({
        "apiVersion": "buildcrd.k8s.example.io/v2",
        "kind": "App",
        "metadata": { "name": "web", "namespace": "shop" },
        "spec": { "replicas": 3, "image": "nginx" }
    });
    let resp = client
        .post(format!("{base}/validate-buildcrd-k8s-example-io-v2-app"))
        .json(&admission_review("CREATE", object))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["response"]["allowed"], false);
    assert_eq!(body["response"]["status"]["code"], 403);
    assert!(
        body["response"]["status"]["message"]
            .as_str()
            .unwrap()
            .contains("spec.replicas")
    );

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn conversion_webhook_round_trips_enable_pod() {
    let (base, _store, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    let review = |desired: &str, object: Value| {
        json!({
            "apiVersion": "apiextensions.k8s.io/v1",
            "kind": "ConversionReview",
            "request": { "uid": "c1", "desiredAPIVersion": desired, "objects": [object] }
        })
    };

    let v2 = json!({
        "apiVersion": "buildcrd.k8s.example.io/v2",
        "kind": "App",
        "metadata": { "name": "web", "namespace": "shop" },
        "spec": { "replicas": 1, "image": "nginx", "enablePod": true }
    });
    let resp = client
        .post(format!("{base}/convert"))
        .json(&review("buildcrd.k8s.example.io/v1", v2))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["response"]["result"]["status"], "Success");
    let v1 = body["response"]["convertedObjects"][0].clone();
    assert_eq!(v1["apiVersion"], "buildcrd.k8s.example.io/v1");
    assert_eq!(v1["metadata"]["annotations"][ENABLE_POD_ANNOTATION], "true");

    let resp = client
        .post(format!("{base}/convert"))
        .json(&review("buildcrd.k8s.example.io/v2", v1))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let back = &body["response"]["convertedObjects"][0];
    assert_eq!(back["apiVersion"], "buildcrd.k8s.example.io/v2");
    assert_eq!(back["spec"]["enablePod"], true);
    assert!(back["metadata"].get("annotations").is_none());

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn put_app_is_reconciled() {
    let (base, store, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();
    let url = format!("{base}/apis/buildcrd.k8s.example.io/v2/namespaces/shop/apps/web");

    // Rejected by the gate
    let resp = client
        .put(&url)
        .json(&json!({ "spec": { "replicas": 5, "image": "nginx" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["reason"], "Invalid");

    // Created with defaults
    let resp = client
        .put(&url)
        .json(&json!({
            "apiVersion": "buildcrd.k8s.example.io/v2",
            "kind": "App",
            "spec": { "image": "nginx:1.27", "enableService": true, "enableIngress": true }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["spec"]["replicas"], 2);

    // The controller creates the Deployment in the background
    let key = deployment_key(&ObjectKey::new("shop", "web"));
    let mut deployment = None;
    for _ in 0..100 {
        if let Some(found) = store.try_get_as::<Deployment>(&key).await.unwrap() {
            deployment = Some(found);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let deployment = deployment.expect("deployment reconciled");
    assert_eq!(deployment.spec.replicas, Some(2));
    assert_eq!(
        deployment.metadata.controller_reference().unwrap().name,
        "web"
    );

    // Replaced
    let resp = client
        .put(&url)
        .json(&json!({ "spec": { "replicas": 1, "image": "nginx:1.27" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    // Read back in the v2 form
    let resp = client.get(&url).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["apiVersion"], "buildcrd.k8s.example.io/v2");
    assert_eq!(body["spec"]["replicas"], 1);
    assert_eq!(body["spec"]["enablePod"], false);
    assert!(body["metadata"].get("annotations").is_none());

    let resp = client
        .get(format!("{base}/apis/buildcrd.k8s.example.io/v2/namespaces/shop/apps"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "AppList");
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
