//! End-to-end scenarios driven over real `UnixStream` pairs, one registry instance shared by
//! every connection in a given test (as `regd`'s own `main` shares one `Arc<KcontRegistry>`
//! across every accepted connection).

use std::sync::Arc;

use regctl::{KcontClient, VarsClient};
use regd::control::{kcont, vars};
use regd::kcont::KcontRegistry;
use regd::vars::VarsRegistry;
use shared::wire::VarDesc;
use shared::{IpcError, TypeTag};
use tempfile::tempdir;
use tokio::net::UnixListener;

async fn spawn_kcont_server(registry: Arc<KcontRegistry>) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kcont.sock");
    let listener = UnixListener::bind(&path).unwrap();
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::spawn(kcont::serve(stream, registry.clone()));
        }
    });
    (dir, path)
}

async fn spawn_vars_server(registry: Arc<VarsRegistry>) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vars.sock");
    let listener = UnixListener::bind(&path).unwrap();
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::spawn(vars::serve(stream, registry.clone()));
        }
    });
    (dir, path)
}

/// Scenario 1: a kcont outlives the session that created it; a second session's `GET_FD`
/// sees the same backing pages and the refcounts `RELEASE_FD` left behind.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn persists_across_sessions() {
    let registry = Arc::new(KcontRegistry::new(16));
    let (_dir, socket) = spawn_kcont_server(registry).await;

    let mut s1 = KcontClient::connect(&socket).await.unwrap();
    s1.create(9999, 4).await.unwrap();
    {
        let handle = s1.get_fd(9999).await.unwrap();
        let mut map = handle.map().unwrap();
        map[0..4].copy_from_slice(&[0, 0, 0, 0]);
    } // KcontHandle::drop issues RELEASE_FD synchronously here
    drop(s1);

    // Give the synchronous RELEASE_FD connection (opened from Drop) a moment to land.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let mut s2 = KcontClient::connect(&socket).await.unwrap();
    let _handle = s2.get_fd(9999).await.unwrap();
    let info = s2.info(9999).await.unwrap();
    assert_eq!(info.size, 4096);
    assert_eq!(info.user_refs, 1);
    assert!(info.kernel_refs >= 1);
}

/// Scenario 2: `DESTROY` refuses while a descriptor is outstanding, then succeeds once
/// released.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn destroy_refuses_while_mapped() {
    let registry = Arc::new(KcontRegistry::new(16));
    let (_dir, socket) = spawn_kcont_server(registry).await;

    let mut client = KcontClient::connect(&socket).await.unwrap();
    client.create(1, 4096).await.unwrap();
    let handle = client.get_fd(1).await.unwrap();
    let _mapping = handle.map().unwrap();

    assert_eq!(daemon_error(&client.destroy(1).await), Some(IpcError::Busy));

    drop(handle);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    client.destroy(1).await.unwrap();
}

/// Scenario 3: two sessions race to `CREATE` the same id; exactly one wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_create_races_have_exactly_one_winner() {
    let registry = Arc::new(KcontRegistry::new(16));
    let (_dir, socket) = spawn_kcont_server(registry).await;

    let a = {
        let socket = socket.clone();
        tokio::spawn(async move {
            let mut client = KcontClient::connect(&socket).await.unwrap();
            client.create(7, 64).await
        })
    };
    let b = {
        let socket = socket.clone();
        tokio::spawn(async move {
            let mut client = KcontClient::connect(&socket).await.unwrap();
            client.create(7, 64).await
        })
    };

    let (a, b) = tokio::join!(a, b);
    let (a, b) = (a.unwrap(), b.unwrap());
    let successes = a.is_ok() as u8 + b.is_ok() as u8;
    let conflicts = (daemon_error(&a) == Some(IpcError::AlreadyExists)) as u8
        + (daemon_error(&b) == Some(IpcError::AlreadyExists)) as u8;
    assert_eq!((successes, conflicts), (1, 1));

    let mut client = KcontClient::connect(&socket).await.unwrap();
    assert_eq!(client.info(7).await.unwrap().size, 64);
}

/// Scenario 4: a `SET` followed by a `GET` on the same variable returns what was written.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn vars_round_trip() {
    let registry = Arc::new(VarsRegistry::new(8));
    let (_dir, socket) = spawn_vars_server(registry).await;

    let mut client = VarsClient::connect(&socket).await.unwrap();
    client
        .register("c", vec![VarDesc { name: "counter".into(), type_tag: TypeTag::I64.wire_value(), capacity: 8 }])
        .await
        .unwrap();
    client.open_container("c").await.unwrap();
    client.set("counter", &42i64.to_le_bytes()).await.unwrap();
    let data = client.get("counter", 8).await.unwrap();
    assert_eq!(i64::from_le_bytes(data.try_into().unwrap()), 42);
    client.close_container().await.unwrap();
}

/// Scenario 5: requesting a buffer of the wrong size leaves storage untouched.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn vars_wrong_size_buffer_is_rejected() {
    let registry = Arc::new(VarsRegistry::new(8));
    let (_dir, socket) = spawn_vars_server(registry).await;

    let mut client = VarsClient::connect(&socket).await.unwrap();
    client
        .register("c", vec![VarDesc { name: "counter".into(), type_tag: TypeTag::I64.wire_value(), capacity: 8 }])
        .await
        .unwrap();
    client.open_container("c").await.unwrap();
    client.set("counter", &42i64.to_le_bytes()).await.unwrap();

    assert_eq!(daemon_error(&client.get("counter", 4).await), Some(IpcError::InvalidArgument));

    let data = client.get("counter", 8).await.unwrap();
    assert_eq!(i64::from_le_bytes(data.try_into().unwrap()), 42);
}

/// Scenario 6: a session that drops without an explicit `CLOSE_CONTAINER` still releases its
/// reference, and since that was the container's only outstanding open, it is unlinked.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abrupt_session_teardown_releases_its_container_ref() {
    let registry = Arc::new(VarsRegistry::new(8));
    let (_dir, socket) = spawn_vars_server(registry.clone()).await;

    {
        let mut client = VarsClient::connect(&socket).await.unwrap();
        client.register("c", vec![]).await.unwrap();
        client.open_container("c").await.unwrap();
        // client, and the connection backing its session, drop here without CLOSE_CONTAINER
    }
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let mut client = VarsClient::connect(&socket).await.unwrap();
    client.register("d", vec![]).await.unwrap();
    // "c" is gone: the leaked session's drop brought its only reference to zero
    assert_eq!(client.list_containers().await.unwrap(), vec!["d".to_string()]);
    assert_eq!(registry.open("c").err(), Some(IpcError::NotFound));
}

fn daemon_error<T>(result: &Result<T, regctl::ClientError>) -> Option<IpcError> {
    match result {
        Err(regctl::ClientError::Daemon(e)) => Some(*e),
        _ => None,
    }
}
