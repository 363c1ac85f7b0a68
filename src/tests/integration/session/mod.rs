//! N11 session signaling integration tests
//!
//! Drives the asynchronous client over the HTTP/2 transport against a fake
//! sessiond.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use ngcore_n11::proto::{NotifyUeEvent, PduSessionType, RequestType, SmSessionFsmState};
use ngcore_n11::{
    create_sm_notification, AsyncSmfServiceClient, Apn, HttpSmfChannel, Imsi, N11Config,
    PduSessionParams, RpcCode, RpcStatus, ServiceRegistry, SmNotificationParams, SESSIOND_SERVICE,
};

use crate::common::*;

fn params() -> PduSessionParams {
    let mut p = PduSessionParams::new(Imsi::new("001010000000001").unwrap(), Apn::from_cstr(b"internet\0").unwrap(), 5);
    p.pdu_session_type = PduSessionType::Ipv4;
    p.gnb_gtp_teid = 0x0000_1234;
    p.pti = 0x01;
    p.gnb_gtp_teid_ip_addr = [192, 168, 1, 1];
    p.ue_ipv6 = "2001:db8::5".into();
    p
}

fn start_client(sessiond: &FakeSessiond, timeout_ms: u64) -> Arc<AsyncSmfServiceClient> {
    let mut services = ServiceRegistry::empty();
    services.register(SESSIOND_SERVICE, sessiond.endpoint());
    let config = N11Config {
        response_timeout_ms: timeout_ms,
        services,
    };
    let channel = HttpSmfChannel::for_service(&config.services, SESSIOND_SERVICE, Handle::current()).unwrap();
    AsyncSmfServiceClient::start(Arc::new(channel), &config).unwrap()
}

async fn session_status(client: &AsyncSmfServiceClient) -> RpcStatus {
    let (tx, rx) = oneshot::channel();
    client.set_smf_session_rpc(ngcore_n11::create_sm_pdu_session(&params()), move |status, _| {
        let _ = tx.send(status);
    });
    tokio::time::timeout(Duration::from_secs(10), rx).await.unwrap().unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pdu_session_establishment() {
    let _ = env_logger::try_init();

    let sessiond = FakeSessiond::start(Reply::ok()).await;
    let client = start_client(&sessiond, 2000);

    let status = session_status(&client).await;
    assert!(status.is_ok(), "unexpected status {status}");
    assert_eq!(client.in_flight(), 0);

    let received = sessiond.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].path, "/magma.lte.AmfPduSessionSmContext/SetAmfSessionContext");

    let body = &received[0].body;
    let common = &body["common_context"];
    assert_eq!(common["sid"]["id"], "IMSI001010000000001");
    assert_eq!(common["sid"]["type"], 0);
    assert_eq!(common["apn"], "internet");
    assert_eq!(common["rat_type"], 2);
    assert_eq!(common["sm_session_state"], 0);
    assert!(common.get("ue_ipv4").is_none());
    assert_eq!(common["ue_ipv6"], "2001:db8::5");

    let ctx = &body["rat_specific_context"]["m5gsm_session_context"];
    assert_eq!(ctx["pdu_session_id"], 5);
    assert_eq!(ctx["request_type"], 0);
    assert_eq!(ctx["gnode_endpoint"]["teid"], 0x1234);
    assert_eq!(ctx["gnode_endpoint"]["end_ipv4_addr"], "192.168.1.1");
    assert_eq!(ctx["procedure_trans_identity"], serde_json::json!([1]));

    client.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_notification() {
    let _ = env_logger::try_init();

    let sessiond = FakeSessiond::start(Reply::ok()).await;
    let client = start_client(&sessiond, 2000);

    let notify = create_sm_notification(&SmNotificationParams {
        imsi: Imsi::new("001010000000001").unwrap(),
        apn: Apn::from("internet"),
        pdu_session_id: 5,
        request_type: RequestType::ExistingPduSession,
        sm_session_state: SmSessionFsmState::Active2,
        version: 1,
        event: NotifyUeEvent::UeIdleModeNotify,
    });
    let (tx, rx) = oneshot::channel();
    client.set_smf_notification_rpc(notify, move |status, _| {
        let _ = tx.send(status);
    });
    let status = tokio::time::timeout(Duration::from_secs(10), rx).await.unwrap().unwrap();
    assert!(status.is_ok());

    let received = sessiond.received();
    assert_eq!(received[0].path, "/magma.lte.AmfPduSessionSmContext/SetSmfNotification");
    assert_eq!(received[0].body["rat_specific_notification"]["notify_ue_event"], 1);
    client.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_peer_error_status_reported() {
    let _ = env_logger::try_init();

    let sessiond = FakeSessiond::start(Reply::status(503)).await;
    let client = start_client(&sessiond, 2000);

    let status = session_status(&client).await;
    assert_eq!(status.code, RpcCode::Unavailable);
    client.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_peer_times_out_once() {
    let _ = env_logger::try_init();

    let sessiond = FakeSessiond::start(Reply::delayed(Duration::from_millis(600))).await;
    let client = start_client(&sessiond, 100);

    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let counter = Arc::clone(&calls);
    client.set_smf_session_rpc(ngcore_n11::create_sm_pdu_session(&params()), move |status, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(status);
    });

    let status = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(status.code, RpcCode::DeadlineExceeded);
    assert_eq!(client.in_flight(), 0);

    // the late answer must not produce a second callback
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    client.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_sessions_each_answered_once() {
    let _ = env_logger::try_init();

    const SESSIONS: u32 = 32;
    let sessiond = FakeSessiond::start(Reply::ok()).await;
    let client = start_client(&sessiond, 5000);

    let (tx, mut rx) = mpsc::unbounded_channel();
    for id in 1..=SESSIONS {
        let tx = tx.clone();
        let mut p = params();
        p.pdu_session_id = id;
        client.set_smf_session_rpc(ngcore_n11::create_sm_pdu_session(&p), move |status, _| {
            let _ = tx.send((id, status));
        });
    }
    drop(tx);

    let mut seen = vec![0u32; SESSIONS as usize + 1];
    while let Some((id, status)) = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await.unwrap() {
        assert!(status.is_ok());
        seen[id as usize] += 1;
    }
    assert!(seen[1..].iter().all(|&n| n == 1));
    assert_eq!(sessiond.received().len(), SESSIONS as usize);
    client.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unreachable_sessiond() {
    let _ = env_logger::try_init();

    let sessiond = FakeSessiond::start(Reply::ok()).await;
    let endpoint = sessiond.endpoint();
    drop(sessiond);
    // give the aborted listener time to close
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut services = ServiceRegistry::empty();
    services.register(SESSIOND_SERVICE, endpoint);
    let config = N11Config {
        response_timeout_ms: 2000,
        services,
    };
    let channel = HttpSmfChannel::for_service(&config.services, SESSIOND_SERVICE, Handle::current()).unwrap();
    let client = AsyncSmfServiceClient::start(Arc::new(channel), &config).unwrap();

    let status = session_status(&client).await;
    assert_eq!(status.code, RpcCode::Unavailable);
    client.shutdown();
}
