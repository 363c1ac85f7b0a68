//! Asynchronous sessiond client
//!
//! Calls are fire-and-forget: `submit` registers the call, hands it to the
//! transport and returns. A dedicated thread drains the completion queue and
//! runs each call's callback exactly once, with either the transport's result,
//! `DEADLINE_EXCEEDED` when the response timeout passes first, or `CANCELLED`
//! when the client shuts down.

use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Notify};
use tokio::time::Instant;

use crate::builder::create_sm_pdu_session;
use crate::channel::{CallId, Completion, OutboundCall, ResponseReader, SmfChannel, SmfMethod, SmfRequest};
use crate::config::N11Config;
use crate::error::N11Result;
use crate::legacy::{S6aUpdateLocation, S6aUpdateLocationReq};
use crate::proto::{SetSmNotificationContext, SetSmSessionContext, SmContextVoid};
use crate::status::RpcStatus;
use crate::types::PduSessionParams;

/// Name of the completion-draining thread
pub const RPC_LOOP_THREAD_NAME: &str = "n11-rpc-loop";

/// Expired ids remembered so the transport's own late answer is expected
const RECENTLY_EXPIRED: usize = 1024;

/// Single-shot completion handler
pub type RpcCallback = Box<dyn FnOnce(RpcStatus, SmContextVoid) + Send + 'static>;

struct PendingCall {
    method: SmfMethod,
    deadline: Instant,
    callback: RpcCallback,
}

#[derive(Default)]
struct Registry {
    calls: HashMap<CallId, PendingCall>,
    recently_expired: VecDeque<CallId>,
    closed: bool,
}

impl Registry {
    fn remember_expired(&mut self, id: CallId) {
        if self.recently_expired.len() == RECENTLY_EXPIRED {
            self.recently_expired.pop_front();
        }
        self.recently_expired.push_back(id);
    }

    /// True if `id` expired earlier; forgets it
    fn take_expired(&mut self, id: CallId) -> bool {
        match self.recently_expired.iter().position(|expired| *expired == id) {
            Some(at) => self.recently_expired.remove(at).is_some(),
            None => false,
        }
    }
}

/// State shared between submitters and the loop thread
#[derive(Default)]
struct Shared {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
    wakeup: Notify,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Callbacks never run under the lock
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.registry().calls.values().map(|call| call.deadline).min()
    }

    fn complete(&self, completion: Completion) {
        let (pending, expired) = {
            let mut registry = self.registry();
            match registry.calls.remove(&completion.tag) {
                Some(call) => (Some(call), false),
                None => (None, registry.take_expired(completion.tag)),
            }
        };
        match pending {
            Some(call) => {
                log::debug!("{} call {} completed: {}", call.method, completion.tag, completion.status);
                invoke(call.method, completion.tag, call.callback, completion.status, completion.response);
            }
            None if expired => {
                log::debug!("Dropping late completion for expired call {} ({})", completion.tag, completion.status)
            }
            None => log::warn!("Completion for unknown call {} ({})", completion.tag, completion.status),
        }
    }

    fn expire(&self, now: Instant) {
        let expired: Vec<(CallId, PendingCall)> = {
            let mut registry = self.registry();
            let ids: Vec<CallId> = registry
                .calls
                .iter()
                .filter(|(_, call)| call.deadline <= now)
                .map(|(id, _)| *id)
                .collect();
            let mut expired = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(call) = registry.calls.remove(&id) {
                    registry.remember_expired(id);
                    expired.push((id, call));
                }
            }
            expired
        };

        for (id, call) in expired {
            log::debug!("{} call {} timed out", call.method, id);
            invoke(call.method, id, call.callback, RpcStatus::deadline_exceeded(), SmContextVoid::default());
        }
    }

    fn cancel_all(&self) {
        let drained: Vec<(CallId, PendingCall)> = {
            let mut registry = self.registry();
            registry.closed = true;
            registry.calls.drain().collect()
        };

        if !drained.is_empty() {
            log::info!("Cancelling {} pending N11 call(s)", drained.len());
        }
        for (id, call) in drained {
            invoke(
                call.method,
                id,
                call.callback,
                RpcStatus::cancelled("N11 client shut down"),
                SmContextVoid::default(),
            );
        }
    }
}

fn invoke(method: SmfMethod, id: CallId, callback: RpcCallback, status: RpcStatus, response: SmContextVoid) {
    if panic::catch_unwind(AssertUnwindSafe(move || callback(status, response))).is_err() {
        log::error!("{} callback for call {} panicked", method, id);
    }
}

async fn rpc_response_loop(
    shared: Arc<Shared>,
    mut queue: mpsc::UnboundedReceiver<Completion>,
    mut stop: watch::Receiver<bool>,
) {
    log::info!("N11 RPC response loop started");

    loop {
        let next_deadline = shared.next_deadline();
        let expiry = async move {
            match next_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = stop.changed() => break,
            Some(completion) = queue.recv() => shared.complete(completion),
            _ = expiry => shared.expire(Instant::now()),
            // a new call may carry an earlier deadline
            _ = shared.wakeup.notified() => {}
        }
    }

    shared.cancel_all();
    log::info!("N11 RPC response loop stopped");
}

/// Default completion handler: log failures, never retry
pub fn handle_session_context_response(method: SmfMethod, status: &RpcStatus, _response: &SmContextVoid) {
    if !status.is_ok() {
        log::error!(
            "{} fails with code {}, msg: {}",
            method,
            status.error_code(),
            status.message
        );
    }
}

/// Client for the session manager's AMF session RPCs.
///
/// Constructed once with [`start`](Self::start) and shared by `Arc`.
pub struct AsyncSmfServiceClient {
    channel: Arc<dyn SmfChannel>,
    shared: Arc<Shared>,
    queue: mpsc::UnboundedSender<Completion>,
    stop: watch::Sender<bool>,
    loop_thread: Mutex<Option<JoinHandle<()>>>,
    response_timeout: Duration,
    update_location: Mutex<Option<Arc<dyn S6aUpdateLocation>>>,
}

impl AsyncSmfServiceClient {
    /// Create the client and spawn its completion loop thread.
    pub fn start(channel: Arc<dyn SmfChannel>, config: &N11Config) -> N11Result<Arc<Self>> {
        config.validate()?;

        let shared = Arc::new(Shared::default());
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let loop_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name(RPC_LOOP_THREAD_NAME.to_string())
            .spawn(move || runtime.block_on(rpc_response_loop(loop_shared, queue_rx, stop_rx)))?;

        Ok(Arc::new(Self {
            channel,
            shared,
            queue: queue_tx,
            stop: stop_tx,
            loop_thread: Mutex::new(Some(handle)),
            response_timeout: config.response_timeout(),
            update_location: Mutex::new(None),
        }))
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Number of calls still waiting for their callback
    pub fn in_flight(&self) -> usize {
        self.shared.registry().calls.len()
    }

    /// Issue `request`; `callback` runs once on the loop thread.
    pub fn submit<F>(&self, request: SmfRequest, callback: F, timeout: Duration)
    where
        F: FnOnce(RpcStatus, SmContextVoid) + Send + 'static,
    {
        let method = request.method();
        let id = CallId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let deadline = Instant::now() + timeout;
        let callback: RpcCallback = Box::new(callback);

        {
            let mut registry = self.shared.registry();
            if registry.closed {
                drop(registry);
                log::warn!("{} call {} submitted after shutdown", method, id);
                invoke(
                    method,
                    id,
                    callback,
                    RpcStatus::unavailable("N11 client is shut down"),
                    SmContextVoid::default(),
                );
                return;
            }
            registry.calls.insert(
                id,
                PendingCall {
                    method,
                    deadline,
                    callback,
                },
            );
        }
        self.shared.wakeup.notify_one();

        log::debug!("{} call {} submitted (timeout {:?})", method, id, timeout);
        self.channel.start_call(
            OutboundCall { request, deadline },
            ResponseReader::new(id, self.queue.clone()),
        );
    }

    pub fn set_smf_session_rpc<F>(&self, request: SetSmSessionContext, callback: F)
    where
        F: FnOnce(RpcStatus, SmContextVoid) + Send + 'static,
    {
        self.submit(request.into(), callback, self.response_timeout);
    }

    pub fn set_smf_notification_rpc<F>(&self, notify: SetSmNotificationContext, callback: F)
    where
        F: FnOnce(RpcStatus, SmContextVoid) + Send + 'static,
    {
        self.submit(notify.into(), callback, self.response_timeout);
    }

    pub fn set_smf_session(&self, request: SetSmSessionContext) -> bool {
        self.set_smf_session_rpc(request, |status, response| {
            handle_session_context_response(SmfMethod::SetAmfSessionContext, &status, &response)
        });
        true
    }

    pub fn set_smf_notification(&self, notify: SetSmNotificationContext) -> bool {
        self.set_smf_notification_rpc(notify, |status, response| {
            handle_session_context_response(SmfMethod::SetSmfNotification, &status, &response)
        });
        true
    }

    /// Build the establishment request for `params` and send it with the
    /// default completion handler.
    pub fn amf_smf_create_pdu_session(&self, params: &PduSessionParams) -> bool {
        log::info!(
            "Sending PDU session establishment to sessiond: IMSI {} session {}",
            params.imsi,
            params.pdu_session_id
        );
        self.set_smf_session(create_sm_pdu_session(params))
    }

    /// Install the S6a handler reached by `n11_update_location_req`
    pub fn set_update_location_handler(&self, handler: Arc<dyn S6aUpdateLocation>) {
        *self.update_location.lock().unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    pub fn n11_update_location_req(&self, req: &S6aUpdateLocationReq) -> bool {
        let handler = self
            .update_location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match handler {
            Some(handler) => handler.s6a_update_location_req(req),
            None => {
                log::warn!("No S6a handler for update location of IMSI {}", req.imsi);
                false
            }
        }
    }

    /// Stop the loop thread and cancel every pending call.
    ///
    /// Blocks until the loop has exited, unless called from a callback.
    pub fn shutdown(&self) {
        let _ = self.stop.send(true);

        let handle = self
            .loop_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return;
        };
        if handle.thread().id() == std::thread::current().id() {
            log::debug!("N11 client shutdown requested from its own loop");
            return;
        }
        if handle.join().is_err() {
            log::error!("N11 RPC loop thread panicked");
        }
    }
}

impl Drop for AsyncSmfServiceClient {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::proto::RatType;
    use crate::status::RpcCode;
    use crate::types::{Apn, Imsi};

    /// Transport that finishes every call before returning
    struct Immediate(RpcStatus);

    impl SmfChannel for Immediate {
        fn start_call(&self, _call: OutboundCall, reader: ResponseReader) {
            reader.finish(self.0.clone(), SmContextVoid::default());
        }
    }

    /// Transport that never answers on its own
    #[derive(Default)]
    struct Silent {
        readers: Mutex<Vec<ResponseReader>>,
    }

    impl SmfChannel for Silent {
        fn start_call(&self, _call: OutboundCall, reader: ResponseReader) {
            self.readers.lock().unwrap().push(reader);
        }
    }

    fn config(timeout_ms: u64) -> N11Config {
        N11Config {
            response_timeout_ms: timeout_ms,
            ..Default::default()
        }
    }

    fn request() -> SmfRequest {
        let params = PduSessionParams::new(Imsi::new("001010000000001").unwrap(), Apn::from("internet"), 1);
        create_sm_pdu_session(&params).into()
    }

    fn wait_until(cond: impl Fn() -> bool) {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(std::time::Instant::now() < deadline, "condition not reached");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn recorder() -> (
        Arc<Mutex<Vec<RpcStatus>>>,
        impl Fn() -> Box<dyn FnOnce(RpcStatus, SmContextVoid) + Send>,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let make = move || {
            let sink = Arc::clone(&sink);
            Box::new(move |status: RpcStatus, _: SmContextVoid| sink.lock().unwrap().push(status))
                as Box<dyn FnOnce(RpcStatus, SmContextVoid) + Send>
        };
        (seen, make)
    }

    #[test]
    fn test_completion_reaches_callback() {
        let client = AsyncSmfServiceClient::start(Arc::new(Immediate(RpcStatus::ok())), &config(1000)).unwrap();
        let (seen, callback) = recorder();

        client.submit(request(), callback(), Duration::from_secs(1));
        wait_until(|| seen.lock().unwrap().len() == 1);
        assert!(seen.lock().unwrap()[0].is_ok());
        assert_eq!(client.in_flight(), 0);
        client.shutdown();
    }

    #[test]
    fn test_transport_error_status_forwarded() {
        let status = RpcStatus::unavailable("connection refused");
        let client = AsyncSmfServiceClient::start(Arc::new(Immediate(status.clone())), &config(1000)).unwrap();
        let (seen, callback) = recorder();

        client.set_smf_session_rpc(
            match request() {
                SmfRequest::SessionContext(req) => req,
                SmfRequest::Notification(_) => unreachable!(),
            },
            callback(),
        );
        wait_until(|| !seen.lock().unwrap().is_empty());
        assert_eq!(seen.lock().unwrap()[0], status);
        client.shutdown();
    }

    #[test]
    fn test_timeout_fires_once_and_releases() {
        let channel = Arc::new(Silent::default());
        let client = AsyncSmfServiceClient::start(channel.clone(), &config(1000)).unwrap();
        let (seen, callback) = recorder();

        for cycle in 1..=10 {
            client.submit(request(), callback(), Duration::from_millis(20));
            wait_until(|| seen.lock().unwrap().len() == cycle);
            assert_eq!(client.in_flight(), 0);
        }
        assert!(seen
            .lock()
            .unwrap()
            .iter()
            .all(|status| status.code == RpcCode::DeadlineExceeded));

        // answers arriving after the deadline are dropped
        for reader in channel.readers.lock().unwrap().drain(..) {
            reader.finish(RpcStatus::ok(), SmContextVoid::default());
        }
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(seen.lock().unwrap().len(), 10);
        client.shutdown();
    }

    #[test]
    fn test_late_completion_after_expiry_is_expected() {
        let shared = Shared::default();
        let (seen, callback) = recorder();
        let id = CallId(3);
        shared.registry().calls.insert(
            id,
            PendingCall {
                method: SmfMethod::SetAmfSessionContext,
                deadline: Instant::now(),
                callback: callback(),
            },
        );

        shared.expire(Instant::now());
        assert_eq!(shared.registry().recently_expired, VecDeque::from([id]));

        let late = Completion {
            tag: id,
            status: RpcStatus::ok(),
            response: SmContextVoid::default(),
        };
        shared.complete(late.clone());
        assert!(shared.registry().recently_expired.is_empty());
        // a second answer for the same id is a defect, not a late answer
        shared.complete(late);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(seen.lock().unwrap()[0].code, RpcCode::DeadlineExceeded);
    }

    #[test]
    fn test_expired_ids_are_bounded() {
        let mut registry = Registry::default();
        for n in 0..(RECENTLY_EXPIRED as u64 + 10) {
            registry.remember_expired(CallId(n));
        }
        assert_eq!(registry.recently_expired.len(), RECENTLY_EXPIRED);
        assert!(!registry.take_expired(CallId(0)));
        assert!(registry.take_expired(CallId(RECENTLY_EXPIRED as u64 + 9)));
    }

    #[test]
    fn test_earlier_deadline_submitted_later() {
        let client = AsyncSmfServiceClient::start(Arc::new(Silent::default()), &config(1000)).unwrap();
        let (seen, callback) = recorder();

        client.submit(request(), callback(), Duration::from_secs(60));
        client.submit(request(), callback(), Duration::from_millis(20));
        wait_until(|| seen.lock().unwrap().len() == 1);
        assert_eq!(client.in_flight(), 1);
        client.shutdown();
    }

    #[test]
    fn test_concurrent_submissions_each_called_once() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 50;

        let client = AsyncSmfServiceClient::start(Arc::new(Immediate(RpcStatus::ok())), &config(1000)).unwrap();
        let counts: Arc<Vec<AtomicUsize>> = Arc::new((0..THREADS * PER_THREAD).map(|_| AtomicUsize::new(0)).collect());

        let workers: Vec<_> = (0..THREADS)
            .map(|t| {
                let client = Arc::clone(&client);
                let counts = Arc::clone(&counts);
                std::thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        let counts = Arc::clone(&counts);
                        let slot = t * PER_THREAD + i;
                        client.submit(
                            request(),
                            move |_, _| {
                                counts[slot].fetch_add(1, Ordering::SeqCst);
                            },
                            Duration::from_secs(5),
                        );
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        wait_until(|| counts.iter().all(|c| c.load(Ordering::SeqCst) >= 1));
        std::thread::sleep(Duration::from_millis(20));
        assert!(counts.iter().all(|c| c.load(Ordering::SeqCst) == 1));
        assert_eq!(client.in_flight(), 0);
        client.shutdown();
    }

    #[test]
    fn test_shutdown_cancels_pending() {
        let client = AsyncSmfServiceClient::start(Arc::new(Silent::default()), &config(60_000)).unwrap();
        let (seen, callback) = recorder();

        for _ in 0..3 {
            client.submit(request(), callback(), client.response_timeout());
        }
        assert_eq!(client.in_flight(), 3);

        client.shutdown();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|status| status.code == RpcCode::Cancelled));
        assert_eq!(client.in_flight(), 0);
    }

    #[test]
    fn test_submit_after_shutdown_is_unavailable() {
        let client = AsyncSmfServiceClient::start(Arc::new(Immediate(RpcStatus::ok())), &config(1000)).unwrap();
        client.shutdown();
        client.shutdown();

        let (seen, callback) = recorder();
        client.submit(request(), callback(), Duration::from_secs(1));
        assert_eq!(seen.lock().unwrap()[0].code, RpcCode::Unavailable);
        assert_eq!(client.in_flight(), 0);
    }

    #[test]
    fn test_panicking_callback_does_not_stop_loop() {
        let client = AsyncSmfServiceClient::start(Arc::new(Immediate(RpcStatus::ok())), &config(1000)).unwrap();
        let (seen, callback) = recorder();

        client.submit(request(), |_, _| panic!("callback failure"), Duration::from_secs(1));
        client.submit(request(), callback(), Duration::from_secs(1));
        wait_until(|| seen.lock().unwrap().len() == 1);
        client.shutdown();
    }

    #[test]
    fn test_shutdown_from_callback() {
        let client = AsyncSmfServiceClient::start(Arc::new(Immediate(RpcStatus::ok())), &config(1000)).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        let inner = Arc::clone(&client);
        let flag = Arc::clone(&done);
        client.submit(
            request(),
            move |_, _| {
                inner.shutdown();
                flag.fetch_add(1, Ordering::SeqCst);
            },
            Duration::from_secs(1),
        );
        wait_until(|| done.load(Ordering::SeqCst) == 1);

        let (seen, callback) = recorder();
        wait_until(|| {
            client.submit(request(), callback(), Duration::from_secs(1));
            seen.lock()
                .unwrap()
                .iter()
                .any(|status| status.code == RpcCode::Unavailable)
        });
    }

    #[test]
    fn test_default_callback_forms() {
        let client = AsyncSmfServiceClient::start(Arc::new(Immediate(RpcStatus::unavailable("down"))), &config(1000)).unwrap();
        let params = PduSessionParams::new(Imsi::new("001010000000001").unwrap(), Apn::from("internet"), 1);
        assert!(client.amf_smf_create_pdu_session(&params));
        wait_until(|| client.in_flight() == 0);
        client.shutdown();
    }

    #[test]
    fn test_update_location_pass_through() {
        let client = AsyncSmfServiceClient::start(Arc::new(Silent::default()), &config(1000)).unwrap();
        let req = S6aUpdateLocationReq {
            imsi: Imsi::new("001010000000001").unwrap(),
            initial_attach: true,
            skip_subscriber_data: false,
            visited_plmn: vec![0x00, 0xf1, 0x10],
            rat_type: RatType::TgppNr,
        };
        assert!(!client.n11_update_location_req(&req));

        let forwarded = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&forwarded);
        client.set_update_location_handler(Arc::new(move |r: &S6aUpdateLocationReq| {
            *sink.lock().unwrap() = Some(r.clone());
            true
        }));
        assert!(client.n11_update_location_req(&req));
        assert_eq!(forwarded.lock().unwrap().as_ref(), Some(&req));
        client.shutdown();
    }
}
