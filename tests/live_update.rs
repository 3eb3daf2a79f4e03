use livedesign::doc::DocContent;
use livedesign::live::{
    DocTransport, FetchParams, FetchRequest, FetchResponse, LiveUpdate, LiveUpdateConfig,
};
use livedesign::view::{View, ViewShape, ViewStyle};
use livedesign::FetchError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Serves canned responses and records what it was asked.
#[derive(Default)]
struct FakeTransport {
    responses: Mutex<HashMap<String, Result<FetchResponse, FetchError>>>,
    requests: Mutex<Vec<(String, FetchRequest)>>,
}

impl FakeTransport {
    fn serve(&self, doc_id: &str, response: Result<FetchResponse, FetchError>) {
        self.responses.lock().insert(doc_id.to_string(), response);
    }

    fn fetches_of(&self, doc_id: &str) -> usize {
        self.requests.lock().iter().filter(|(id, _)| id == doc_id).count()
    }
}

impl DocTransport for FakeTransport {
    fn fetch(&self, doc_id: &str, request_json: &str) -> Result<FetchResponse, FetchError> {
        let request = FetchRequest::from_json(request_json).unwrap();
        self.requests.lock().push((doc_id.to_string(), request));
        self.responses
            .lock()
            .get(doc_id)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::NotFound(doc_id.to_string())))
    }
}

fn encoded(doc_id: &str, last_modified: &str) -> FetchResponse {
    let mut doc = DocContent::new(doc_id);
    doc.last_modified = last_modified.to_string();
    let root = View::new_container(
        "1:1",
        "Main",
        ViewShape::Rect { is_mask: false },
        ViewStyle::default(),
    );
    doc.views.insert("Main".into(), Arc::new(root));
    FetchResponse::Document(doc.encode().unwrap())
}

type Received = Arc<Mutex<Vec<Arc<DocContent>>>>;

fn recorder() -> (Received, impl Fn(&Arc<DocContent>) + Send + Sync + 'static) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let callback = move |doc: &Arc<DocContent>| sink.lock().push(doc.clone());
    (received, callback)
}

fn service(transport: &Arc<FakeTransport>) -> LiveUpdate {
    LiveUpdate::new(LiveUpdateConfig::default(), transport.clone())
}

#[test]
fn subscribers_of_one_document_share_a_fetch() {
    let transport = Arc::new(FakeTransport::default());
    transport.serve("D1", Ok(encoded("D1", "t1")));
    let live = service(&transport);

    let (first, first_cb) = recorder();
    let (second, second_cb) = recorder();
    live.subscribe("D1", FetchParams::with_queries(vec!["Main"]), first_cb);
    live.subscribe("D1", FetchParams::with_queries(vec!["Other"]), second_cb);

    assert_eq!(live.fetch_now(), Some(1));
    assert_eq!(transport.fetches_of("D1"), 1);
    assert_eq!(live.poll(), 1);

    let (first, second) = (first.lock(), second.lock());
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert!(Arc::ptr_eq(&first[0], &second[0]));

    // both subscriptions' queries went into the one request
    let requests = transport.requests.lock();
    assert_eq!(requests[0].1.queries, vec!["Main".to_string(), "Other".to_string()]);
}

#[test]
fn subscribe_fetch_unsubscribe() {
    let transport = Arc::new(FakeTransport::default());
    transport.serve("D1", Ok(encoded("D1", "t1")));
    let live = service(&transport);

    let (received, callback) = recorder();
    let id = live.subscribe("D1", FetchParams::default(), callback);
    live.fetch_now();
    live.poll();
    {
        let received = received.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].doc_id, "D1");
    }

    assert!(live.unsubscribe(id));
    assert!(!live.unsubscribe(id));
    assert!(live.subscribed_doc_ids().is_empty());
    assert_eq!(live.fetch_now(), Some(0));
    assert_eq!(transport.fetches_of("D1"), 1);
}

#[test]
fn unsubscribing_before_delivery_skips_the_callback() {
    let transport = Arc::new(FakeTransport::default());
    transport.serve("D1", Ok(encoded("D1", "t1")));
    let live = service(&transport);

    let (received, callback) = recorder();
    let id = live.subscribe("D1", FetchParams::default(), callback);
    live.fetch_now();
    live.unsubscribe(id);
    live.poll();

    assert!(received.lock().is_empty());
    // the fetched document is still kept
    assert_eq!(live.doc("D1").unwrap().last_modified, "t1");
}

#[test]
fn failing_branch_reverts_once() {
    let transport = Arc::new(FakeTransport::default());
    transport.serve("D1", Ok(encoded("D1", "t1")));
    transport.serve("B", Err(FetchError::NotFound("B".into())));
    let live = service(&transport);

    let (received, callback) = recorder();
    live.subscribe("D1", FetchParams::default(), callback);
    live.fetch_now();
    live.poll();

    assert!(live.switch_branch("D1", "B"));
    assert_eq!(live.subscribed_doc_ids(), vec!["B".to_string()]);
    assert_eq!(live.original_of("B").as_deref(), Some("D1"));

    live.fetch_now();
    let feedback = live.take_feedback();
    assert_eq!(feedback.len(), 1);
    assert!(feedback[0].contains("reverting to D1"), "{}", feedback[0]);
    assert_eq!(live.subscribed_doc_ids(), vec!["D1".to_string()]);
    assert_eq!(live.original_of("B"), None);

    // the original keeps working and nothing is reported again
    assert_eq!(live.fetch_now(), Some(1));
    assert!(live.take_feedback().is_empty());
    live.poll();
    assert_eq!(received.lock().len(), 2);
}

#[test]
fn one_failure_does_not_block_other_documents() {
    let transport = Arc::new(FakeTransport::default());
    transport.serve("D1", Err(FetchError::RateLimited));
    transport.serve("D2", Ok(encoded("D2", "t1")));
    let live = service(&transport);

    let (received, callback) = recorder();
    live.subscribe("D1", FetchParams::default(), |_: &Arc<DocContent>| {});
    live.subscribe("D2", FetchParams::default(), callback);

    assert_eq!(live.fetch_now(), Some(1));
    assert_eq!(live.take_feedback(), vec!["Rate Limit Exceeded".to_string()]);
    live.poll();
    assert_eq!(received.lock()[0].doc_id, "D2");
}

#[test]
fn undecodable_bytes_keep_the_previous_document() {
    let transport = Arc::new(FakeTransport::default());
    transport.serve("D1", Ok(encoded("D1", "t1")));
    let live = service(&transport);
    live.subscribe("D1", FetchParams::default(), |_: &Arc<DocContent>| {});
    live.fetch_now();

    transport.serve("D1", Ok(FetchResponse::Document(vec![1, 2, 3])));
    assert_eq!(live.fetch_now(), Some(0));
    assert_eq!(live.doc("D1").unwrap().last_modified, "t1");
}

#[test]
fn unmodified_documents_are_not_redelivered() {
    let transport = Arc::new(FakeTransport::default());
    transport.serve("D1", Ok(encoded("D1", "t1")));
    let live = service(&transport);

    let (received, callback) = recorder();
    live.subscribe("D1", FetchParams::default(), callback);
    live.fetch_now();

    transport.serve("D1", Ok(FetchResponse::Unmodified));
    assert_eq!(live.fetch_now(), Some(0));
    live.poll();
    assert_eq!(received.lock().len(), 1);

    let requests = transport.requests.lock();
    assert_eq!(requests[0].1.last_modified, None);
    assert_eq!(requests[1].1.last_modified.as_deref(), Some("t1"));
}

#[test]
fn hooks_run_before_subscribers() {
    let transport = Arc::new(FakeTransport::default());
    transport.serve("D1", Ok(encoded("D1", "t1")));
    let mut live = service(&transport);

    let order = Arc::new(Mutex::new(Vec::new()));
    let o = order.clone();
    live.set_invalidation_hook(move |doc_id| {
        o.lock().push(format!("invalidate {}", doc_id))
    });
    let o = order.clone();
    live.set_bytes_callback(move |doc_id, bytes| {
        o.lock()
            .push(format!("bytes {} {}", doc_id, !bytes.is_empty()))
    });
    let o = order.clone();
    live.subscribe("D1", FetchParams::default(), move |doc: &Arc<DocContent>| {
        o.lock().push(format!("update {}", doc.doc_id))
    });

    live.fetch_now();
    live.poll();
    assert_eq!(*order.lock(), vec!["invalidate D1", "update D1", "bytes D1 true"]);
}

#[test]
fn saved_copy_is_a_placeholder() {
    let dir = std::env::temp_dir().join(format!("livedesign-test-{}", uuid::Uuid::new_v4()));
    let config = LiveUpdateConfig {
        save_dir: Some(dir.clone()),
        ..LiveUpdateConfig::default()
    };

    let transport = Arc::new(FakeTransport::default());
    transport.serve("D1", Ok(encoded("D1", "saved")));
    {
        let live = LiveUpdate::new(config.clone(), transport.clone());
        live.subscribe("D1", FetchParams::default(), |_: &Arc<DocContent>| {});
        live.fetch_now();
    }

    // offline now
    let offline = Arc::new(FakeTransport::default());
    let live = LiveUpdate::new(config, offline);
    let (received, callback) = recorder();
    live.subscribe("D1", FetchParams::default(), callback);
    assert_eq!(live.doc("D1").unwrap().last_modified, "saved");
    live.poll();
    assert_eq!(received.lock().len(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn worker_fetches_on_subscribe_and_resume() {
    let transport = Arc::new(FakeTransport::default());
    transport.serve("D1", Ok(encoded("D1", "t1")));
    let config = LiveUpdateConfig {
        fetch_interval: Duration::from_secs(3600),
        ..LiveUpdateConfig::default()
    };
    let mut live = LiveUpdate::new(config, transport.clone());
    live.start().unwrap();

    let wait_for = |count: usize| {
        let deadline = Instant::now() + Duration::from_secs(5);
        while transport.fetches_of("D1") < count && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        transport.fetches_of("D1")
    };

    live.subscribe("D1", FetchParams::default(), |_: &Arc<DocContent>| {});
    assert_eq!(wait_for(1), 1);

    live.set_paused(true);
    assert!(live.is_paused());
    live.set_paused(false);
    assert_eq!(wait_for(2), 2);

    drop(live);
}

#[test]
fn pausing_stops_periodic_fetches() {
    let transport = Arc::new(FakeTransport::default());
    transport.serve("D1", Ok(encoded("D1", "t1")));
    let interval = Duration::from_millis(20);
    let config = LiveUpdateConfig {
        fetch_interval: interval,
        ..LiveUpdateConfig::default()
    };
    let mut live = LiveUpdate::new(config, transport.clone());
    live.start().unwrap();

    let wait_for = |count: usize| {
        let deadline = Instant::now() + Duration::from_secs(5);
        while transport.fetches_of("D1") < count && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        transport.fetches_of("D1")
    };

    live.subscribe("D1", FetchParams::default(), |_: &Arc<DocContent>| {});
    assert!(wait_for(3) >= 3);

    live.set_paused(true);
    // let a cycle that was already running finish
    thread::sleep(interval * 3);
    let paused_at = transport.fetches_of("D1");
    thread::sleep(interval * 8);
    assert_eq!(transport.fetches_of("D1"), paused_at);

    live.set_paused(false);
    assert!(wait_for(paused_at + 2) >= paused_at + 2);
}
