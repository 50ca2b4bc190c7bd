//! Per-stream subscriber registry with SSE framing.
//!
//! Each subscriber owns a small bounded frame queue drained by its HTTP
//! response task, so one broadcast serializes the event once and hands the
//! same payload to every queue. A queue that is full or whose reader has
//! gone away counts as a failed write and the subscriber is evicted; the
//! stream itself never waits on a slow client.

// Poisoned lock should fail the program
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::trace;
use uuid::Uuid;

use switchboard_protocol::ConversationRecord;
use switchboard_protocol::StreamEvent;
use switchboard_protocol::StreamId;

/// Frames small enough that a handful of queued events is plenty for an
/// interactive client; anything deeper means the client has stalled.
const SUBSCRIBER_QUEUE_CAPACITY: usize = 64;

/// One frame on a subscriber's wire.
#[derive(Debug, Clone)]
pub enum Frame {
    /// `data: <compact JSON>\n\n`
    Event(Arc<str>),
    /// `: heartbeat\n\n`
    Heartbeat,
    /// Terminates the response body.
    End,
}

impl Frame {
    pub fn to_sse_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Frame::Event(json) => Some(format!("data: {json}\n\n").into_bytes()),
            Frame::Heartbeat => Some(b": heartbeat\n\n".to_vec()),
            Frame::End => None,
        }
    }
}

/// Handle to one long-lived subscriber response.
#[derive(Clone)]
pub struct Subscriber {
    id: Uuid,
    tx: mpsc::Sender<Frame>,
}

impl Subscriber {
    /// Create the subscriber and the receiving half its response task
    /// drains.
    pub fn channel() -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Non-blocking write; `false` marks the subscriber for eviction.
    fn write(&self, frame: Frame) -> bool {
        self.tx.try_send(frame).is_ok()
    }

    fn close(&self) {
        let _ = self.tx.try_send(Frame::End);
    }
}

struct FanoutState {
    streams: HashMap<StreamId, Vec<Subscriber>>,
    heartbeat: Option<JoinHandle<()>>,
}

pub struct StreamFanout {
    heartbeat_interval: Duration,
    state: Mutex<FanoutState>,
}

impl StreamFanout {
    pub fn new(heartbeat_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            heartbeat_interval,
            state: Mutex::new(FanoutState {
                streams: HashMap::new(),
                heartbeat: None,
            }),
        })
    }

    /// Register a subscriber, greet it with the `connected` frame, and
    /// make sure the heartbeat ticker is running.
    pub fn add_subscriber(self: &Arc<Self>, stream_id: StreamId, subscriber: Subscriber) {
        let connected = serialize(&StreamEvent::connected(stream_id));
        subscriber.write(Frame::Event(connected));

        let mut state = self.state.lock().unwrap();
        state.streams.entry(stream_id).or_default().push(subscriber);
        if state.heartbeat.is_none() {
            let fanout = Arc::clone(self);
            state.heartbeat = Some(tokio::spawn(async move {
                fanout.heartbeat_loop().await;
            }));
        }
    }

    pub fn remove_subscriber(&self, stream_id: StreamId, subscriber_id: Uuid) {
        let mut state = self.state.lock().unwrap();
        if let Some(subscribers) = state.streams.get_mut(&stream_id) {
            subscribers.retain(|s| s.id != subscriber_id);
            if subscribers.is_empty() {
                state.streams.remove(&stream_id);
            }
        }
        stop_heartbeat_if_idle(&mut state);
    }

    /// Forward a subprocess record to every subscriber of `stream_id`.
    ///
    /// Init records are suppressed here: they were already returned from
    /// the start/resume HTTP call. With no subscribers the event is
    /// dropped silently.
    pub fn broadcast_record(&self, stream_id: StreamId, record: &ConversationRecord) {
        if record.is_init() {
            trace!("suppressing init record for stream {stream_id}");
            return;
        }
        match serde_json::to_string(&record.0) {
            Ok(json) => self.send_frame(stream_id, Frame::Event(Arc::from(json))),
            Err(e) => debug!("unserializable record for stream {stream_id}: {e}"),
        }
    }

    pub fn broadcast_event(&self, stream_id: StreamId, event: &StreamEvent) {
        self.send_frame(stream_id, Frame::Event(serialize(event)));
    }

    /// Send the terminal `closed` frame, end every subscriber response,
    /// and forget the stream.
    pub fn close_stream(&self, stream_id: StreamId) {
        let subscribers = {
            let mut state = self.state.lock().unwrap();
            let subscribers = state.streams.remove(&stream_id);
            stop_heartbeat_if_idle(&mut state);
            subscribers
        };
        let Some(subscribers) = subscribers else {
            return;
        };

        let closed = serialize(&StreamEvent::closed(stream_id));
        for subscriber in subscribers {
            subscriber.write(Frame::Event(Arc::clone(&closed)));
            subscriber.close();
        }
    }

    pub fn disconnect_all(&self) {
        let stream_ids: Vec<StreamId> = {
            let state = self.state.lock().unwrap();
            state.streams.keys().copied().collect()
        };
        for stream_id in stream_ids {
            self.close_stream(stream_id);
        }
    }

    pub fn subscriber_count(&self, stream_id: StreamId) -> usize {
        let state = self.state.lock().unwrap();
        state.streams.get(&stream_id).map_or(0, Vec::len)
    }

    pub fn total_subscriber_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.streams.values().map(Vec::len).sum()
    }

    /// Serialize-once fan-out over a snapshot of the subscriber set, so a
    /// concurrent add/remove never invalidates the iteration. Failed
    /// writes are collected and evicted after the loop.
    fn send_frame(&self, stream_id: StreamId, frame: Frame) {
        let snapshot: Vec<Subscriber> = {
            let state = self.state.lock().unwrap();
            match state.streams.get(&stream_id) {
                Some(subscribers) => subscribers.clone(),
                None => return,
            }
        };

        let mut failed = Vec::new();
        for subscriber in &snapshot {
            if !subscriber.write(frame.clone()) {
                failed.push(subscriber.id);
            }
        }

        if !failed.is_empty() {
            debug!(
                "evicting {} slow subscriber(s) from stream {stream_id}",
                failed.len()
            );
            for subscriber_id in failed {
                self.remove_subscriber(stream_id, subscriber_id);
            }
        }
    }

    async fn heartbeat_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.heartbeat_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately; skip it so
        // a fresh subscriber is not greeted with a heartbeat.
        interval.tick().await;
        loop {
            interval.tick().await;

            let snapshot: Vec<(StreamId, Subscriber)> = {
                let state = self.state.lock().unwrap();
                state
                    .streams
                    .iter()
                    .flat_map(|(stream_id, subscribers)| {
                        subscribers.iter().map(|s| (*stream_id, s.clone()))
                    })
                    .collect()
            };
            for (stream_id, subscriber) in snapshot {
                if !subscriber.write(Frame::Heartbeat) {
                    self.remove_subscriber(stream_id, subscriber.id);
                }
            }
        }
    }
}

fn stop_heartbeat_if_idle(state: &mut FanoutState) {
    if state.streams.is_empty()
        && let Some(heartbeat) = state.heartbeat.take()
    {
        heartbeat.abort();
    }
}

fn serialize(event: &StreamEvent) -> Arc<str> {
    #[allow(clippy::expect_used)]
    Arc::from(serde_json::to_string(event).expect("stream event must serialize"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn drain(rx: &mut mpsc::Receiver<Frame>) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    fn event_json(frame: &Frame) -> serde_json::Value {
        match frame {
            Frame::Event(json) => serde_json::from_str(json).unwrap(),
            other => panic!("expected event frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn subscriber_is_greeted_with_connected() {
        let fanout = StreamFanout::new(Duration::from_secs(30));
        let stream_id = StreamId::new();
        let (subscriber, mut rx) = Subscriber::channel();

        fanout.add_subscriber(stream_id, subscriber);

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        let connected = event_json(&frames[0]);
        assert_eq!(connected["type"], "connected");
        assert_eq!(connected["streaming_id"], stream_id.to_string());
        assert_eq!(fanout.subscriber_count(stream_id), 1);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber_in_order() {
        let fanout = StreamFanout::new(Duration::from_secs(30));
        let stream_id = StreamId::new();
        let (sub_a, mut rx_a) = Subscriber::channel();
        let (sub_b, mut rx_b) = Subscriber::channel();
        fanout.add_subscriber(stream_id, sub_a);
        fanout.add_subscriber(stream_id, sub_b);

        let first = ConversationRecord::from(json!({"type": "assistant", "n": 1}));
        let second = ConversationRecord::from(json!({"type": "assistant", "n": 2}));
        fanout.broadcast_record(stream_id, &first);
        fanout.broadcast_record(stream_id, &second);

        for rx in [&mut rx_a, &mut rx_b] {
            let frames = drain(rx);
            assert_eq!(frames.len(), 3);
            assert_eq!(event_json(&frames[1])["n"], 1);
            assert_eq!(event_json(&frames[2])["n"], 2);
        }
    }

    #[tokio::test]
    async fn init_records_are_suppressed() {
        let fanout = StreamFanout::new(Duration::from_secs(30));
        let stream_id = StreamId::new();
        let (subscriber, mut rx) = Subscriber::channel();
        fanout.add_subscriber(stream_id, subscriber);
        drain(&mut rx);

        let init = ConversationRecord::from(json!({
            "type": "system", "subtype": "init", "session_id": "z",
        }));
        fanout.broadcast_record(stream_id, &init);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_dropped_silently() {
        let fanout = StreamFanout::new(Duration::from_secs(30));
        let record = ConversationRecord::from(json!({"type": "assistant"}));
        fanout.broadcast_record(StreamId::new(), &record);
        assert_eq!(fanout.total_subscriber_count(), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_is_evicted_while_others_continue() {
        let fanout = StreamFanout::new(Duration::from_secs(30));
        let stream_id = StreamId::new();
        let (slow, slow_rx) = Subscriber::channel();
        let (healthy, mut healthy_rx) = Subscriber::channel();
        fanout.add_subscriber(stream_id, slow);
        fanout.add_subscriber(stream_id, healthy);

        // Dropping the receiver makes every write to the slow subscriber
        // fail, the same as a closed transport.
        drop(slow_rx);

        let record = ConversationRecord::from(json!({"type": "assistant", "n": 1}));
        fanout.broadcast_record(stream_id, &record);

        assert_eq!(fanout.subscriber_count(stream_id), 1);
        let frames = drain(&mut healthy_rx);
        assert_eq!(event_json(&frames[1])["n"], 1);

        let next = ConversationRecord::from(json!({"type": "assistant", "n": 2}));
        fanout.broadcast_record(stream_id, &next);
        assert_eq!(event_json(&drain(&mut healthy_rx)[0])["n"], 2);
    }

    #[tokio::test]
    async fn close_stream_sends_closed_then_ends_subscribers() {
        let fanout = StreamFanout::new(Duration::from_secs(30));
        let stream_id = StreamId::new();
        let (subscriber, mut rx) = Subscriber::channel();
        fanout.add_subscriber(stream_id, subscriber);
        drain(&mut rx);

        fanout.close_stream(stream_id);

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 2);
        assert_eq!(event_json(&frames[0])["type"], "closed");
        assert!(matches!(frames[1], Frame::End));
        assert_eq!(fanout.subscriber_count(stream_id), 0);
        assert_eq!(fanout.total_subscriber_count(), 0);
    }

    #[tokio::test]
    async fn heartbeat_reaches_all_streams() {
        let fanout = StreamFanout::new(Duration::from_millis(20));
        let (sub_a, mut rx_a) = Subscriber::channel();
        let (sub_b, mut rx_b) = Subscriber::channel();
        fanout.add_subscriber(StreamId::new(), sub_a);
        fanout.add_subscriber(StreamId::new(), sub_b);
        drain(&mut rx_a);
        drain(&mut rx_b);

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(
            drain(&mut rx_a)
                .iter()
                .any(|f| matches!(f, Frame::Heartbeat))
        );
        assert!(
            drain(&mut rx_b)
                .iter()
                .any(|f| matches!(f, Frame::Heartbeat))
        );
    }

    #[tokio::test]
    async fn disconnect_all_closes_every_stream() {
        let fanout = StreamFanout::new(Duration::from_secs(30));
        let (sub_a, mut rx_a) = Subscriber::channel();
        let (sub_b, mut rx_b) = Subscriber::channel();
        fanout.add_subscriber(StreamId::new(), sub_a);
        fanout.add_subscriber(StreamId::new(), sub_b);

        fanout.disconnect_all();

        assert_eq!(fanout.total_subscriber_count(), 0);
        for rx in [&mut rx_a, &mut rx_b] {
            let frames = drain(rx);
            assert!(matches!(frames.last(), Some(Frame::End)));
        }
    }

    #[test]
    fn frames_follow_sse_framing() {
        let event = Frame::Event(Arc::from("{\"type\":\"closed\"}"));
        assert_eq!(
            event.to_sse_bytes().unwrap(),
            b"data: {\"type\":\"closed\"}\n\n"
        );
        assert_eq!(Frame::Heartbeat.to_sse_bytes().unwrap(), b": heartbeat\n\n");
        assert!(Frame::End.to_sse_bytes().is_none());
    }
}
