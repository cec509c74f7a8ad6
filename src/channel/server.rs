//! Worker-channel server side: one `actix-web-actors` WebSocket actor per
//! accepted worker connection, a liveness timer that force-closes
//! connections that go quiet, and a registry the scheduler queries for an
//! idle worker handle.

use crate::channel::messages::{sniff, ControlMessage, DispatchMessage, ProofResults, SniffedFrame};
use crate::channel::ChannelTiming;
use crate::error::ChannelError;
use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Message)]
#[rtype(result = "()")]
pub struct SendText(pub String);

struct WorkerHandle {
    addr: Addr<WorkerSession>,
    alive: Arc<AtomicBool>,
}

/// The connected-worker set the scheduler queries for dispatch.
/// Single-writer from the accept/close handlers below.
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    workers: Arc<DashMap<Uuid, WorkerHandle>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, id: Uuid, addr: Addr<WorkerSession>, alive: Arc<AtomicBool>) {
        self.workers.insert(id, WorkerHandle { addr, alive });
    }

    fn deregister(&self, id: Uuid) {
        self.workers.remove(&id);
    }

    /// First worker whose liveness flag is true. Substituting LRU here
    /// is correctness-preserving.
    pub fn pick_idle(&self) -> Option<Uuid> {
        self.workers
            .iter()
            .find(|entry| entry.alive.load(Ordering::Relaxed))
            .map(|entry| *entry.key())
    }

    pub fn dispatch(&self, worker_id: Uuid, message: &DispatchMessage) -> Result<(), ChannelError> {
        let handle = self.workers.get(&worker_id).ok_or(ChannelError::Closed)?;
        let text = serde_json::to_string(message)
            .map_err(|e| ChannelError::MalformedFrame(e.to_string()))?;
        handle.addr.do_send(SendText(text));
        Ok(())
    }

    pub fn connected_count(&self) -> usize {
        self.workers.len()
    }
}

pub struct WorkerSession {
    id: Uuid,
    hb: Instant,
    registry: WorkerRegistry,
    results_tx: UnboundedSender<(Uuid, ProofResults)>,
    alive: Arc<AtomicBool>,
    timing: ChannelTiming,
}

impl WorkerSession {
    fn new(
        registry: WorkerRegistry,
        results_tx: UnboundedSender<(Uuid, ProofResults)>,
        timing: ChannelTiming,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            hb: Instant::now(),
            registry,
            results_tx,
            alive: Arc::new(AtomicBool::new(true)),
            timing,
        }
    }

    fn run_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let connection_timeout = self.timing.connection_timeout;
        ctx.run_interval(self.timing.ping_interval, move |act, ctx| {
            if Instant::now().duration_since(act.hb) > connection_timeout {
                warn!(worker_id = %act.id, "worker missed liveness window, closing");
                act.alive.store(false, Ordering::Relaxed);
                ctx.stop();
                return;
            }
            let ping = serde_json::to_string(&ControlMessage::Ping).unwrap();
            ctx.text(ping);
        });
    }
}

impl Actor for WorkerSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(worker_id = %self.id, "worker connected");
        self.registry.register(self.id, ctx.address(), self.alive.clone());
        self.run_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.alive.store(false, Ordering::Relaxed);
        self.registry.deregister(self.id);
        info!(worker_id = %self.id, "worker disconnected");
    }
}

impl Handler<SendText> for WorkerSession {
    type Result = ();

    fn handle(&mut self, msg: SendText, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WorkerSession {
    fn handle(&mut self, item: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match item {
            Ok(m) => m,
            Err(_) => {
                ctx.stop();
                return;
            }
        };
        match msg {
            ws::Message::Text(text) => match sniff(&text) {
                SniffedFrame::Control(ControlMessage::Pong) => {
                    self.hb = Instant::now();
                }
                SniffedFrame::Control(ControlMessage::Ping) => {
                    self.hb = Instant::now();
                    let pong = serde_json::to_string(&ControlMessage::Pong).unwrap();
                    ctx.text(pong);
                }
                SniffedFrame::Reply(reply) => {
                    let crate::channel::messages::ReplyMessage::GenerateProof { proof_id, results } = reply;
                    let _ = self.results_tx.send((proof_id, results));
                }
                SniffedFrame::Dispatch(_) => {
                    debug!(worker_id = %self.id, "ignoring dispatch-shaped frame from worker");
                }
                SniffedFrame::Unknown(raw) => {
                    warn!(worker_id = %self.id, frame = %raw, "unknown message type, discarding");
                }
            },
            ws::Message::Ping(bytes) => ctx.pong(&bytes),
            ws::Message::Close(reason) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => {}
        }
    }
}

pub async fn worker_ws_route(
    req: HttpRequest,
    stream: web::Payload,
    registry: web::Data<WorkerRegistry>,
    results_tx: web::Data<UnboundedSender<(Uuid, ProofResults)>>,
    timing: web::Data<ChannelTiming>,
) -> Result<HttpResponse, actix_web::Error> {
    let session = WorkerSession::new(registry.get_ref().clone(), results_tx.get_ref().clone(), *timing.get_ref());
    ws::start(session, &req, stream)
}
