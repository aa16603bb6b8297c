use std::sync::Arc;

use tokio::{
    sync::{Mutex, broadcast, mpsc, oneshot, watch},
    time::{Duration, Instant},
};

use crate::{
    core::store::{GuestStore, StoreError},
    guest::{GuestDraft, GuestRecord},
    op::StoredOp,
    persist::{GuestSink, PersistError},
    photo,
    query::live::{FilteredRoster, LiveRoster},
    types::{GuestId, OpSeq},
};

use super::events::GuestEvent;

/// Errors surfaced by [`GuestListHandle`] operations.
#[derive(Debug)]
pub enum RuntimeError {
    /// The in-memory store rejected the operation.
    Store(StoreError),
    /// The persistence layer failed or is overloaded.
    Persist(PersistError),
    /// The runtime has shut down.
    ChannelClosed,
}

impl From<StoreError> for RuntimeError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<PersistError> for RuntimeError {
    fn from(value: PersistError) -> Self {
        Self::Persist(value)
    }
}

/// Tuning knobs for the runtime and its persistence worker.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Flush the sink eagerly after every add.
    pub flush_on_add: bool,
    /// Maximum ops batched into one sink write.
    pub batch_max_ops: usize,
    /// Maximum time an op may sit unflushed, in milliseconds.
    pub batch_max_latency_ms: u64,
    /// Bound of the persistence queue; a full queue fails the write.
    pub persist_queue_bound: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            flush_on_add: true,
            batch_max_ops: 32,
            batch_max_latency_ms: 75,
            persist_queue_bound: 64,
        }
    }
}

/// Cloneable async handle to the guest-list runtime.
pub struct GuestListHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<GuestEvent>,
    roster_rx: watch::Receiver<Vec<GuestRecord>>,
}

impl Clone for GuestListHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
            roster_rx: self.roster_rx.clone(),
        }
    }
}

enum Command {
    Add {
        draft: GuestDraft,
        resp: oneshot::Sender<Result<GuestId, RuntimeError>>,
    },
    Update {
        guest: GuestRecord,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Remove {
        id: GuestId,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    ToggleCheckIn {
        id: GuestId,
        resp: oneshot::Sender<Result<bool, RuntimeError>>,
    },
    Get {
        id: GuestId,
        resp: oneshot::Sender<Option<GuestRecord>>,
    },
    All {
        resp: oneshot::Sender<Vec<GuestRecord>>,
    },
    ByEvent {
        event_name: String,
        resp: oneshot::Sender<Vec<GuestRecord>>,
    },
    Flush {
        resp: oneshot::Sender<Result<OpSeq, RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
}

enum PersistMsg {
    Op(StoredOp),
    Flush {
        resp: oneshot::Sender<Result<OpSeq, PersistError>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Spawns the single-writer runtime over `store`.
///
/// When `sink` is present, every successful mutation is forwarded to a
/// persistence worker that batches row writes off the command loop.
pub fn spawn_guestlist(
    store: GuestStore,
    sink: Option<Box<dyn GuestSink>>,
    config: RuntimeConfig,
) -> GuestListHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(256);
    let (events_tx, _) = broadcast::channel::<GuestEvent>(1024);
    let (roster_tx, roster_rx) = watch::channel(store.all_cloned());

    let (persist_tx_opt, mut durable_rx) = if let Some(sink) = sink {
        let (persist_tx, persist_rx) = mpsc::channel::<PersistMsg>(config.persist_queue_bound);
        let (durable_tx, durable_rx) = mpsc::unbounded_channel::<Result<OpSeq, PersistError>>();
        spawn_persistence_worker(sink, persist_rx, durable_tx, config.clone());
        (Some(persist_tx), Some(durable_rx))
    } else {
        (None, None)
    };

    let events_tx_loop = events_tx.clone();

    tokio::spawn(async move {
        let mut store = store;

        loop {
            if let Some(rx) = durable_rx.as_mut() {
                tokio::select! {
                    cmd = cmd_rx.recv() => {
                        let Some(cmd) = cmd else { break; };
                        let done = handle_command(
                            cmd,
                            &mut store,
                            &events_tx_loop,
                            &roster_tx,
                            persist_tx_opt.as_ref(),
                        ).await;

                        if done {
                            break;
                        }
                    }
                    durable = rx.recv() => {
                        if let Some(Ok(op_seq)) = durable {
                            let _ = events_tx_loop.send(GuestEvent::DurableUpTo { op_seq });
                        }
                    }
                }
            } else {
                let Some(cmd) = cmd_rx.recv().await else { break; };
                let done = handle_command(
                    cmd,
                    &mut store,
                    &events_tx_loop,
                    &roster_tx,
                    persist_tx_opt.as_ref(),
                ).await;
                if done {
                    break;
                }
            }
        }
    });

    GuestListHandle {
        cmd_tx,
        events_tx,
        roster_rx,
    }
}

impl GuestListHandle {
    /// Subscribes to the runtime event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<GuestEvent> {
        self.events_tx.subscribe()
    }

    /// Live view of the full roster, ordered by surname.
    pub fn live_roster(&self) -> LiveRoster {
        LiveRoster::new(self.roster_rx.clone())
    }

    /// Live roster combined with a mutable search string.
    pub fn filtered_roster(&self) -> FilteredRoster {
        FilteredRoster::new(self.live_roster())
    }

    /// Adds a guest, returning the assigned id.
    pub async fn add(&self, draft: GuestDraft) -> Result<GuestId, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Add { draft, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Replaces the record matching `guest.id`.
    ///
    /// When the photo reference changed, the previous photo file is discarded
    /// best-effort.
    pub async fn update(&self, guest: GuestRecord) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Update { guest, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Removes a guest, discarding its photo file best-effort.
    pub async fn remove(&self, id: GuestId) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Remove { id, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Flips the check-in flag, returning the new value.
    pub async fn toggle_check_in(&self, id: GuestId) -> Result<bool, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::ToggleCheckIn { id, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Fetches a single record by id.
    pub async fn get(&self, id: GuestId) -> Result<Option<GuestRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Get { id, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Fetches the full roster, ordered by surname.
    pub async fn all(&self) -> Result<Vec<GuestRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::All { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Fetches the guests registered for one event.
    pub async fn by_event(&self, event_name: impl Into<String>) -> Result<Vec<GuestRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::ByEvent {
                event_name: event_name.into(),
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Forces pending writes down to the sink, returning the durable seq.
    pub async fn flush(&self) -> Result<OpSeq, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Flush { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Drains the persistence worker and stops the runtime.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }
}

async fn handle_command(
    cmd: Command,
    store: &mut GuestStore,
    events_tx: &broadcast::Sender<GuestEvent>,
    roster_tx: &watch::Sender<Vec<GuestRecord>>,
    persist_tx: Option<&mpsc::Sender<PersistMsg>>,
) -> bool {
    match cmd {
        Command::Add { draft, resp } => {
            // Reserve the persist slot before mutating; a full queue must
            // leave no trace in the store.
            let res = reserve_persist(persist_tx).and_then(|permit| {
                let (id, stored) = store.add(draft)?;
                forward_op(permit, stored, store, events_tx);
                let _ = events_tx.send(GuestEvent::Added { id });
                Ok(id)
            });
            if res.is_ok() {
                commit_mutation(store, roster_tx);
            }
            let _ = resp.send(res);
        }
        Command::Update { guest, resp } => {
            let new_photo = guest.photo_ref.clone();
            let res = reserve_persist(persist_tx).and_then(|permit| {
                let (stored, prev) = store.update(guest)?;
                let id = stored.op.guest_id();
                photo::discard_replaced(&prev.photo_ref, &new_photo);
                forward_op(permit, stored, store, events_tx);
                let _ = events_tx.send(GuestEvent::Updated { id });
                Ok(())
            });
            if res.is_ok() {
                commit_mutation(store, roster_tx);
            }
            let _ = resp.send(res);
        }
        Command::Remove { id, resp } => {
            let res = reserve_persist(persist_tx).and_then(|permit| {
                let (stored, removed) = store.remove(id)?;
                photo::discard(&removed.photo_ref);
                forward_op(permit, stored, store, events_tx);
                let _ = events_tx.send(GuestEvent::Removed { id });
                Ok(())
            });
            if res.is_ok() {
                commit_mutation(store, roster_tx);
            }
            let _ = resp.send(res);
        }
        Command::ToggleCheckIn { id, resp } => {
            let res = reserve_persist(persist_tx).and_then(|permit| {
                let (stored, checked_in) = store.toggle_check_in(id)?;
                forward_op(permit, stored, store, events_tx);
                let _ = events_tx.send(GuestEvent::CheckedIn { id, checked_in });
                Ok(checked_in)
            });
            if res.is_ok() {
                commit_mutation(store, roster_tx);
            }
            let _ = resp.send(res);
        }
        Command::Get { id, resp } => {
            let _ = resp.send(store.get_cloned(id));
        }
        Command::All { resp } => {
            let _ = resp.send(store.all_cloned());
        }
        Command::ByEvent { event_name, resp } => {
            let _ = resp.send(store.by_event_cloned(&event_name));
        }
        Command::Flush { resp } => {
            let out = if let Some(tx) = persist_tx {
                let (flush_tx, flush_rx) = oneshot::channel();
                if tx
                    .send(PersistMsg::Flush { resp: flush_tx })
                    .await
                    .is_err()
                {
                    Err(RuntimeError::ChannelClosed)
                } else {
                    flush_rx
                        .await
                        .map_err(|_| RuntimeError::ChannelClosed)
                        .and_then(|r| r.map_err(RuntimeError::from))
                }
            } else {
                Ok(store.latest_op_seq())
            };
            let _ = resp.send(out);
        }
        Command::Shutdown { resp } => {
            let out = if let Some(tx) = persist_tx {
                let (done_tx, done_rx) = oneshot::channel();
                let send_res = tx.send(PersistMsg::Shutdown { resp: done_tx }).await;
                if send_res.is_err() {
                    Err(RuntimeError::ChannelClosed)
                } else {
                    match done_rx.await {
                        Ok(()) => Ok(()),
                        Err(_) => Err(RuntimeError::ChannelClosed),
                    }
                }
            } else {
                Ok(())
            };
            let _ = resp.send(out);
            return true;
        }
    }

    false
}

fn commit_mutation(store: &mut GuestStore, roster_tx: &watch::Sender<Vec<GuestRecord>>) {
    // Ops were already forwarded; the pending buffer only serves sync callers
    // and must not accumulate under the loop.
    let _ = store.drain_pending_ops();
    roster_tx.send_replace(store.all_cloned());
}

fn reserve_persist<'a>(
    tx: Option<&'a mpsc::Sender<PersistMsg>>,
) -> Result<Option<mpsc::Permit<'a, PersistMsg>>, RuntimeError> {
    let Some(tx) = tx else {
        return Ok(None);
    };
    tx.try_reserve().map(Some).map_err(|err| {
        RuntimeError::Persist(PersistError::Message(format!("persist queue error: {err}")))
    })
}

fn forward_op(
    permit: Option<mpsc::Permit<'_, PersistMsg>>,
    stored: StoredOp,
    store: &GuestStore,
    events_tx: &broadcast::Sender<GuestEvent>,
) {
    match permit {
        Some(permit) => permit.send(PersistMsg::Op(stored)),
        None => {
            let _ = events_tx.send(GuestEvent::DurableUpTo {
                op_seq: store.latest_op_seq(),
            });
        }
    }
}

fn spawn_persistence_worker(
    sink: Box<dyn GuestSink>,
    mut rx: mpsc::Receiver<PersistMsg>,
    durable_tx: mpsc::UnboundedSender<Result<OpSeq, PersistError>>,
    config: RuntimeConfig,
) {
    let sink = Arc::new(Mutex::new(sink));
    tokio::spawn(async move {
        let mut buf = Vec::<StoredOp>::new();
        let mut deadline = Instant::now() + Duration::from_millis(config.batch_max_latency_ms);
        let mut last_durable: OpSeq = 0;

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else {
                        let _ = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                        break;
                    };

                    match msg {
                        PersistMsg::Op(stored) => {
                            let is_add = matches!(stored.op, crate::op::Op::Add { .. });
                            buf.push(stored);

                            if buf.len() >= config.batch_max_ops || (config.flush_on_add && is_add) {
                                let _ = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                                deadline = Instant::now() + Duration::from_millis(config.batch_max_latency_ms);
                            }
                        }
                        PersistMsg::Flush { resp } => {
                            let result = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                            let _ = resp.send(result.map(|_| last_durable));
                            deadline = Instant::now() + Duration::from_millis(config.batch_max_latency_ms);
                        }
                        PersistMsg::Shutdown { resp } => {
                            let _ = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                            let _ = resp.send(());
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline), if !buf.is_empty() => {
                    let _ = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, false).await;
                    deadline = Instant::now() + Duration::from_millis(config.batch_max_latency_ms);
                }
            }
        }
    });
}

async fn flush_buf(
    sink: &Arc<Mutex<Box<dyn GuestSink>>>,
    buf: &mut Vec<StoredOp>,
    last_durable: &mut OpSeq,
    durable_tx: &mpsc::UnboundedSender<Result<OpSeq, PersistError>>,
    call_flush: bool,
) -> Result<(), PersistError> {
    if buf.is_empty() {
        if call_flush {
            let sink_ref = Arc::clone(sink);
            tokio::task::spawn_blocking(move || {
                let mut sink = sink_ref.blocking_lock();
                sink.flush()
            })
            .await
            .map_err(|e| PersistError::Message(format!("join error: {e}")))??;
        }
        return Ok(());
    }

    let ops = std::mem::take(buf);
    let sink_ref = Arc::clone(sink);
    let apply_res: Result<OpSeq, PersistError> = tokio::task::spawn_blocking(move || {
        let mut sink = sink_ref.blocking_lock();
        let seq = sink.apply_ops(&ops)?;
        if call_flush {
            sink.flush()?;
        }
        Ok(seq)
    })
    .await
    .map_err(|e| PersistError::Message(format!("join error: {e}")))?;

    match apply_res {
        Ok(seq) => {
            *last_durable = (*last_durable).max(seq);
            let _ = durable_tx.send(Ok(*last_durable));
            Ok(())
        }
        Err(err) => {
            let _ = durable_tx.send(Err(PersistError::Message(format!("apply failed: {err:?}"))));
            Err(err)
        }
    }
}
