//! Event dispatcher
//!
//! The one place a dispatch frame becomes a cache mutation and a typed event.
//! Each shard's lane is consumed by `run_lane`, so cache effects apply in wire
//! order for that shard; listener bodies then fan out to the task queue. REST
//! fetches a handler needs never run on the lane.

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use shardline_cache::Cache;
use shardline_common::ClientResult;
use shardline_http::RestClient;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;

use super::handlers::{self, Handled};
use super::listeners::ListenerRegistry;
use crate::client::Context;
use crate::commands::CommandHandler;
use crate::events::{Event, EventType};
use crate::shard::{stopped, DispatchFrame, LaneItem, LaneReceiver, Shard, ShardInfo};
use crate::tasks::TaskQueue;

/// Routes dispatch frames to handlers and events to listeners
pub struct EventDispatcher {
    /// Dispatch name to kind, built once
    table: HashMap<&'static str, EventType>,
    cache: Arc<Cache>,
    rest: Arc<RestClient>,
    listeners: Arc<ListenerRegistry>,
    queue: Arc<TaskQueue>,
    command_handler: RwLock<Arc<dyn CommandHandler>>,
}

impl EventDispatcher {
    pub fn new(
        cache: Arc<Cache>,
        rest: Arc<RestClient>,
        listeners: Arc<ListenerRegistry>,
        queue: Arc<TaskQueue>,
        command_handler: Arc<dyn CommandHandler>,
    ) -> Self {
        let table = EventType::DISPATCH
            .iter()
            .map(|kind| (kind.as_str(), *kind))
            .collect();
        Self {
            table,
            cache,
            rest,
            listeners,
            queue,
            command_handler: RwLock::new(command_handler),
        }
    }

    /// Kind registered for a dispatch name
    pub fn lookup(&self, name: &str) -> Option<EventType> {
        self.table.get(name).copied()
    }

    pub fn context(&self, shard: ShardInfo) -> Context {
        Context::new(shard, Arc::clone(&self.cache), Arc::clone(&self.rest))
    }

    pub fn set_command_handler(&self, handler: Arc<dyn CommandHandler>) {
        *self.command_handler.write() = handler;
    }

    /// Handle one frame; returns how many listeners were scheduled.
    ///
    /// Unknown names are ignored. A frame the handler cannot interpret is
    /// logged and dropped. A handler that needs a REST call finishes on the
    /// task queue, and its listeners are scheduled from there.
    pub async fn dispatch(&self, shard: &Arc<Shard>, frame: DispatchFrame) -> usize {
        let Some(kind) = self.lookup(&frame.name) else {
            tracing::trace!(shard = %frame.shard, event = %frame.name, "Ignoring unknown event");
            return 0;
        };

        let ctx = self.context(frame.shard);
        let event = match handlers::handle(kind, shard, &self.cache, &frame.data) {
            Ok(Some(Handled::Event(event))) => event,
            Ok(Some(Handled::Deferred(pending))) => {
                self.defer(ctx, kind, pending);
                return 0;
            }
            Ok(None) => return 0,
            Err(e) => {
                tracing::warn!(
                    shard = %frame.shard,
                    event = %kind,
                    seq = ?frame.sequence,
                    error = %e,
                    code = e.error_code(),
                    "Dropping dispatch frame"
                );
                return 0;
            }
        };

        let created = match &event {
            Event::MessageCreate { message } => Some(message.clone()),
            _ => None,
        };
        let scheduled = self.emit(&ctx, event);

        if let Some(message) = created {
            let handler = Arc::clone(&*self.command_handler.read());
            handler.handle(ctx, &message, &self.queue).await;
        }
        scheduled
    }

    /// Schedule every listener registered for the event's kind
    pub fn emit(&self, ctx: &Context, event: Event) -> usize {
        fan_out(&self.listeners, &self.queue, ctx, event)
    }

    fn defer(&self, ctx: Context, kind: EventType, pending: BoxFuture<'static, ClientResult<Event>>) {
        let listeners = Arc::clone(&self.listeners);
        let queue = Arc::clone(&self.queue);
        self.queue.schedule("dispatch", async move {
            match pending.await {
                Ok(event) => {
                    fan_out(&listeners, &queue, &ctx, event);
                }
                Err(e) => tracing::warn!(
                    shard = %ctx.shard,
                    event = %kind,
                    error = %e,
                    code = e.error_code(),
                    "Dropping dispatch frame"
                ),
            }
            Ok(())
        });
    }

    /// Consume one shard's lane until it closes or `shutdown` is raised
    pub async fn run_lane(
        self: Arc<Self>,
        shard: Arc<Shard>,
        mut lane: LaneReceiver,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            let item = tokio::select! {
                item = lane.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
                () = stopped(&mut shutdown) => break,
            };

            match item {
                LaneItem::Dispatch(frame) => {
                    let name = frame.name.clone();
                    let handled = AssertUnwindSafe(self.dispatch(&shard, frame))
                        .catch_unwind()
                        .await;
                    if handled.is_err() {
                        tracing::error!(shard = %shard.info(), event = %name, "Dispatch handler panicked");
                    }
                }
                LaneItem::Lifecycle(event) => {
                    let ctx = self.context(shard.info());
                    self.emit(&ctx, event);
                }
            }
        }
        tracing::debug!(shard = %shard.info(), "Dispatch lane stopped");
    }
}

fn fan_out(registry: &ListenerRegistry, queue: &TaskQueue, ctx: &Context, event: Event) -> usize {
    let listeners = registry.listeners_for(event.kind());
    if listeners.is_empty() {
        return 0;
    }

    let event = Arc::new(event);
    for listener in &listeners {
        queue.schedule("listener", listener(ctx.clone(), Arc::clone(&event)));
    }
    listeners.len()
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.table.len())
            .field("listeners", &self.listeners)
            .finish()
    }
}
