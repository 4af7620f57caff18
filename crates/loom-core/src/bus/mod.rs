//! Typed, filterable publish/subscribe.
//!
//! A [`MessageBus`] is bound to one [`BusScope`]. Only types implementing
//! [`Message`] for that scope can be published on it, so workspace events
//! never reach generator subscribers and the other way round.
//!
//! ```text
//! subscribe::<E>(handler)          ─┐
//! subscribe_filtered::<E>(f, h)    ─┼─► token (monotonic)
//! subscribe_async::<E>(h)          ─┘
//!
//! publish(&mut e, ctx)              sync handlers, subscription order
//! publish_async(&mut e, ctx, tok)   sync + async handlers, awaited one by one
//! ```
//!
//! Handlers receive the event mutably: several subscribers may each add an
//! entry to a map carried on the event and the publisher reads it back.

pub mod workspace;

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::domain::DomainError;

pub use workspace::{
    ArtifactConstructed, ChildAdded, ChildRemoved, ContextMenuOpening, MenuItem,
    RenameRequested, WorkspaceScope,
};

// ============================================================================
// Scope and message markers
// ============================================================================

/// Marker for one independent bus instance.
pub trait BusScope: Send + 'static {
    const NAME: &'static str;

    /// Mutable state handed to every handler next to the event.
    type Context: Send + 'static;
}

/// An event publishable on the bus of scope `S`.
pub trait Message<S: BusScope>: Any + Send {}

/// Opaque handle returned by the `subscribe*` family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BusError {
    #[error("Dispatch of '{event}' was cancelled")]
    Cancelled { event: &'static str },

    #[error("{0}")]
    Handler(String),
}

impl BusError {
    pub fn handler(message: impl fmt::Display) -> Self {
        Self::Handler(message.to_string())
    }
}

impl From<DomainError> for BusError {
    fn from(err: DomainError) -> Self {
        Self::Handler(err.to_string())
    }
}

impl From<std::io::Error> for BusError {
    fn from(err: std::io::Error) -> Self {
        Self::Handler(err.to_string())
    }
}

/// Handler that must finish asynchronous work before dispatch moves on.
#[async_trait]
pub trait AsyncHandler<S: BusScope, E: Message<S>>: Send + Sync + 'static {
    async fn handle(&self, event: &mut E, ctx: &mut S::Context) -> Result<(), BusError>;
}

/// One async handler failure collected during [`MessageBus::publish_async`].
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchFailure {
    pub token: SubscriptionToken,
    pub event: &'static str,
    pub error: BusError,
}

/// Outcome of one asynchronous publish.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ============================================================================
// Type erasure
// ============================================================================

type ErasedFilter = Box<dyn Fn(&dyn Any) -> bool + Send + Sync>;
type ErasedSync<C> = Box<dyn FnMut(&mut dyn Any, &mut C) + Send + Sync>;

#[async_trait]
trait ErasedAsync<S: BusScope>: Send + Sync {
    async fn call(&self, event: &mut (dyn Any + Send), ctx: &mut S::Context)
    -> Result<(), BusError>;
}

struct AsyncAdapter<E, H> {
    handler: H,
    _event: PhantomData<fn() -> E>,
}

#[async_trait]
impl<S, E, H> ErasedAsync<S> for AsyncAdapter<E, H>
where
    S: BusScope,
    E: Message<S>,
    H: AsyncHandler<S, E>,
{
    async fn call(
        &self,
        event: &mut (dyn Any + Send),
        ctx: &mut S::Context,
    ) -> Result<(), BusError> {
        match event.downcast_mut::<E>() {
            Some(event) => self.handler.handle(event, ctx).await,
            None => Ok(()),
        }
    }
}

enum Handler<S: BusScope> {
    Sync(ErasedSync<S::Context>),
    Async(Arc<dyn ErasedAsync<S>>),
}

struct Subscription<S: BusScope> {
    token: SubscriptionToken,
    event_type: TypeId,
    event_name: &'static str,
    filter: Option<ErasedFilter>,
    handler: Handler<S>,
}

impl<S: BusScope> Subscription<S> {
    fn matches(&self, event_type: TypeId, event: &dyn Any) -> bool {
        self.event_type == event_type && self.filter.as_ref().is_none_or(|f| f(event))
    }
}

// ============================================================================
// MessageBus
// ============================================================================

pub struct MessageBus<S: BusScope> {
    next_token: u64,
    subscriptions: Vec<Subscription<S>>,
}

impl<S: BusScope> Default for MessageBus<S> {
    fn default() -> Self {
        Self {
            next_token: 0,
            subscriptions: Vec::new(),
        }
    }
}

impl<S: BusScope> MessageBus<S> {
    pub fn new() -> Self {
        Self::default()
    }

    // ── subscribe ─────────────────────────────────────────────────────────

    pub fn subscribe<E, F>(&mut self, handler: F) -> SubscriptionToken
    where
        E: Message<S>,
        F: FnMut(&mut E, &mut S::Context) + Send + Sync + 'static,
    {
        self.register::<E>(None, Handler::Sync(erase_sync::<S, E, F>(handler)))
    }

    pub fn subscribe_filtered<E, P, F>(&mut self, filter: P, handler: F) -> SubscriptionToken
    where
        E: Message<S>,
        P: Fn(&E) -> bool + Send + Sync + 'static,
        F: FnMut(&mut E, &mut S::Context) + Send + Sync + 'static,
    {
        self.register::<E>(
            Some(erase_filter(filter)),
            Handler::Sync(erase_sync::<S, E, F>(handler)),
        )
    }

    pub fn subscribe_async<E, H>(&mut self, handler: H) -> SubscriptionToken
    where
        E: Message<S>,
        H: AsyncHandler<S, E>,
    {
        self.register::<E>(None, Handler::Async(erase_async::<S, E, H>(handler)))
    }

    pub fn subscribe_async_filtered<E, P, H>(&mut self, filter: P, handler: H) -> SubscriptionToken
    where
        E: Message<S>,
        P: Fn(&E) -> bool + Send + Sync + 'static,
        H: AsyncHandler<S, E>,
    {
        self.register::<E>(
            Some(erase_filter(filter)),
            Handler::Async(erase_async::<S, E, H>(handler)),
        )
    }

    fn register<E: Message<S>>(
        &mut self,
        filter: Option<ErasedFilter>,
        handler: Handler<S>,
    ) -> SubscriptionToken {
        self.next_token += 1;
        let token = SubscriptionToken(self.next_token);
        let event_name = short_type_name::<E>();
        trace!(scope = S::NAME, event = event_name, %token, "Subscribed");

        self.subscriptions.push(Subscription {
            token,
            event_type: TypeId::of::<E>(),
            event_name,
            filter,
            handler,
        });
        token
    }

    /// Remove one subscription. Unknown or already removed tokens are ignored.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.token != token);
        let removed = before != self.subscriptions.len();
        if removed {
            trace!(scope = S::NAME, %token, "Unsubscribed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Number of subscriptions registered for event type `E`.
    pub fn subscriber_count<E: Message<S>>(&self) -> usize {
        let event_type = TypeId::of::<E>();
        self.subscriptions
            .iter()
            .filter(|s| s.event_type == event_type)
            .count()
    }

    // ── publish ───────────────────────────────────────────────────────────

    /// Dispatch to every matching synchronous handler in subscription order.
    ///
    /// Async subscriptions are skipped; use [`Self::publish_async`] for them.
    /// Returns the number of handlers invoked.
    pub fn publish<E: Message<S>>(&mut self, event: &mut E, ctx: &mut S::Context) -> usize {
        let event_type = TypeId::of::<E>();
        let mut delivered = 0;

        for subscription in self.subscriptions.iter_mut() {
            if !subscription.matches(event_type, &*event) {
                continue;
            }
            match &mut subscription.handler {
                Handler::Sync(handler) => {
                    handler(&mut *event, &mut *ctx);
                    delivered += 1;
                }
                Handler::Async(_) => {
                    trace!(
                        scope = S::NAME,
                        event = subscription.event_name,
                        token = %subscription.token,
                        "Skipping async handler on sync publish"
                    );
                }
            }
        }
        delivered
    }

    /// Dispatch to every matching handler, awaiting async ones sequentially.
    ///
    /// Cancellation is checked before each async handler. A failing async
    /// handler does not stop the remaining ones; its error is collected in
    /// the report.
    #[instrument(skip_all, fields(scope = S::NAME, event = short_type_name::<E>()))]
    pub async fn publish_async<E: Message<S>>(
        &mut self,
        event: &mut E,
        ctx: &mut S::Context,
        cancel: &CancellationToken,
    ) -> Result<DispatchReport, BusError> {
        let event_type = TypeId::of::<E>();
        let mut report = DispatchReport::default();

        for subscription in self.subscriptions.iter_mut() {
            if !subscription.matches(event_type, &*event) {
                continue;
            }
            match &mut subscription.handler {
                Handler::Sync(handler) => {
                    handler(&mut *event, &mut *ctx);
                    report.delivered += 1;
                }
                Handler::Async(handler) => {
                    if cancel.is_cancelled() {
                        debug!("Dispatch cancelled before async handler");
                        return Err(BusError::Cancelled {
                            event: subscription.event_name,
                        });
                    }
                    let handler = Arc::clone(handler);
                    report.delivered += 1;
                    if let Err(error) = handler.call(&mut *event, &mut *ctx).await {
                        warn!(token = %subscription.token, %error, "Async handler failed");
                        report.failures.push(DispatchFailure {
                            token: subscription.token,
                            event: subscription.event_name,
                            error,
                        });
                    }
                }
            }
        }
        Ok(report)
    }
}

impl<S: BusScope<Context = ()>> MessageBus<S> {
    /// [`Self::publish`] for scopes without handler context.
    pub fn notify<E: Message<S>>(&mut self, event: &mut E) -> usize {
        self.publish(event, &mut ())
    }
}

impl<S: BusScope> fmt::Debug for MessageBus<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBus")
            .field("scope", &S::NAME)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

fn erase_filter<E, P>(filter: P) -> ErasedFilter
where
    E: Any,
    P: Fn(&E) -> bool + Send + Sync + 'static,
{
    Box::new(move |event: &dyn Any| event.downcast_ref::<E>().is_some_and(&filter))
}

fn erase_sync<S, E, F>(mut handler: F) -> ErasedSync<S::Context>
where
    S: BusScope,
    E: Message<S>,
    F: FnMut(&mut E, &mut S::Context) + Send + Sync + 'static,
{
    Box::new(move |event: &mut dyn Any, ctx: &mut S::Context| {
        if let Some(event) = event.downcast_mut::<E>() {
            handler(event, ctx);
        }
    })
}

fn erase_async<S, E, H>(handler: H) -> Arc<dyn ErasedAsync<S>>
where
    S: BusScope,
    E: Message<S>,
    H: AsyncHandler<S, E>,
{
    Arc::new(AsyncAdapter {
        handler,
        _event: PhantomData,
    })
}

/// `loom_core::bus::workspace::ChildAdded` → `ChildAdded`
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
