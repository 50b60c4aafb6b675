//! Diagnostic bus shared by every node of a runtime.
//!
//! [`Console`] fans each [`Message`] out to its listeners and mirrors it as a
//! `tracing` event. Listeners are held weakly: dropping the last strong
//! reference unsubscribes them, and dead entries are pruned on the next
//! delivery.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::node::NodeId;
use crate::tag::Tag;

/// Severity of a console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    /// Informational output, such as the text of a `print` node.
    Post,
    /// Something was ignored or adjusted.
    Warning,
    /// An operation was refused.
    Error,
}

impl Level {
    /// Lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Level::Post => "post",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

/// The node a message is about.
#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    /// Node ID.
    pub id: NodeId,
    /// Node type name.
    pub name: Tag,
}

/// One console message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Severity.
    pub level: Level,
    /// Human-readable text.
    pub text: String,
    /// Node the message is about, if any.
    pub origin: Option<Origin>,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Some(origin) => write!(f, "{} ({}): {}", origin.name, origin.id, self.text),
            None => f.write_str(&self.text),
        }
    }
}

/// Receives console messages.
pub trait ConsoleListener: Send + Sync {
    /// Called for every message, on the thread that emitted it.
    fn receive(&self, message: &Message);
}

/// Publish/subscribe diagnostic bus.
#[derive(Default)]
pub struct Console {
    listeners: Mutex<Vec<Weak<dyn ConsoleListener>>>,
}

impl Console {
    /// Creates a console with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `listener` until it is dropped or removed.
    pub fn add_listener<L: ConsoleListener + 'static>(&self, listener: &Arc<L>) {
        let weak = Arc::downgrade(listener);
        let weak: Weak<dyn ConsoleListener> = weak;
        let mut listeners = self.listeners.lock();
        if !listeners
            .iter()
            .any(|l| std::ptr::addr_eq(l.as_ptr(), Arc::as_ptr(listener)))
        {
            listeners.push(weak);
        }
    }

    /// Unsubscribes `listener`.
    pub fn remove_listener<L: ConsoleListener + 'static>(&self, listener: &Arc<L>) {
        self.listeners.lock().retain(|l| {
            l.strong_count() > 0 && !std::ptr::addr_eq(l.as_ptr(), Arc::as_ptr(listener))
        });
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|l| l.strong_count() > 0)
            .count()
    }

    /// Posts an informational message.
    pub fn post(&self, text: impl Into<String>) {
        self.emit(Message {
            level: Level::Post,
            text: text.into(),
            origin: None,
        });
    }

    /// Posts a warning.
    pub fn warning(&self, text: impl Into<String>) {
        self.emit(Message {
            level: Level::Warning,
            text: text.into(),
            origin: None,
        });
    }

    /// Posts an error.
    pub fn error(&self, text: impl Into<String>) {
        self.emit(Message {
            level: Level::Error,
            text: text.into(),
            origin: None,
        });
    }

    /// Delivers `message` to every live listener in subscription order.
    pub fn emit(&self, message: Message) {
        trace(&message);
        let live: Vec<Arc<dyn ConsoleListener>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in live {
            listener.receive(&message);
        }
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

fn trace(message: &Message) {
    match (&message.origin, message.level) {
        (Some(o), Level::Post) => {
            tracing::info!(node_id = o.id.index(), node_name = %o.name, "{}", message.text);
        }
        (Some(o), Level::Warning) => {
            tracing::warn!(node_id = o.id.index(), node_name = %o.name, "{}", message.text);
        }
        (Some(o), Level::Error) => {
            tracing::error!(node_id = o.id.index(), node_name = %o.name, "{}", message.text);
        }
        (None, Level::Post) => tracing::info!("{}", message.text),
        (None, Level::Warning) => tracing::warn!("{}", message.text),
        (None, Level::Error) => tracing::error!("{}", message.text),
    }
}

/// A listener that keeps the messages it receives, oldest first.
#[derive(Debug, Default)]
pub struct ConsoleHistory {
    messages: Mutex<VecDeque<Message>>,
    capacity: Option<usize>,
}

impl ConsoleHistory {
    /// Creates an unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history that keeps only the newest `capacity` messages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: Some(capacity.max(1)),
        }
    }

    /// Snapshot of the kept messages.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().iter().cloned().collect()
    }

    /// Kept messages of the given level.
    pub fn at_level(&self, level: Level) -> Vec<Message> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.level == level)
            .cloned()
            .collect()
    }

    /// Returns `true` if any kept message contains `text`.
    pub fn contains(&self, text: &str) -> bool {
        self.messages.lock().iter().any(|m| m.text.contains(text))
    }

    /// Number of kept messages.
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Returns `true` if nothing was kept.
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Forgets every kept message.
    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl ConsoleListener for ConsoleHistory {
    fn receive(&self, message: &Message) {
        let mut messages = self.messages.lock();
        if let Some(capacity) = self.capacity {
            while messages.len() >= capacity {
                messages.pop_front();
            }
        }
        messages.push_back(message.clone());
    }
}
