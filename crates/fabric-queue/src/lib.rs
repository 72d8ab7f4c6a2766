//! Persistent queue abstraction and local mailboxes.
//!
//! The manager treats the external store as a list-oriented key-value
//! queue: tail-push to append, head-pop to consume. [`PersistentQueue`]
//! keeps the manager's logic independent of the concrete backend; a Redis
//! implementation ([`RedisQueue`]) and an in-memory one ([`MemoryQueue`],
//! used by tests) both satisfy it.
#![forbid(unsafe_code)]
#![deny(unreachable_pub)]

mod mailbox;
mod memory;
mod queue;
mod redis_backend;

pub use mailbox::{Mailbox, MailboxError, MailboxReceiver, MailboxSender};
pub use memory::MemoryQueue;
pub use queue::{PersistentQueue, QueueError};
pub use redis_backend::RedisQueue;
