//! Job Queue Framework
//!
//! An in-process queue + worker framework for background jobs.
//!
//! ## Features
//!
//! - **Atomic reservation**: no two consumers ever receive the same job
//! - **Typed jobs**: any serde type with a `JOB_TYPE` key can be enqueued
//! - **Handler registry**: jobs are dispatched by their type key
//! - **Bounded retries**: failed jobs are re-enqueued, then dead-lettered
//! - **Graceful shutdown**: the worker finishes its in-flight job before exit
//!
//! The queue is deliberately non-durable: it lives in process memory and is
//! shared between producer tasks (e.g. HTTP handlers) and one or more worker
//! tasks. Jobs do not survive a process restart.
//!
//! ## Example
//!
//! ```ignore
//! use job_queue::{HandlerRegistry, JobQueue, QueueConfig, Worker};
//!
//! let queue = JobQueue::new();
//! let mut registry = HandlerRegistry::new();
//! registry.register_job::<MyJob>(Arc::new(MyHandler))?;
//!
//! let worker = Worker::new(queue.clone(), Arc::new(registry), QueueConfig::default());
//! tokio::spawn(async move { worker.run(shutdown_rx).await });
//!
//! queue.enqueue(&MyJob { .. }).await?;
//! ```

mod config;
mod error;
mod job;
mod queue;
mod registry;
mod worker;

pub use config::QueueConfig;
pub use error::{ErrorCategory, JobError};
pub use job::{Job, JobEnvelope};
pub use queue::{DeadJob, JobQueue};
pub use registry::{HandlerRegistry, JobHandler};
pub use worker::Worker;
