//! # Runner Module
//!
//! Execution contexts for the router: single-threaded task queues that run one task at a
//! time, in the order tasks were posted.
//!
//! ## Flavours
//!
//! - [`LocalRunner`] - queue drained manually on the calling thread (`run_until_idle`).
//!   Deterministic, which makes it the tool of choice for simulating several contexts in tests.
//! - [`RunnerThread`] - queue drained by a dedicated named OS thread whose stack size comes
//!   from [`RuntimeConfig`].
//!
//! Both hand out cloneable [`TaskRunner`] handles. While a task runs, its runner is the
//! *current* runner of that thread ([`TaskRunner::current`]); code that needs to get back to
//! a particular context compares against [`TaskRunner::is_current`] and re-posts itself when
//! it is somewhere else.
//!
//! Queues are may's unbounded MPSC channels, so posting never waits on the consumer.
//! Once a runner shuts down its queue is closed: every later `post` fails with
//! [`RunnerError::Closed`], and every `post` that succeeded is run before the runner exits.

use crate::error::RunnerError;
use crate::runtime_config::RuntimeConfig;
use may::sync::mpsc;
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use tracing::{debug, error, info, warn};

/// A unit of work posted to a runner.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Task),
    Quit,
}

static NEXT_RUNNER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: RefCell<Option<TaskRunner>> = const { RefCell::new(None) };
}

/// Process-unique identity of a runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RunnerId(u64);

impl fmt::Display for RunnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runner-{}", self.0)
    }
}

/// Cloneable handle used to post tasks onto one execution context.
#[derive(Clone)]
pub struct TaskRunner {
    id: RunnerId,
    name: Arc<str>,
    /// `None` once the runner has stopped accepting tasks
    queue: Arc<Mutex<Option<mpsc::Sender<Message>>>>,
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl TaskRunner {
    fn channel(name: &str) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel();
        let runner = TaskRunner {
            id: RunnerId(NEXT_RUNNER_ID.fetch_add(1, Ordering::Relaxed)),
            name: Arc::from(name),
            queue: Arc::new(Mutex::new(Some(tx))),
        };
        (runner, rx)
    }

    /// The runner whose task is executing on this thread, if any.
    #[must_use]
    pub fn current() -> Option<TaskRunner> {
        CURRENT.with(|current| current.borrow().clone())
    }

    #[must_use]
    pub fn id(&self) -> RunnerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the calling code is running inside a task of this runner.
    #[must_use]
    pub fn is_current(&self) -> bool {
        CURRENT.with(|current| {
            current
                .borrow()
                .as_ref()
                .is_some_and(|runner| runner.id == self.id)
        })
    }

    /// Enqueue a task. Fails only when the runner has shut down.
    pub fn post<F>(&self, task: F) -> Result<(), RunnerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sent = match self.queue().as_ref() {
            Some(tx) => tx.send(Message::Run(Box::new(task))).is_ok(),
            None => false,
        };
        if sent {
            Ok(())
        } else {
            Err(RunnerError::Closed {
                runner: self.name.to_string(),
            })
        }
    }

    /// Whether the runner has stopped accepting tasks.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.queue().is_none()
    }

    /// Stop accepting tasks. `Quit` is queued behind everything already posted.
    /// Returns `false` if the queue was already closed.
    fn close(&self) -> bool {
        let mut queue = self.queue();
        let Some(tx) = queue.take() else {
            return false;
        };
        // Sent under the lock so no task can be queued behind it.
        tx.send(Message::Quit).is_ok()
    }

    fn queue(&self) -> MutexGuard<'_, Option<mpsc::Sender<Message>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a runner as current for the lifetime of the guard and restores the previous one on drop.
struct EnterGuard {
    previous: Option<TaskRunner>,
}

impl EnterGuard {
    fn new(runner: &TaskRunner) -> Self {
        let previous = CURRENT.with(|current| current.replace(Some(runner.clone())));
        EnterGuard { previous }
    }
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

/// A task queue drained explicitly by its owner on the owner's thread.
///
/// Panics raised by tasks propagate to the caller of [`run_one`](Self::run_one).
pub struct LocalRunner {
    handle: TaskRunner,
    rx: mpsc::Receiver<Message>,
}

impl LocalRunner {
    #[must_use]
    pub fn new(name: &str) -> Self {
        let (handle, rx) = TaskRunner::channel(name);
        LocalRunner { handle, rx }
    }

    /// A handle for posting onto this runner.
    #[must_use]
    pub fn handle(&self) -> TaskRunner {
        self.handle.clone()
    }

    /// Run `f` as if it were a task of this runner.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = EnterGuard::new(&self.handle);
        f()
    }

    /// Run the next queued task, if there is one.
    pub fn run_one(&self) -> bool {
        match self.rx.try_recv() {
            Ok(Message::Run(task)) => {
                let _guard = EnterGuard::new(&self.handle);
                task();
                true
            }
            Ok(Message::Quit) | Err(_) => false,
        }
    }

    /// Run tasks until the queue is empty, including tasks posted while draining.
    /// Returns the number of tasks executed.
    pub fn run_until_idle(&self) -> usize {
        let mut executed = 0;
        while self.run_one() {
            executed += 1;
        }
        executed
    }
}

impl Drop for LocalRunner {
    fn drop(&mut self) {
        self.handle.close();
    }
}

/// A task queue drained by a dedicated thread.
///
/// Dropping the runner drains the tasks already queued and joins the thread.
pub struct RunnerThread {
    handle: TaskRunner,
    join: Option<thread::JoinHandle<()>>,
}

impl RunnerThread {
    /// Spawn a runner thread configured from the environment.
    pub fn spawn(name: &str) -> Result<Self, RunnerError> {
        Self::spawn_with_config(name, &RuntimeConfig::from_env())
    }

    /// Spawn a runner thread with an explicit configuration.
    pub fn spawn_with_config(name: &str, config: &RuntimeConfig) -> Result<Self, RunnerError> {
        let (handle, rx) = TaskRunner::channel(name);
        let thread_handle = handle.clone();
        let thread_name = config.thread_name(name);

        info!(
            runner = %name,
            thread_name = %thread_name,
            stack_size = config.stack_size,
            "Starting runner thread"
        );

        let join = thread::Builder::new()
            .name(thread_name)
            .stack_size(config.stack_size)
            .spawn(move || {
                let _guard = EnterGuard::new(&thread_handle);
                debug!(runner = %thread_handle.name(), "Runner thread started");

                for message in rx.iter() {
                    match message {
                        Message::Run(task) => {
                            if let Err(panic) =
                                std::panic::catch_unwind(std::panic::AssertUnwindSafe(task))
                            {
                                error!(
                                    runner = %thread_handle.name(),
                                    panic_message = ?panic,
                                    "Runner task panicked"
                                );
                            }
                        }
                        Message::Quit => break,
                    }
                }

                debug!(runner = %thread_handle.name(), "Runner thread exiting");
            })?;

        Ok(RunnerThread {
            handle,
            join: Some(join),
        })
    }

    /// A handle for posting onto this runner.
    #[must_use]
    pub fn handle(&self) -> TaskRunner {
        self.handle.clone()
    }

    /// Stop accepting work after the tasks already queued and wait for the thread to exit.
    pub fn shutdown(&mut self) {
        let Some(join) = self.join.take() else {
            return;
        };
        if !self.handle.close() {
            warn!(runner = %self.handle.name(), "Runner thread already gone");
        }
        if self.handle.is_current() {
            // Joining from inside the runner would deadlock; the thread exits on Quit.
            return;
        }
        if join.join().is_err() {
            error!(runner = %self.handle.name(), "Runner thread terminated abnormally");
        }
    }
}

impl Drop for RunnerThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}
