// src/system/notifier.rs

use crate::{
    constants::{NOTIFY_QUEUE_CAPACITY, NOTIFY_VOICE},
    system::shell::find_executable,
};
use crossbeam_channel::Sender;
use std::fmt;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Delivers one message. Called on the worker thread, one message at a time.
pub type NotifyHandler = Box<dyn Fn(&str) + Send>;

/// Bounded, ordered, single-consumer notification queue.
///
/// `notify` only blocks when the queue is full. The worker hands each message to
/// the handler and takes the next one only once the handler returned.
pub struct Notifier {
    sender: Option<Sender<String>>,
    pending: Arc<AtomicUsize>,
    worker: Option<JoinHandle<()>>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    /// A notifier that speaks messages aloud when `say` is available.
    pub fn new() -> Self {
        Self::with_handler(NOTIFY_QUEUE_CAPACITY, Box::new(speak))
    }

    pub fn with_handler(capacity: usize, handler: NotifyHandler) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded::<String>(capacity);
        let pending = Arc::new(AtomicUsize::new(0));
        let worker_pending = Arc::clone(&pending);

        let worker = thread::Builder::new()
            .name("nrun-notify".to_string())
            .spawn(move || {
                for message in receiver.iter() {
                    handler(&message);
                    worker_pending.fetch_sub(1, Ordering::SeqCst);
                }
            });

        match worker {
            Ok(worker) => Self {
                sender: Some(sender),
                pending,
                worker: Some(worker),
            },
            Err(e) => {
                log::warn!("Notifications disabled, could not start worker: {}", e);
                Self {
                    sender: None,
                    pending,
                    worker: None,
                }
            }
        }
    }

    /// Queues a message.
    pub fn notify(&self, message: impl Into<String>) {
        let message = message.into();
        let Some(sender) = &self.sender else {
            log::warn!("{}", message);
            return;
        };
        self.pending.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = sender.send(message) {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            log::warn!("Notification dropped: {}", e.into_inner());
        }
    }

    /// Number of queued or in-flight messages.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Blocks until every queued message has been delivered.
    pub fn wait_until_drained(&self) {
        while self.pending() > 0 {
            if self.worker.as_ref().is_none_or(JoinHandle::is_finished) {
                log::warn!("Notification worker stopped with {} message(s) pending.", self.pending());
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Notification worker panicked.");
            }
        }
    }
}

fn speak(message: &str) {
    let Some(say) = find_executable("say") else {
        log::warn!("{}", message);
        return;
    };
    let status = Command::new(say)
        .arg(format!("--voice={}", NOTIFY_VOICE))
        .arg(message)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = status {
        log::warn!("{} (notification failed: {})", message, e);
    }
}
