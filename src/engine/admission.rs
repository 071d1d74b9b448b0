//! 准入控制 - 前台调用方与消息循环之间唯一共享的状态
//!
//! The run state, the message sender and the in-flight counter live behind
//! one mutex. Every enqueue goes through [`Admission::push`] so the channel
//! is never closed while a send is racing toward it.

use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::config::PoolConfig;
use crate::engine::message::Message;
use crate::engine::PoolRunState;

pub(crate) struct Shared {
    pub(crate) config: PoolConfig,
    admission: Mutex<Admission>,
    changed: Condvar,
}

pub(crate) struct Admission {
    pub(crate) state: PoolRunState,
    sender: Option<Sender<Message>>,
    /// Messages enqueued but not yet fully handled by the loop
    pub(crate) pending: usize,
    pub(crate) work_set_active: bool,
    pub(crate) loop_panicked: bool,
    pub(crate) loop_handle: Option<JoinHandle<()>>,
}

impl Shared {
    pub(crate) fn new(config: PoolConfig, sender: Sender<Message>) -> Self {
        Self {
            config,
            admission: Mutex::new(Admission {
                state: PoolRunState::Running,
                sender: Some(sender),
                pending: 0,
                work_set_active: false,
                loop_panicked: false,
                loop_handle: None,
            }),
            changed: Condvar::new(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Admission> {
        self.admission.lock()
    }

    /// Block while `condition` holds, re-checking after every state change.
    pub(crate) fn wait_while<F>(&self, guard: &mut MutexGuard<'_, Admission>, condition: F)
    where
        F: FnMut(&mut Admission) -> bool,
    {
        self.changed.wait_while(guard, condition);
    }

    pub(crate) fn notify_all(&self) {
        self.changed.notify_all();
    }

    /// Enqueue regardless of run state, as long as the channel is open.
    pub(crate) fn enqueue(&self, message: Message) -> bool {
        self.lock().push(message)
    }

    /// Called by the loop after each message.
    pub(crate) fn message_handled(&self) {
        let mut admission = self.lock();
        admission.pending = admission.pending.saturating_sub(1);
        if admission.pending == 0 {
            self.changed.notify_all();
        }
    }

    /// Called when the loop thread unwinds.
    pub(crate) fn loop_died(&self) {
        let mut admission = self.lock();
        admission.loop_panicked = true;
        admission.sender = None;
        self.changed.notify_all();
    }
}

impl Admission {
    pub(crate) fn push(&mut self, message: Message) -> bool {
        let Some(sender) = self.sender.as_ref() else {
            return false;
        };
        self.pending += 1;
        if sender.send(message).is_err() {
            self.pending -= 1;
            return false;
        }
        true
    }

    /// Drop the only sender, closing the channel.
    pub(crate) fn close(&mut self) {
        self.sender = None;
    }
}
