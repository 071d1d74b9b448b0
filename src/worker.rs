use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::{TaskId, WorkerAddress};

/// 工作节点状态
///
/// A worker runs at most one task at a time. `Failed` is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WorkerState {
    Free,
    Busy(TaskId),
    Failed,
}

/// Worker table owned by the pool's message loop
#[derive(Default)]
pub struct WorkerTable {
    states: HashMap<WorkerAddress, WorkerState>,
}

impl WorkerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a worker as `Free`. Returns false if the address is already known,
    /// whatever its state.
    pub fn register(&mut self, address: &str) -> bool {
        if self.states.contains_key(address) {
            return false;
        }
        self.states.insert(address.to_string(), WorkerState::Free);
        true
    }

    pub fn state(&self, address: &str) -> Option<&WorkerState> {
        self.states.get(address)
    }

    pub fn is_free(&self, address: &str) -> bool {
        matches!(self.states.get(address), Some(WorkerState::Free))
    }

    pub fn mark_busy(&mut self, address: &str, task_id: &str) {
        let state = self.state_mut(address);
        if *state != WorkerState::Free {
            panic!("worker {} assigned task {} while {:?}", address, task_id, state);
        }
        *state = WorkerState::Busy(task_id.to_string());
    }

    /// Release a worker after it completed `task_id`.
    pub fn mark_free(&mut self, address: &str, task_id: &str) {
        let state = self.expect_busy_with(address, task_id);
        *state = WorkerState::Free;
    }

    /// Permanently retire a worker whose run of `task_id` failed.
    pub fn mark_failed(&mut self, address: &str, task_id: &str) {
        let state = self.expect_busy_with(address, task_id);
        *state = WorkerState::Failed;
    }

    fn expect_busy_with(&mut self, address: &str, task_id: &str) -> &mut WorkerState {
        let state = self.state_mut(address);
        if !matches!(&*state, WorkerState::Busy(current) if current == task_id) {
            panic!("worker {} reported task {} while {:?}", address, task_id, state);
        }
        state
    }

    fn state_mut(&mut self, address: &str) -> &mut WorkerState {
        match self.states.get_mut(address) {
            Some(state) => state,
            None => panic!("unknown worker {}", address),
        }
    }

    pub fn first_free(&self) -> Option<WorkerAddress> {
        self.states
            .iter()
            .find(|(_, state)| **state == WorkerState::Free)
            .map(|(address, _)| address.clone())
    }

    pub fn free_workers(&self) -> Vec<WorkerAddress> {
        self.states
            .iter()
            .filter(|(_, state)| **state == WorkerState::Free)
            .map(|(address, _)| address.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// 按地址排序的状态列表(快照用)
    pub fn entries(&self) -> Vec<(WorkerAddress, WorkerState)> {
        let mut entries: Vec<_> = self
            .states
            .iter()
            .map(|(address, state)| (address.clone(), state.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl fmt::Debug for WorkerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerTable")
            .field("workers", &self.states.len())
            .field("free", &self.free_workers().len())
            .finish()
    }
}
