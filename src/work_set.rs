//! 任务批次(work set)模块 - 跟踪一个批次内每个任务的执行状态

use std::collections::HashMap;
use std::fmt;

use crossbeam_channel::Sender;
use rand::seq::IteratorRandom;
use serde::Serialize;
use uuid::Uuid;

use crate::engine::PoolEvent;
use crate::task::SharedTask;
use crate::{PoolError, Result, TaskId};

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Complete,
}

/// 批次标识, 用于日志和快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WorkSetId(Uuid);

impl WorkSetId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for WorkSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 批次内各状态的任务数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkSetProgress {
    pub id: WorkSetId,
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub complete: usize,
}

/// 一个批次的任务集合
///
/// 任务集合在创建时固定, 之后只有任务状态会变化.
/// 当且仅当所有任务都是 [`TaskStatus::Complete`] 时批次完成.
pub struct WorkSet {
    id: WorkSetId,
    tasks: HashMap<TaskId, SharedTask>,
    statuses: HashMap<TaskId, TaskStatus>,
    started: bool,
    completion: Option<Sender<PoolEvent>>,
}

impl WorkSet {
    /// 创建新的批次, 任务列表不能为空且标识不能重复
    pub fn new(tasks: Vec<SharedTask>) -> Result<Self> {
        if tasks.is_empty() {
            return Err(PoolError::EmptyWorkSet);
        }

        let mut by_id = HashMap::with_capacity(tasks.len());
        let mut statuses = HashMap::with_capacity(tasks.len());
        for task in tasks {
            let id = task.id();
            if by_id.contains_key(&id) {
                return Err(PoolError::DuplicateTask(id));
            }
            statuses.insert(id.clone(), TaskStatus::NotStarted);
            by_id.insert(id, task);
        }

        Ok(Self {
            id: WorkSetId::generate(),
            tasks: by_id,
            statuses,
            started: false,
            completion: None,
        })
    }

    pub fn id(&self) -> WorkSetId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// 批次开始后才会分配任务
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn status(&self, id: &str) -> Option<TaskStatus> {
        self.statuses.get(id).copied()
    }

    /// 标记批次已开始并在 `completion` 上发送Commenced
    ///
    /// 之后该通道只会再收到一次完成事件
    pub fn commence(&mut self, completion: Sender<PoolEvent>) {
        self.started = true;
        // 调用方可能已经丢弃接收端, 这不影响批次执行
        let _ = completion.send(PoolEvent::Commenced);
        self.completion = Some(completion);
    }

    pub fn mark_in_progress(&mut self, id: &str) {
        self.transition(id, TaskStatus::NotStarted, TaskStatus::InProgress);
    }

    pub fn mark_complete(&mut self, id: &str) {
        self.transition(id, TaskStatus::InProgress, TaskStatus::Complete);
    }

    /// 工作节点失败后任务重新排队
    pub fn mark_not_started(&mut self, id: &str) {
        self.transition(id, TaskStatus::InProgress, TaskStatus::NotStarted);
    }

    fn transition(&mut self, id: &str, from: TaskStatus, to: TaskStatus) {
        let status = match self.statuses.get_mut(id) {
            Some(status) => status,
            None => panic!("task {} is not part of work set {}", id, self.id),
        };
        if *status != from {
            panic!(
                "task {} in work set {} moved {:?} -> {:?}, expected from {:?}",
                id, self.id, status, to, from
            );
        }
        *status = to;
    }

    pub fn is_completed(&self) -> bool {
        self.statuses.values().all(|s| *s == TaskStatus::Complete)
    }

    /// 随机挑选一个尚未开始的任务, 顺序不作保证
    pub fn next_unassigned_task(&self) -> Option<SharedTask> {
        self.statuses
            .iter()
            .filter(|(_, status)| **status == TaskStatus::NotStarted)
            .map(|(id, _)| id)
            .choose(&mut rand::rng())
            .and_then(|id| self.tasks.get(id))
            .cloned()
    }

    pub fn task(&self, id: &str) -> Option<SharedTask> {
        self.tasks.get(id).cloned()
    }

    pub fn progress(&self) -> WorkSetProgress {
        let count = |wanted: TaskStatus| self.statuses.values().filter(|s| **s == wanted).count();
        WorkSetProgress {
            id: self.id,
            total: self.statuses.len(),
            not_started: count(TaskStatus::NotStarted),
            in_progress: count(TaskStatus::InProgress),
            complete: count(TaskStatus::Complete),
        }
    }

    /// 发送完成事件, 消耗 `self` 保证只触发一次
    pub fn fire_completion(mut self) {
        if let Some(completion) = self.completion.take() {
            let _ = completion.send(PoolEvent::Completed);
        }
    }
}

impl fmt::Debug for WorkSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkSet")
            .field("id", &self.id)
            .field("started", &self.started)
            .field("statuses", &self.statuses)
            .finish()
    }
}
