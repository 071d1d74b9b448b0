//! 任务批次与工作节点表单元测试

mod test_utils;

use std::collections::HashSet;
use std::time::Duration;

use proptest::prelude::*;
use test_utils::FakeCluster;
use workset_pool::{PoolError, PoolEvent, TaskStatus, WorkSet, WorkerState, WorkerTable};

fn work_set(ids: &[&str]) -> WorkSet {
    WorkSet::new(FakeCluster::new(Duration::ZERO).tasks(ids)).unwrap()
}

#[test]
fn test_new_rejects_empty_and_duplicates() {
    assert!(matches!(WorkSet::new(Vec::new()), Err(PoolError::EmptyWorkSet)));

    let tasks = FakeCluster::new(Duration::ZERO).tasks(&["a", "b", "a"]);
    assert!(matches!(WorkSet::new(tasks), Err(PoolError::DuplicateTask(id)) if id == "a"));
}

#[test]
fn test_new_work_set_is_idle() {
    let ws = work_set(&["a", "b"]);
    assert_eq!(ws.len(), 2);
    assert!(!ws.is_started());
    assert!(!ws.is_completed());
    assert_eq!(ws.status("a"), Some(TaskStatus::NotStarted));
    assert_eq!(ws.status("missing"), None);
}

#[test]
fn test_task_lifecycle_and_completion() {
    let mut ws = work_set(&["a", "b"]);

    ws.mark_in_progress("a");
    assert_eq!(ws.status("a"), Some(TaskStatus::InProgress));
    let next = ws.next_unassigned_task().expect("b is still unassigned");
    assert_eq!(next.id(), "b");

    // 失败后重新排队
    ws.mark_not_started("a");
    ws.mark_in_progress("a");
    ws.mark_complete("a");
    ws.mark_in_progress("b");
    assert!(ws.next_unassigned_task().is_none());
    assert!(!ws.is_completed());

    ws.mark_complete("b");
    assert!(ws.is_completed());

    let progress = ws.progress();
    assert_eq!(progress.total, 2);
    assert_eq!(progress.complete, 2);
    assert_eq!(progress.id, ws.id());
}

#[test]
fn test_commence_and_completion_events() {
    let mut ws = work_set(&["a"]);
    let (tx, rx) = crossbeam_channel::unbounded();

    ws.commence(tx);
    assert!(ws.is_started());
    assert_eq!(rx.try_recv(), Ok(PoolEvent::Commenced));

    ws.mark_in_progress("a");
    ws.mark_complete("a");
    ws.fire_completion();
    assert_eq!(rx.try_recv(), Ok(PoolEvent::Completed));
    // 发送端随批次一起被丢弃, 完成事件只会触发一次
    assert!(rx.recv().is_err());
}

#[test]
#[should_panic(expected = "not part of work set")]
fn test_unknown_task_panics() {
    let mut ws = work_set(&["a"]);
    ws.mark_in_progress("nope");
}

#[test]
#[should_panic(expected = "expected from InProgress")]
fn test_completing_unstarted_task_panics() {
    let mut ws = work_set(&["a"]);
    ws.mark_complete("a");
}

#[test]
fn test_worker_table_transitions() {
    let mut table = WorkerTable::new();
    assert!(table.register("w1"));
    assert!(!table.register("w1"));
    assert!(table.register("w2"));
    assert_eq!(table.len(), 2);

    table.mark_busy("w1", "t1");
    assert_eq!(table.state("w1"), Some(&WorkerState::Busy("t1".to_string())));
    assert_eq!(table.free_workers(), vec!["w2".to_string()]);

    table.mark_free("w1", "t1");
    assert!(table.is_free("w1"));

    table.mark_busy("w2", "t2");
    table.mark_failed("w2", "t2");
    assert_eq!(table.state("w2"), Some(&WorkerState::Failed));
    // 失败节点不能再次注册
    assert!(!table.register("w2"));
    assert_eq!(table.first_free(), Some("w1".to_string()));
    assert_eq!(
        table.entries(),
        vec![
            ("w1".to_string(), WorkerState::Free),
            ("w2".to_string(), WorkerState::Failed),
        ]
    );
}

#[test]
#[should_panic(expected = "assigned task")]
fn test_busy_worker_cannot_take_second_task() {
    let mut table = WorkerTable::new();
    table.register("w1");
    table.mark_busy("w1", "t1");
    table.mark_busy("w1", "t2");
}

#[test]
#[should_panic(expected = "reported task")]
fn test_completion_from_wrong_task_panics() {
    let mut table = WorkerTable::new();
    table.register("w1");
    table.mark_busy("w1", "t1");
    table.mark_free("w1", "t2");
}

#[derive(Debug, Clone)]
enum Step {
    Assign,
    Complete(usize),
    Fail(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Assign),
        (0usize..8).prop_map(Step::Complete),
        (0usize..8).prop_map(Step::Fail),
    ]
}

proptest! {
    #[test]
    fn test_status_counts_follow_the_model(steps in prop::collection::vec(step(), 1..64)) {
        let ids: Vec<String> = (0..8).map(|i| format!("t{}", i)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut ws = work_set(&refs);
        let mut in_progress: Vec<String> = Vec::new();
        let mut complete: HashSet<String> = HashSet::new();

        for step in steps {
            match step {
                Step::Assign => {
                    if let Some(task) = ws.next_unassigned_task() {
                        let id = task.id();
                        prop_assert_eq!(ws.status(&id), Some(TaskStatus::NotStarted));
                        ws.mark_in_progress(&id);
                        in_progress.push(id);
                    } else {
                        prop_assert_eq!(in_progress.len() + complete.len(), 8);
                    }
                }
                Step::Complete(i) if !in_progress.is_empty() => {
                    let id = in_progress.remove(i % in_progress.len());
                    ws.mark_complete(&id);
                    complete.insert(id);
                }
                Step::Fail(i) if !in_progress.is_empty() => {
                    let id = in_progress.remove(i % in_progress.len());
                    ws.mark_not_started(&id);
                }
                _ => {}
            }

            let progress = ws.progress();
            prop_assert_eq!(progress.in_progress, in_progress.len());
            prop_assert_eq!(progress.complete, complete.len());
            prop_assert_eq!(progress.not_started, 8 - in_progress.len() - complete.len());
            prop_assert_eq!(ws.is_completed(), complete.len() == 8);
        }
    }
}
