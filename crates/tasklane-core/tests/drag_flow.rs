use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use tasklane_core::dnd::{
    ContainerId, ContainerMap, DragSession, Layout, PartitionKey, group_by_priority, index_tasks,
    reduce_patches,
};
use tasklane_core::optimistic::OptimisticTasks;
use tasklane_core::task::{Priority, Queue, Task, TaskPatch, apply_patches};
use tasklane_core::views::sensor::{PointerInput, PointerSensor};
use tasklane_core::views::week::WeekView;
use tasklane_core::views::work::WorkView;
use tasklane_core::views::{DragEvent, Transition};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 15, 9, 0, 0)
        .single()
        .expect("valid now")
}

fn task(id: &str, queue: Option<Queue>, priority: Option<Priority>, order: i64) -> Task {
    let mut t = Task::new(id.to_string(), now());
    t.id = id.to_string();
    t.queue = queue;
    t.priority = priority;
    t.order = Some(order);
    t
}

fn cid(token: &str) -> ContainerId {
    token.parse().expect("container token")
}

fn start(event_id: &str) -> DragEvent {
    DragEvent::Start {
        active: format!("item::{event_id}"),
    }
}

fn over(event_id: &str, target: &str) -> DragEvent {
    DragEvent::Over {
        active: format!("item::{event_id}"),
        over: Some(target.to_string()),
    }
}

fn end(event_id: &str, target: &str) -> DragEvent {
    DragEvent::End {
        active: format!("item::{event_id}"),
        over: Some(target.to_string()),
    }
}

fn sorted(mut patches: Vec<TaskPatch>) -> Vec<TaskPatch> {
    patches.sort_by(|a, b| a.id.cmp(&b.id));
    patches
}

fn drive(view: &mut WorkView, tasks: &[Task], events: &[DragEvent]) -> Vec<Vec<TaskPatch>> {
    let mut batches: Vec<Vec<TaskPatch>> = Vec::new();
    for event in events {
        view.handle(event, tasks, &mut batches);
    }
    batches
}

#[test]
fn scenario_a_reorder_within_a_flat_queue() {
    let tasks = vec![
        task("T1", Some(Queue::Day), None, 0),
        task("T2", Some(Queue::Day), None, 1),
    ];
    let mut view = WorkView::new();
    let batches = drive(
        &mut view,
        &tasks,
        &[start("T2"), over("T2", "item::T1"), end("T2", "item::T1")],
    );

    let mut t1 = TaskPatch::new("T1");
    t1.order = Some(1);
    let mut t2 = TaskPatch::new("T2");
    t2.order = Some(0);
    assert_eq!(batches.len(), 1);
    assert_eq!(sorted(batches[0].clone()), vec![t1, t2]);
}

#[test]
fn scenario_b_grouping_labels() {
    let tasks = vec![
        task("p1", Some(Queue::Day), Some(Priority::P1), 0),
        task("plain", Some(Queue::Day), None, 1),
    ];
    let refs: Vec<&Task> = tasks.iter().collect();
    let groups = group_by_priority(&refs).expect("grouped");
    let labels: Vec<Option<&str>> = groups.iter().map(|g| g.priority.map(|p| p.label())).collect();
    assert_eq!(labels, vec![Some("P1 - Important"), None]);

    let view = WorkView::new();
    let rendered: Vec<Option<String>> = view
        .column_groups(&tasks, Some(Queue::Day))
        .into_iter()
        .map(|g| g.label)
        .collect();
    assert_eq!(
        rendered,
        vec![
            Some("P1 - Important".to_string()),
            Some("No priority".to_string())
        ]
    );
}

#[test]
fn scenario_c_cross_queue_into_flat_column() {
    let tasks = vec![
        task("D1", Some(Queue::Day), None, 0),
        task("D2", Some(Queue::Day), None, 1),
        task("W0", Some(Queue::Week), None, 0),
        task("T", Some(Queue::Week), None, 1),
    ];
    let mut view = WorkView::new();
    let batches = drive(
        &mut view,
        &tasks,
        &[start("T"), over("T", "column::day"), end("T", "column::day")],
    );

    let mut expected = TaskPatch::new("T");
    expected.order = Some(2);
    expected.queue = Some(Some(Queue::Day));
    assert_eq!(batches, vec![vec![expected]]);
}

#[test]
fn scenario_d_column_drop_redirects_into_no_priority_group() {
    let tasks = vec![
        task("P", Some(Queue::Day), Some(Priority::P1), 0),
        task("T", Some(Queue::Week), None, 0),
    ];

    let mut session = DragSession::start("item::T", &tasks, &Layout::Queues).expect("start");
    assert!(session.hover("column::day"));
    assert_eq!(
        session.containers().get(&cid("group::day::null")),
        Some(&["T".to_string()][..])
    );
    assert!(!session.containers().contains(&cid("column::day")));

    let outcome = session.finish(Some("column::day")).expect("drop");
    assert!(outcome.touched.contains(&cid("group::day::null")));

    let patches = reduce_patches(&outcome.containers, &outcome.touched, &index_tasks(&tasks));
    let mut expected = TaskPatch::new("T");
    expected.queue = Some(Some(Queue::Day));
    assert_eq!(patches, vec![expected]);
}

#[test]
fn date_column_drop_redirects_into_no_priority_day_group() {
    let day = NaiveDate::from_ymd_opt(2026, 10, 16).expect("date");
    let mut planned = task("P", None, Some(Priority::P1), 0);
    planned.due_date = Some(day);
    let tasks = vec![planned, task("U", None, Some(Priority::P2), 0)];
    let layout = Layout::Dates(vec![day]);

    let before = ContainerMap::build(&tasks, &layout);
    assert!(before.contains(&cid("dategrp::2026-10-16::P1")));
    assert!(!before.contains(&cid("dategrp::2026-10-16::null")));
    assert!(!before.contains(&cid("datecol::2026-10-16")));

    let mut session = DragSession::start("item::U", &tasks, &layout).expect("start");
    assert!(session.hover("datecol::2026-10-16"));
    assert_eq!(
        session.containers().get(&cid("dategrp::2026-10-16::null")),
        Some(&["U".to_string()][..])
    );
    assert!(!session.containers().contains(&cid("datecol::2026-10-16")));

    let outcome = session.finish(Some("datecol::2026-10-16")).expect("drop");
    assert!(outcome.touched.contains(&cid("dategrp::2026-10-16::null")));

    let patches = reduce_patches(&outcome.containers, &outcome.touched, &index_tasks(&tasks));
    let mut expected = TaskPatch::new("U");
    expected.due_date = Some(Some(day));
    expected.priority = Some(None);
    assert_eq!(patches, vec![expected]);
}

#[test]
fn drop_into_group_sets_priority_and_rebuild_matches() {
    let tasks = vec![
        task("P0", Some(Queue::Day), Some(Priority::P0), 0),
        task("P3", Some(Queue::Day), Some(Priority::P3), 0),
        task("B", None, None, 0),
        task("C", None, None, 1),
    ];

    let mut session = DragSession::start("item::B", &tasks, &Layout::Queues).expect("start");
    session.hover("item::P0");
    let outcome = session.finish(Some("item::P0")).expect("drop");
    let patches = reduce_patches(&outcome.containers, &outcome.touched, &index_tasks(&tasks));

    let mut after = tasks.clone();
    apply_patches(&mut after, &patches, now());
    let moved = after.iter().find(|t| t.id == "B").expect("moved task");
    assert_eq!(moved.priority, Some(Priority::P0));
    assert_eq!(moved.queue, Some(Queue::Day));

    let rebuilt = ContainerMap::build(&after, &Layout::Queues);
    assert_eq!(rebuilt.without_empty(), outcome.containers.without_empty());

    let mut twice = after.clone();
    apply_patches(&mut twice, &patches, now());
    assert_eq!(twice, after);
}

#[test]
fn partition_invariant_holds_for_both_layouts() {
    let day = NaiveDate::from_ymd_opt(2026, 10, 14).expect("date");
    let elsewhere = NaiveDate::from_ymd_opt(2026, 11, 2).expect("date");

    let mut tasks = vec![
        task("a", None, Some(Priority::P2), 0),
        task("b", None, None, 1),
        task("c", Some(Queue::Day), None, 0),
        task("d", Some(Queue::Week), Some(Priority::P4), 0),
        task("e", Some(Queue::Week), None, 1),
    ];
    tasks[2].due_date = Some(day);
    tasks[3].due_date = Some(elsewhere);
    let mut finished = task("done", Some(Queue::Day), None, 2);
    finished.mark_done(now());
    tasks.push(finished);

    let queues = ContainerMap::build(&tasks, &Layout::Queues);
    let ids: Vec<&str> = queues
        .iter()
        .flat_map(|(_, ids)| ids.iter().map(String::as_str))
        .collect();
    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(ids.len(), 5);
    assert_eq!(unique.len(), 5);
    assert!(!unique.contains("done"));

    let dates = ContainerMap::build(&tasks, &Layout::Dates(vec![day]));
    let mut placed: Vec<&str> = dates
        .iter()
        .flat_map(|(_, ids)| ids.iter().map(String::as_str))
        .collect();
    placed.sort_unstable();
    assert_eq!(placed, vec!["a", "b", "c", "e"]);
    assert_eq!(dates.partition_len(PartitionKey::Date(Some(day))), 1);
}

#[test]
fn malformed_tokens_never_change_anything() {
    let tasks = vec![
        task("a", Some(Queue::Day), None, 0),
        task("b", Some(Queue::Day), None, 1),
    ];
    let mut view = WorkView::new();
    let mut batches: Vec<Vec<TaskPatch>> = Vec::new();

    assert_eq!(view.handle(&start("a"), &tasks, &mut batches), Transition::Started);
    let before = view.column_groups(&tasks, Some(Queue::Day));
    for garbage in ["", "column::", "column::month", "group::day", "item::", "item::ghost", "::"] {
        assert_eq!(
            view.handle(&over("a", garbage), &tasks, &mut batches),
            Transition::Unchanged,
            "token {garbage:?}"
        );
    }
    let after = view.column_groups(&tasks, Some(Queue::Day));
    assert_eq!(
        before.iter().map(|g| g.task_ids.clone()).collect::<Vec<_>>(),
        after.iter().map(|g| g.task_ids.clone()).collect::<Vec<_>>()
    );

    assert_eq!(
        view.handle(&end("a", "datecol::yesterday"), &tasks, &mut batches),
        Transition::Dropped { patches: 0 }
    );
    assert!(batches.is_empty());
}

#[test]
fn drop_on_empty_space_cancels() {
    let tasks = vec![
        task("a", Some(Queue::Day), None, 0),
        task("b", Some(Queue::Week), None, 0),
    ];
    let mut view = WorkView::new();
    let mut batches: Vec<Vec<TaskPatch>> = Vec::new();
    view.handle(&start("a"), &tasks, &mut batches);
    view.handle(&over("a", "column::week"), &tasks, &mut batches);
    let transition = view.handle(
        &DragEvent::End {
            active: "item::a".to_string(),
            over: None,
        },
        &tasks,
        &mut batches,
    );
    assert_eq!(transition, Transition::Cancelled);
    assert!(batches.is_empty());
    assert!(!view.controller().is_dragging());
}

#[test]
fn week_view_schedules_an_unscheduled_task() {
    let today = NaiveDate::from_ymd_opt(2026, 10, 15).expect("date");
    let target = NaiveDate::from_ymd_opt(2026, 10, 16).expect("date");
    let tasks = vec![task("a", None, None, 0)];

    let mut view = WeekView::new(today, false);
    let mut batches: Vec<Vec<TaskPatch>> = Vec::new();
    for event in [
        start("a"),
        over("a", "datecol::2026-10-16"),
        end("a", "datecol::2026-10-16"),
    ] {
        view.handle(&event, &tasks, &mut batches);
    }

    let mut expected = TaskPatch::new("a");
    expected.due_date = Some(Some(target));
    assert_eq!(batches, vec![vec![expected]]);
}

#[test]
fn pointer_gesture_updates_the_optimistic_cache() {
    let tasks = vec![
        task("a", None, None, 0),
        task("b", Some(Queue::Week), None, 0),
    ];
    let mut cache = OptimisticTasks::new(tasks);
    let mut view = WorkView::new();
    let mut sensor = PointerSensor::default();

    let inputs = vec![
        PointerInput::Down {
            token: "item::a".to_string(),
            x: 0.0,
            y: 0.0,
        },
        PointerInput::Move {
            x: 2.0,
            y: 0.0,
            over: None,
        },
        PointerInput::Move {
            x: 40.0,
            y: 0.0,
            over: Some("item::b".to_string()),
        },
        PointerInput::Up {
            over: Some("item::b".to_string()),
        },
    ];
    for input in inputs {
        for event in sensor.feed(input) {
            let snapshot = cache.tasks().to_vec();
            view.handle(&event, &snapshot, &mut cache);
        }
    }

    let pending = cache.pending();
    assert_eq!(pending.len(), 1);
    let moved = cache.tasks().iter().find(|t| t.id == "a").expect("task a");
    assert_eq!(moved.queue, Some(Queue::Week));
    assert_eq!(moved.order, Some(0));
    let neighbour = cache.tasks().iter().find(|t| t.id == "b").expect("task b");
    assert_eq!(neighbour.order, Some(1));

    let (batch, _) = pending[0];
    assert!(cache.rollback(batch));
    let restored = cache.tasks().iter().find(|t| t.id == "a").expect("task a");
    assert_eq!(restored.queue, None);
}
