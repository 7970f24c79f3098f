use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, anyhow, bail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::cli::{AddArgs, Command, DragArgs, ViewArgs, ViewKind, WeekArgs};
use crate::config::Config;
use crate::datastore::DataStore;
use crate::datetime::{local_date, parse_date_arg, parse_optional_date, resolve_timezone};
use crate::dnd::{ColumnGroup, Layout, PartitionKey, Token, item_token};
use crate::optimistic::OptimisticTasks;
use crate::render::{Renderer, short_id};
use crate::task::{Priority, Queue, Task};
use crate::views::sensor::{KeyInput, KeyboardSensor, PointerInput, PointerSensor};
use crate::views::week::WeekView;
use crate::views::work::WorkView;
use crate::views::{DragController, DragEvent, MutationBoundary, Transition};

/// One of the two boards, chosen by `--view`.
#[derive(Debug, Clone)]
enum Board {
    Work(WorkView),
    Week(WeekView),
}

impl Board {
    fn open(args: &ViewArgs, cfg: &Config, today: NaiveDate) -> Self {
        match args.view {
            ViewKind::Work => Board::Work(WorkView::new()),
            ViewKind::Week => Board::Week(open_week(&args.week, cfg, today)),
        }
    }

    fn handle<B>(&mut self, event: &DragEvent, tasks: &[Task], boundary: &mut B) -> Transition
    where
        B: MutationBoundary + ?Sized,
    {
        match self {
            Board::Work(view) => view.handle(event, tasks, boundary),
            Board::Week(view) => view.handle(event, tasks, boundary),
        }
    }

    fn all_groups(&self, tasks: &[Task]) -> Vec<ColumnGroup> {
        match self {
            Board::Work(view) => Layout::QUEUES
                .iter()
                .flat_map(|&queue| view.column_groups(tasks, queue))
                .collect(),
            Board::Week(view) => view
                .visible_dates()
                .into_iter()
                .map(Some)
                .chain([None])
                .flat_map(|date| view.column_groups(tasks, date))
                .collect(),
        }
    }
}

fn open_week(args: &WeekArgs, cfg: &Config, today: NaiveDate) -> WeekView {
    let mut view = WeekView::new(today, args.weekend || cfg.weekend_expanded());
    if args.offset != 0 {
        view.shift_week(args.offset);
    }
    view
}

#[instrument(skip(store, cfg, renderer, command))]
pub fn dispatch(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &Renderer,
    command: Command,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let tz = resolve_timezone(cfg.get("timezone").as_deref());
    let today = local_date(now, &tz);
    debug!(%today, timezone = %tz, ?command, "dispatching command");

    match command {
        Command::Add(args) => cmd_add(store, args, today, now),
        Command::Board { json } => cmd_board(store, renderer, json),
        Command::Week { week, json } => cmd_week(store, cfg, renderer, &week, today, json),
        Command::Tokens { view } => cmd_tokens(store, cfg, renderer, &view, today),
        Command::Drag(args) => cmd_drag(store, cfg, renderer, args, today),
        Command::Send {
            task,
            target,
            view,
            dry_run,
        } => cmd_send(store, renderer, &task, &target, view.view, today, dry_run),
        Command::Replay {
            file,
            view,
            dry_run,
        } => cmd_replay(store, cfg, renderer, &file, &view, today, dry_run),
        Command::Done { task } => cmd_done(store, &task, now),
        Command::Reschedule {
            to,
            from,
            week,
            dry_run,
        } => cmd_reschedule(
            store,
            cfg,
            renderer,
            &to,
            from.as_deref(),
            &week,
            today,
            dry_run,
        ),
        Command::Undo => cmd_undo(store),
        Command::Export => cmd_export(store),
    }
}

#[instrument(skip(store, args, now))]
fn cmd_add(
    store: &mut DataStore,
    args: AddArgs,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    let title = args.title.join(" ");
    if title.trim().is_empty() {
        bail!("task title cannot be empty");
    }

    let mut task = Task::new(title, now);
    task.description = args.description;
    task.category = args.category;
    task.queue = args.queue.as_deref().map(parse_queue_arg).transpose()?.flatten();
    task.priority = args
        .priority
        .as_deref()
        .map(|raw| raw.parse::<Priority>().map_err(|e| anyhow!(e)))
        .transpose()?;
    task.due_date = args
        .due
        .as_deref()
        .map(|raw| parse_optional_date(raw, today))
        .transpose()?
        .flatten();

    let id = task.id.clone();
    store.add_task(task)?;
    println!("Created task {}.", short_id(&id));
    Ok(())
}

#[instrument(skip(store, renderer))]
fn cmd_board(store: &mut DataStore, renderer: &Renderer, json: bool) -> anyhow::Result<()> {
    info!("command board");
    let tasks = store.load_tasks()?;
    let view = WorkView::new();

    if json {
        let columns: Vec<serde_json::Value> = view
            .columns(&tasks)
            .into_iter()
            .map(|column| {
                serde_json::json!({
                    "title": column.title,
                    "queue": column.queue,
                    "total": column.total,
                    "groups": groups_json(&column.groups),
                    "done": column.done.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&columns)?);
        return Ok(());
    }

    renderer.print_board(&view, &tasks)
}

#[instrument(skip(store, cfg, renderer, week))]
fn cmd_week(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &Renderer,
    week: &WeekArgs,
    today: NaiveDate,
    json: bool,
) -> anyhow::Result<()> {
    info!("command week");
    let tasks = store.load_tasks()?;
    let view = open_week(week, cfg, today);

    if json {
        let days: Vec<serde_json::Value> = view
            .day_columns(&tasks)
            .into_iter()
            .map(|day| {
                serde_json::json!({
                    "date": day.date,
                    "title": day.title,
                    "today": day.is_today,
                    "total": day.total,
                    "groups": groups_json(&day.groups),
                })
            })
            .collect();
        let weekend_hidden = if view.weekend_expanded() {
            0
        } else {
            view.weekend_task_count(&tasks)
        };
        let out = serde_json::json!({
            "label": view.week_label(),
            "days": days,
            "unscheduled": groups_json(&view.unscheduled_groups(&tasks)),
            "overdue": view.overdue_tasks(&tasks).iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            "weekend_hidden": weekend_hidden,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    renderer.print_week(&view, &tasks)
}

fn groups_json(groups: &[ColumnGroup]) -> Vec<serde_json::Value> {
    groups
        .iter()
        .map(|group| {
            serde_json::json!({
                "token": group.token(),
                "label": group.label,
                "tasks": group.task_ids,
            })
        })
        .collect()
}

#[instrument(skip(store, cfg, renderer, view))]
fn cmd_tokens(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &Renderer,
    view: &ViewArgs,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command tokens");
    let tasks = store.load_tasks()?;
    let board = Board::open(view, cfg, today);
    renderer.write_tokens(io::stdout().lock(), &board.all_groups(&tasks))
}

#[instrument(skip(store, cfg, renderer, args), fields(task = %args.task))]
fn cmd_drag(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &Renderer,
    args: DragArgs,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command drag");
    let tasks = store.load_tasks()?;
    let task_id = resolve_task_id(&tasks, &args.task)?;

    let mut inputs = vec![KeyInput::Pick(item_token(&task_id))];
    inputs.extend(args.over.iter().cloned().map(KeyInput::Target));
    if args.cancel {
        inputs.push(KeyInput::Escape);
    } else if let Some(target) = args.drop_on {
        inputs.push(KeyInput::Target(target));
        inputs.push(KeyInput::Drop);
    } else if args.over.is_empty() {
        debug!("no hover or drop target; cancelling");
        inputs.push(KeyInput::Escape);
    } else {
        inputs.push(KeyInput::Drop);
    }

    let mut board = Board::open(&args.view, cfg, today);
    let mut cache = OptimisticTasks::new(tasks);
    let mut sensor = KeyboardSensor::default();
    for input in inputs {
        for event in sensor.feed(input) {
            let snapshot = cache.tasks().to_vec();
            let transition = board.handle(&event, &snapshot, &mut cache);
            report_transition(&event, transition);
        }
    }

    persist_pending(store, &mut cache, renderer, args.dry_run)
}

#[instrument(skip(store, renderer))]
fn cmd_send(
    store: &mut DataStore,
    renderer: &Renderer,
    task: &str,
    target: &str,
    kind: ViewKind,
    today: NaiveDate,
    dry_run: bool,
) -> anyhow::Result<()> {
    info!("command send");
    let tasks = store.load_tasks()?;
    let task_id = resolve_task_id(&tasks, task)?;
    let Some(task) = tasks.iter().find(|t| t.id == task_id) else {
        bail!("task not found: {task_id}");
    };
    if task.is_done {
        bail!("task is done: {}", short_id(&task_id));
    }

    let (controller, key) = match kind {
        ViewKind::Work => (
            DragController::new(Layout::Queues),
            PartitionKey::Queue(parse_queue_arg(target)?),
        ),
        ViewKind::Week => {
            let date = parse_optional_date(target, today)?;
            let dates: Vec<NaiveDate> = [date, task.due_date].into_iter().flatten().collect();
            (
                DragController::new(Layout::Dates(dates)),
                PartitionKey::Date(date),
            )
        }
    };

    let mut cache = OptimisticTasks::new(tasks.clone());
    match controller.send_to(&task_id, key, &tasks, &mut cache) {
        Transition::Unchanged => println!("Task is already there."),
        Transition::Ignored => bail!("cannot send {} to {target}", short_id(&task_id)),
        _ => {}
    }

    persist_pending(store, &mut cache, renderer, dry_run)
}

/// A replay file line: either a drag event or raw pointer input.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplayLine {
    Drag(DragEvent),
    Pointer(PointerInput),
}

#[instrument(skip(store, cfg, renderer, file, view), fields(file = %file.display()))]
fn cmd_replay(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &Renderer,
    file: &Path,
    view: &ViewArgs,
    today: NaiveDate,
    dry_run: bool,
) -> anyhow::Result<()> {
    info!("command replay");
    let lines = load_replay(file)?;

    let mut board = Board::open(view, cfg, today);
    let mut cache = OptimisticTasks::new(store.load_tasks()?);
    let mut pointer = PointerSensor::new(cfg.drag_distance()?);

    for line in lines {
        let events = match line {
            ReplayLine::Drag(event) => vec![event],
            ReplayLine::Pointer(input) => pointer.feed(input),
        };
        for event in events {
            let snapshot = cache.tasks().to_vec();
            let transition = board.handle(&event, &snapshot, &mut cache);
            report_transition(&event, transition);
        }
    }
    if pointer.is_dragging() {
        warn!("replay ended mid-gesture; the open drag is discarded");
    }

    persist_pending(store, &mut cache, renderer, dry_run)
}

fn load_replay(path: &Path) -> anyhow::Result<Vec<ReplayLine>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str(line.trim())
                .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))
        })
        .collect()
}

fn report_transition(event: &DragEvent, transition: Transition) {
    debug!(active = event.active(), ?transition, "drag event handled");
    match transition {
        Transition::Dropped { patches } => println!("Dropped: {patches} patch(es)."),
        Transition::Cancelled => println!("Drag cancelled."),
        Transition::Ignored => warn!(active = event.active(), "drag event ignored"),
        Transition::Started | Transition::Moved | Transition::Unchanged => {}
    }
}

/// Writes every unconfirmed batch through the store, oldest first. A rejected
/// batch rolls back locally and stops the run.
fn persist_pending(
    store: &mut DataStore,
    cache: &mut OptimisticTasks,
    renderer: &Renderer,
    dry_run: bool,
) -> anyhow::Result<()> {
    let batches: Vec<_> = cache
        .pending()
        .into_iter()
        .map(|(id, patches)| (id, patches.to_vec()))
        .collect();
    if batches.is_empty() {
        println!("No changes.");
        return Ok(());
    }

    for (id, patches) in batches {
        renderer.print_patches(&patches)?;
        if dry_run {
            continue;
        }
        match store.apply_batch(&patches, Utc::now()) {
            Ok(_) => {
                cache.confirm(id);
            }
            Err(err) => {
                cache.rollback(id);
                return Err(err.context("batch rejected; local changes rolled back"));
            }
        }
    }

    if dry_run {
        println!("Dry run: nothing written.");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
#[instrument(skip(store, cfg, renderer, week))]
fn cmd_reschedule(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &Renderer,
    to: &str,
    from: Option<&str>,
    week: &WeekArgs,
    today: NaiveDate,
    dry_run: bool,
) -> anyhow::Result<()> {
    info!("command reschedule");
    let tasks = store.load_tasks()?;
    let to = parse_date_arg(to, today)?;
    let view = open_week(week, cfg, today);

    let mut cache = OptimisticTasks::new(tasks.clone());
    let moved = match from {
        Some(day) => {
            let day = parse_date_arg(day, today)?;
            view.reschedule_day(&tasks, day, to, &mut cache)
        }
        None => view.reschedule_overdue(&tasks, to, &mut cache),
    };
    println!("Rescheduling {moved} task(s) to {to}.");

    persist_pending(store, &mut cache, renderer, dry_run)
}

#[instrument(skip(store, now))]
fn cmd_done(store: &mut DataStore, task: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command done");
    let tasks = store.load_tasks()?;
    let task_id = resolve_task_id(&tasks, task)?;
    let done = store.mark_done(&task_id, now)?;
    println!("Completed task {} '{}'.", short_id(&done.id), done.title);
    Ok(())
}

#[instrument(skip(store))]
fn cmd_undo(store: &mut DataStore) -> anyhow::Result<()> {
    info!("command undo");

    match store.undo()? {
        Some(label) => println!("Undid last {label}."),
        None => println!("No undo transactions available."),
    }
    Ok(())
}

#[instrument(skip(store))]
fn cmd_export(store: &mut DataStore) -> anyhow::Result<()> {
    info!("command export");
    let tasks = store.load_tasks()?;
    println!("{}", serde_json::to_string(&tasks)?);
    Ok(())
}

/// Accepts a full id, an `item::` token, or a unique id prefix.
pub fn resolve_task_id(tasks: &[Task], raw: &str) -> anyhow::Result<String> {
    let wanted = Token::parse(raw)
        .as_ref()
        .and_then(Token::as_item)
        .map(str::to_string)
        .unwrap_or_else(|| raw.trim().to_string());
    if wanted.is_empty() {
        bail!("task id cannot be empty");
    }
    if tasks.iter().any(|t| t.id == wanted) {
        return Ok(wanted);
    }

    let matches: Vec<&Task> = tasks.iter().filter(|t| t.id.starts_with(&wanted)).collect();
    match matches.as_slice() {
        [] => bail!("no task matches '{wanted}'"),
        [only] => Ok(only.id.clone()),
        many => bail!("'{wanted}' is ambiguous: {} tasks match", many.len()),
    }
}

/// `backlog` / `none` clear the queue; anything else must name one.
pub fn parse_queue_arg(raw: &str) -> anyhow::Result<Option<Queue>> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "backlog" | "none" | "null" => Ok(None),
        other => other.parse::<Queue>().map(Some).map_err(|e| anyhow!(e)),
    }
}
