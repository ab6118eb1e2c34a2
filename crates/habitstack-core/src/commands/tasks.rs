use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use super::{Context, resolve_task};
use crate::cli::{AddArgs, EditArgs};
use crate::task::{NewTask, Priority, TaskEdit};

#[instrument(skip(ctx, args, now))]
pub(super) fn add(ctx: &mut Context<'_>, args: AddArgs, now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command add");
    let mut fields = NewTask::new(args.title.join(" "), now);
    if let Some(estimate) = args.estimate {
        fields.estimated_time = estimate;
    }
    if let Some(priority) = args.priority.as_deref() {
        fields.priority = priority.parse::<Priority>()?;
    }
    fields.category = args.category;
    fields.description = args.description;

    let created = ctx.workspace.create_task(fields);
    let task = ctx.settle(created)?;
    println!("Created task {}.", crate::render::short_id(&task.id));
    Ok(())
}

#[instrument(skip(ctx, now))]
pub(super) fn list(ctx: &mut Context<'_>, all: bool, now: DateTime<Utc>) -> anyhow::Result<()> {
    let ws = &*ctx.workspace;
    let active = ws.session().active_task().map(|t| t.id.clone());
    if all {
        let tasks: Vec<_> = ws.tasks().iter().collect();
        ctx.renderer.print_task_table(&tasks, active.as_ref(), false)
    } else {
        let today = ws.todays_tasks(now);
        ctx.renderer.print_task_table(&today, active.as_ref(), true)
    }
}

#[instrument(skip(ctx, args, now))]
pub(super) fn edit(ctx: &mut Context<'_>, args: EditArgs, now: DateTime<Utc>) -> anyhow::Result<()> {
    let id = resolve_task(ctx.workspace, &args.task, now)?;
    let edit = TaskEdit {
        title: args.title,
        description: args.description,
        estimated_time: args.estimate,
    };
    let result = ctx.workspace.edit_task(&id, edit);
    ctx.settle(result)?;
    if let Some(task) = ctx.workspace.task(&id) {
        let task = task.clone();
        ctx.renderer.print_task_info(&task)?;
    }
    Ok(())
}

pub(super) fn done(ctx: &mut Context<'_>, token: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
    let id = resolve_task(ctx.workspace, token, now)?;
    let result = ctx.workspace.complete_task(&id, now);
    ctx.settle(result)?;
    println!("Completed task {}.", crate::render::short_id(&id));
    Ok(())
}

pub(super) fn undone(ctx: &mut Context<'_>, token: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
    let id = resolve_task(ctx.workspace, token, now)?;
    let result = ctx.workspace.reopen_task(&id);
    ctx.settle(result)?;
    println!("Reopened task {}.", crate::render::short_id(&id));
    Ok(())
}

pub(super) fn delete(ctx: &mut Context<'_>, token: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
    let id = resolve_task(ctx.workspace, token, now)?;
    let result = ctx.workspace.delete_task(&id);
    ctx.settle(result)?;
    println!("Deleted task {}.", crate::render::short_id(&id));
    Ok(())
}

pub(super) fn move_up(ctx: &mut Context<'_>, token: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
    let id = resolve_task(ctx.workspace, token, now)?;
    let result = ctx.workspace.move_up(&id, now);
    if !ctx.settle(result)? {
        println!("Already at the top of today's stack.");
    }
    list(ctx, false, now)
}

pub(super) fn move_down(ctx: &mut Context<'_>, token: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
    let id = resolve_task(ctx.workspace, token, now)?;
    let result = ctx.workspace.move_down(&id, now);
    if !ctx.settle(result)? {
        println!("Already at the bottom of today's stack.");
    }
    list(ctx, false, now)
}

pub(super) fn assign(ctx: &mut Context<'_>, token: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
    let id = resolve_task(ctx.workspace, token, now)?;
    let result = ctx.workspace.assign_to_today(&id, now);
    ctx.settle(result)?;
    list(ctx, false, now)
}

pub(super) fn unassign(ctx: &mut Context<'_>, token: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
    let id = resolve_task(ctx.workspace, token, now)?;
    let result = ctx.workspace.remove_from_today(&id);
    ctx.settle(result)?;
    list(ctx, false, now)
}
