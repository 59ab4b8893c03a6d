//! SageMaker cleanup: user profiles and spaces.

use super::{listing_failed, required};
use crate::api::{App, SageMakerApi, Space};
use crate::runtime::CommandRuntime;
use anyhow::{Context, Result, bail};
use cleanupkit::{
    ActionPlan, ActionRow, ActionState, CancelToken, CascadeBuilder, CascadeExecutor,
    DeleteOperation, PollStatus, RowSet, Waiter, drain, execute_plan,
};
use std::collections::BTreeSet;

const PROFILE_HEADERS: [&str; 5] = ["domain_id", "user_profile", "step", "resource", "action"];
const SPACE_HEADERS: [&str; 4] = ["domain_id", "space_name", "status", "action"];

fn status_is(status: &str, expected: &str) -> bool {
    status.eq_ignore_ascii_case(expected)
}

/// Whether a resource still counts as present.
///
/// `Deleted` never does; `Deleting` does only when `include_deleting` is set.
fn is_live(status: &str, include_deleting: bool) -> bool {
    !status_is(status, "Deleted") && (include_deleting || !status_is(status, "Deleting"))
}

// ============================================================================
// delete-user-profile
// ============================================================================

/// Delete a user profile after its apps and private spaces.
///
/// Listing failures abort before anything is shown. Once every dependent is
/// cleared, waits until no app or space of the profile remains (including
/// ones still `Deleting`) before deleting the profile itself.
pub fn delete_user_profile(
    api: &dyn SageMakerApi,
    domain_id: &str,
    user_profile: &str,
    rt: &mut CommandRuntime,
) -> Result<RowSet> {
    let domain = required(domain_id, "--domain-id")?;
    let profile = required(user_profile, "--user-profile")?;

    let apps = profile_apps(api, &rt.cancel, &domain, &profile, false)
        .map_err(|err| listing_failed(&format!("list apps for user profile {profile}"), &err))?;
    let spaces = profile_spaces(api, &rt.cancel, &domain, &profile, false)
        .map_err(|err| listing_failed(&format!("list spaces for user profile {profile}"), &err))?;

    let mut builder = CascadeBuilder::new(
        PROFILE_HEADERS,
        [domain.clone(), profile.clone()],
        rt.opts.dry_run,
    );

    for app in apps {
        let resource = format!("{} ({})", app.name, app.app_type);
        let (domain, profile) = (domain.clone(), profile.clone());
        builder.dependent(DeleteOperation::new("app", resource, move |cancel| {
            api.delete_app(cancel, &domain, &profile, &app)
        }));
    }

    for space in spaces {
        let domain = domain.clone();
        builder.dependent(DeleteOperation::new("space", space.clone(), move |cancel| {
            api.delete_space(cancel, &domain, &space)
        }));
    }

    let wait = rt.config.waits.user_profile_dependencies;
    let sleeper = rt.sleeper.as_ref();
    let (wait_domain, wait_profile) = (domain.clone(), profile.clone());
    builder.settle(move |cancel| {
        let target = format!("dependencies to delete for user profile {wait_profile}");
        Waiter::new(wait, sleeper).wait_until(&target, cancel, |cancel| {
            let apps = profile_apps(api, cancel, &wait_domain, &wait_profile, true)
                .with_context(|| format!("list apps for user profile {wait_profile}"))?;
            let spaces = profile_spaces(api, cancel, &wait_domain, &wait_profile, true)
                .with_context(|| format!("list spaces for user profile {wait_profile}"))?;
            log::debug!(
                "user profile {wait_profile}: {} app(s), {} space(s) remaining",
                apps.len(),
                spaces.len()
            );
            Ok(if apps.is_empty() && spaces.is_empty() {
                PollStatus::Done
            } else {
                PollStatus::Pending
            })
        })
    });

    let (terminal_domain, terminal_profile) = (domain, profile.clone());
    builder.terminal(DeleteOperation::new("user-profile", profile.clone(), move |cancel| {
        api.delete_user_profile(cancel, &terminal_domain, &terminal_profile)
    }));

    let prompt = format!(
        "Delete SageMaker user profile {profile:?} and {} dependency item(s)",
        builder.dependent_count()
    );
    let plan = builder.build(prompt)?;
    CascadeExecutor::new(rt.opts).run(plan, rt.confirm.as_mut(), &rt.cancel)
}

/// Apps running under `profile`, sorted by name.
fn profile_apps(
    api: &dyn SageMakerApi,
    cancel: &CancelToken,
    domain: &str,
    profile: &str,
    include_deleting: bool,
) -> Result<Vec<App>> {
    let mut apps = drain(cancel, |token| api.list_apps(cancel, domain, profile, token))?;
    apps.retain(|app| !app.name.is_empty() && is_live(&app.status, include_deleting));
    apps.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(apps)
}

/// Names of the private spaces owned by `profile`, sorted.
fn profile_spaces(
    api: &dyn SageMakerApi,
    cancel: &CancelToken,
    domain: &str,
    profile: &str,
    include_deleting: bool,
) -> Result<Vec<String>> {
    let spaces = drain(cancel, |token| api.list_spaces(cancel, domain, token))?;
    let mut names: Vec<String> = spaces
        .into_iter()
        .filter(|space| {
            !space.name.is_empty()
                && space.owner.as_deref() == Some(profile)
                && is_live(&space.status, include_deleting)
        })
        .map(|space| space.name)
        .collect();
    names.sort();
    Ok(names)
}

// ============================================================================
// cleanup-spaces
// ============================================================================

/// Delete spaces in one domain, or in every domain when none is given.
///
/// `space_names` narrows the selection and requires a domain. Spaces already
/// `Deleting` or `Delete_Failed` are left out.
pub fn cleanup_spaces(
    api: &dyn SageMakerApi,
    domain_id: Option<&str>,
    space_names: &[String],
    rt: &mut CommandRuntime,
) -> Result<RowSet> {
    let domain = domain_id.map(str::trim).unwrap_or_default();
    if !space_names.is_empty() && domain.is_empty() {
        bail!("--domain-id is required when --spaces is set");
    }

    let domains = if domain.is_empty() {
        let mut ids = drain(&rt.cancel, |token| api.list_domains(&rt.cancel, token))
            .map_err(|err| listing_failed("list SageMaker domains", &err))?;
        ids.retain(|id| !id.is_empty());
        ids.sort();
        ids
    } else {
        vec![domain.to_string()]
    };

    let requested: BTreeSet<&str> = space_names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect();

    let mut targets: Vec<(String, Space)> = Vec::new();
    for domain in domains {
        let spaces = drain(&rt.cancel, |token| api.list_spaces(&rt.cancel, &domain, token))
            .map_err(|err| listing_failed(&format!("list spaces for domain {domain}"), &err))?;
        for space in spaces {
            if space.name.is_empty()
                || (!requested.is_empty() && !requested.contains(space.name.as_str()))
                || status_is(&space.status, "Deleting")
                || status_is(&space.status, "Delete_Failed")
            {
                continue;
            }
            targets.push((domain.clone(), space));
        }
    }
    targets.sort_by(|(da, a), (db, b)| da.cmp(db).then_with(|| a.name.cmp(&b.name)));

    let mut rows = RowSet::new(SPACE_HEADERS);
    for (domain, space) in &targets {
        let action = ActionState::initial(rt.opts.dry_run, ActionState::would_delete());
        rows.push(ActionRow::new(
            [domain.as_str(), space.name.as_str(), space.status.as_str()],
            action,
        ));
    }

    let plan = ActionPlan::new(rows, format!("Delete {} SageMaker space(s)", targets.len()));
    let cancel = rt.cancel.clone();
    execute_plan(plan, &rt.opts, rt.confirm.as_mut(), |_, row| {
        let (domain, space) = (&row.columns[0], &row.columns[1]);
        let result = cancel
            .check()
            .map_err(anyhow::Error::from)
            .and_then(|()| api.delete_space(&cancel, domain, space));
        Some(match result {
            Ok(()) => ActionState::deleted(),
            Err(err) => {
                log::warn!("delete space {domain}/{space}: {err:#}");
                ActionState::failed_from(&err)
            }
        })
    })
}
