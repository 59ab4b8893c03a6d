//! IAM cleanup: cascade-delete a user.

use super::{listing_failed, required};
use crate::api::{IamApi, UserAttachment};
use crate::runtime::CommandRuntime;
use anyhow::Result;
use cleanupkit::{CancelToken, CascadeBuilder, CascadeExecutor, DeleteOperation, RowSet, drain};

const HEADERS: [&str; 4] = ["username", "step", "resource", "action"];

/// Cleared before the permissions boundary and login profile
const LEADING: [UserAttachment; 5] = [
    UserAttachment::AccessKey,
    UserAttachment::MfaDevice,
    UserAttachment::AttachedPolicy,
    UserAttachment::InlinePolicy,
    UserAttachment::GroupMembership,
];

/// Cleared after the permissions boundary and login profile
const TRAILING: [UserAttachment; 2] = [
    UserAttachment::SigningCertificate,
    UserAttachment::SshPublicKey,
];

/// Delete an IAM user after removing everything attached to it.
///
/// A listing failure becomes a `<step>-list` row and keeps the user, unless
/// the command was cancelled, which aborts before anything is shown.
/// The permissions boundary and login profile are always attempted; when
/// they do not exist the row is `skipped:not-found`.
pub fn delete_user(api: &dyn IamApi, username: &str, rt: &mut CommandRuntime) -> Result<RowSet> {
    let user = required(username, "--username")?;
    let mut builder = CascadeBuilder::new(HEADERS, [user.clone()], rt.opts.dry_run);

    for kind in LEADING {
        add_attachments(&mut builder, api, &user, kind, &rt.cancel)?;
    }

    let boundary_user = user.clone();
    builder.dependent(DeleteOperation::new("permissions-boundary", "-", move |cancel| {
        api.delete_permissions_boundary(cancel, &boundary_user)
    }));
    let login_user = user.clone();
    builder.dependent(DeleteOperation::new("login-profile", "-", move |cancel| {
        api.delete_login_profile(cancel, &login_user)
    }));

    for kind in TRAILING {
        add_attachments(&mut builder, api, &user, kind, &rt.cancel)?;
    }

    let target = user.clone();
    builder.terminal(DeleteOperation::new("user", user.clone(), move |cancel| {
        api.delete_user(cancel, &target)
    }));

    log::info!(
        "user {user}: {} dependent operation(s) planned",
        builder.dependent_count()
    );
    let plan = builder.build(format!("Cascade-delete IAM user {user:?}"))?;
    CascadeExecutor::new(rt.opts).run(plan, rt.confirm.as_mut(), &rt.cancel)
}

fn add_attachments<'a>(
    builder: &mut CascadeBuilder<'a>,
    api: &'a dyn IamApi,
    user: &str,
    kind: UserAttachment,
    cancel: &CancelToken,
) -> Result<()> {
    let ids = match list_attachments(api, user, kind, cancel) {
        Ok(ids) => ids,
        Err(err) if cancel.is_cancelled() => {
            return Err(listing_failed(
                &format!("list {} for user {user}", kind.step()),
                &err,
            ));
        }
        Err(err) => {
            builder.list_failure(&format!("{}-list", kind.step()), &err);
            return Ok(());
        }
    };

    for id in ids {
        let user = user.to_string();
        let resource = id.clone();
        builder.dependent(DeleteOperation::new(kind.step(), resource, move |cancel| {
            api.remove_user_attachment(cancel, &user, kind, &id)
        }));
    }
    Ok(())
}

/// Every identifier of one attachment kind, sorted, blanks dropped.
fn list_attachments(
    api: &dyn IamApi,
    user: &str,
    kind: UserAttachment,
    cancel: &CancelToken,
) -> Result<Vec<String>> {
    let mut ids = drain(cancel, |marker| {
        api.list_user_attachments(cancel, user, kind, marker)
    })?;
    ids.retain(|id| !id.trim().is_empty());
    ids.sort();
    Ok(ids)
}
