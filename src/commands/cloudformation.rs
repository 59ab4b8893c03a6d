//! CloudFormation cleanup: delete a stack set and its instances.

use super::{listing_failed, required};
use crate::api::{CloudFormationApi, StackInstance, StackSetOperation};
use crate::runtime::CommandRuntime;
use anyhow::Result;
use cleanupkit::{
    CancelToken, CascadeBuilder, CascadeExecutor, DeleteOperation, Error, PollStatus, RowSet,
    Waiter, classify, drain,
};
use std::collections::BTreeSet;

const HEADERS: [&str; 4] = ["stackset_name", "step", "resource", "action"];

/// Delete every stack instance, waiting on each instance's operation, then
/// the stack set. Instances are deduplicated and run in account/region order.
pub fn delete_stackset(
    api: &dyn CloudFormationApi,
    stackset_name: &str,
    rt: &mut CommandRuntime,
) -> Result<RowSet> {
    let stack_set = required(stackset_name, "--stackset-name")?;
    let instances = instance_targets(api, &rt.cancel, &stack_set)
        .map_err(|err| listing_failed("list stack set instances", &err))?;
    let instance_count = instances.len();

    let mut builder = CascadeBuilder::new(HEADERS, [stack_set.clone()], rt.opts.dry_run);
    let wait = rt.config.waits.stack_set_operation;
    let sleeper = rt.sleeper.as_ref();

    for instance in instances {
        let resource = format!("{}/{}", instance.account, instance.region);
        let name = stack_set.clone();
        builder.dependent(DeleteOperation::new("stack-instance", resource, move |cancel| {
            let operation_id = api.delete_stack_instance(cancel, &name, &instance)?;
            let Some(operation_id) = operation_id.filter(|id| !id.trim().is_empty()) else {
                return Ok(());
            };
            let operation_id = operation_id.trim();
            let target = format!("stack set operation {operation_id}");
            Waiter::new(wait, sleeper).wait_until(&target, cancel, |cancel| {
                let operation = api
                    .describe_stack_set_operation(cancel, &name, operation_id)
                    .map_err(|err| describe_failed(&target, err))?;
                Ok(operation_status(&operation))
            })
        }));
    }

    let target = stack_set.clone();
    builder.terminal(DeleteOperation::new("stackset", stack_set.clone(), move |cancel| {
        api.delete_stack_set(cancel, &target)
    }));

    let plan = builder.build(format!(
        "Delete stack set {stack_set:?} and {instance_count} stack instance(s)"
    ))?;
    CascadeExecutor::new(rt.opts).run(plan, rt.confirm.as_mut(), &rt.cancel)
}

/// Distinct (account, region) pairs with blanks dropped, in sorted order.
fn instance_targets(
    api: &dyn CloudFormationApi,
    cancel: &CancelToken,
    stack_set: &str,
) -> Result<Vec<StackInstance>> {
    let instances = drain(cancel, |token| api.list_stack_instances(cancel, stack_set, token))?;
    let unique: BTreeSet<StackInstance> = instances
        .into_iter()
        .map(|instance| StackInstance {
            account: instance.account.trim().to_string(),
            region: instance.region.trim().to_string(),
        })
        .filter(|instance| !instance.account.is_empty() && !instance.region.is_empty())
        .collect();
    Ok(unique.into_iter().collect())
}

/// Only the delete call may report an instance as already gone. An operation
/// that cannot be described leaves the deletion unconfirmed.
fn describe_failed(target: &str, err: anyhow::Error) -> anyhow::Error {
    let classified = classify(&err);
    if !classified.kind.is_not_found() {
        return err;
    }
    Error::TerminalState {
        target: target.to_string(),
        status: classified.code,
        reason: Some(classified.message),
    }
    .into()
}

fn operation_status(operation: &StackSetOperation) -> PollStatus {
    match operation.status.as_str() {
        "SUCCEEDED" => PollStatus::Done,
        "FAILED" | "STOPPED" => PollStatus::Terminal {
            status: operation.status.clone(),
            reason: operation
                .reason
                .as_deref()
                .map(str::trim)
                .filter(|reason| !reason.is_empty())
                .map(str::to_string),
        },
        _ => PollStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::inventory::{Inventory, InventoryBackend, StackSet};
    use crate::runtime::testing::harness;
    use cleanupkit::{Page, RemoteError, WaitConfig};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::time::Duration;

    fn instance(account: &str, region: &str) -> StackInstance {
        StackInstance {
            account: account.into(),
            region: region.into(),
        }
    }

    fn actions(rows: &RowSet) -> Vec<String> {
        rows.actions().map(ToString::to_string).collect()
    }

    /// Scripted operation statuses per instance, in deletion order
    #[derive(Default)]
    struct Scripted {
        instances: Vec<StackInstance>,
        statuses: RefCell<VecDeque<StackSetOperation>>,
        fail_delete: Option<StackInstance>,
        describe_error: Option<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn status(mut self, status: &str, reason: Option<&str>) -> Self {
            self.statuses.get_mut().push_back(StackSetOperation {
                status: status.into(),
                reason: reason.map(Into::into),
            });
            self
        }
    }

    impl CloudFormationApi for Scripted {
        fn list_stack_instances(
            &self,
            _cancel: &CancelToken,
            _stack_set: &str,
            _token: Option<&str>,
        ) -> Result<Page<StackInstance>> {
            Ok(Page::last(self.instances.clone()))
        }

        fn delete_stack_instance(
            &self,
            _cancel: &CancelToken,
            _stack_set: &str,
            instance: &StackInstance,
        ) -> Result<Option<String>> {
            self.calls
                .borrow_mut()
                .push(format!("delete {}/{}", instance.account, instance.region));
            if self.fail_delete.as_ref() == Some(instance) {
                return Err(RemoteError::new("OperationInProgressException", "busy").into());
            }
            Ok(Some("op-1".into()))
        }

        fn describe_stack_set_operation(
            &self,
            _cancel: &CancelToken,
            _stack_set: &str,
            operation_id: &str,
        ) -> Result<StackSetOperation> {
            self.calls.borrow_mut().push(format!("describe {operation_id}"));
            if let Some(code) = self.describe_error {
                let message = format!("Operation {operation_id} not found");
                return Err(RemoteError::new(code, message).into());
            }
            Ok(self
                .statuses
                .borrow_mut()
                .pop_front()
                .unwrap_or(StackSetOperation {
                    status: "RUNNING".into(),
                    reason: None,
                }))
        }

        fn delete_stack_set(&self, _cancel: &CancelToken, stack_set: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("delete-set {stack_set}"));
            Ok(())
        }
    }

    #[test]
    fn test_required_name() {
        let api = Scripted::default();
        let mut h = harness(false, true);
        let err = delete_stackset(&api, "\t", &mut h.runtime).unwrap_err();
        assert_eq!(err.to_string(), "--stackset-name is required");
    }

    #[test]
    fn test_instances_deduplicated_and_sorted() {
        let api = Scripted {
            instances: vec![
                instance("222", "us-east-1"),
                instance("111", "eu-west-1"),
                instance(" 111 ", "eu-west-1"),
                instance("", "eu-west-1"),
                instance("111", "ap-south-1"),
            ],
            ..Scripted::default()
        };
        let mut h = harness(true, true);

        let rows = delete_stackset(&api, "baseline", &mut h.runtime).unwrap();

        let resources: Vec<String> = rows
            .to_dataset()
            .rows
            .into_iter()
            .map(|row| format!("{} {}", row[1], row[2]))
            .collect();
        assert_eq!(
            resources,
            vec![
                "stack-instance 111/ap-south-1",
                "stack-instance 111/eu-west-1",
                "stack-instance 222/us-east-1",
                "stackset baseline",
            ]
        );
        assert!(api.calls.borrow().is_empty());
    }

    #[test]
    fn test_waits_for_each_operation() {
        let api = Scripted {
            instances: vec![instance("111", "eu-west-1"), instance("222", "eu-west-1")],
            ..Scripted::default()
        }
        .status("RUNNING", None)
        .status("SUCCEEDED", None)
        .status("SUCCEEDED", None);
        let mut h = harness(false, true);

        let rows = delete_stackset(&api, "baseline", &mut h.runtime).unwrap();

        assert_eq!(actions(&rows), vec!["deleted"; 3]);
        assert_eq!(
            *api.calls.borrow(),
            vec![
                "delete 111/eu-west-1",
                "describe op-1",
                "describe op-1",
                "delete 222/eu-west-1",
                "describe op-1",
                "delete-set baseline",
            ]
        );
        assert_eq!(*h.naps.borrow(), vec![Duration::from_secs(5)]);
        assert_eq!(
            *h.prompts.borrow(),
            vec!["Delete stack set \"baseline\" and 2 stack instance(s)".to_string()]
        );
    }

    #[test]
    fn test_failed_operation_keeps_stack_set() {
        let api = Scripted {
            instances: vec![instance("111", "eu-west-1"), instance("222", "eu-west-1")],
            ..Scripted::default()
        }
        .status("FAILED", Some(" account suspended "))
        .status("SUCCEEDED", None);
        let mut h = harness(false, true);

        let rows = delete_stackset(&api, "baseline", &mut h.runtime).unwrap();

        assert_eq!(
            actions(&rows),
            vec![
                "failed:stack set operation op-1 FAILED: account suspended (UnknownError)",
                "deleted",
                "skipped:dependency cleanup failed",
            ]
        );
        assert!(!api.calls.borrow().iter().any(|call| call.starts_with("delete-set")));
    }

    #[test]
    fn test_delete_failure_and_wait_timeout() {
        let api = Scripted {
            instances: vec![instance("111", "eu-west-1"), instance("222", "eu-west-1")],
            fail_delete: Some(instance("111", "eu-west-1")),
            ..Scripted::default()
        };
        let mut h = harness(false, true);
        h.runtime.config.waits.stack_set_operation = WaitConfig::new(Duration::from_secs(5), 2);

        let rows = delete_stackset(&api, "baseline", &mut h.runtime).unwrap();

        assert_eq!(
            actions(&rows),
            vec![
                "failed:busy (OperationInProgressException)",
                "failed:timed out waiting for stack set operation op-1 (UnknownError)",
                "skipped:dependency cleanup failed",
            ]
        );
    }

    #[test]
    fn test_vanished_operation_fails_instance_and_keeps_stack_set() {
        let api = Scripted {
            instances: vec![instance("111", "eu-west-1")],
            describe_error: Some("OperationNotFoundException"),
            ..Scripted::default()
        };
        let mut h = harness(false, true);

        let rows = delete_stackset(&api, "baseline", &mut h.runtime).unwrap();

        assert_eq!(
            actions(&rows),
            vec![
                "failed:stack set operation op-1 OperationNotFoundException: Operation op-1 not found (UnknownError)",
                "skipped:dependency cleanup failed",
            ]
        );
        assert!(!api.calls.borrow().iter().any(|call| call.starts_with("delete-set")));
        assert!(h.naps.borrow().is_empty());
    }

    #[test]
    fn test_describe_errors_other_than_not_found_pass_through() {
        let err = describe_failed(
            "stack set operation op-1",
            RemoteError::new("ThrottlingException", "Rate exceeded").into(),
        );
        assert_eq!(
            cleanupkit::format_user_message(Some(&err)),
            "Rate exceeded (ThrottlingException)"
        );
    }

    #[test]
    fn test_cancelled_before_listing_aborts_without_prompt() {
        let api = Scripted {
            instances: vec![instance("111", "eu-west-1")],
            ..Scripted::default()
        };
        let mut h = harness(false, true);
        h.runtime.cancel.cancel();

        let err = delete_stackset(&api, "baseline", &mut h.runtime).unwrap_err();

        assert_eq!(
            err.to_string(),
            "list stack set instances: request timed out before a response was returned (Timeout)"
        );
        assert!(h.prompts.borrow().is_empty());
        assert!(api.calls.borrow().is_empty());
    }

    #[test]
    fn test_missing_stack_set_aborts() {
        let api = InventoryBackend::new(Inventory::default(), 10);
        let mut h = harness(false, true);
        let err = delete_stackset(&api, "ghost", &mut h.runtime).unwrap_err();
        assert_eq!(
            err.to_string(),
            "list stack set instances: StackSet ghost not found (StackSetNotFoundException)"
        );
    }

    #[test]
    fn test_against_inventory() {
        let mut inventory = Inventory::default();
        inventory.cloudformation.stack_sets.insert(
            "baseline".into(),
            StackSet {
                instances: vec![instance("111", "eu-west-1"), instance("111", "us-east-1")],
                ..StackSet::default()
            },
        );
        let api = InventoryBackend::new(inventory, 1);
        let mut h = harness(false, true);

        let rows = delete_stackset(&api, "baseline", &mut h.runtime).unwrap();

        assert_eq!(actions(&rows), vec!["deleted"; 3]);
        assert!(api.snapshot().cloudformation.stack_sets.is_empty());
    }

    #[test]
    fn test_operation_status_mapping() {
        let op = |status: &str, reason: Option<&str>| StackSetOperation {
            status: status.into(),
            reason: reason.map(Into::into),
        };
        assert_eq!(operation_status(&op("SUCCEEDED", None)), PollStatus::Done);
        assert_eq!(operation_status(&op("QUEUED", None)), PollStatus::Pending);
        assert_eq!(
            operation_status(&op("STOPPED", Some("  "))),
            PollStatus::Terminal {
                status: "STOPPED".into(),
                reason: None
            }
        );
    }
}
