//! JSON inventory backend.
//!
//! Models remote state as a JSON document so cleanups can be rehearsed
//! offline. Listings paginate by `page_size` with offset tokens; failures
//! use the provider's error codes so they classify like the real service.

use super::{
    App, CloudFormationApi, IamApi, SageMakerApi, Space, StackInstance, StackSetOperation,
    UserAttachment,
};
use anyhow::{Context, Result};
use cleanupkit::{CancelToken, Page, RemoteError};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const STATUS_DELETED: &str = "Deleted";
const OPERATION_SUCCEEDED: &str = "SUCCEEDED";

/// Snapshot of remote state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    pub iam: IamInventory,
    pub sagemaker: SageMakerInventory,
    pub cloudformation: CloudFormationInventory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IamInventory {
    pub users: BTreeMap<String, IamUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IamUser {
    pub attachments: BTreeMap<UserAttachment, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions_boundary: Option<String>,
    pub login_profile: bool,
}

impl IamUser {
    fn has_blocking_attachments(&self) -> bool {
        self.login_profile || self.attachments.values().any(|ids| !ids.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SageMakerInventory {
    pub domains: BTreeMap<String, Domain>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Domain {
    pub user_profiles: Vec<String>,
    pub apps: Vec<ProfileApp>,
    pub spaces: Vec<Space>,
}

/// An app together with the user profile it runs under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileApp {
    pub user_profile: String,
    #[serde(flatten)]
    pub app: App,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudFormationInventory {
    pub stack_sets: BTreeMap<String, StackSet>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackSet {
    pub instances: Vec<StackInstance>,
    pub operations: BTreeMap<String, StackSetOperation>,
}

/// Serves the API traits from an [`Inventory`], optionally backed by a file.
pub struct InventoryBackend {
    state: RefCell<Inventory>,
    page_size: usize,
    path: Option<PathBuf>,
}

impl InventoryBackend {
    pub fn new(inventory: Inventory, page_size: usize) -> Self {
        Self {
            state: RefCell::new(inventory),
            page_size: page_size.max(1),
            path: None,
        }
    }

    /// Load inventory JSON from `path`; [`save`](Self::save) writes back to it.
    pub fn load(path: &Path, page_size: usize) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read inventory {}", path.display()))?;
        let inventory: Inventory = serde_json::from_str(&content)
            .with_context(|| format!("Invalid inventory format in {}", path.display()))?;
        log::debug!("loaded inventory from {}", path.display());

        let mut backend = Self::new(inventory, page_size);
        backend.path = Some(path.to_path_buf());
        Ok(backend)
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(&*self.state.borrow())?;
        fs::write(path, content)
            .with_context(|| format!("Could not write inventory {}", path.display()))?;
        log::debug!("saved inventory to {}", path.display());
        Ok(())
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Inventory {
        self.state.borrow().clone()
    }

    fn page<T: Clone>(&self, items: &[T], token: Option<&str>) -> Result<Page<T>> {
        paginate(items, token, self.page_size)
    }
}

fn paginate<T: Clone>(items: &[T], token: Option<&str>, page_size: usize) -> Result<Page<T>> {
    let start = match token {
        None => 0,
        Some(token) => token
            .parse::<usize>()
            .ok()
            .filter(|offset| *offset <= items.len())
            .ok_or_else(|| remote("InvalidNextToken", format!("Invalid pagination token {token}")))?,
    };
    let end = start.saturating_add(page_size).min(items.len());
    let next_token = (end < items.len()).then(|| end.to_string());
    Ok(Page::new(items[start..end].to_vec(), next_token))
}

fn remote(code: &str, message: impl Into<String>) -> anyhow::Error {
    RemoteError::new(code, message).into()
}

fn no_such_user(user: &str) -> anyhow::Error {
    remote(
        "NoSuchEntity",
        format!("The user with name {user} cannot be found."),
    )
}

fn no_such_domain(domain: &str) -> anyhow::Error {
    remote("ResourceNotFound", format!("Domain {domain} does not exist"))
}

fn no_such_stack_set(stack_set: &str) -> anyhow::Error {
    remote(
        "StackSetNotFoundException",
        format!("StackSet {stack_set} not found"),
    )
}

// ============================================================================
// IAM
// ============================================================================

impl IamApi for InventoryBackend {
    fn list_user_attachments(
        &self,
        cancel: &CancelToken,
        user: &str,
        kind: UserAttachment,
        marker: Option<&str>,
    ) -> Result<Page<String>> {
        cancel.check()?;
        let state = self.state.borrow();
        let entry = state.iam.users.get(user).ok_or_else(|| no_such_user(user))?;
        let ids = entry.attachments.get(&kind).map(Vec::as_slice).unwrap_or_default();
        self.page(ids, marker)
    }

    fn remove_user_attachment(
        &self,
        cancel: &CancelToken,
        user: &str,
        kind: UserAttachment,
        id: &str,
    ) -> Result<()> {
        cancel.check()?;
        let mut state = self.state.borrow_mut();
        let entry = state
            .iam
            .users
            .get_mut(user)
            .ok_or_else(|| no_such_user(user))?;
        let ids = entry.attachments.entry(kind).or_default();
        let position = ids.iter().position(|existing| existing == id).ok_or_else(|| {
            remote(
                "NoSuchEntity",
                format!("{} {id} for user {user} cannot be found.", kind.step()),
            )
        })?;
        ids.remove(position);
        Ok(())
    }

    fn delete_permissions_boundary(&self, cancel: &CancelToken, user: &str) -> Result<()> {
        cancel.check()?;
        let mut state = self.state.borrow_mut();
        let entry = state
            .iam
            .users
            .get_mut(user)
            .ok_or_else(|| no_such_user(user))?;
        entry.permissions_boundary.take().map(|_| ()).ok_or_else(|| {
            remote(
                "NoSuchEntity",
                format!("User {user} has no permissions boundary."),
            )
        })
    }

    fn delete_login_profile(&self, cancel: &CancelToken, user: &str) -> Result<()> {
        cancel.check()?;
        let mut state = self.state.borrow_mut();
        let entry = state
            .iam
            .users
            .get_mut(user)
            .ok_or_else(|| no_such_user(user))?;
        if !entry.login_profile {
            return Err(remote(
                "NoSuchEntity",
                format!("Login Profile for User {user} cannot be found."),
            ));
        }
        entry.login_profile = false;
        Ok(())
    }

    fn delete_user(&self, cancel: &CancelToken, user: &str) -> Result<()> {
        cancel.check()?;
        let mut state = self.state.borrow_mut();
        let entry = state.iam.users.get(user).ok_or_else(|| no_such_user(user))?;
        if entry.has_blocking_attachments() {
            return Err(remote(
                "DeleteConflict",
                "Cannot delete entity, must remove attached resources first.",
            ));
        }
        state.iam.users.remove(user);
        Ok(())
    }
}

// ============================================================================
// SageMaker
// ============================================================================

impl SageMakerApi for InventoryBackend {
    fn list_domains(&self, cancel: &CancelToken, token: Option<&str>) -> Result<Page<String>> {
        cancel.check()?;
        let ids: Vec<String> = self.state.borrow().sagemaker.domains.keys().cloned().collect();
        self.page(&ids, token)
    }

    fn list_spaces(
        &self,
        cancel: &CancelToken,
        domain: &str,
        token: Option<&str>,
    ) -> Result<Page<Space>> {
        cancel.check()?;
        let state = self.state.borrow();
        let entry = state
            .sagemaker
            .domains
            .get(domain)
            .ok_or_else(|| no_such_domain(domain))?;
        self.page(&entry.spaces, token)
    }

    fn list_apps(
        &self,
        cancel: &CancelToken,
        domain: &str,
        profile: &str,
        token: Option<&str>,
    ) -> Result<Page<App>> {
        cancel.check()?;
        let state = self.state.borrow();
        let entry = state
            .sagemaker
            .domains
            .get(domain)
            .ok_or_else(|| no_such_domain(domain))?;
        let apps: Vec<App> = entry
            .apps
            .iter()
            .filter(|candidate| candidate.user_profile == profile)
            .map(|candidate| candidate.app.clone())
            .collect();
        self.page(&apps, token)
    }

    fn delete_app(
        &self,
        cancel: &CancelToken,
        domain: &str,
        profile: &str,
        app: &App,
    ) -> Result<()> {
        cancel.check()?;
        let mut state = self.state.borrow_mut();
        let entry = state
            .sagemaker
            .domains
            .get_mut(domain)
            .ok_or_else(|| no_such_domain(domain))?;
        let target = entry
            .apps
            .iter_mut()
            .find(|candidate| {
                candidate.user_profile == profile
                    && candidate.app.name == app.name
                    && candidate.app.app_type == app.app_type
                    && candidate.app.status != STATUS_DELETED
            })
            .ok_or_else(|| {
                remote(
                    "ResourceNotFound",
                    format!("App {} ({}) does not exist", app.name, app.app_type),
                )
            })?;
        target.app.status = STATUS_DELETED.to_string();
        Ok(())
    }

    fn delete_space(&self, cancel: &CancelToken, domain: &str, space: &str) -> Result<()> {
        cancel.check()?;
        let mut state = self.state.borrow_mut();
        let entry = state
            .sagemaker
            .domains
            .get_mut(domain)
            .ok_or_else(|| no_such_domain(domain))?;
        let target = entry
            .spaces
            .iter_mut()
            .find(|candidate| candidate.name == space && candidate.status != STATUS_DELETED)
            .ok_or_else(|| remote("ResourceNotFound", format!("Space {space} does not exist")))?;
        target.status = STATUS_DELETED.to_string();
        Ok(())
    }

    fn delete_user_profile(
        &self,
        cancel: &CancelToken,
        domain: &str,
        profile: &str,
    ) -> Result<()> {
        cancel.check()?;
        let mut state = self.state.borrow_mut();
        let entry = state
            .sagemaker
            .domains
            .get_mut(domain)
            .ok_or_else(|| no_such_domain(domain))?;
        let position = entry
            .user_profiles
            .iter()
            .position(|existing| existing == profile)
            .ok_or_else(|| {
                remote(
                    "ResourceNotFound",
                    format!("User profile {profile} does not exist"),
                )
            })?;

        let in_use = entry
            .apps
            .iter()
            .any(|candidate| candidate.user_profile == profile && candidate.app.status != STATUS_DELETED)
            || entry.spaces.iter().any(|space| {
                space.owner.as_deref() == Some(profile) && space.status != STATUS_DELETED
            });
        if in_use {
            return Err(remote(
                "ResourceInUse",
                format!("User profile {profile} still has apps or spaces"),
            ));
        }

        entry.user_profiles.remove(position);
        Ok(())
    }
}

// ============================================================================
// CloudFormation
// ============================================================================

impl CloudFormationApi for InventoryBackend {
    fn list_stack_instances(
        &self,
        cancel: &CancelToken,
        stack_set: &str,
        token: Option<&str>,
    ) -> Result<Page<StackInstance>> {
        cancel.check()?;
        let state = self.state.borrow();
        let entry = state
            .cloudformation
            .stack_sets
            .get(stack_set)
            .ok_or_else(|| no_such_stack_set(stack_set))?;
        self.page(&entry.instances, token)
    }

    fn delete_stack_instance(
        &self,
        cancel: &CancelToken,
        stack_set: &str,
        instance: &StackInstance,
    ) -> Result<Option<String>> {
        cancel.check()?;
        let mut state = self.state.borrow_mut();
        let entry = state
            .cloudformation
            .stack_sets
            .get_mut(stack_set)
            .ok_or_else(|| no_such_stack_set(stack_set))?;
        let before = entry.instances.len();
        entry.instances.retain(|existing| existing != instance);
        if entry.instances.len() == before {
            return Err(remote(
                "StackInstanceNotFoundException",
                format!(
                    "Stack instance {}/{} not found in {stack_set}",
                    instance.account, instance.region
                ),
            ));
        }

        let operation_id = format!("op-{}", entry.operations.len() + 1);
        entry.operations.insert(
            operation_id.clone(),
            StackSetOperation {
                status: OPERATION_SUCCEEDED.to_string(),
                reason: None,
            },
        );
        Ok(Some(operation_id))
    }

    fn describe_stack_set_operation(
        &self,
        cancel: &CancelToken,
        stack_set: &str,
        operation_id: &str,
    ) -> Result<StackSetOperation> {
        cancel.check()?;
        let state = self.state.borrow();
        let entry = state
            .cloudformation
            .stack_sets
            .get(stack_set)
            .ok_or_else(|| no_such_stack_set(stack_set))?;
        entry.operations.get(operation_id).cloned().ok_or_else(|| {
            remote(
                "OperationNotFoundException",
                format!("Operation {operation_id} not found"),
            )
        })
    }

    fn delete_stack_set(&self, cancel: &CancelToken, stack_set: &str) -> Result<()> {
        cancel.check()?;
        let mut state = self.state.borrow_mut();
        let entry = state
            .cloudformation
            .stack_sets
            .get(stack_set)
            .ok_or_else(|| no_such_stack_set(stack_set))?;
        if !entry.instances.is_empty() {
            return Err(remote(
                "StackSetNotEmptyException",
                format!("StackSet {stack_set} still has stack instances"),
            ));
        }
        state.cloudformation.stack_sets.remove(stack_set);
        Ok(())
    }
}
