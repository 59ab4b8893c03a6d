//! Remote API abstraction.
//!
//! Each service exposes the subset of calls its cleanup commands need.
//! Every call takes the command's [`CancelToken`] and must fail once it is
//! cancelled or past its deadline. Listing calls return one [`Page`] per
//! call and are drained by [`cleanupkit::drain`]; failures carry a
//! [`cleanupkit::RemoteError`] so they classify by provider code.
//!
//! Implementations:
//! - [`inventory::InventoryBackend`]: a JSON snapshot of remote state
//! - hand-written mocks in each command's tests

pub mod inventory;

use anyhow::Result;
use cleanupkit::{CancelToken, Page};
use serde::{Deserialize, Serialize};

// ============================================================================
// IAM
// ============================================================================

/// Something attached to an IAM user that blocks deleting the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAttachment {
    AccessKey,
    MfaDevice,
    AttachedPolicy,
    InlinePolicy,
    GroupMembership,
    SigningCertificate,
    SshPublicKey,
}

impl UserAttachment {
    /// Cascade step label.
    pub fn step(&self) -> &'static str {
        match self {
            Self::AccessKey => "access-key",
            Self::MfaDevice => "mfa-device",
            Self::AttachedPolicy => "attached-policy",
            Self::InlinePolicy => "inline-policy",
            Self::GroupMembership => "group-membership",
            Self::SigningCertificate => "signing-certificate",
            Self::SshPublicKey => "ssh-public-key",
        }
    }
}

pub trait IamApi {
    /// One page of attachment identifiers (key ids, serials, policy ARNs, names).
    fn list_user_attachments(
        &self,
        cancel: &CancelToken,
        user: &str,
        kind: UserAttachment,
        marker: Option<&str>,
    ) -> Result<Page<String>>;

    /// Delete, detach or deactivate one attachment.
    fn remove_user_attachment(
        &self,
        cancel: &CancelToken,
        user: &str,
        kind: UserAttachment,
        id: &str,
    ) -> Result<()>;

    fn delete_permissions_boundary(&self, cancel: &CancelToken, user: &str) -> Result<()>;

    fn delete_login_profile(&self, cancel: &CancelToken, user: &str) -> Result<()>;

    fn delete_user(&self, cancel: &CancelToken, user: &str) -> Result<()>;
}

// ============================================================================
// SageMaker
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub name: String,
    pub app_type: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub name: String,
    pub status: String,
    /// Owning user profile for private spaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

pub trait SageMakerApi {
    fn list_domains(&self, cancel: &CancelToken, token: Option<&str>) -> Result<Page<String>>;

    fn list_spaces(
        &self,
        cancel: &CancelToken,
        domain: &str,
        token: Option<&str>,
    ) -> Result<Page<Space>>;

    fn list_apps(
        &self,
        cancel: &CancelToken,
        domain: &str,
        profile: &str,
        token: Option<&str>,
    ) -> Result<Page<App>>;

    fn delete_app(
        &self,
        cancel: &CancelToken,
        domain: &str,
        profile: &str,
        app: &App,
    ) -> Result<()>;

    fn delete_space(&self, cancel: &CancelToken, domain: &str, space: &str) -> Result<()>;

    fn delete_user_profile(
        &self,
        cancel: &CancelToken,
        domain: &str,
        profile: &str,
    ) -> Result<()>;
}

// ============================================================================
// CloudFormation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StackInstance {
    pub account: String,
    pub region: String,
}

/// Status of an asynchronous stack set operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSetOperation {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub trait CloudFormationApi {
    fn list_stack_instances(
        &self,
        cancel: &CancelToken,
        stack_set: &str,
        token: Option<&str>,
    ) -> Result<Page<StackInstance>>;

    /// Start deleting one instance; returns the operation id to wait on, if any.
    fn delete_stack_instance(
        &self,
        cancel: &CancelToken,
        stack_set: &str,
        instance: &StackInstance,
    ) -> Result<Option<String>>;

    fn describe_stack_set_operation(
        &self,
        cancel: &CancelToken,
        stack_set: &str,
        operation_id: &str,
    ) -> Result<StackSetOperation>;

    fn delete_stack_set(&self, cancel: &CancelToken, stack_set: &str) -> Result<()>;
}
