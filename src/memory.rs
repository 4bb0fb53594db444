//! In-memory adapters for the persistence ports and the mail relay.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lettre::Message;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::integration_queue::VISIBILITY_TIMEOUT_SECS;
use crate::email::{MailError, Mailer};
use crate::error::StoreError;
use crate::health::Notifier;
use crate::models::{
    Credential, FormField, Integration, IntegrationQueueItem, OwnerContact, ProviderKind,
    WorkflowInstance, WorkflowStatus,
};
use crate::store::{
    AccountStore, FieldStore, HealthCounterStore, IntegrationQueue, IntegrationStore, StepJournal,
    WorkflowHost,
};
use crate::workflow::WorkflowSpec;

/// Forms, integrations and accounts.
#[derive(Default)]
pub struct MemoryStore {
    integrations: RwLock<HashMap<String, Integration>>,
    owners: RwLock<HashMap<String, OwnerContact>>,
    fields: RwLock<HashMap<String, Vec<FormField>>>,
    accounts: RwLock<HashMap<(String, String), Credential>>,
    fields_unavailable: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_integration(&self, integration: Integration) {
        self.integrations
            .write()
            .await
            .insert(integration.id.clone(), integration);
    }

    pub async fn set_owner(&self, form_id: &str, email: &str, form_name: &str) {
        self.owners.write().await.insert(
            form_id.to_string(),
            OwnerContact {
                email: email.to_string(),
                form_name: form_name.to_string(),
            },
        );
    }

    pub async fn set_fields(&self, form_id: &str, fields: Vec<FormField>) {
        self.fields.write().await.insert(form_id.to_string(), fields);
    }

    pub async fn insert_account(&self, credential: Credential) {
        self.accounts.write().await.insert(
            (credential.user_id.clone(), credential.provider_id.clone()),
            credential,
        );
    }

    pub async fn account(&self, user_id: &str, provider: ProviderKind) -> Option<Credential> {
        self.accounts
            .read()
            .await
            .get(&(user_id.to_string(), provider.provider_id().to_string()))
            .cloned()
    }

    pub async fn contains_integration(&self, id: &str) -> bool {
        self.integrations.read().await.contains_key(id)
    }

    /// Make every subsequent field lookup fail.
    pub fn set_fields_unavailable(&self, unavailable: bool) {
        self.fields_unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl IntegrationStore for MemoryStore {
    async fn list_by_form(&self, form_id: &str) -> Result<Vec<Integration>, StoreError> {
        let mut found: Vec<Integration> = self
            .integrations
            .read()
            .await
            .values()
            .filter(|i| i.form_id == form_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn find(&self, id: &str) -> Result<Option<Integration>, StoreError> {
        Ok(self.integrations.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.integrations.write().await.remove(id).is_some())
    }

    async fn owner_contact(&self, form_id: &str) -> Result<Option<OwnerContact>, StoreError> {
        Ok(self.owners.read().await.get(form_id).cloned())
    }
}

#[async_trait]
impl FieldStore for MemoryStore {
    async fn list_by_form(&self, form_id: &str) -> Result<Vec<FormField>, StoreError> {
        if self.fields_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Other("field store unavailable".to_string()));
        }
        let mut fields = self
            .fields
            .read()
            .await
            .get(form_id)
            .cloned()
            .unwrap_or_default();
        fields.sort_by_key(|f| f.order);
        Ok(fields)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find(
        &self,
        user_id: &str,
        provider: ProviderKind,
    ) -> Result<Option<Credential>, StoreError> {
        Ok(self.account(user_id, provider).await)
    }

    async fn update_access_token(
        &self,
        user_id: &str,
        provider: ProviderKind,
        access_token: &str,
    ) -> Result<(), StoreError> {
        let key = (user_id.to_string(), provider.provider_id().to_string());
        if let Some(account) = self.accounts.write().await.get_mut(&key) {
            account.access_token = Some(access_token.to_string());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryHealthStore {
    counts: RwLock<HashMap<String, u32>>,
}

impl MemoryHealthStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self, integration_id: &str) -> u32 {
        self.counts
            .read()
            .await
            .get(integration_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl HealthCounterStore for MemoryHealthStore {
    async fn increment(&self, integration_id: &str) -> Result<u32, StoreError> {
        let mut counts = self.counts.write().await;
        let count = counts.entry(integration_id.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn reset(&self, integration_id: &str) -> Result<(), StoreError> {
        self.counts.write().await.remove(integration_id);
        Ok(())
    }
}

/// Workflow instances and step checkpoints. Leases never expire.
#[derive(Default)]
pub struct MemoryWorkflowHost {
    instances: RwLock<Vec<WorkflowInstance>>,
    steps: RwLock<HashMap<(String, String), Value>>,
    batches: RwLock<Vec<usize>>,
    unavailable: AtomicBool,
    checkpoint_writes_fail: AtomicBool,
}

impl MemoryWorkflowHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent create fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every subsequent checkpoint write fail.
    pub fn set_checkpoint_writes_fail(&self, fail: bool) {
        self.checkpoint_writes_fail.store(fail, Ordering::SeqCst);
    }

    pub async fn instances(&self) -> Vec<WorkflowInstance> {
        self.instances.read().await.clone()
    }

    pub async fn instance(&self, id: &str) -> Option<WorkflowInstance> {
        self.instances.read().await.iter().find(|i| i.id == id).cloned()
    }

    /// Sizes of the `create_batch` calls received, in call order.
    pub async fn batch_sizes(&self) -> Vec<usize> {
        self.batches.read().await.clone()
    }

    pub async fn step_output(&self, instance_id: &str, step: &str) -> Option<Value> {
        self.steps
            .read()
            .await
            .get(&(instance_id.to_string(), step.to_string()))
            .cloned()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Other("workflow host unavailable".to_string()));
        }
        Ok(())
    }

    async fn insert(&self, spec: &WorkflowSpec) -> Result<bool, StoreError> {
        let params = serde_json::to_value(&spec.params)?;
        let mut instances = self.instances.write().await;
        if instances.iter().any(|i| i.id == spec.id) {
            return Ok(false);
        }
        let now = Utc::now();
        instances.push(WorkflowInstance {
            id: spec.id.clone(),
            params,
            status: WorkflowStatus::Pending.as_str().to_string(),
            attempts: 0,
            last_error: None,
            leased_until: None,
            created_at: now,
            updated_at: now,
        });
        Ok(true)
    }

    async fn set_status(&self, id: &str, status: WorkflowStatus, error: Option<&str>) {
        let mut instances = self.instances.write().await;
        if let Some(instance) = instances.iter_mut().find(|i| i.id == id) {
            instance.status = status.as_str().to_string();
            instance.last_error = error.map(str::to_string);
            instance.leased_until = None;
            instance.updated_at = Utc::now();
        }
    }
}

#[async_trait]
impl WorkflowHost for MemoryWorkflowHost {
    async fn create(&self, spec: &WorkflowSpec) -> Result<bool, StoreError> {
        self.check_available()?;
        self.insert(spec).await
    }

    async fn create_batch(&self, specs: &[WorkflowSpec]) -> Result<usize, StoreError> {
        self.check_available()?;
        self.batches.write().await.push(specs.len());
        let mut created = 0;
        for spec in specs {
            if self.insert(spec).await? {
                created += 1;
            }
        }
        Ok(created)
    }

    async fn claim_next(&self, lease: Duration) -> Result<Option<WorkflowInstance>, StoreError> {
        let mut instances = self.instances.write().await;
        let Some(instance) = instances
            .iter_mut()
            .find(|i| i.status == WorkflowStatus::Pending.as_str())
        else {
            return Ok(None);
        };
        let now = Utc::now();
        instance.status = WorkflowStatus::Running.as_str().to_string();
        instance.attempts += 1;
        instance.leased_until = chrono::Duration::from_std(lease).ok().map(|lease| now + lease);
        instance.updated_at = now;
        Ok(Some(instance.clone()))
    }

    async fn complete(&self, id: &str) -> Result<(), StoreError> {
        self.set_status(id, WorkflowStatus::Done, None).await;
        Ok(())
    }

    async fn fail(&self, id: &str, error: &str) -> Result<(), StoreError> {
        self.set_status(id, WorkflowStatus::Failed, Some(error)).await;
        Ok(())
    }
}

#[async_trait]
impl StepJournal for MemoryWorkflowHost {
    async fn load(&self, instance_id: &str, step: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.step_output(instance_id, step).await)
    }

    async fn save(&self, instance_id: &str, step: &str, output: &Value) -> Result<(), StoreError> {
        if self.checkpoint_writes_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Other("checkpoint write failed".to_string()));
        }
        self.steps
            .write()
            .await
            .entry((instance_id.to_string(), step.to_string()))
            .or_insert_with(|| output.clone());
        Ok(())
    }
}

/// Integration queue with the same claim and backoff rules as the Postgres table.
#[derive(Default)]
pub struct MemoryIntegrationQueue {
    items: RwLock<Vec<IntegrationQueueItem>>,
}

impl MemoryIntegrationQueue {
    /// Attempts allowed per message, as in the table default.
    pub const MAX_ATTEMPTS: i32 = 5;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages not yet acked, in enqueue order.
    pub async fn items(&self) -> Vec<IntegrationQueueItem> {
        self.items.read().await.clone()
    }

    pub async fn item(&self, id: Uuid) -> Option<IntegrationQueueItem> {
        self.items.read().await.iter().find(|i| i.id == id).cloned()
    }
}

#[async_trait]
impl IntegrationQueue for MemoryIntegrationQueue {
    async fn enqueue(&self, payload: &Value) -> Result<(), StoreError> {
        let now = Utc::now();
        self.items.write().await.push(IntegrationQueueItem {
            id: Uuid::now_v7(),
            payload: payload.clone(),
            status: "pending".to_string(),
            attempts: 0,
            max_attempts: Self::MAX_ATTEMPTS,
            last_error: None,
            next_retry_at: now,
            created_at: now,
        });
        Ok(())
    }

    async fn claim_batch(&self, limit: i64) -> Result<Vec<IntegrationQueueItem>, StoreError> {
        let now = Utc::now();
        let limit = usize::try_from(limit).unwrap_or(0);
        let mut items = self.items.write().await;

        let mut claimed = Vec::new();
        for item in items
            .iter_mut()
            .filter(|i| i.next_retry_at <= now && i.attempts < i.max_attempts)
            .take(limit)
        {
            item.status = "processing".to_string();
            item.attempts += 1;
            item.next_retry_at = now + chrono::Duration::seconds(VISIBILITY_TIMEOUT_SECS as i64);
            claimed.push(item.clone());
        }
        Ok(claimed)
    }

    async fn ack(&self, id: Uuid) -> Result<(), StoreError> {
        self.items.write().await.retain(|i| i.id != id);
        Ok(())
    }

    async fn mark_failed(&self, item: &IntegrationQueueItem, error: &str) -> Result<(), StoreError> {
        let mut items = self.items.write().await;
        if let Some(stored) = items.iter_mut().find(|i| i.id == item.id) {
            stored.status = "failed".to_string();
            stored.last_error = Some(error.to_string());
            if item.attempts < item.max_attempts {
                let backoff = 2_i64.pow(item.attempts.max(0) as u32);
                stored.next_retry_at = Utc::now() + chrono::Duration::seconds(backoff);
            }
        }
        Ok(())
    }
}

/// A message accepted by [`MemoryMailer`].
#[derive(Debug, Clone)]
pub struct SentMail {
    pub from: Option<String>,
    pub to: Vec<String>,
    /// The fully formatted message, headers included.
    pub raw: String,
}

#[derive(Default)]
pub struct MemoryMailer {
    sent: RwLock<Vec<SentMail>>,
}

impl MemoryMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: Message) -> Result<(), MailError> {
        let envelope = message.envelope();
        let mail = SentMail {
            from: envelope.from().map(ToString::to_string),
            to: envelope.to().iter().map(ToString::to_string).collect(),
            raw: String::from_utf8_lossy(&message.formatted()).into_owned(),
        };
        self.sent.write().await.push(mail);
        Ok(())
    }
}

/// Records which integrations were reported as disabled.
#[derive(Default)]
pub struct MemoryNotifier {
    disabled: RwLock<Vec<String>>,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn disabled(&self) -> Vec<String> {
        self.disabled.read().await.clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn integration_disabled(&self, integration: &Integration) -> Result<(), String> {
        self.disabled.write().await.push(integration.id.clone());
        Ok(())
    }
}
