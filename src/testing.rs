//! Testing utilities.
//!
//! [`ProviderTester`] drives a [`ProviderService`] without a gRPC server, and
//! [`FakeBam`] stands in for BlueCat Address Manager so that handlers can be
//! exercised end to end in memory.
//!
//! # Example
//!
//! ```ignore
//! use bluecat_provider::testing::{FakeBam, ProviderTester};
//! use bluecat_provider::BlueCatProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_network() {
//!     let bam = FakeBam::new();
//!     let block = bam.add_block(0, "10.0.0.0/8");
//!     let tester = ProviderTester::new(BlueCatProvider::with_connector(bam.clone()));
//!     tester.configure(FakeBam::provider_config()).await.unwrap();
//!
//!     let state = tester
//!         .lifecycle_create("bluecat_ip4_network", json!({
//!             "parent_id": block.to_string(),
//!             "name": "office",
//!             "size": 256
//!         }))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(state["cidr"], "10.0.0.0/24");
//! }
//! ```

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::bam::client::{BamClient, Connector};
use crate::bam::entity::{ApiEntity, ObjectType};
use crate::bam::properties::{cidr_prefix_len, parse_properties};
use crate::config::BamConfig;
use crate::error::{BamError, ProviderError};
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// A test harness for provider implementations.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Get the list of data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    /// Validate provider configuration, failing on error diagnostics.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider, failing on error diagnostics.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Validate a data source configuration.
    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Read data from a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    /// Plan, create, then read back. Returns the state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Plan, update, then read back. Returns the state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated).await
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Assert that a plan creates the resource.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(
        !plan.requires_replace,
        "Expected plan to create, not replace"
    );
}

/// Assert that a plan has no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan requires replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan updates in place.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan changes the given attribute.
///
/// # Panics
///
/// Panics if the plan does not have a change for `path`.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected plan to change attribute '{}'. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error whose summary contains
/// `substring`.
///
/// # Panics
///
/// Panics if no error diagnostic matches.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| d.severity == DiagnosticSeverity::Error && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}'. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

/// First id handed out by [`FakeBam`].
const FIRST_FAKE_ID: i64 = 1001;

/// An in-memory BlueCat Address Manager.
///
/// Clones share state, so a test keeps one handle for seeding and
/// inspection and gives another to the provider as its [`Connector`].
#[derive(Clone, Default)]
pub struct FakeBam {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    objects: BTreeMap<i64, FakeObject>,
    next_id: i64,
    logins: usize,
    logouts: usize,
    open_sessions: usize,
    peak_sessions: usize,
    fail_login: bool,
    fail_logout: bool,
    failing: Vec<&'static str>,
    calls: Vec<String>,
}

struct FakeObject {
    parent_id: i64,
    entity: ApiEntity,
}

impl FakeState {
    fn insert(&mut self, parent_id: i64, mut entity: ApiEntity) -> i64 {
        if self.next_id < FIRST_FAKE_ID {
            self.next_id = FIRST_FAKE_ID;
        }
        let id = self.next_id;
        self.next_id += 1;
        entity.id = id;
        self.objects.insert(id, FakeObject { parent_id, entity });
        id
    }

    fn children(&self, parent_id: i64) -> impl Iterator<Item = &ApiEntity> {
        self.objects
            .values()
            .filter(move |o| o.parent_id == parent_id)
            .map(|o| &o.entity)
    }

    fn record(&mut self, operation: &'static str, args: String) -> Result<(), BamError> {
        self.calls.push(format!("{}({})", operation, args));
        if self.failing.contains(&operation) {
            return Err(BamError::api(operation, 500, "injected failure"));
        }
        Ok(())
    }
}

impl FakeBam {
    /// Create an empty fake.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider configuration accepted by the fake.
    pub fn provider_config() -> Value {
        json!({
            "username": "admin",
            "password": "secret",
            "bluecat_endpoint": "bam.test",
            "ssl_verify": false
        })
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an object under `parent_id` and return its id.
    pub fn add_entity(
        &self,
        parent_id: i64,
        name: &str,
        object_type: ObjectType,
        properties: &str,
    ) -> i64 {
        self.state().insert(
            parent_id,
            ApiEntity::new(0, name, object_type).with_properties(properties),
        )
    }

    /// Add an IP4 block with the given CIDR.
    pub fn add_block(&self, parent_id: i64, cidr: &str) -> i64 {
        self.add_entity(
            parent_id,
            "",
            ObjectType::Ip4Block,
            &format!("CIDR={}|", cidr),
        )
    }

    /// Add an IP4 network with the given name and property string.
    pub fn add_network(&self, parent_id: i64, name: &str, properties: &str) -> i64 {
        self.add_entity(parent_id, name, ObjectType::Ip4Network, properties)
    }

    /// Add `count` allocated addresses to a network.
    pub fn add_addresses(&self, network_id: i64, count: usize) {
        let mut state = self.state();
        for i in 0..count {
            state.insert(
                network_id,
                ApiEntity::new(0, format!("host-{}", i), ObjectType::Ip4Address),
            );
        }
    }

    /// Remove an object behind the provider's back.
    pub fn remove(&self, id: i64) {
        self.state().objects.remove(&id);
    }

    /// The stored entity with `id`, if any.
    pub fn entity(&self, id: i64) -> Option<ApiEntity> {
        self.state().objects.get(&id).map(|o| o.entity.clone())
    }

    /// Make the next logins fail.
    pub fn fail_login(&self) {
        self.state().fail_login = true;
    }

    /// Make logouts fail.
    pub fn fail_logout(&self) {
        self.state().fail_logout = true;
    }

    /// Make every call to the named BAM method fail with HTTP 500.
    pub fn fail_operation(&self, operation: &'static str) {
        self.state().failing.push(operation);
    }

    /// Number of successful logins.
    pub fn logins(&self) -> usize {
        self.state().logins
    }

    /// Number of logout attempts.
    pub fn logouts(&self) -> usize {
        self.state().logouts
    }

    /// Highest number of sessions that were logged in at the same time.
    pub fn peak_sessions(&self) -> usize {
        self.state().peak_sessions
    }

    /// Every BAM call made so far, as `Method(args)`.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Whether any recorded call was to `operation`.
    pub fn called(&self, operation: &str) -> bool {
        let prefix = format!("{}(", operation);
        self.state().calls.iter().any(|c| c.starts_with(&prefix))
    }
}

#[async_trait]
impl Connector for FakeBam {
    async fn connect(&self, _config: &BamConfig) -> Result<Box<dyn BamClient>, BamError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        if state.fail_login {
            return Err(BamError::Login("HTTP 401: Invalid username or password".to_string()));
        }
        state.logins += 1;
        state.open_sessions += 1;
        state.peak_sessions = state.peak_sessions.max(state.open_sessions);
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl BamClient for FakeBam {
    async fn get_entity_by_id(&self, id: i64) -> Result<ApiEntity, BamError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        state.record("GetEntityById", id.to_string())?;
        let entity = state
            .objects
            .get(&id)
            .map(|o| o.entity.clone())
            .unwrap_or_default();
        Ok(entity)
    }

    async fn get_ip_ranged_by_ip(
        &self,
        container_id: i64,
        object_type: &str,
        address: &str,
    ) -> Result<ApiEntity, BamError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        state.record(
            "GetIPRangedByIP",
            format!("{}, {}, {}", container_id, object_type, address),
        )?;

        let address: Ipv4Addr = address
            .parse()
            .map_err(|_| BamError::api("GetIPRangedByIP", 500, "Invalid IP address"))?;

        let ranged = [
            ObjectType::Ip4Block,
            ObjectType::Ip4Network,
            ObjectType::Dhcp4Range,
        ];
        let found = state
            .children(container_id)
            .filter(|e| match object_type {
                "" => ranged.iter().any(|t| t.as_str() == e.object_type()),
                wanted => e.object_type() == wanted,
            })
            .find(|e| contains(e.properties(), address))
            .cloned()
            .unwrap_or_default();
        Ok(found)
    }

    async fn get_parent(&self, id: i64) -> Result<ApiEntity, BamError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        state.record("GetParent", id.to_string())?;
        let parent = state.objects.get(&id).map(|o| o.parent_id);
        let entity = parent
            .and_then(|p| state.objects.get(&p))
            .map(|o| o.entity.clone())
            .unwrap_or_default();
        Ok(entity)
    }

    async fn get_next_available_ip4_network(
        &self,
        parent_id: i64,
        size: i64,
        is_larger_allowed: bool,
        auto_create: bool,
    ) -> Result<i64, BamError> {
        const OPERATION: &str = "GetNextAvailableIP4Network";
        tokio::task::yield_now().await;
        let mut state = self.state();
        state.record(
            OPERATION,
            format!(
                "{}, {}, {}, {}",
                parent_id, size, is_larger_allowed, auto_create
            ),
        )?;

        if size <= 0 || size > 1 << 32 || (size & (size - 1)) != 0 {
            return Err(BamError::api(OPERATION, 500, "Invalid network size"));
        }

        let base = state
            .objects
            .get(&parent_id)
            .filter(|o| o.entity.object_type() == ObjectType::Ip4Block.as_str())
            .and_then(|o| network_address(o.entity.properties()))
            .ok_or_else(|| BamError::api(OPERATION, 500, "Parent is not an IP4 block"))?;

        // The n-th network in a block starts n sizes past the block address.
        let allocated = state
            .children(parent_id)
            .filter(|e| e.object_type() == ObjectType::Ip4Network.as_str())
            .count() as u64;
        let prefix = 32 - size.trailing_zeros();
        let start = u64::from(u32::from(base)) + allocated * size as u64;
        let start = u32::try_from(start)
            .map_err(|_| BamError::api(OPERATION, 500, "No available network"))?;

        Ok(state.insert(
            parent_id,
            ApiEntity::new(0, "", ObjectType::Ip4Network).with_properties(format!(
                "CIDR={}/{}|allowDuplicateHost=disable|inheritAllowDuplicateHost=true|\
                 inheritPingBeforeAssign=true|inheritDNSRestrictions=true|\
                 inheritDefaultDomains=true|inheritDefaultView=true|locationInherited=true|",
                Ipv4Addr::from(start),
                prefix
            )),
        ))
    }

    async fn update(&self, entity: &ApiEntity) -> Result<(), BamError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        state.record("Update", format!("{}, {}", entity.id, entity.name()))?;

        let stored = state
            .objects
            .get_mut(&entity.id)
            .ok_or_else(|| BamError::api("Update", 500, "Object was not found"))?;
        stored.entity.name = entity.name.clone();
        // BAM keeps existing properties when none are sent.
        if !entity.properties().is_empty() {
            stored.entity.properties = entity.properties.clone();
        }
        Ok(())
    }

    async fn delete(&self, object_id: i64) -> Result<(), BamError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        state.record("Delete", object_id.to_string())?;

        if state.objects.remove(&object_id).is_none() {
            return Err(BamError::api("Delete", 500, "Object was not found"));
        }
        state.objects.retain(|_, o| o.parent_id != object_id);
        Ok(())
    }

    async fn get_entities(
        &self,
        parent_id: i64,
        object_type: ObjectType,
        start: u64,
        count: u64,
    ) -> Result<Vec<ApiEntity>, BamError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        state.record(
            "GetEntities",
            format!("{}, {}, {}, {}", parent_id, object_type, start, count),
        )?;

        let skip = usize::try_from(start).unwrap_or(usize::MAX);
        let take = usize::try_from(count).unwrap_or(usize::MAX);
        let page = state
            .children(parent_id)
            .filter(|e| e.object_type() == object_type.as_str())
            .skip(skip)
            .take(take)
            .cloned()
            .collect();
        Ok(page)
    }

    async fn logout(&self) -> Result<(), BamError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        state.logouts += 1;
        state.open_sessions = state.open_sessions.saturating_sub(1);
        if state.fail_logout {
            return Err(BamError::api("Logout", 500, "Session expired"));
        }
        Ok(())
    }
}

fn network_address(properties: &str) -> Option<Ipv4Addr> {
    let cidr = property(properties, "CIDR")?;
    let (address, _) = cidr.split_once('/')?;
    address.parse().ok()
}

fn property<'a>(properties: &'a str, key: &str) -> Option<&'a str> {
    parse_properties(properties)
        .ok()?
        .into_iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// Whether an object with the given properties covers `address`, either by
/// `CIDR` or by a `start`/`end` range.
fn contains(properties: &str, address: Ipv4Addr) -> bool {
    let address = u32::from(address);

    if let Some(cidr) = property(properties, "CIDR") {
        let (Some(network), Ok(prefix)) = (network_address(properties), cidr_prefix_len(cidr))
        else {
            return false;
        };
        let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
        return address & mask == u32::from(network) & mask;
    }

    let bound = |key: &str| {
        property(properties, key)
            .and_then(|v| v.parse::<Ipv4Addr>().ok())
            .map(u32::from)
    };
    match (bound("start"), bound("end")) {
        (Some(start), Some(end)) => (start..=end).contains(&address),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn config() -> BamConfig {
        BamConfig::new("admin", "secret", "bam.test")
    }

    #[tokio::test]
    async fn test_fake_allocates_consecutive_networks() {
        let bam = FakeBam::new();
        let block = bam.add_block(0, "10.1.0.0/16");

        let first = assert_ok!(
            bam.get_next_available_ip4_network(block, 256, false, true)
                .await
        );
        let second = assert_ok!(
            bam.get_next_available_ip4_network(block, 64, false, true)
                .await
        );

        assert_eq!(
            property(bam.entity(first).unwrap().properties(), "CIDR"),
            Some("10.1.0.0/24")
        );
        assert_eq!(
            property(bam.entity(second).unwrap().properties(), "CIDR"),
            Some("10.1.0.64/26")
        );
    }

    #[tokio::test]
    async fn test_fake_rejects_bad_size() {
        let bam = FakeBam::new();
        let block = bam.add_block(0, "10.1.0.0/16");

        let result = bam.get_next_available_ip4_network(block, 100, false, true).await;
        assert!(matches!(result, Err(BamError::Api { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_fake_ranged_lookup() {
        let bam = FakeBam::new();
        let block = bam.add_block(0, "10.0.0.0/8");
        let network = bam.add_network(block, "office", "CIDR=10.0.1.0/24|");
        let range = bam.add_entity(
            network,
            "pool",
            ObjectType::Dhcp4Range,
            "start=10.0.1.100|end=10.0.1.200|",
        );

        let found = assert_ok!(bam.get_ip_ranged_by_ip(block, "", "10.0.1.7").await);
        assert_eq!(found.id, network);

        let found = assert_ok!(
            bam.get_ip_ranged_by_ip(network, "DHCP4Range", "10.0.1.150")
                .await
        );
        assert_eq!(found.id, range);

        let missing = assert_ok!(bam.get_ip_ranged_by_ip(block, "IP4Block", "10.0.1.7").await);
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn test_fake_counts_sessions() {
        let bam = FakeBam::new();

        let client = assert_ok!(bam.connect(&config()).await);
        assert_ok!(client.logout().await);

        assert_eq!(bam.logins(), 1);
        assert_eq!(bam.logouts(), 1);
    }

    #[tokio::test]
    async fn test_fake_tracks_overlapping_sessions() {
        let bam = FakeBam::new();

        let first = assert_ok!(bam.connect(&config()).await);
        let second = assert_ok!(bam.connect(&config()).await);
        assert_ok!(first.logout().await);
        assert_ok!(second.logout().await);
        let third = assert_ok!(bam.connect(&config()).await);
        assert_ok!(third.logout().await);

        assert_eq!(bam.peak_sessions(), 2);
    }

    #[tokio::test]
    async fn test_fake_ranged_lookup_miss_is_empty_entity() {
        let bam = FakeBam::new();
        let block = bam.add_block(0, "10.0.0.0/8");

        let found = assert_ok!(bam.get_ip_ranged_by_ip(block, "", "192.168.0.1").await);

        assert_eq!(found, ApiEntity::default());
        assert_eq!(
            bam.calls(),
            vec![format!("GetIPRangedByIP({}, , 192.168.0.1)", block)]
        );
    }

    #[tokio::test]
    async fn test_fake_injected_failure_is_recorded() {
        let bam = FakeBam::new();
        bam.fail_operation("Delete");

        let result = bam.delete(42).await;

        assert!(result.is_err());
        assert!(bam.called("Delete"));
        assert_eq!(bam.calls(), vec!["Delete(42)".to_string()]);
    }

    #[tokio::test]
    async fn test_fake_get_entities_pages() {
        let bam = FakeBam::new();
        let network = bam.add_network(0, "office", "CIDR=10.0.1.0/24|");
        bam.add_addresses(network, 5);

        let page = assert_ok!(
            bam.get_entities(network, ObjectType::Ip4Address, 2, 10)
                .await
        );
        assert_eq!(page.len(), 3);
    }

    #[test]
    fn test_contains() {
        let addr = |s: &str| s.parse::<Ipv4Addr>().unwrap();

        assert!(contains("CIDR=10.0.0.0/8|", addr("10.200.1.1")));
        assert!(!contains("CIDR=10.0.0.0/8|", addr("11.0.0.1")));
        assert!(contains("CIDR=0.0.0.0/0|", addr("192.168.1.1")));
        assert!(contains("start=10.0.0.5|end=10.0.0.9|", addr("10.0.0.9")));
        assert!(!contains("start=10.0.0.5|end=10.0.0.9|", addr("10.0.0.10")));
        assert!(!contains("gateway=10.0.0.1|", addr("10.0.0.1")));
    }

    #[test]
    fn test_check_diagnostics() {
        assert!(check_diagnostics(vec![Diagnostic::warning("careful")]).is_ok());

        let err = check_diagnostics(vec![
            Diagnostic::error("Missing required attribute 'name'").with_attribute("name"),
        ])
        .unwrap_err();
        let display = err.to_string();
        assert!(display.contains("Missing required attribute"));
        assert!(display.contains("(at name)"));
    }
}
