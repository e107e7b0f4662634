//! The BAM API surface used by the provider.

use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::bam::entity::{ApiEntity, ObjectType};
use crate::config::BamConfig;
use crate::error::{BamError, ProviderError};

/// One authenticated BAM session.
///
/// Methods map one-to-one onto BAM API methods.
#[async_trait]
pub trait BamClient: Send + Sync {
    /// `GetEntityById`. A missing object comes back with id `0`.
    async fn get_entity_by_id(&self, id: i64) -> Result<ApiEntity, BamError>;

    /// `GetIPRangedByIP`: the block, network or range in `container_id`
    /// containing `address`. An empty `object_type` matches any of them.
    async fn get_ip_ranged_by_ip(
        &self,
        container_id: i64,
        object_type: &str,
        address: &str,
    ) -> Result<ApiEntity, BamError>;

    /// `GetParent`: the object directly containing `id`.
    async fn get_parent(&self, id: i64) -> Result<ApiEntity, BamError>;

    /// `GetNextAvailableIP4Network`, returning the id of the network.
    async fn get_next_available_ip4_network(
        &self,
        parent_id: i64,
        size: i64,
        is_larger_allowed: bool,
        auto_create: bool,
    ) -> Result<i64, BamError>;

    /// `Update` an entity's name, type and properties.
    async fn update(&self, entity: &ApiEntity) -> Result<(), BamError>;

    /// `Delete` an object.
    async fn delete(&self, object_id: i64) -> Result<(), BamError>;

    /// `GetEntities`: children of `parent_id` of the given type.
    async fn get_entities(
        &self,
        parent_id: i64,
        object_type: ObjectType,
        start: u64,
        count: u64,
    ) -> Result<Vec<ApiEntity>, BamError>;

    /// `Logout`, ending the session.
    async fn logout(&self) -> Result<(), BamError>;
}

/// Opens authenticated BAM sessions.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Log in to BAM and return a client bound to the new session.
    async fn connect(&self, config: &BamConfig) -> Result<Box<dyn BamClient>, BamError>;
}

/// A logged-in client that must be closed with [`Session::finish`].
///
/// A session dropped without `finish`, for example because the request
/// future was cancelled, logs out from a background task instead.
pub struct Session {
    client: Arc<dyn BamClient>,
    finished: bool,
}

impl Session {
    /// Log in through `connector`.
    pub async fn open(connector: &dyn Connector, config: &BamConfig) -> Result<Self, BamError> {
        let client = connector.connect(config).await?;
        Ok(Self {
            client: Arc::from(client),
            finished: false,
        })
    }

    /// Log out and hand back `result`.
    ///
    /// When `result` is an error the logout is still attempted; a logout
    /// failure is then only logged and the original error is returned.
    pub async fn finish<T>(
        mut self,
        result: Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        self.finished = true;
        match result {
            Ok(value) => {
                self.client.logout().await?;
                info!("BlueCat logout was successful");
                Ok(value)
            }
            Err(err) => {
                match self.client.logout().await {
                    Ok(()) => info!("BlueCat logout was successful"),
                    Err(logout_err) => {
                        warn!(error = %logout_err, "BlueCat logout failed after an error")
                    }
                }
                Err(err)
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("BlueCat session dropped outside a runtime, it was not logged out");
            return;
        };
        warn!("BlueCat session dropped before logout, logging out in the background");
        let client = Arc::clone(&self.client);
        handle.spawn(async move {
            if let Err(err) = client.logout().await {
                warn!(error = %err, "Background BlueCat logout failed");
            }
        });
    }
}

impl Deref for Session {
    type Target = dyn BamClient;

    fn deref(&self) -> &Self::Target {
        self.client.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBam;

    fn config() -> BamConfig {
        BamConfig::new("admin", "secret", "bam.example.com")
    }

    #[tokio::test]
    async fn test_finish_logs_out_on_success() {
        let bam = FakeBam::new();
        let session = Session::open(&bam, &config()).await.unwrap();

        let value = session.finish(Ok::<_, ProviderError>(5)).await.unwrap();

        assert_eq!(value, 5);
        assert_eq!(bam.logins(), 1);
        assert_eq!(bam.logouts(), 1);
    }

    #[tokio::test]
    async fn test_finish_logs_out_on_error() {
        let bam = FakeBam::new();
        let session = Session::open(&bam, &config()).await.unwrap();

        let result = session
            .finish::<()>(Err(ProviderError::Validation("bad id".to_string())))
            .await;

        assert!(matches!(result, Err(ProviderError::Validation(_))));
        assert_eq!(bam.logouts(), 1);
    }

    #[tokio::test]
    async fn test_original_error_wins_over_logout_failure() {
        let bam = FakeBam::new();
        bam.fail_logout();
        let session = Session::open(&bam, &config()).await.unwrap();

        let result = session
            .finish::<()>(Err(ProviderError::NotFound("42".to_string())))
            .await;

        assert!(matches!(result, Err(ProviderError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_logout_failure_surfaces_on_success() {
        let bam = FakeBam::new();
        bam.fail_logout();
        let session = Session::open(&bam, &config()).await.unwrap();

        let result = session.finish(Ok::<_, ProviderError>(())).await;

        assert!(matches!(result, Err(ProviderError::Bam(_))));
    }

    #[tokio::test]
    async fn test_dropped_session_logs_out() {
        let bam = FakeBam::new();
        let session = Session::open(&bam, &config()).await.unwrap();

        drop(session);
        for _ in 0..10 {
            if bam.logouts() == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(bam.logouts(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_operation_logs_out() {
        let bam = FakeBam::new();
        let session = Session::open(&bam, &config()).await.unwrap();

        // The caller gives up while the session is still in use.
        let pending = async move {
            let _ = session.get_entity_by_id(1).await;
            std::future::pending::<()>().await;
        };
        let cancelled = tokio::time::timeout(std::time::Duration::from_millis(10), pending).await;
        assert!(cancelled.is_err());

        for _ in 0..10 {
            if bam.logouts() == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(bam.logouts(), 1);
    }

    #[tokio::test]
    async fn test_finished_session_logs_out_once() {
        let bam = FakeBam::new();
        let session = Session::open(&bam, &config()).await.unwrap();

        session.finish(Ok::<_, ProviderError>(())).await.unwrap();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert_eq!(bam.logouts(), 1);
    }

    #[tokio::test]
    async fn test_login_failure() {
        let bam = FakeBam::new();
        bam.fail_login();

        let result = Session::open(&bam, &config()).await;

        assert!(matches!(result, Err(BamError::Login(_))));
        assert_eq!(bam.logouts(), 0);
    }
}
