use arcadia_types::PoolError;
use async_trait::async_trait;

/// Creates, checks and tears down the resources a [`super::ResourcePool`] lends out.
///
/// `close` and `close_session` are best-effort: implementations log failures instead of
/// returning them, and must tolerate being called on a resource that is already gone.
#[async_trait]
pub trait ResourceManager: Send + Sync + 'static {
    type Resource: Clone + Send + Sync + 'static;
    type Session: Clone + Send + Sync + 'static;

    /// Start shared machinery. Called once per pool initialization, before pre-warming.
    async fn startup(&self) -> Result<(), PoolError> {
        Ok(())
    }

    async fn create(&self) -> Result<Self::Resource, PoolError>;

    /// Cheap liveness check, run when a resource is released.
    fn is_alive(&self, resource: &Self::Resource) -> bool;

    async fn close(&self, resource: Self::Resource);

    /// Derive an isolated per-task session from a checked-out resource.
    async fn new_session(&self, resource: &Self::Resource) -> Result<Self::Session, PoolError>;

    async fn close_session(&self, session: Self::Session);

    /// Stop shared machinery after every resource has been closed.
    async fn shutdown(&self) {}
}
