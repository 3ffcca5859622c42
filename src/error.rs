use thiserror::Error;

#[derive(Error, Debug)]
pub enum BalancerError {
    #[error("No healthy containers")]
    NoHealthyContainers,

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("All replicas offline for {0}")]
    AllReplicasOffline(String),

    #[error("Lock timeout on container {0}")]
    LockTimeout(String),

    #[error("Catalog lists {1} on container {0} but storage disagrees")]
    InconsistentReplica(String, String),

    #[error("Container already exists: {0}")]
    ContainerExists(String),

    #[error("Container not found: {0}")]
    UnknownContainer(String),

    #[error("Unknown scheduler: {0}")]
    UnknownScheduler(String),

    #[error("Unknown picker: {0}")]
    UnknownPicker(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Shutting down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, BalancerError>;
