pub mod catalog;
pub mod config;
pub mod container;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod health;
pub mod http;
pub mod job;
pub mod picker;
pub mod scheduler;
pub mod shutdown;
pub mod users;

pub use catalog::FileCatalog;
pub use config::BalancerConfig;
pub use container::{Container, ContainerRegistry};
pub use dispatcher::Dispatcher;
pub use error::{BalancerError, Result};
pub use job::{Job, JobType};
