pub mod connection;
pub mod destination;
pub mod factory;
pub mod phase;
pub mod plan;
pub mod scenario;

pub mod measure;
pub mod reportable;
pub mod worker;
