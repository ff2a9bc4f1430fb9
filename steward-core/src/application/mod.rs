pub mod agent;
pub mod approval;
pub mod session;
pub mod tooling;
