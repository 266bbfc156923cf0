pub mod auth;
pub mod me;
pub mod polls;
pub mod run;
pub mod stake;
