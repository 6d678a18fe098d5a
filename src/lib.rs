//! Library side of capshare.
//!
//! The binary is a thin command line front end over these modules: jobs are built
//! from flags and configuration, then run through [`job::JobManager`]. The same
//! pieces are usable on their own, for example the [`upload`] adapters or the
//! [`process`] image stages.

pub mod artifact;
pub mod capture;
pub mod config;
pub mod job;
pub mod naming;
pub mod process;
pub mod publish;
pub mod store;
pub mod upload;
pub mod util;

pub use config::Config;
