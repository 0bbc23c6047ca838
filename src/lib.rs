#![doc = "deed-image-sync: reconcile local deed image scans against an S3 bucket and upload what is missing."]

//! Pipeline: [`inventory`] (or [`cache`]) → [`reconcile`] → [`scheduler`],
//! coordinated by [`synchronise`]. The bucket is reached only through the
//! [`contract::RemoteStore`] trait; [`store::S3Store`] is the production
//! implementation.

pub mod cache;
pub mod cli;
pub mod config;
pub mod contract;
pub mod error;
pub mod inventory;
pub mod keys;
pub mod load_config;
pub mod reconcile;
pub mod scheduler;
pub mod store;
pub mod synchronise;

pub use cli::{run, Cli, Commands};
