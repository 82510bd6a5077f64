//! Automotive Dev Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the operator's controllers.

pub mod automotive_dev_config;

pub use automotive_dev_config::*;
