//! Authentication and authorization flow.
//!
//! ## Module Organization
//!
//! - `action`: Actions checked against Casbin policies (read, write, approve)
//! - `authenticate`: User authentication (single user, basic auth, proxy)
//! - `authorize`: Role-based authorization wrapper over the enforcer
//! - `casbin`: Casbin enforcer initialization and depot integration
//! - `depot`: Helpers for extracting the authenticated user from Salvo requests
//! - `password`: Password hashing and verification with Argon2
//! - `resource`: Resource kinds named in policies

pub mod action;
pub mod authenticate;
pub mod authorize;
pub mod casbin;
pub mod depot;
pub mod password;
pub mod resource;

pub use action::Action;
pub use authorize::{Authorizer, AuthzResult, authorizer_from_depot};
pub use depot::{DepotUser, get_user_from_depot, is_authenticated};
pub use resource::Resource;
