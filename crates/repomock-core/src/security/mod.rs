//! Users, groups, and principals.

pub mod membership;
pub mod principal;
pub mod user_manager;

pub use membership::{MembershipResolver, SearchType};
pub use principal::{Principal, PrincipalKind, PrincipalManager};
pub use user_manager::UserManager;
