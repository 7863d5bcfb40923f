pub mod account;
pub mod first_login_token;
pub mod group;
pub mod invite;
pub mod membership;
pub mod permission;
pub mod project;
pub mod role;
pub mod user;

pub use account::Account;
pub use first_login_token::FirstLoginToken;
pub use group::Group;
pub use invite::{Invite, InviteStatus};
pub use membership::GroupMembership;
pub use permission::{Permission, PermissionSet};
pub use project::Project;
pub use role::RoleName;
pub use user::{NewAdminUser, User};
