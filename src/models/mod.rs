pub mod membership;
pub mod patch;
pub mod project;
pub mod task;
pub mod user;

pub use membership::{MembershipInput, ProjectMembership, ProjectRole};
pub use patch::Patch;
pub use project::{Project, ProjectInput, ProjectStatus, ProjectUpdate};
pub use task::{
    AssignUsersRequest, Task, TaskInput, TaskPriority, TaskQuery, TaskStatus, TaskUpdate,
    TaskWithAssignees,
};
pub use user::{NewUser, User, UserRole, UserSummary, UserUpdate};
