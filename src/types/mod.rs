mod icon;
mod issue;
mod label;
mod priority;
mod project;
mod status;
mod team;
mod user;

pub use icon::Icon;
pub use issue::Issue;
pub use label::{Label, DEFAULT_LABEL_COLOR};
pub use priority::{default_priorities, Priority, PriorityInfo, UNKNOWN_PRIORITY_ORDER};
pub use project::Project;
pub use status::{default_statuses, Status, DEFAULT_STATUS_COLOR};
pub use team::Team;
pub use user::User;
