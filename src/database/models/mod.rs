pub mod contact;
pub mod project;
pub mod skill;
pub mod user;

pub use contact::{ContactMessage, NewContactMessage};
pub use project::{Project, ProjectForm, ProjectView, ValidProjectForm};
pub use skill::{NewSkill, Skill, SkillPatch};
pub use user::{NewUser, User};
