pub mod api;
pub mod models;

pub use api::{DuplicateMatch, PriorityLevel, PriorityToggle, SeverityAggregate};
pub use models::{Coordinates, DraftReport, Report, ReportStatus, Role, SeverityVote, Voter};
