pub mod exercise;
pub mod exercise_request;
pub mod record;
pub mod session;
pub mod template;
pub mod user;

pub use exercise::{Exercise, ExerciseDraft, ExerciseType};
pub use exercise_request::{ExerciseRequest, RequestStatus};
pub use record::Record;
pub use session::{
    RestState, RestStatus, RuntimeEntry, Session, SessionSet, SessionStatus, SessionSummary,
    SetInput,
};
pub use template::{
    ComboType, Prescription, RepBlock, Template, TemplateDay, TemplateItem,
};
pub use user::{NewUser, Settings, Unit, User, UserRole};
