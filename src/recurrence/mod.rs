// Recurring occurrence projection: pure date generation from a repeat rule.

pub mod projector;

pub use projector::{
    project, validate_rule, ProjectionError, RecurrenceRule, RecurrenceUnit,
};
