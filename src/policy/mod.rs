//! Policy store (C3): CRUD, inheritance, validation, template instantiation.

pub mod store;
pub mod template;
pub mod validation;

pub use store::{seed_default_policy, PolicyDiff, PolicyError, PolicyStore};
pub use template::{instantiate, TemplateError, TemplateValue};
pub use validation::{validate_policy, ValidationError};
