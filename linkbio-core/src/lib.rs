//! Pure rules shared by the linkbio server and its tooling.
//!
//! Nothing in here performs I/O: the username rule set turns raw input into a
//! canonical token plus feedback, and the link helpers normalize what users
//! type into the link editor.

pub mod links;
pub mod username;

pub use links::{LinkError, move_item, normalize_title, normalize_url};
pub use username::{
    Username, UsernameIssue, UsernameRules, ValidationResult, describe_transformation, sanitize,
    suggest_username,
};
