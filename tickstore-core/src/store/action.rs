//! Actions and their discriminator.

use serde_json::Value;

/// Discriminator of the action every store feeds its reducer once, at
/// construction.
pub const INIT_ACTION_TYPE: &str = "@@INIT";

/// A request for a state change.
///
/// The store only looks at an action's discriminator: an action whose
/// [`action_type`](Action::action_type) is `None` is rejected when it reaches
/// the reducer, unless a middleware consumed it first (a thunk, for example).
///
/// # Example
///
/// ```rust
/// use tickstore_core::{Action, INIT_ACTION_TYPE};
///
/// enum Counter {
///     Init,
///     Increment,
/// }
///
/// impl Action for Counter {
///     fn action_type(&self) -> Option<&str> {
///         Some(match self {
///             Counter::Init => INIT_ACTION_TYPE,
///             Counter::Increment => "increment",
///         })
///     }
///
///     fn init() -> Self {
///         Counter::Init
///     }
/// }
/// ```
pub trait Action: Send + 'static {
    /// The discriminator used to select handling.
    fn action_type(&self) -> Option<&str>;

    /// Build the initialization action, whose discriminator must be
    /// [`INIT_ACTION_TYPE`].
    fn init() -> Self
    where
        Self: Sized;
}

/// Schema-less actions: a JSON object whose string `"type"` field is the
/// discriminator, e.g. `{"type": "inc", "by": 2}`.
impl Action for Value {
    fn action_type(&self) -> Option<&str> {
        self.get("type").and_then(Value::as_str)
    }

    fn init() -> Self {
        serde_json::json!({ "type": INIT_ACTION_TYPE })
    }
}
