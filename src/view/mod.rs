//! # View Results
//!
//! A [`ViewResult`] is the intent of how to answer a request, produced by an
//! action and executed by the dispatcher against the bound response.
//! `execute` consumes the boxed value, so a view runs at most once.
//!
//! Strategies shipped with the crate:
//!
//! | View                  | Response                                             |
//! |-----------------------|------------------------------------------------------|
//! | [`DefaultViewResult`] | strings verbatim as `text/plain`, other values as JSON |
//! | [`JsonView`]          | JSON body with an explicit status                    |
//! | [`RedirectView`]      | `302 Found` with `Location`                          |
//! | [`ContentView`]       | raw bytes with an explicit content type              |

mod views;

pub use views::{ContentView, DefaultViewResult, JsonView, RedirectView};

use crate::action::ActionResult;
use crate::context::ActionContext;
use crate::error::ActionError;

/// Rendering strategy for an action's output.
pub trait ViewResult: Send {
    /// Materialize the response.
    ///
    /// # Errors
    ///
    /// Failures are classified like action errors.
    fn execute(self: Box<Self>, ctx: &ActionContext) -> Result<(), ActionError>;
}

/// Turn an action's output into the view to execute.
///
/// Views pass through, plain values are wrapped in [`DefaultViewResult`],
/// and `Empty` yields no view.
#[must_use]
pub fn normalize(result: ActionResult) -> Option<Box<dyn ViewResult>> {
    match result {
        ActionResult::View(view) => Some(view),
        ActionResult::Value(value) => Some(Box::new(DefaultViewResult::new(value))),
        ActionResult::Empty => None,
    }
}
