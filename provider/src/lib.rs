/*!

`spawner-provider` defines the contract that each cloud vendor's cluster engine satisfies, and the
error type those engines return.

!*/

mod controller;
mod error;
mod unavailable;

pub use controller::Controller;
pub use error::{AsErrorKind, IntoProviderError, ProviderError, ProviderResult};
pub use unavailable::UnavailableController;
