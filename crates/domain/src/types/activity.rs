//! Opaque host UI handle

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Handle to the host UI surface a purchase flow is launched from
///
/// The pipeline never inspects it; it is handed to the billing client as-is.
#[derive(Clone)]
pub struct ActivityHandle(Arc<dyn Any + Send + Sync>);

impl ActivityHandle {
    pub fn new<T: Any + Send + Sync>(inner: T) -> Self {
        Self(Arc::new(inner))
    }

    /// Borrow the wrapped host object if it has the expected type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for ActivityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ActivityHandle(..)")
    }
}
