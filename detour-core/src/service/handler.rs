//! `async fn(...)` as [`Service`].

use crate::Service;
use std::fmt;

/// Create a [`ServiceFn`] from a function.
///
/// This is the quickest way to plug an existing transport,
/// or a test double of one, at the bottom of a detour middleware stack.
pub fn service_fn<F>(f: F) -> ServiceFn<F> {
    ServiceFn { f }
}

/// A [`ServiceFn`] is a [`Service`] implemented using a function.
///
/// You do not need to implement this trait yourself.
/// Instead, you need to use the [`service_fn`] function to create a [`ServiceFn`].
#[derive(Clone, Copy)]
pub struct ServiceFn<F> {
    f: F,
}

impl<F> fmt::Debug for ServiceFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceFn")
            .field("f", &std::any::type_name::<F>())
            .finish()
    }
}

impl<F, Fut, Input, O, E> Service<Input> for ServiceFn<F>
where
    F: Fn(Input) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
    O: Send + 'static,
    E: Send + 'static,
{
    type Output = O;
    type Error = E;

    #[inline]
    fn serve(&self, input: Input) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send + '_ {
        (self.f)(input)
    }
}
