//! Layer type and utilities.
//!
//! Layers are the abstraction of middleware in detour,
//! what other http client stacks call an interceptor.
//!
//! A tuple of layers is a layer as well, where the first
//! element of the tuple becomes the outermost middleware:
//! `(a, b, c).into_layer(transport)` equals `a(b(c(transport)))`.

/// A layer that produces a Layered service (middleware(inner service)).
pub trait Layer<S>: Sized {
    /// The service produced by the layer.
    type Service;

    /// Wrap the given service with the middleware, returning a new service.
    fn layer(&self, inner: S) -> Self::Service;

    /// Same as `layer` but consuming self after the service was created.
    ///
    /// Useful for layers which are only used once,
    /// as it avoids cloning the state they carry.
    fn into_layer(self, inner: S) -> Self::Service {
        self.layer(inner)
    }
}

impl<T, S> Layer<S> for &T
where
    T: Layer<S>,
{
    type Service = T::Service;

    fn layer(&self, inner: S) -> Self::Service {
        (**self).layer(inner)
    }
}

impl<S> Layer<S> for () {
    type Service = S;

    fn layer(&self, inner: S) -> Self::Service {
        inner
    }
}

impl<S, L> Layer<S> for (L,)
where
    L: Layer<S>,
{
    type Service = L::Service;

    fn layer(&self, inner: S) -> Self::Service {
        self.0.layer(inner)
    }

    fn into_layer(self, inner: S) -> Self::Service {
        self.0.into_layer(inner)
    }
}

impl<S, Outer, Inner> Layer<S> for (Outer, Inner)
where
    Outer: Layer<Inner::Service>,
    Inner: Layer<S>,
{
    type Service = Outer::Service;

    fn layer(&self, inner: S) -> Self::Service {
        self.0.layer(self.1.layer(inner))
    }

    fn into_layer(self, inner: S) -> Self::Service {
        let (outer, middle) = self;
        outer.into_layer(middle.into_layer(inner))
    }
}

impl<S, L1, L2, L3> Layer<S> for (L1, L2, L3)
where
    L1: Layer<L2::Service>,
    L2: Layer<L3::Service>,
    L3: Layer<S>,
{
    type Service = L1::Service;

    fn layer(&self, inner: S) -> Self::Service {
        self.0.layer(self.1.layer(self.2.layer(inner)))
    }

    fn into_layer(self, inner: S) -> Self::Service {
        let (l1, l2, l3) = self;
        l1.into_layer(l2.into_layer(l3.into_layer(inner)))
    }
}

impl<S, L1, L2, L3, L4> Layer<S> for (L1, L2, L3, L4)
where
    L1: Layer<L2::Service>,
    L2: Layer<L3::Service>,
    L3: Layer<L4::Service>,
    L4: Layer<S>,
{
    type Service = L1::Service;

    fn layer(&self, inner: S) -> Self::Service {
        self.0.layer(self.1.layer(self.2.layer(self.3.layer(inner))))
    }

    fn into_layer(self, inner: S) -> Self::Service {
        let (l1, l2, l3, l4) = self;
        l1.into_layer(l2.into_layer(l3.into_layer(l4.into_layer(inner))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Wrap(&'static str);

    impl Layer<String> for Wrap {
        type Service = String;

        fn layer(&self, inner: String) -> Self::Service {
            format!("{}({inner})", self.0)
        }
    }

    #[test]
    fn tuple_layers_wrap_outer_to_inner() {
        let transport = || "transport".to_owned();
        assert_eq!(().layer(transport()), "transport");
        assert_eq!((Wrap("a"),).layer(transport()), "a(transport)");
        assert_eq!(
            (Wrap("a"), Wrap("b"), Wrap("c")).layer(transport()),
            "a(b(c(transport)))"
        );
        assert_eq!(
            (Wrap("a"), Wrap("b"), Wrap("c"), Wrap("d")).into_layer(transport()),
            "a(b(c(d(transport))))"
        );
        assert_eq!((&Wrap("x"), Wrap("y")).layer(transport()), "x(y(transport))");
    }
}
