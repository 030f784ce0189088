//! Function catalog and registry.
//!
//! The [`Catalog`] maps stable identifiers to constructors and is filled in
//! code by the binary. At startup the [`FunctionRegistry`] picks the targets
//! out of the catalog, constructs each function exactly once and records its
//! kind and route.

use crate::error::{ConfigurationError, HandlerFault, Result, RuntimeError};
use crate::function::{EventFunction, HttpFunction, OpenFunction, Route};
use std::collections::HashSet;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::info;

/// A constructed function instance
#[derive(Clone)]
pub enum Function {
    Http(Arc<dyn HttpFunction>),
    Event(Arc<dyn EventFunction>),
    Open(Arc<dyn OpenFunction>),
}

/// Capability of a registered function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Http,
    Event,
    Open,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FunctionKind::Http => "http",
            FunctionKind::Event => "event",
            FunctionKind::Open => "open",
        };
        f.write_str(name)
    }
}

impl Function {
    pub fn kind(&self) -> FunctionKind {
        match self {
            Function::Http(_) => FunctionKind::Http,
            Function::Event(_) => FunctionKind::Event,
            Function::Open(_) => FunctionKind::Open,
        }
    }

    fn route(&self) -> Option<Route> {
        match self {
            Function::Http(f) => f.route(),
            Function::Event(f) => f.route(),
            Function::Open(f) => f.route(),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function::{}", self.kind())
    }
}

type Constructor = Box<dyn Fn() -> anyhow::Result<Function> + Send + Sync>;

/// Ordered mapping of function identifiers to constructors
#[derive(Default)]
pub struct Catalog {
    entries: Vec<(String, Constructor)>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constructor under `id`
    pub fn register<F>(&mut self, id: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn() -> anyhow::Result<Function> + Send + Sync + 'static,
    {
        self.entries.push((id.into(), Box::new(constructor)));
        self
    }

    pub fn http<T: HttpFunction + Default>(&mut self, id: impl Into<String>) -> &mut Self {
        self.register(id, || Ok(Function::Http(Arc::new(T::default()))))
    }

    pub fn event<T: EventFunction + Default>(&mut self, id: impl Into<String>) -> &mut Self {
        self.register(id, || Ok(Function::Event(Arc::new(T::default()))))
    }

    pub fn open<T: OpenFunction + Default>(&mut self, id: impl Into<String>) -> &mut Self {
        self.register(id, || Ok(Function::Open(Arc::new(T::default()))))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get(&self, id: &str) -> Option<&Constructor> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == id)
            .map(|(_, constructor)| constructor)
    }
}

/// A function ready to be served
#[derive(Debug, Clone)]
pub struct Registration {
    id: String,
    function: Function,
    route: Route,
    declared_route: bool,
}

impl Registration {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn kind(&self) -> FunctionKind {
        self.function.kind()
    }

    /// The declared route, or the catch-all route
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Whether the function declared its own route
    pub fn is_routable(&self) -> bool {
        self.declared_route
    }
}

/// Ordered, immutable list of registrations
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    registrations: Arc<[Registration]>,
}

impl FunctionRegistry {
    /// Construct the functions named by `targets`, in order.
    ///
    /// An empty target list selects every catalog entry.
    pub fn build(catalog: &Catalog, targets: &[String]) -> Result<Self> {
        let targets: Vec<&str> = if targets.is_empty() {
            catalog.ids().collect()
        } else {
            targets.iter().map(|t| t.trim()).collect()
        };

        let mut seen = HashSet::new();
        let mut registrations = Vec::with_capacity(targets.len());

        for id in targets {
            if !seen.insert(id) {
                return Err(ConfigurationError::DuplicateFunction(id.to_string()).into());
            }

            let constructor =
                catalog
                    .get(id)
                    .ok_or_else(|| ConfigurationError::UnsupportedHandler {
                        id: id.to_string(),
                        reason: "no such function in the catalog".to_string(),
                    })?;

            let function = construct(id, constructor)?;
            let declared = function.route();
            let declared_route = declared.is_some();
            let route = declared.unwrap_or_else(Route::catch_all);
            route.pattern()?;

            info!(
                "Registered function: {} ({}, route {})",
                id,
                function.kind(),
                route
            );

            registrations.push(Registration {
                id: id.to_string(),
                function,
                route,
                declared_route,
            });
        }

        Ok(Self {
            registrations: registrations.into(),
        })
    }

    /// Registry holding already constructed functions
    pub fn from_functions<I, S>(functions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Function)>,
        S: Into<String>,
    {
        let mut catalog = Catalog::new();
        for (id, function) in functions {
            catalog.register(id, move || Ok(function.clone()));
        }
        Self::build(&catalog, &[])
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.registrations.iter()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

fn construct(id: &str, constructor: &Constructor) -> Result<Function> {
    match catch_unwind(AssertUnwindSafe(|| constructor())) {
        Ok(Ok(function)) => Ok(function),
        Ok(Err(e)) => Err(RuntimeError::Construction {
            id: id.to_string(),
            source: HandlerFault::from(e),
        }),
        Err(payload) => Err(RuntimeError::Construction {
            id: id.to_string(),
            source: HandlerFault::from_panic(payload),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::error::InvokeResult;
    use crate::event::{HttpRequest, HttpResponse};
    use crate::output::Output;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Echo;

    #[async_trait]
    impl OpenFunction for Echo {
        async fn accept(&self, _ctx: &mut Context, payload: Bytes) -> InvokeResult<Output> {
            Ok(Output::new().with_data(payload))
        }
    }

    #[derive(Default)]
    struct Hello;

    #[async_trait]
    impl HttpFunction for Hello {
        async fn service(&self, _req: &HttpRequest, res: &mut HttpResponse) -> InvokeResult {
            res.write("hello");
            Ok(())
        }

        fn route(&self) -> Option<Route> {
            Some(Route::new("/hello").with_methods(["GET"]))
        }
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.open::<Echo>("echo").http::<Hello>("hello");
        catalog
    }

    #[test]
    fn test_empty_targets_select_whole_catalog() {
        let registry = FunctionRegistry::build(&catalog(), &[]).unwrap();

        let ids: Vec<_> = registry.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["echo", "hello"]);

        let echo = &registry.registrations()[0];
        assert_eq!(echo.kind(), FunctionKind::Open);
        assert!(!echo.is_routable());
        assert_eq!(echo.route(), &Route::catch_all());

        let hello = &registry.registrations()[1];
        assert_eq!(hello.kind(), FunctionKind::Http);
        assert!(hello.is_routable());
        assert_eq!(hello.route().path(), "/hello");
    }

    #[test]
    fn test_targets_keep_their_order() {
        let targets = vec!["hello".to_string(), " echo ".to_string()];
        let registry = FunctionRegistry::build(&catalog(), &targets).unwrap();

        let ids: Vec<_> = registry.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["hello", "echo"]);
    }

    #[test]
    fn test_unknown_target() {
        let err = FunctionRegistry::build(&catalog(), &["missing".to_string()]).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Configuration(ConfigurationError::UnsupportedHandler { ref id, .. }) if id == "missing"
        ));
    }

    #[test]
    fn test_duplicate_target() {
        let targets = vec!["echo".to_string(), "echo".to_string()];
        let err = FunctionRegistry::build(&catalog(), &targets).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Configuration(ConfigurationError::DuplicateFunction(ref id)) if id == "echo"
        ));
    }

    #[test]
    fn test_constructor_failures() {
        let mut catalog = Catalog::new();
        catalog
            .register("failing", || Err(anyhow::anyhow!("missing credentials")))
            .register("panicking", || panic!("constructor exploded"));

        let err = FunctionRegistry::build(&catalog, &["failing".to_string()]).unwrap_err();
        assert!(matches!(err, RuntimeError::Construction { ref id, .. } if id == "failing"));
        assert!(err.to_string().contains("missing credentials"));

        let err = FunctionRegistry::build(&catalog, &["panicking".to_string()]).unwrap_err();
        assert!(matches!(err, RuntimeError::Construction { ref id, .. } if id == "panicking"));
        assert!(err.to_string().contains("constructor exploded"));
    }

    #[test]
    fn test_each_function_is_constructed_once() {
        static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

        let mut catalog = Catalog::new();
        catalog.register("counted", || {
            CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
            Ok(Function::Open(Arc::new(Echo)))
        });

        let registry = FunctionRegistry::build(&catalog, &[]).unwrap();
        let first = registry.registrations()[0].function().clone();
        let second = registry.registrations()[0].function().clone();

        assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 1);
        match (first, second) {
            (Function::Open(a), Function::Open(b)) => assert!(Arc::ptr_eq(&a, &b)),
            _ => panic!("expected open functions"),
        }
    }

    #[test]
    fn test_invalid_declared_route() {
        struct Bad;

        #[async_trait]
        impl HttpFunction for Bad {
            async fn service(&self, _req: &HttpRequest, _res: &mut HttpResponse) -> InvokeResult {
                Ok(())
            }

            fn route(&self) -> Option<Route> {
                Some(Route::new("no-slash"))
            }
        }

        let err =
            FunctionRegistry::from_functions([("bad", Function::Http(Arc::new(Bad)))]).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Configuration(ConfigurationError::InvalidRoute(_))
        ));
    }
}
