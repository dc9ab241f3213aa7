use std::future::Future;
use std::pin::Pin;

/// Future returned by object-safe async ports (see [`super::compiler::Compiler`]).
pub type BoxFuture<T = ()> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;
