#[path = "integration/concurrency.rs"]
mod concurrency;
#[path = "integration/console.rs"]
mod console;
#[path = "integration/lifecycle.rs"]
mod lifecycle;
#[path = "integration/routing.rs"]
mod routing;
