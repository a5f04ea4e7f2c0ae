mod dispatch_loop;
mod registry;
mod waiter;

pub(crate) use dispatch_loop::DispatchLoop;
pub(crate) use registry::Registry;
pub(crate) use waiter::{Waiter, WaiterId};
