//! Background tasks owned by the runtime.

mod follower;
mod scheduler;

pub(crate) use follower::Follower;
pub(crate) use scheduler::Scheduler;
