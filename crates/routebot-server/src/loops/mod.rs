//! Background loops for continuous processing.

pub mod follower_loop;
