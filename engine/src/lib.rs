pub mod ecs;
pub mod jobs;
