pub mod follow;
pub mod reviews;

pub use follow::FollowService;
pub use reviews::ReviewService;
