pub mod confirmation;
pub mod navigation;
pub mod renderer;
pub mod submission;
pub mod tracking;

pub use navigation::{ButtonOutcome, FunnelViewer, NavigationState, Transition, ValidationError, ViewerMode};
