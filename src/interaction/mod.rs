pub mod move_resize;
pub mod shell;
pub mod swipe;
pub mod zoom;

pub use move_resize::{MoveSession, ResizeSession, TileFrame, TileOutcome, TileView};
pub use shell::DemoShell;
pub use swipe::{SwipeFrame, SwipeOutcome, SwipeSession, WorkspaceView};
pub use zoom::{ZoomFrame, ZoomSession};
