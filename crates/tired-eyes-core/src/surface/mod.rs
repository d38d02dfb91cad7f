mod controller;

pub use controller::{
    BreakSurfaceController, LogSurfaceHost, SurfaceHandle, SurfaceHost, SurfaceStatus,
    FAILSAFE_GRACE,
};
