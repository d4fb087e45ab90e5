pub mod executor;
pub mod mapper;

pub use executor::{
    Action, ActionExecutor, LogExecutor, RecordingExecutor, ScrollDirection, VolumeDirection,
};
pub use mapper::{
    ActivationState, CommandMapper, Cooldown, MapperConfig, Mode, PinchState, VolumeTracking,
};
