pub mod acquire;
pub mod frame;
pub mod mapping;
pub mod sensor;
pub mod synthetic;

pub use acquire::acquire_pair;
pub use frame::{CaptureInstant, FrameDescriptor, FramePair, Lease, RawFrame, StreamType};
pub use mapping::{CoordinateMappingTable, DepthSpacePoint};
pub use sensor::{FrameArrival, Sensor};
pub use synthetic::{SensorStats, SyntheticSensor, TickPlan};
