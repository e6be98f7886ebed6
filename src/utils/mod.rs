pub mod errors;
pub mod session_axis;

pub use errors::ChartError;
pub use session_axis::SessionAxis;
