pub mod bearer;
pub mod logging;
pub mod responses;
pub mod secrets;

pub use logging::LoggingHelper;
pub use responses::ResponseBuilder;
