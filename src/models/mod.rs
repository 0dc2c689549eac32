pub mod appointment;
pub mod details;
pub mod session;

pub use appointment::{AcType, Appointment, AppointmentStatus, Customer, NewAppointment, ServiceKind};
pub use details::BookingDetails;
pub use session::{BookingSession, BookingState, PendingCode, SessionView};
