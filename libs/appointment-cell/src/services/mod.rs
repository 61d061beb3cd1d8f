pub mod booking;
pub mod calendar;
pub mod lookup;
pub mod slots;
pub mod store;

pub use booking::AppointmentBookingService;
pub use calendar::CalendarSync;
pub use lookup::AppointmentLookupService;
