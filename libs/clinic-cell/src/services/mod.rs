pub mod settings;

pub use settings::ClinicSettingsService;
