pub mod resume;
pub mod tailor;
