pub mod clock;
pub mod http_date;
