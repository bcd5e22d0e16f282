pub mod backoff;
pub mod line_buffer;
