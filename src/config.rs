use crate::logger::LogLevel;

#[cfg(feature = "log-debug")]
pub const LOG_LEVEL: LogLevel = LogLevel::Debug;
#[cfg(not(feature = "log-debug"))]
pub const LOG_LEVEL: LogLevel = LogLevel::Info;

/// I/O base of the UART the logger writes to: COM1, or COM2 with the
/// `serial-com2` feature.
#[cfg(not(feature = "serial-com2"))]
pub const SERIAL_PORT: u16 = 0x3F8;
#[cfg(feature = "serial-com2")]
pub const SERIAL_PORT: u16 = 0x2F8;

/// Null, kernel code, kernel data, user code, user data.
pub const GDT_ENTRY_COUNT: usize = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(feature = "serial-com2"))]
    fn serial_defaults_to_com1() {
        assert_eq!(SERIAL_PORT, 0x3F8);
    }

    #[test]
    #[cfg(feature = "serial-com2")]
    fn serial_feature_selects_com2() {
        assert_eq!(SERIAL_PORT, 0x2F8);
    }

    #[test]
    #[cfg(not(feature = "log-debug"))]
    fn logs_at_info_by_default() {
        assert_eq!(LOG_LEVEL, LogLevel::Info);
    }
}
