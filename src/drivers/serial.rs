use core::arch::asm;
use core::fmt::{self, Write};

use spin::{Mutex, Once};

use crate::config::SERIAL_PORT;
use crate::logger::LogWriter;

static DRIVER: Once<SerialDriver> = Once::new();

pub struct SerialDriver {
    device: Mutex<SerialPort>,
}

/// Brings up the UART at [`SERIAL_PORT`] and routes the kernel log to it.
pub fn init() {
    let driver = DRIVER.call_once(|| {
        let mut port = SerialPort::new(SERIAL_PORT);
        port.initialize();
        SerialDriver {
            device: Mutex::new(port),
        }
    });
    crate::LOGGER.attach(driver);
}

pub fn get() -> Option<&'static SerialDriver> {
    DRIVER.get()
}

impl LogWriter for SerialDriver {
    fn write_line(&self, args: fmt::Arguments) -> fmt::Result {
        let mut port = self.device.lock();
        port.write_fmt(args)?;
        port.write_str("\r\n")
    }
}

/// 16550 UART driven through port I/O.
pub struct SerialPort {
    base: u16,
}

impl SerialPort {
    const DATA: u16 = 0;
    const INTERRUPT_ENABLE: u16 = 1;
    const FIFO_CONTROL: u16 = 2;
    const LINE_CONTROL: u16 = 3;
    const MODEM_CONTROL: u16 = 4;
    const LINE_STATUS: u16 = 5;

    /// Divisor latch access bit of the line control register.
    const DLAB: u8 = 0x80;
    /// Transmitter holding register empty, in the line status register.
    const THR_EMPTY: u8 = 0x20;

    pub const fn new(base: u16) -> Self {
        Self { base }
    }

    /// 57600 baud, 8N1, FIFO enabled and cleared with a 14-byte threshold.
    pub fn initialize(&mut self) {
        unsafe {
            outb(self.base + Self::INTERRUPT_ENABLE, 0x00);
            outb(self.base + Self::LINE_CONTROL, Self::DLAB);
            outb(self.base + Self::DATA, 0x02);
            outb(self.base + Self::INTERRUPT_ENABLE, 0x00);
            outb(self.base + Self::LINE_CONTROL, 0x03);
            outb(self.base + Self::FIFO_CONTROL, 0xC7);
            outb(self.base + Self::MODEM_CONTROL, 0x0B);
        }
    }

    fn transmit_empty(&self) -> bool {
        unsafe { inb(self.base + Self::LINE_STATUS) & Self::THR_EMPTY != 0 }
    }

    fn write_byte(&mut self, byte: u8) {
        while !self.transmit_empty() {
            core::hint::spin_loop();
        }
        unsafe { outb(self.base + Self::DATA, byte) }
    }
}

impl Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}

unsafe fn outb(port: u16, value: u8) {
    unsafe {
        asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
    }
}

unsafe fn inb(port: u16) -> u8 {
    let value: u8;
    unsafe {
        asm!("in al, dx", out("al") value, in("dx") port, options(nomem, nostack, preserves_flags));
    }
    value
}
